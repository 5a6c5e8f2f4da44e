//! Browser entry point and runtime singleton.
//!
//! Compiled only with the `web` feature. The module auto-initializes when
//! the wasm bundle loads: it waits for the document to be ready, defers
//! briefly so the host application finishes hydrating, reads the options
//! object injected by the delivery channel, and starts a [`ZoomRuntime`]
//! over a [`WebHost`]. The runtime instance lives in a thread-local slot;
//! every DOM callback funnels through [`with_runtime`].
//!
//! Two functions are exported to the page for hosts that manage the
//! lifecycle themselves: `reinitImageZoom()` and `teardownImageZoom()`.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{DocumentReadyState, Element};

use crate::config::ZoomConfig;
use crate::host::web::WebHost;
use crate::host::TimerId;
use crate::runtime::ZoomRuntime;

/// Deferral between document readiness and the first scan, giving the
/// host application time to finish mounting, in milliseconds
const INIT_DELAY_MS: i32 = 100;

/// Name of the global options object injected by the delivery channel
const OPTIONS_GLOBAL: &str = "__IMAGE_ZOOM_OPTIONS__";

thread_local! {
    static RUNTIME: RefCell<Option<ZoomRuntime<WebHost>>> = const { RefCell::new(None) };
}

/// Module entry point: schedule initialization once the document is ready.
/// In a context with no window or document this does nothing.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    if document.ready_state() == DocumentReadyState::Loading {
        let callback = Closure::once_into_js(schedule_init);
        let _ = document
            .add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref());
    } else {
        schedule_init();
    }
}

/// Re-initialize from the injected options object. Idempotent: a running
/// runtime is torn down first.
#[wasm_bindgen(js_name = reinitImageZoom)]
pub fn reinit_image_zoom() {
    init_from_page();
}

/// Tear the runtime down, restoring wrapped images and removing all
/// observers and listeners.
#[wasm_bindgen(js_name = teardownImageZoom)]
pub fn teardown_image_zoom() {
    RUNTIME.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut() {
            if let Some(mut runtime) = slot.take() {
                runtime.teardown();
            }
        }
    });
}

fn schedule_init() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(init_from_page);
    let _ = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            INIT_DELAY_MS,
        );
}

fn init_from_page() {
    let config = page_config().unwrap_or_default();
    let Ok(host) = WebHost::new() else {
        return;
    };
    RUNTIME.with(|cell| {
        let mut slot = cell.borrow_mut();
        if let Some(previous) = slot.as_mut() {
            previous.teardown();
        }
        let mut runtime = ZoomRuntime::new(host, config);
        runtime.init();
        *slot = Some(runtime);
    });
}

/// Read the injected options object, if present and well-formed.
fn page_config() -> Option<ZoomConfig> {
    let window = web_sys::window()?;
    let raw = js_sys::Reflect::get(&window, &JsValue::from_str(OPTIONS_GLOBAL)).ok()?;
    if raw.is_undefined() || raw.is_null() {
        return None;
    }
    let json = js_sys::JSON::stringify(&raw).ok()?.as_string()?;
    match ZoomConfig::from_json(&json) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("ignoring malformed zoom options: {err}");
            None
        }
    }
}

/// Run a closure against the runtime singleton, if one is live. Skips
/// silently when the slot is empty or already borrowed.
pub(crate) fn with_runtime(f: impl FnOnce(&mut ZoomRuntime<WebHost>)) {
    RUNTIME.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut() {
            if let Some(runtime) = slot.as_mut() {
                f(runtime);
            }
        }
    });
}

pub(crate) fn dispatch_activate(element: Element) {
    with_runtime(|runtime| runtime.on_activate(&element));
}

pub(crate) fn dispatch_dismiss() {
    with_runtime(|runtime| runtime.on_dismiss());
}

pub(crate) fn dispatch_escape() {
    with_runtime(|runtime| runtime.on_escape());
}

pub(crate) fn dispatch_image_loaded(element: Element) {
    with_runtime(|runtime| runtime.on_image_loaded(&element));
}

pub(crate) fn dispatch_subtree(added: Vec<Element>) {
    with_runtime(|runtime| runtime.on_subtree_changed(&added));
}

pub(crate) fn dispatch_history_changed() {
    with_runtime(|runtime| runtime.on_history_changed());
}

pub(crate) fn dispatch_frame() {
    with_runtime(|runtime| runtime.on_frame());
}

pub(crate) fn dispatch_timer(id: TimerId) {
    with_runtime(|runtime| {
        runtime.host_mut().forget_timer(id);
        runtime.on_timer(id);
    });
}
