//! Browser host backed by `web-sys`.
//!
//! Implements [`Host`] over the real DOM: `MutationObserver` for subtree
//! observation, history-API interception plus `popstate` for navigation
//! intent, `requestAnimationFrame` and `setTimeout`/`setInterval` for
//! scheduling. Every listener closure routes its event to the runtime
//! singleton in [`crate::wasm`].
//!
//! Listener lifetimes: document-level closures (Escape, `popstate`, the
//! history patches, the mutation observer) live as long as the host and
//! are toggled by add/remove, so deregistering one from inside its own
//! invocation never drops running code. Element-scoped one-shot load
//! listeners are handed to the JS garbage collector via
//! `Closure::once_into_js`.

use js_sys::{Array, Function, Reflect};
use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, HtmlElement, HtmlImageElement,
    KeyboardEvent, MutationObserver, MutationObserverInit, MutationRecord, Window,
};

use crate::error::ZoomError;
use crate::host::{Host, ImageInfo, ListenKind, TimerId};
use crate::wrapper::ZOOM_SRC_ATTR;

type EventClosure = Closure<dyn FnMut(Event)>;

struct ListenerEntry {
    element: Element,
    kind: ListenKind,
    callbacks: Vec<(&'static str, EventClosure)>,
}

struct HistoryHooks {
    history: JsValue,
    original_push: Function,
    original_replace: Function,
    _patched_push: Closure<dyn FnMut(JsValue, JsValue, JsValue)>,
    _patched_replace: Closure<dyn FnMut(JsValue, JsValue, JsValue)>,
}

/// [`Host`] implementation over the browser DOM.
pub struct WebHost {
    window: Window,
    document: Document,
    listeners: Vec<ListenerEntry>,
    escape_handler: Option<Closure<dyn FnMut(KeyboardEvent)>>,
    escape_active: bool,
    popstate: Option<Closure<dyn FnMut(Event)>>,
    history_hooks: Option<HistoryHooks>,
    observer: Option<(MutationObserver, Closure<dyn FnMut(Array, MutationObserver)>)>,
    interval_callbacks: Vec<(TimerId, Closure<dyn FnMut()>)>,
    timers: Vec<(TimerId, i32, bool)>,
    next_timer: u64,
}

impl WebHost {
    /// Bind to the current page. Fails when no window or document exists
    /// (a non-browser context), in which case the caller simply does not
    /// start the runtime.
    pub fn new() -> Result<Self, ZoomError> {
        let window =
            web_sys::window().ok_or_else(|| ZoomError::Host("no window object".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| ZoomError::Host("no document object".to_string()))?;
        Ok(Self {
            window,
            document,
            listeners: Vec::new(),
            escape_handler: None,
            escape_active: false,
            popstate: None,
            history_hooks: None,
            observer: None,
            interval_callbacks: Vec::new(),
            timers: Vec::new(),
            next_timer: 0,
        })
    }

    /// Drop bookkeeping for a one-shot timer that has fired.
    pub(crate) fn forget_timer(&mut self, id: TimerId) {
        self.timers.retain(|(t, _, _)| *t != id);
    }

    fn alloc_timer(&mut self) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        id
    }

    fn has_entry(&self, element: &Element, kind: ListenKind) -> bool {
        self.listeners
            .iter()
            .any(|e| e.kind == kind && e.element == *element)
    }

    fn add_callback(
        entry: &mut ListenerEntry,
        event: &'static str,
        closure: EventClosure,
    ) {
        let _ = entry
            .element
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        entry.callbacks.push((event, closure));
    }

    fn install_activate(&mut self, element: &Element) {
        let mut entry = ListenerEntry {
            element: element.clone(),
            kind: ListenKind::Activate,
            callbacks: Vec::new(),
        };

        let target = element.clone();
        let click = Closure::wrap(Box::new(move |event: Event| {
            event.prevent_default();
            event.stop_propagation();
            crate::wasm::dispatch_activate(target.clone());
        }) as Box<dyn FnMut(Event)>);
        Self::add_callback(&mut entry, "click", click);

        let target = element.clone();
        let keydown = Closure::wrap(Box::new(move |event: Event| {
            let Some(key_event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            match key_event.key().as_str() {
                "Enter" | " " => {
                    event.prevent_default();
                    event.stop_propagation();
                    crate::wasm::dispatch_activate(target.clone());
                }
                _ => {}
            }
        }) as Box<dyn FnMut(Event)>);
        Self::add_callback(&mut entry, "keydown", keydown);

        self.listeners.push(entry);
    }

    fn install_dismiss(&mut self, element: &Element) {
        let mut entry = ListenerEntry {
            element: element.clone(),
            kind: ListenKind::Dismiss,
            callbacks: Vec::new(),
        };
        let click = Closure::wrap(Box::new(move |event: Event| {
            event.prevent_default();
            event.stop_propagation();
            crate::wasm::dispatch_dismiss();
        }) as Box<dyn FnMut(Event)>);
        Self::add_callback(&mut entry, "click", click);
        self.listeners.push(entry);
    }

    fn install_image_load(&mut self, element: &Element) {
        // One-shot: the browser removes the listener after it fires and JS
        // owns the closure, so nothing is left to clean up on this side
        // beyond the registry marker.
        let target = element.clone();
        let callback = Closure::once_into_js(move || crate::wasm::dispatch_image_loaded(target));
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        let _ = element.add_event_listener_with_callback_and_add_event_listener_options(
            "load",
            callback.unchecked_ref(),
            &options,
        );
        self.listeners.push(ListenerEntry {
            element: element.clone(),
            kind: ListenKind::ImageLoad,
            callbacks: Vec::new(),
        });
    }

    fn patch_history(&mut self) -> Result<(), JsValue> {
        let history = Reflect::get(&self.window, &JsValue::from_str("history"))?;
        let original_push: Function =
            Reflect::get(&history, &JsValue::from_str("pushState"))?.dyn_into()?;
        let original_replace: Function =
            Reflect::get(&history, &JsValue::from_str("replaceState"))?.dyn_into()?;

        let patched_push = Self::history_patch(history.clone(), original_push.clone());
        let patched_replace = Self::history_patch(history.clone(), original_replace.clone());

        Reflect::set(&history, &JsValue::from_str("pushState"), patched_push.as_ref())?;
        Reflect::set(
            &history,
            &JsValue::from_str("replaceState"),
            patched_replace.as_ref(),
        )?;

        self.history_hooks = Some(HistoryHooks {
            history,
            original_push,
            original_replace,
            _patched_push: patched_push,
            _patched_replace: patched_replace,
        });
        Ok(())
    }

    /// A replacement history method that forwards to the original, then
    /// reports the navigation intent.
    fn history_patch(
        history: JsValue,
        original: Function,
    ) -> Closure<dyn FnMut(JsValue, JsValue, JsValue)> {
        Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
            let args = Array::of3(&state, &title, &url);
            let _ = original.apply(&history, &args);
            crate::wasm::dispatch_history_changed();
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue)>)
    }

    fn unpatch_history(&mut self) {
        if let Some(hooks) = self.history_hooks.take() {
            let _ = Reflect::set(
                &hooks.history,
                &JsValue::from_str("pushState"),
                &hooks.original_push,
            );
            let _ = Reflect::set(
                &hooks.history,
                &JsValue::from_str("replaceState"),
                &hooks.original_replace,
            );
        }
    }
}

impl Host for WebHost {
    type Node = Element;

    fn has_document(&self) -> bool {
        true
    }

    fn query_selector_all(&self, selector: &str) -> Vec<Element> {
        // An invalid selector is an authoring error; let the query throw.
        let list = self.document.query_selector_all(selector).unwrap_throw();
        let mut out = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            if let Some(node) = list.item(i) {
                if let Some(element) = node.dyn_ref::<Element>() {
                    out.push(element.clone());
                }
            }
        }
        out
    }

    fn is_inside_anchor(&self, node: &Element) -> bool {
        node.parent_element()
            .and_then(|parent| parent.closest("a").ok().flatten())
            .is_some()
    }

    fn node_adds_images(&self, node: &Element) -> bool {
        node.tag_name().eq_ignore_ascii_case("img")
            || node.query_selector("img").ok().flatten().is_some()
    }

    fn image_info(&self, node: &Element) -> Option<ImageInfo> {
        let image = node.dyn_ref::<HtmlImageElement>()?;
        Some(ImageInfo {
            complete: image.complete(),
            natural_width: image.natural_width(),
            natural_height: image.natural_height(),
            src: image.src(),
            srcset: node.get_attribute("srcset"),
            alt: node.get_attribute("alt"),
            zoom_src: node.get_attribute(ZOOM_SRC_ATTR),
        })
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn location_path(&self) -> String {
        self.window
            .location()
            .pathname()
            .unwrap_or_default()
    }

    fn create_element(&mut self, tag: &str) -> Element {
        self.document.create_element(tag).unwrap_throw()
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        let _ = node.set_attribute(name, value);
    }

    fn remove_attribute(&mut self, node: &Element, name: &str) {
        let _ = node.remove_attribute(name);
    }

    fn add_class(&mut self, node: &Element, class: &str) {
        let _ = node.class_list().add_1(class);
    }

    fn remove_class(&mut self, node: &Element, class: &str) {
        let _ = node.class_list().remove_1(class);
    }

    fn set_style(&mut self, node: &Element, property: &str, value: &str) {
        if let Some(html) = node.dyn_ref::<HtmlElement>() {
            let _ = html.style().set_property(property, value);
        }
    }

    fn wrap_element(&mut self, target: &Element, wrapper: &Element) -> bool {
        let Some(parent) = target.parent_node() else {
            return false;
        };
        if parent.insert_before(wrapper, Some(target.as_ref())).is_err() {
            return false;
        }
        wrapper.append_child(target).is_ok()
    }

    fn unwrap_element(&mut self, wrapper: &Element, target: &Element) -> bool {
        let Some(parent) = wrapper.parent_node() else {
            return false;
        };
        if target.parent_element().as_ref() != Some(wrapper) {
            return false;
        }
        if parent.insert_before(target, Some(wrapper.as_ref())).is_err() {
            return false;
        }
        wrapper.remove();
        true
    }

    fn append_to_body(&mut self, node: &Element) {
        if let Some(body) = self.document.body() {
            let _ = body.append_child(node);
        }
    }

    fn remove_element(&mut self, node: &Element) {
        node.remove();
    }

    fn focus(&mut self, node: &Element) {
        if let Some(html) = node.dyn_ref::<HtmlElement>() {
            let _ = html.focus();
        }
    }

    fn lock_scroll(&mut self, locked: bool) {
        if let Some(body) = self.document.body() {
            let style = body.style();
            if locked {
                let _ = style.set_property("overflow", "hidden");
            } else {
                let _ = style.remove_property("overflow");
            }
        }
    }

    fn listen(&mut self, node: &Element, kind: ListenKind) {
        if self.has_entry(node, kind) {
            return;
        }
        match kind {
            ListenKind::Activate => self.install_activate(node),
            ListenKind::Dismiss => self.install_dismiss(node),
            ListenKind::ImageLoad => self.install_image_load(node),
        }
    }

    fn unlisten(&mut self, node: &Element, kind: ListenKind) {
        let Some(position) = self
            .listeners
            .iter()
            .position(|e| e.kind == kind && e.element == *node)
        else {
            return;
        };
        let entry = self.listeners.swap_remove(position);
        for (event, closure) in &entry.callbacks {
            let _ = entry
                .element
                .remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        }
    }

    fn set_escape_listener(&mut self, active: bool) {
        if active == self.escape_active {
            return;
        }
        self.escape_active = active;
        let handler = self.escape_handler.get_or_insert_with(|| {
            Closure::wrap(Box::new(|event: KeyboardEvent| {
                if event.key() == "Escape" {
                    crate::wasm::dispatch_escape();
                }
            }) as Box<dyn FnMut(KeyboardEvent)>)
        });
        if active {
            let _ = self
                .document
                .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref());
        } else {
            let _ = self
                .document
                .remove_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref());
        }
    }

    fn observe_subtree(&mut self, active: bool) {
        if !active {
            if let Some((observer, _callback)) = self.observer.take() {
                observer.disconnect();
            }
            return;
        }
        if self.observer.is_some() {
            return;
        }

        let callback = Closure::wrap(Box::new(|records: Array, _observer: MutationObserver| {
            let mut added = Vec::new();
            for record in records.iter() {
                let record: MutationRecord = record.unchecked_into();
                let nodes = record.added_nodes();
                for i in 0..nodes.length() {
                    if let Some(node) = nodes.item(i) {
                        if let Some(element) = node.dyn_ref::<Element>() {
                            added.push(element.clone());
                        }
                    }
                }
            }
            if !added.is_empty() {
                crate::wasm::dispatch_subtree(added);
            }
        }) as Box<dyn FnMut(Array, MutationObserver)>);

        match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => {
                let init = MutationObserverInit::new();
                init.set_child_list(true);
                init.set_subtree(true);
                if let Some(body) = self.document.body() {
                    let _ = observer.observe_with_options(&body, &init);
                }
                self.observer = Some((observer, callback));
            }
            Err(err) => warn!("mutation observer unavailable: {err:?}"),
        }
    }

    fn observe_navigation(&mut self, active: bool) {
        if !active {
            self.unpatch_history();
            if let Some(popstate) = self.popstate.take() {
                let _ = self
                    .window
                    .remove_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref());
            }
            return;
        }

        if self.popstate.is_none() {
            let popstate = Closure::wrap(Box::new(|_event: Event| {
                crate::wasm::dispatch_history_changed();
            }) as Box<dyn FnMut(Event)>);
            let _ = self
                .window
                .add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref());
            self.popstate = Some(popstate);
        }

        if self.history_hooks.is_none() {
            if let Err(err) = self.patch_history() {
                // The fallback poll still detects route changes.
                warn!("history interception unavailable: {err:?}");
            }
        }
    }

    fn request_frame(&mut self) {
        let callback = Closure::once_into_js(crate::wasm::dispatch_frame);
        let _ = self.window.request_animation_frame(callback.unchecked_ref());
    }

    fn set_timeout(&mut self, delay_ms: u32) -> TimerId {
        let id = self.alloc_timer();
        let callback = Closure::once_into_js(move || crate::wasm::dispatch_timer(id));
        match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            delay_ms as i32,
        ) {
            Ok(handle) => self.timers.push((id, handle, false)),
            Err(err) => warn!("setTimeout failed: {err:?}"),
        }
        id
    }

    fn set_interval(&mut self, period_ms: u32) -> TimerId {
        let id = self.alloc_timer();
        let callback = Closure::wrap(Box::new(move || crate::wasm::dispatch_timer(id))
            as Box<dyn FnMut()>);
        match self.window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            period_ms as i32,
        ) {
            Ok(handle) => {
                self.timers.push((id, handle, true));
                self.interval_callbacks.push((id, callback));
            }
            Err(err) => warn!("setInterval failed: {err:?}"),
        }
        id
    }

    fn clear_timer(&mut self, id: TimerId) {
        let Some(position) = self.timers.iter().position(|(t, _, _)| *t == id) else {
            return;
        };
        let (_, handle, is_interval) = self.timers.swap_remove(position);
        if is_interval {
            self.window.clear_interval_with_handle(handle);
            self.interval_callbacks.retain(|(t, _)| *t != id);
        } else {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}
