// Headless demo driving the zoom runtime against the in-memory host
// Run with: cargo run --example headless

use anyhow::Result;
use log::info;
use rzoom::host::memory::MemoryHost;
use rzoom::session::{OVERLAY_CLASS, ZOOMED_CLASS};
use rzoom::{Host, ZoomConfig, ZoomRuntime};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    // Build a small document: a markdown section with one figure.
    let mut host = MemoryHost::new();
    let body = host.body();
    let content = host.append_child(&body, "div");
    host.add_class(&content, "markdown");
    let figure = host.add_image(&content, "figure.png", 640, 480);
    host.set_attribute(&figure, "data-zoom-src", "figure@2x.png");

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();
    info!("after initial scan: {} image(s) wrapped", runtime.wrapped_count());

    // Activate the figure's wrapper, then pump the frame and the
    // transition timer the way a host event loop would.
    let wrapper = runtime
        .host()
        .parent_of(&figure)
        .expect("figure should be wrapped");
    runtime.on_activate(&wrapper);
    pump(&mut runtime, 300);
    info!(
        "session phase: {:?}, overlays in document: {}",
        runtime.session_phase(),
        runtime.host().elements_with_class(OVERLAY_CLASS).len()
    );
    info!(
        "enlarged source: {:?}",
        runtime
            .host()
            .elements_with_class(ZOOMED_CLASS)
            .first()
            .and_then(|z| runtime.host().attribute(z, "src"))
    );

    // Dismiss with Escape and let the exit animation finish.
    runtime.on_escape();
    pump(&mut runtime, 300);
    info!(
        "after dismissal: phase {:?}, scroll locked: {}",
        runtime.session_phase(),
        runtime.host().is_scroll_locked()
    );

    runtime.teardown();
    info!("after teardown: {} wrapper(s) left", runtime.wrapped_count());
    Ok(())
}

/// Deliver the pending animation frame and every timer due within `ms`.
fn pump(runtime: &mut ZoomRuntime<MemoryHost>, ms: u64) {
    if runtime.host_mut().take_frame_request() {
        runtime.on_frame();
    }
    for id in runtime.host_mut().advance_clock(ms) {
        runtime.on_timer(id);
    }
}
