// Zoom session lifecycle: open/close round trips, transition guards,
// single-flight enforcement.

use rzoom::host::memory::{MemoryHost, NodeRef};
use rzoom::session::{ACTIVE_CLASS, OVERLAY_CLASS, ZOOMED_CLASS};
use rzoom::{Host, Phase, ZoomConfig, ZoomRuntime};

/// Build a page with one eligible image and an initialized runtime.
/// Returns the runtime and the image's wrapper container.
fn ready_runtime() -> (ZoomRuntime<MemoryHost>, NodeRef) {
    let mut host = MemoryHost::new();
    let body = host.body();
    let content = host.append_child(&body, "div");
    host.add_class(&content, "markdown");
    let img = host.add_image(&content, "figure.png", 400, 300);

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();
    let wrapper = runtime.host().parent_of(&img).expect("image wrapped");
    (runtime, wrapper)
}

/// Deliver the pending animation frame (if any), then advance the clock
/// and deliver every timer that comes due.
fn pump(runtime: &mut ZoomRuntime<MemoryHost>, ms: u64) {
    if runtime.host_mut().take_frame_request() {
        runtime.on_frame();
    }
    for id in runtime.host_mut().advance_clock(ms) {
        runtime.on_timer(id);
    }
}

#[test]
fn click_then_escape_round_trip() {
    let (mut runtime, wrapper) = ready_runtime();

    // Activation mounts the overlay pair and locks scroll.
    runtime.on_activate(&wrapper);
    assert_eq!(runtime.session_phase(), Some(Phase::Opening));
    assert_eq!(runtime.host().elements_with_class(OVERLAY_CLASS).len(), 1);
    assert_eq!(runtime.host().elements_with_class(ZOOMED_CLASS).len(), 1);
    assert!(runtime.host().is_scroll_locked());

    // One frame plus the transition duration: fully open and active.
    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), Some(Phase::Open));
    let overlay = runtime.host().elements_with_class(OVERLAY_CLASS)[0];
    let zoomed = runtime.host().elements_with_class(ZOOMED_CLASS)[0];
    assert!(runtime.host().has_class(&overlay, ACTIVE_CLASS));
    assert!(runtime.host().has_class(&zoomed, ACTIVE_CLASS));
    assert_eq!(runtime.host().focused(), Some(zoomed));
    assert!(runtime.host().escape_listener_active());

    // Escape starts the exit transition and restores scroll immediately.
    runtime.on_escape();
    assert_eq!(runtime.session_phase(), Some(Phase::Closing));
    assert!(!runtime.host().is_scroll_locked());
    assert!(!runtime.host().escape_listener_active());

    // After the exit duration the document is clean again.
    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), None);
    assert!(runtime.host().elements_with_class(OVERLAY_CLASS).is_empty());
    assert!(runtime.host().elements_with_class(ZOOMED_CLASS).is_empty());
}

#[test]
fn overlay_click_dismisses() {
    let (mut runtime, wrapper) = ready_runtime();
    runtime.on_activate(&wrapper);
    pump(&mut runtime, 300);

    runtime.on_dismiss();
    assert_eq!(runtime.session_phase(), Some(Phase::Closing));
    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), None);
}

#[test]
fn dismissal_during_opening_is_dropped() {
    let (mut runtime, wrapper) = ready_runtime();
    runtime.on_activate(&wrapper);

    // Before the frame and during the entry animation: both ignored.
    runtime.on_escape();
    assert_eq!(runtime.session_phase(), Some(Phase::Opening));
    if runtime.host_mut().take_frame_request() {
        runtime.on_frame();
    }
    runtime.on_dismiss();
    assert_eq!(runtime.session_phase(), Some(Phase::Opening));

    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), Some(Phase::Open));
}

#[test]
fn rapid_double_activation_yields_one_session() {
    let (mut runtime, wrapper) = ready_runtime();
    let baseline = runtime.host().listener_count();

    runtime.on_activate(&wrapper);
    // Second activation lands inside the opening window and is swallowed.
    runtime.on_activate(&wrapper);
    assert_eq!(runtime.host().elements_with_class(OVERLAY_CLASS).len(), 1);
    assert_eq!(runtime.host().elements_with_class(ZOOMED_CLASS).len(), 1);

    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), Some(Phase::Open));

    // Close everything; no listeners may leak past the wrappers'.
    runtime.on_escape();
    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), None);
    assert_eq!(runtime.host().listener_count(), baseline);
    assert!(!runtime.host().escape_listener_active());
}

#[test]
fn reopening_tears_down_the_previous_session_first() {
    let mut host = MemoryHost::new();
    let body = host.body();
    let content = host.append_child(&body, "div");
    host.add_class(&content, "markdown");
    let first = host.add_image(&content, "first.png", 400, 300);
    let second = host.add_image(&content, "second.png", 800, 600);

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();
    let first_wrapper = runtime.host().parent_of(&first).unwrap();
    let second_wrapper = runtime.host().parent_of(&second).unwrap();

    runtime.on_activate(&first_wrapper);
    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), Some(Phase::Open));

    // Opening the second image: the first session's elements are fully
    // removed before the new pair is mounted, so exactly one pair exists.
    runtime.on_activate(&second_wrapper);
    assert_eq!(runtime.host().elements_with_class(OVERLAY_CLASS).len(), 1);
    assert_eq!(runtime.host().elements_with_class(ZOOMED_CLASS).len(), 1);
    let zoomed = runtime.host().elements_with_class(ZOOMED_CLASS)[0];
    assert_eq!(
        runtime.host().attribute(&zoomed, "src").as_deref(),
        Some("second.png")
    );
    assert!(runtime.host().is_scroll_locked());

    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), Some(Phase::Open));

    runtime.on_escape();
    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), None);
    assert!(runtime.host().elements_with_class(OVERLAY_CLASS).is_empty());
}

#[test]
fn activation_during_close_is_dropped() {
    let (mut runtime, wrapper) = ready_runtime();
    runtime.on_activate(&wrapper);
    pump(&mut runtime, 300);
    runtime.on_escape();
    assert_eq!(runtime.session_phase(), Some(Phase::Closing));

    // Mid-exit activation does not resurrect the session.
    runtime.on_activate(&wrapper);
    assert_eq!(runtime.session_phase(), Some(Phase::Closing));

    pump(&mut runtime, 300);
    assert_eq!(runtime.session_phase(), None);
}

#[test]
fn overlay_styling_comes_from_config() {
    let mut host = MemoryHost::new();
    let body = host.body();
    let content = host.append_child(&body, "div");
    host.add_class(&content, "markdown");
    let img = host.add_image(&content, "figure.png", 400, 300);

    let config = ZoomConfig {
        background: "rgba(10, 20, 30, 0.9)".to_string(),
        z_index: 1200,
        margin: 32,
        ..ZoomConfig::default()
    };
    let mut runtime = ZoomRuntime::new(host, config);
    runtime.init();
    let wrapper = runtime.host().parent_of(&img).unwrap();
    runtime.on_activate(&wrapper);

    let overlay = runtime.host().elements_with_class(OVERLAY_CLASS)[0];
    let zoomed = runtime.host().elements_with_class(ZOOMED_CLASS)[0];
    let host = runtime.host();
    assert_eq!(host.style_of(&overlay, "background"), Some("rgba(10, 20, 30, 0.9)"));
    assert_eq!(host.style_of(&overlay, "z-index"), Some("1200"));
    assert_eq!(host.style_of(&zoomed, "z-index"), Some("1201"));
    assert_eq!(host.style_of(&zoomed, "max-width"), Some("calc(100% - 64px)"));
    assert_eq!(host.attribute(&overlay, "role").as_deref(), Some("dialog"));
    assert_eq!(host.attribute(&overlay, "aria-modal").as_deref(), Some("true"));
}

#[test]
fn high_resolution_override_used_for_the_enlarged_copy() {
    let mut host = MemoryHost::new();
    let body = host.body();
    let content = host.append_child(&body, "div");
    host.add_class(&content, "markdown");
    let img = host.add_image(&content, "figure.png", 400, 300);
    host.set_attribute(&img, "data-zoom-src", "figure@2x.png");
    host.set_attribute(&img, "srcset", "figure.png 1x, figure@2x.png 2x");
    host.set_attribute(&img, "alt", "A labeled figure");

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();
    let wrapper = runtime.host().parent_of(&img).unwrap();
    runtime.on_activate(&wrapper);

    let zoomed = runtime.host().elements_with_class(ZOOMED_CLASS)[0];
    let host = runtime.host();
    assert_eq!(host.attribute(&zoomed, "src").as_deref(), Some("figure@2x.png"));
    assert_eq!(
        host.attribute(&zoomed, "srcset").as_deref(),
        Some("figure.png 1x, figure@2x.png 2x")
    );
    assert_eq!(host.attribute(&zoomed, "alt").as_deref(), Some("A labeled figure"));
}
