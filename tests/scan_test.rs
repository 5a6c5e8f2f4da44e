// Initial-scan behavior: discovery, eligibility, idempotence.

use rzoom::host::memory::{MemoryHost, NodeRef};
use rzoom::wrapper::{LOADING_CLASS, PROCESSED_ATTR, WRAP_CLASS};
use rzoom::{Host, ListenKind, ZoomConfig, ZoomRuntime};

fn markdown_page() -> (MemoryHost, NodeRef) {
    let mut host = MemoryHost::new();
    let body = host.body();
    let content = host.append_child(&body, "div");
    host.add_class(&content, "markdown");
    (host, content)
}

#[test]
fn eligible_images_wrapped_exactly_once() {
    let (mut host, content) = markdown_page();
    let first = host.add_image(&content, "a.png", 400, 300);
    let second = host.add_image(&content, "b.png", 1024, 768);
    let icon = host.add_image(&content, "icon.svg", 16, 16);
    let anchor = host.append_child(&content, "a");
    let linked = host.add_image(&anchor, "linked.png", 400, 300);

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();

    assert_eq!(runtime.wrapped_count(), 2);
    let host = runtime.host();
    for img in [&first, &second] {
        assert_eq!(host.attribute(img, PROCESSED_ATTR).as_deref(), Some("true"));
        let wrapper = host.parent_of(img).expect("image reparented");
        assert!(host.has_class(&wrapper, WRAP_CLASS));
        assert_eq!(host.attribute(&wrapper, "tabindex").as_deref(), Some("0"));
        assert_eq!(host.attribute(&wrapper, "role").as_deref(), Some("button"));
        assert!(host.has_listener(&wrapper, ListenKind::Activate));
    }
    for img in [&icon, &linked] {
        assert_eq!(host.attribute(img, PROCESSED_ATTR), None);
    }
    assert_eq!(host.elements_with_class(WRAP_CLASS).len(), 2);

    // A second scan changes nothing.
    let listeners_before = runtime.host().listener_count();
    runtime.scan();
    assert_eq!(runtime.wrapped_count(), 2);
    assert_eq!(runtime.host().listener_count(), listeners_before);
    assert_eq!(runtime.host().elements_with_class(WRAP_CLASS).len(), 2);
}

#[test]
fn icon_gets_no_wrapper_and_no_marker() {
    let (mut host, content) = markdown_page();
    let icon = host.add_image(&content, "icon.svg", 16, 16);

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();

    assert_eq!(runtime.wrapped_count(), 0);
    assert_eq!(runtime.host().attribute(&icon, PROCESSED_ATTR), None);
    assert!(runtime.host().elements_with_class(WRAP_CLASS).is_empty());
}

#[test]
fn below_threshold_until_load_crosses_it() {
    let (mut host, content) = markdown_page();
    let img = host.add_loading_image(&content, "slow.png");

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();

    // Deferred: no wrapper yet, but a one-time load callback is in place.
    assert_eq!(runtime.wrapped_count(), 0);
    assert!(runtime.host().has_listener(&img, ListenKind::ImageLoad));

    // Load completes above the threshold: the image is wrapped.
    runtime.host_mut().finish_image_load(&img, 800, 600);
    runtime.on_image_loaded(&img);
    assert_eq!(runtime.wrapped_count(), 1);
    assert_eq!(
        runtime.host().attribute(&img, PROCESSED_ATTR).as_deref(),
        Some("true")
    );
}

#[test]
fn load_below_threshold_still_rejected() {
    let (mut host, content) = markdown_page();
    let img = host.add_loading_image(&content, "tiny.png");

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();

    runtime.host_mut().finish_image_load(&img, 32, 32);
    runtime.on_image_loaded(&img);
    assert_eq!(runtime.wrapped_count(), 0);
    assert_eq!(runtime.host().attribute(&img, PROCESSED_ATTR), None);
}

#[test]
fn loading_state_clears_on_load() {
    let (mut host, content) = markdown_page();
    // Dimensions known up front, resource still downloading.
    let img = host.add_loading_image(&content, "big.png");
    host.set_image_dimensions(&img, 1200, 900);

    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();

    assert_eq!(runtime.wrapped_count(), 1);
    let wrapper = runtime.host().parent_of(&img).unwrap();
    assert!(runtime.host().has_class(&wrapper, LOADING_CLASS));

    runtime.host_mut().finish_image_load(&img, 1200, 900);
    runtime.on_image_loaded(&img);
    assert!(!runtime.host().has_class(&wrapper, LOADING_CLASS));
}

#[test]
fn custom_selector_scopes_the_scan() {
    let mut host = MemoryHost::new();
    let body = host.body();
    let article = host.append_child(&body, "article");
    let inside = host.add_image(&article, "in.png", 400, 300);
    let outside = host.add_image(&body, "out.png", 400, 300);

    let config = ZoomConfig {
        selector: "article img".to_string(),
        ..ZoomConfig::default()
    };
    let mut runtime = ZoomRuntime::new(host, config);
    runtime.init();

    assert_eq!(runtime.wrapped_count(), 1);
    assert_eq!(
        runtime.host().attribute(&inside, PROCESSED_ATTR).as_deref(),
        Some("true")
    );
    assert_eq!(runtime.host().attribute(&outside, PROCESSED_ATTR), None);
}

#[test]
fn subtree_changes_trigger_rescan() {
    let (host, _content) = markdown_page();
    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();
    assert_eq!(runtime.wrapped_count(), 0);
    assert!(runtime.host().is_observing_subtree());
    assert!(runtime.host().is_observing_navigation());

    // Dynamically injected content brings an image along.
    let content = runtime.host().elements_with_class("markdown")[0];
    let injected = runtime.host_mut().append_child(&content, "section");
    let img = runtime.host_mut().add_image(&injected, "late.png", 500, 500);
    runtime.on_subtree_changed(&[injected]);

    assert_eq!(runtime.wrapped_count(), 1);
    assert_eq!(
        runtime.host().attribute(&img, PROCESSED_ATTR).as_deref(),
        Some("true")
    );

    // Nodes without images do not cause a rescan of anything new.
    let plain = runtime.host_mut().append_child(&content, "p");
    runtime.on_subtree_changed(&[plain]);
    assert_eq!(runtime.wrapped_count(), 1);
}

#[test]
fn no_document_degrades_to_noop() {
    let host = MemoryHost::detached();
    let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
    runtime.init();

    assert!(!runtime.is_initialized());
    assert_eq!(runtime.wrapped_count(), 0);

    // Entry points stay inert rather than panicking.
    runtime.scan();
    runtime.on_dismiss();
    runtime.on_escape();
    runtime.teardown();
}
