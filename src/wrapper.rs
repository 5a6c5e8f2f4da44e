// Wrapper installer module
// Installs the interactive container around an eligible image

use crate::host::{Host, ListenKind};
use log::debug;

/// Marker attribute set on an image once wrapping is installed
pub const PROCESSED_ATTR: &str = "data-zoom-processed";

/// Per-image high-resolution source override attribute
pub const ZOOM_SRC_ATTR: &str = "data-zoom-src";

/// Class applied to the interactive container
pub const WRAP_CLASS: &str = "zoom-img-wrap";

/// Class applied to the container while its image is still loading
pub const LOADING_CLASS: &str = "loading";

/// An installed wrapper and the image it owns
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapped<N> {
    /// The interactive container element
    pub wrapper: N,
    /// The image reparented into it
    pub image: N,
}

/// Install interaction affordances around an eligible image, exactly once.
///
/// Marks the image processed first, so a re-entrant call on the same
/// element is a no-op. Returns `None` without surfacing an error when the
/// image is already processed or detached — wrapping is best-effort
/// enhancement of presentational content.
pub fn install<H: Host>(host: &mut H, image: &H::Node) -> Option<Wrapped<H::Node>> {
    if host.attribute(image, PROCESSED_ATTR).as_deref() == Some("true") {
        return None;
    }
    host.set_attribute(image, PROCESSED_ATTR, "true");

    let wrapper = host.create_element("div");
    host.add_class(&wrapper, WRAP_CLASS);
    host.set_attribute(&wrapper, "tabindex", "0");
    host.set_attribute(&wrapper, "role", "button");
    host.set_attribute(&wrapper, "aria-label", "Click to zoom image");

    if !host.wrap_element(image, &wrapper) {
        debug!("image detached before wrapping; skipping");
        return None;
    }

    // Loading visual state until the image's load event fires.
    if let Some(info) = host.image_info(image) {
        if !info.complete {
            host.add_class(&wrapper, LOADING_CLASS);
            host.listen(image, ListenKind::ImageLoad);
        }
    }

    host.listen(&wrapper, ListenKind::Activate);

    debug!("wrapped image {:?}", image);
    Some(Wrapped {
        wrapper,
        image: image.clone(),
    })
}

/// Undo [`install`]: remove the listeners, restore the image to its
/// original position, and clear the processed marker so a later scan can
/// wrap it again.
pub fn uninstall<H: Host>(host: &mut H, wrapped: &Wrapped<H::Node>) {
    host.unlisten(&wrapped.wrapper, ListenKind::Activate);
    host.unlisten(&wrapped.image, ListenKind::ImageLoad);
    if !host.unwrap_element(&wrapped.wrapper, &wrapped.image) {
        debug!("wrapper already gone during unwrap {:?}", wrapped.wrapper);
    }
    host.remove_attribute(&wrapped.image, PROCESSED_ATTR);
}
