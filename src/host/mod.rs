//! Host environment abstraction.
//!
//! The runtime never touches a concrete DOM. Everything it needs from its
//! environment — element queries and mutation, listener registration,
//! scroll locking, animation-frame and timer scheduling, the current
//! location — goes through the [`Host`] trait. Two implementations ship
//! with the crate:
//!
//! - [`memory::MemoryHost`]: an in-memory document tree with a virtual
//!   clock. Reference host for headless embedding and the vehicle for the
//!   native test suite.
//! - `web::WebHost` (feature `web`): the real browser DOM via `web-sys`,
//!   including `MutationObserver` subtree observation and history-API
//!   interception.
//!
//! Event flow is inverted relative to the trait: the host adapter calls
//! *into* the runtime (`on_activate`, `on_timer`, ...) when the
//! environment produces an event, and the runtime calls *out* through
//! these methods.

pub mod memory;

#[cfg(feature = "web")]
pub mod web;

use std::fmt;

/// Identifies a pending timeout or interval scheduled through a [`Host`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Kinds of element-scoped listeners the runtime registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListenKind {
    /// Pointer click or Enter/Space keydown on a wrapper container.
    /// The host suppresses default behavior and propagation before
    /// reporting the activation.
    Activate,
    /// Click on the overlay or the enlarged image while a session is open.
    Dismiss,
    /// One-shot load completion on an image element. Hosts deliver this at
    /// most once per registration.
    ImageLoad,
}

/// Snapshot of an image element's state, as reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageInfo {
    /// Whether the resource has finished loading
    pub complete: bool,
    /// Natural (intrinsic) width in logical pixels; 0 until known
    pub natural_width: u32,
    /// Natural (intrinsic) height in logical pixels; 0 until known
    pub natural_height: u32,
    /// Base source URL
    pub src: String,
    /// Responsive source-set attribute, verbatim, if present
    pub srcset: Option<String>,
    /// Alternative text, if present
    pub alt: Option<String>,
    /// Declared high-resolution override (`data-zoom-src`), if present
    pub zoom_src: Option<String>,
}

/// Capabilities the runtime requires from its environment.
///
/// Query methods take `&self`; mutation, listener, and scheduling methods
/// take `&mut self`. All mutation methods tolerate already-detached nodes
/// silently — a removal that finds nothing to remove is treated as already
/// satisfied.
pub trait Host {
    /// Opaque element handle. Equality is node identity.
    type Node: Clone + PartialEq + fmt::Debug;

    /// Whether a document is available at all. When this is false every
    /// runtime entry point degrades to a no-op.
    fn has_document(&self) -> bool;

    /// All elements matching a CSS selector, in document order.
    ///
    /// An invalid selector is an authoring error: hosts propagate the
    /// underlying query failure (a thrown exception in the browser, a
    /// panic in the in-memory host) rather than translating it.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Node>;

    /// Whether the node is a descendant of an anchor element.
    fn is_inside_anchor(&self, node: &Self::Node) -> bool;

    /// Whether the node is an image element or contains one.
    fn node_adds_images(&self, node: &Self::Node) -> bool;

    /// Image state for an image element; `None` if the node is not one.
    fn image_info(&self, node: &Self::Node) -> Option<ImageInfo>;

    /// An attribute value, if set.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// The current location path (SPA route changes mutate this without a
    /// document reload).
    fn location_path(&self) -> String;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Self::Node;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);
    fn add_class(&mut self, node: &Self::Node, class: &str);
    fn remove_class(&mut self, node: &Self::Node, class: &str);

    /// Set an inline style property.
    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str);

    /// Insert `wrapper` at `target`'s position and reparent `target` into
    /// it. Returns false (leaving the tree untouched) if `target` is
    /// detached.
    fn wrap_element(&mut self, target: &Self::Node, wrapper: &Self::Node) -> bool;

    /// Reverse of [`wrap_element`](Host::wrap_element): restore `target`
    /// to the wrapper's position and detach the wrapper. Returns false if
    /// the pair is no longer intact.
    fn unwrap_element(&mut self, wrapper: &Self::Node, target: &Self::Node) -> bool;

    /// Append a node as the last child of the document body.
    fn append_to_body(&mut self, node: &Self::Node);

    /// Detach a node from the tree.
    fn remove_element(&mut self, node: &Self::Node);

    /// Move keyboard focus to the node.
    fn focus(&mut self, node: &Self::Node);

    /// Lock or unlock page scrolling.
    fn lock_scroll(&mut self, locked: bool);

    /// Register an element-scoped listener. Registering the same
    /// `(node, kind)` pair twice is a no-op. Events are reported back
    /// through the runtime's corresponding entry point.
    fn listen(&mut self, node: &Self::Node, kind: ListenKind);

    /// Remove an element-scoped listener. Hosts backed by one-shot native
    /// listeners (see [`ListenKind::ImageLoad`]) may treat this as
    /// bookkeeping only.
    fn unlisten(&mut self, node: &Self::Node, kind: ListenKind);

    /// Register or remove the document-level Escape key listener.
    fn set_escape_listener(&mut self, active: bool);

    /// Start or stop subtree-change observation over the document body.
    /// Hosts without a native observer may leave this a no-op; the
    /// embedder is then responsible for explicit re-scan calls.
    fn observe_subtree(&mut self, active: bool);

    /// Start or stop navigation-intent observation (history-mutation
    /// interception and the back/forward event). The runtime's fallback
    /// poll runs regardless, so hosts without native hooks still work.
    fn observe_navigation(&mut self, active: bool);

    /// Request a callback on the next animation frame.
    fn request_frame(&mut self);

    /// Schedule a one-shot timer.
    fn set_timeout(&mut self, delay_ms: u32) -> TimerId;

    /// Schedule a repeating timer.
    fn set_interval(&mut self, period_ms: u32) -> TimerId;

    /// Cancel a pending timeout or interval.
    fn clear_timer(&mut self, id: TimerId);
}
