// Zoom session module
// Owns the overlay + enlarged-image pair and their transition state machine

use crate::config::ZoomConfig;
use crate::host::{Host, ImageInfo, ListenKind};
use log::debug;

/// Fixed transition duration agreed with the styling layer, in milliseconds
pub const TRANSITION_MS: u32 = 300;

/// Class applied to the dimmed backdrop element
pub const OVERLAY_CLASS: &str = "zoom-overlay";

/// Class applied to the enlarged image element
pub const ZOOMED_CLASS: &str = "zoomed-img";

/// Modifier class toggled to drive the enter/exit animation
pub const ACTIVE_CLASS: &str = "active";

/// Session lifecycle phase. `Closed` is represented by the absence of a
/// session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Elements mounted, entry animation pending or running
    Opening,
    /// Fully presented; dismissal triggers are live
    Open,
    /// Exit animation running; elements removed when it completes
    Closing,
}

/// What triggered a dismissal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Click on the overlay or the enlarged image
    Backdrop,
    /// Escape key
    Escape,
    /// Forced close on a client-side route change
    Navigation,
}

/// A single modal zoom view: the overlay and enlarged-image elements plus
/// their transition state. At most one instance exists at a time; the
/// runtime enforces that opening a new session fully destroys the previous
/// one first.
#[derive(Debug)]
pub struct ZoomSession<N> {
    overlay: N,
    zoomed: N,
    phase: Phase,
    active: bool,
}

impl<N: Clone + PartialEq + std::fmt::Debug> ZoomSession<N> {
    /// Build and mount the overlay and enlarged image for `source`, lock
    /// page scroll, and request the animation frame that starts the entry
    /// transition. The session starts in [`Phase::Opening`].
    pub fn begin<H: Host<Node = N>>(host: &mut H, config: &ZoomConfig, source: &ImageInfo) -> Self {
        let overlay = host.create_element("div");
        host.add_class(&overlay, OVERLAY_CLASS);
        host.set_attribute(&overlay, "role", "dialog");
        host.set_attribute(&overlay, "aria-modal", "true");
        host.set_attribute(&overlay, "aria-label", "Zoomed image view");
        host.set_style(&overlay, "background", &config.background);
        host.set_style(&overlay, "z-index", &config.z_index.to_string());

        let zoomed = host.create_element("img");
        host.add_class(&zoomed, ZOOMED_CLASS);

        // Prefer the declared high-resolution source over the base source.
        let src = source.zoom_src.as_deref().unwrap_or(&source.src);
        host.set_attribute(&zoomed, "src", src);
        if let Some(srcset) = &source.srcset {
            host.set_attribute(&zoomed, "srcset", srcset);
        }
        let alt = match source.alt.as_deref() {
            Some(alt) if !alt.is_empty() => alt,
            _ => "Zoomed image",
        };
        host.set_attribute(&zoomed, "alt", alt);
        host.set_style(&zoomed, "z-index", &(config.z_index + 1).to_string());
        let extent = format!("calc(100% - {}px)", config.margin * 2);
        host.set_style(&zoomed, "max-width", &extent);
        host.set_style(&zoomed, "max-height", &extent);

        host.append_to_body(&overlay);
        host.append_to_body(&zoomed);
        host.lock_scroll(true);

        host.listen(&overlay, ListenKind::Dismiss);
        host.listen(&zoomed, ListenKind::Dismiss);
        host.set_escape_listener(true);

        host.request_frame();
        debug!("zoom session opening (source {})", src);

        Self {
            overlay,
            zoomed,
            phase: Phase::Opening,
            active: false,
        }
    }

    /// Animation-frame callback: apply the active presentation state to
    /// both elements, starting the entry transition. Returns true when the
    /// caller should arm the [`TRANSITION_MS`] completion timer.
    pub fn activate<H: Host<Node = N>>(&mut self, host: &mut H) -> bool {
        if self.phase != Phase::Opening || self.active {
            return false;
        }
        self.active = true;
        host.add_class(&self.overlay, ACTIVE_CLASS);
        host.add_class(&self.zoomed, ACTIVE_CLASS);
        true
    }

    /// Entry-transition completion: the session is fully open and the
    /// enlarged image takes keyboard focus.
    pub fn mark_open<H: Host<Node = N>>(&mut self, host: &mut H) {
        if self.phase != Phase::Opening {
            return;
        }
        self.phase = Phase::Open;
        host.focus(&self.zoomed);
        debug!("zoom session open");
    }

    /// Start the exit transition. Only valid while fully open; a dismissal
    /// arriving mid-transition is dropped, not queued. Returns true when
    /// the caller should arm the removal timer.
    pub fn begin_close<H: Host<Node = N>>(&mut self, host: &mut H, reason: CloseReason) -> bool {
        if self.phase != Phase::Open {
            debug!("dismissal ({:?}) ignored during transition", reason);
            return false;
        }
        self.phase = Phase::Closing;
        host.remove_class(&self.overlay, ACTIVE_CLASS);
        host.remove_class(&self.zoomed, ACTIVE_CLASS);
        host.lock_scroll(false);
        host.set_escape_listener(false);
        debug!("zoom session closing ({:?})", reason);
        true
    }

    /// Exit-transition completion: remove both elements from the document,
    /// consuming the session.
    pub fn finish_close<H: Host<Node = N>>(self, host: &mut H) {
        host.unlisten(&self.overlay, ListenKind::Dismiss);
        host.unlisten(&self.zoomed, ListenKind::Dismiss);
        host.remove_element(&self.overlay);
        host.remove_element(&self.zoomed);
        debug!("zoom session closed");
    }

    /// Synchronous full teardown from any phase: unlock scroll, drop the
    /// Escape listener, and remove both elements immediately. Used before
    /// opening a replacement session and on runtime teardown, so that the
    /// previous session is completely gone before anything new is built.
    pub fn destroy<H: Host<Node = N>>(self, host: &mut H) {
        if self.phase != Phase::Closing {
            host.lock_scroll(false);
            host.set_escape_listener(false);
        }
        host.unlisten(&self.overlay, ListenKind::Dismiss);
        host.unlisten(&self.zoomed, ListenKind::Dismiss);
        host.remove_element(&self.overlay);
        host.remove_element(&self.zoomed);
        debug!("zoom session destroyed");
    }

    /// Whether an enter or exit transition is in progress.
    pub fn is_transitioning(&self) -> bool {
        self.phase != Phase::Open
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}
