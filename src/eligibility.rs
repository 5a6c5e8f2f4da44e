// Eligibility filter module
// Decides whether an image element qualifies for zoom treatment

use crate::host::Host;
use crate::wrapper::PROCESSED_ATTR;

/// Minimum natural size on each axis; anything smaller is treated as an
/// icon, not content
pub const MIN_ZOOM_DIMENSION: u32 = 100;

/// Outcome of evaluating a candidate image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Qualifies for wrapping now
    Eligible,
    /// Dimensions unknown until the image finishes loading; re-evaluate
    /// once its load event fires
    Deferred,
    /// Does not qualify
    Rejected(RejectReason),
}

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Already wrapped in a previous scan
    AlreadyProcessed,
    /// Inside an anchor; zooming would conflict with navigation semantics
    InsideAnchor,
    /// Loaded, but below the minimum size on at least one axis
    TooSmall,
    /// The selector matched something that is not an image element
    NotAnImage,
}

/// Evaluate a candidate image against the eligibility rules, in order.
///
/// Pure predicate: no side effects. When the result is
/// [`Eligibility::Deferred`] the caller registers the one-time load
/// callback and re-evaluates from there.
pub fn evaluate<H: Host>(host: &H, image: &H::Node) -> Eligibility {
    if host.attribute(image, PROCESSED_ATTR).as_deref() == Some("true") {
        return Eligibility::Rejected(RejectReason::AlreadyProcessed);
    }

    if host.is_inside_anchor(image) {
        return Eligibility::Rejected(RejectReason::InsideAnchor);
    }

    let Some(info) = host.image_info(image) else {
        return Eligibility::Rejected(RejectReason::NotAnImage);
    };

    // Natural dimensions may be known before the load completes (metadata
    // arrives first); accept as soon as both axes cross the threshold.
    if info.natural_width >= MIN_ZOOM_DIMENSION && info.natural_height >= MIN_ZOOM_DIMENSION {
        return Eligibility::Eligible;
    }

    if !info.complete {
        return Eligibility::Deferred;
    }

    Eligibility::Rejected(RejectReason::TooSmall)
}
