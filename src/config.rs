// Configuration module
// Handles the options object injected by the delivery channel

use crate::error::ZoomError;
use serde::Deserialize;

/// Immutable runtime configuration, supplied once at startup.
///
/// The delivery channel serializes this as a JSON object (camelCase keys)
/// and makes it available before the runtime initializes. Missing fields
/// fall back to their defaults; unknown fields are ignored. The selector
/// is passed through to the host's query machinery unvalidated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// CSS selector identifying candidate images
    pub selector: String,
    /// Overlay backdrop color (any CSS color value)
    pub background: String,
    /// Overlay stacking base; the enlarged image uses `z_index + 1`
    #[serde(rename = "zIndex")]
    pub z_index: i32,
    /// Inset of the enlarged image from the viewport edges, in pixels
    pub margin: u32,
    /// Scroll offset hint carried through to the styling layer, in pixels
    #[serde(rename = "scrollOffset")]
    pub scroll_offset: u32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            selector: ".markdown img".to_string(),
            background: "rgba(0, 0, 0, 0.8)".to_string(),
            z_index: 999,
            margin: 20,
            scroll_offset: 10,
        }
    }
}

impl ZoomConfig {
    /// Parse a configuration from the JSON text of the injected options object
    pub fn from_json(json: &str) -> Result<Self, ZoomError> {
        Ok(serde_json::from_str(json)?)
    }
}
