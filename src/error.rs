// Error types for the zoom runtime
// Most runtime operations degrade to no-ops by design; only configuration
// parsing and host bootstrap are genuinely fallible.

use thiserror::Error;

/// Errors surfaced by the zoom runtime library
#[derive(Debug, Error)]
pub enum ZoomError {
    /// The injected options object could not be parsed
    #[error("invalid zoom configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The host environment is missing a required capability
    #[error("host environment unavailable: {0}")]
    Host(String),
}
