//! # rzoom
//!
//! A click-to-zoom image lightbox runtime for documentation sites.
//!
//! Clicking a qualifying inline image dims the page behind an overlay and
//! shows an enlarged copy, dismissible by click, Escape, or activating
//! another image. The runtime discovers eligible images, wraps them in
//! focusable containers, drives a single modal zoom session through its
//! enter/exit animation, and keeps its annotations fresh as the page
//! mutates (dynamically injected content, single-page-app navigation).
//!
//! ## Hosts
//!
//! All DOM access goes through the [`host::Host`] trait. The `web`
//! feature provides the browser implementation plus a self-initializing
//! wasm entry point; [`host::memory::MemoryHost`] drives the runtime
//! headlessly with an in-memory tree and a virtual clock.
//!
//! ## Quick start (headless)
//!
//! ```
//! use rzoom::host::memory::MemoryHost;
//! use rzoom::{Host, ZoomConfig, ZoomRuntime};
//!
//! let mut host = MemoryHost::new();
//! let body = host.body();
//! let content = host.append_child(&body, "div");
//! host.add_class(&content, "markdown");
//! host.add_image(&content, "figure.png", 640, 480);
//!
//! let mut runtime = ZoomRuntime::new(host, ZoomConfig::default());
//! runtime.init();
//! assert_eq!(runtime.wrapped_count(), 1);
//! ```
//!
//! In the browser (`--features web`, target `wasm32-unknown-unknown`) the
//! module initializes itself on load, reading the configuration the
//! delivery channel injects as `window.__IMAGE_ZOOM_OPTIONS__`.
//!
//! ## Presentation contract
//!
//! The styling layer supplies the visuals for the class hooks
//! (`zoom-img-wrap`, `zoom-overlay`, `zoomed-img`, the `active` modifier,
//! and the wrapper `loading` state) and animates over the same fixed
//! 300 ms the runtime's timers assume.

pub mod config;
pub mod eligibility;
pub mod error;
pub mod host;
pub mod navigation;
pub mod runtime;
pub mod session;
pub mod wrapper;

#[cfg(feature = "web")]
pub mod wasm;

pub use config::ZoomConfig;
pub use error::ZoomError;
pub use host::{Host, ImageInfo, ListenKind, TimerId};
pub use runtime::ZoomRuntime;
pub use session::Phase;
