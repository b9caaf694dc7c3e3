//! # Meridian Compositor Policy Library
//!
//! The window-management core of a Wayland compositor: where views go, how
//! they move and resize under the pointer, which pixels need repainting and
//! how monitors are arranged. Buffers, protocols, input devices and the GPU
//! belong to the windowing toolkit and are reached through [`backend`].
//!
//! ## Architecture
//!
//! - `geometry`: boxes and points shared by everything else
//! - `backend`: traits consumed from the toolkit, plus an in-memory backend
//! - `window`: the view state machine and stacking order
//! - `output`: connected displays and the multi-monitor layout resolver
//! - `renderer`: per-output damage tracking and scissored redraw
//! - `input`: cursor routing and interactive move/resize
//! - `compositor`: the coordinator owning views and outputs
//! - `config`: configuration parsing and validation
//!
//! ## Usage
//!
//! ```rust
//! use meridian::backend::headless::{HeadlessRenderer, HeadlessSeat, HeadlessSurface};
//! use meridian::backend::BackendEvent;
//! use meridian::window::ViewKind;
//! use meridian::{Compositor, MeridianConfig};
//!
//! let mut compositor =
//!     Compositor::new(MeridianConfig::default(), None, Box::new(HeadlessSeat::new()));
//! compositor.handle_event(BackendEvent::OutputConnected {
//!     name: "HDMI-1".into(),
//!     width: 1920,
//!     height: 1080,
//! });
//! compositor.handle_event(BackendEvent::SurfaceCreated {
//!     surface: Box::new(HeadlessSurface::new(1, 800, 600)),
//!     kind: ViewKind::Native,
//!     app_id: "org.example.Editor".into(),
//!     title: "Editor".into(),
//!     parent: None,
//! });
//! compositor.handle_event(BackendEvent::SurfaceMapped(1));
//! assert_eq!(compositor.app_count(), 1);
//!
//! let mut target = HeadlessRenderer::new();
//! assert!(compositor.frame("HDMI-1", &mut target));
//! assert!(!compositor.frame("HDMI-1", &mut target));
//! ```

pub mod backend;
pub mod compositor;
pub mod config;
pub mod geometry;
pub mod input;
pub mod output;
pub mod renderer;
pub mod window;

// Re-export main types for easy access
pub use compositor::{Compositor, CompositorEvent};
pub use config::MeridianConfig;
pub use input::{CursorGrab, Edges, GrabMode};
pub use output::layout::{resolve_layout, OutputLayoutConfig};
pub use window::{View, ViewId, ViewKind, ViewState};

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for Meridian
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
