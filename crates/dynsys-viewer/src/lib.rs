//! dynsys-viewer - interactive 3D trajectory viewer
//!
//! Renders one ordered sequence of 3D points inside a fixed viewport with an
//! orbit camera, and keeps axes, ticks, labels and grid planes consistent with
//! the data range and the current view while the user rotates, zooms or
//! resizes.
//!
//! ## Architecture
//!
//! - **Core**: scale normalisation, tick planning, orbit camera and the
//!   axis/grid/label builder. Pure CPU code, no GPU required.
//! - **Viewer**: owns the view state and the primitive registry, turns input
//!   events into camera changes and full rebuilds.
//! - **GPU**: wgpu line and billboard-label pipelines.
//! - **Web**: `<canvas>` host with a `requestAnimationFrame` loop (feature
//!   `web`, wasm32 only).

pub mod config;
pub mod core;
pub mod error;
pub mod gpu;
pub mod styling;
pub mod viewer;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub mod web;

pub use config::ViewerConfig;
pub use core::{
    AxisBuilder, BoundingBox, ComponentMapping, OrbitCamera, PrimitiveKind, PrimitiveRegistry,
    ScaleMode, SceneTransform, TickPlanner, TickSet, TrajectoryPoint, ViewerEvent,
};
pub use error::{PointDefect, ViewerError};
pub use viewer::{FrameSnapshot, ViewState, Viewer, ViewerStats};

/// Log target used by every module in this crate.
pub(crate) const LOG_TARGET: &str = "dynsys_viewer";
