//! Core scene engine
//!
//! Everything here is plain CPU code: bounds and normalisation, tick
//! planning, the orbit camera and the decoration builder.

pub mod axes;
pub mod bounds;
pub mod camera;
pub mod interaction;
pub mod normalize;
pub mod primitives;
pub mod ticks;
pub mod viewport;

pub use axes::{
    AxisBuilder, AxisEdge, AxisLayout, AxisPrimitives, FaceSelection, SceneSnapshot, Side,
};
pub use bounds::{validate_points, Axis, BoundingBox, ComponentMapping, TrajectoryPoint};
pub use camera::{CameraController, CameraSnapshot, OrbitCamera, OrbitLimits};
pub use interaction::{Modifiers, MouseButton, ViewerEvent};
pub use normalize::{Normalized, ScaleMode, ScaleNormalizer, SceneTransform};
pub use primitives::{
    push_segment, LabelKind, LabelSprite, PrimitiveKind, PrimitiveRegistry, PrimitiveSet, Vertex,
};
pub use ticks::{Tick, TickPlanner, TickSet};
pub use viewport::Viewport;
