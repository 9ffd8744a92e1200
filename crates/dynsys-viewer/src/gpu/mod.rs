//! wgpu rendering of the primitive registry.

pub mod labels;
pub mod renderer;
pub mod shaders;

pub use labels::{label_quad, LabelBitmap, LabelCache, LabelKey, LabelRasterizer};
pub use renderer::{RenderError, SceneRenderer, SceneUniforms};
