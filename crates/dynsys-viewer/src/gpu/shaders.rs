//! WGSL sources for the scene pipelines.
//!
//! Both shaders share bind group 0 ([`super::SceneUniforms`]).

/// Coloured line lists (grid, trajectory, axes, ticks).
pub const LINE: &str = r#"
struct SceneUniforms {
    view_proj: mat4x4<f32>,
    viewport_px: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tex_coords: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = scene.view_proj * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Billboarded label quads. `normal.xy` carries the corner's pixel offset
/// from the anchor, so quads keep a constant on-screen size and always face
/// the camera.
pub const LABEL: &str = r#"
struct SceneUniforms {
    view_proj: mat4x4<f32>,
    viewport_px: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniforms;

@group(1) @binding(0)
var label_sampler: sampler;

@group(1) @binding(1)
var label_texture: texture_2d<f32>;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tex_coords: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let anchor = scene.view_proj * vec4<f32>(in.position, 1.0);
    let px_to_ndc = vec2<f32>(2.0, 2.0) / max(scene.viewport_px, vec2<f32>(1.0, 1.0));
    let offset = in.normal.xy * px_to_ndc * anchor.w;
    out.clip_position = vec4<f32>(anchor.xy + offset, anchor.z, anchor.w);
    out.uv = in.tex_coords;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(label_texture, label_sampler, in.uv);
}
"#;
