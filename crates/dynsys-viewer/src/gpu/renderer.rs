//! Scene renderer: one line-list pipeline and one billboard label pipeline.
//!
//! Vertex buffers and label textures are only rebuilt when the registry
//! generation moves; camera motion alone just rewrites the uniform buffer.

use crate::core::{PrimitiveKind, PrimitiveRegistry, Vertex};
use crate::gpu::labels::{label_quad, LabelBitmap, LabelCache, LabelKey, LabelRasterizer};
use crate::gpu::shaders;
use crate::viewer::FrameSnapshot;
use crate::LOG_TARGET;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("label rasterisation failed for {text:?}: {reason}")]
    Rasterize { text: String, reason: String },
}

impl RenderError {
    /// Lost or outdated surfaces recover after the host reconfigures them.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(
            self,
            RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
        )
    }

    /// Frames that can be skipped without reporting an error.
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::Surface(wgpu::SurfaceError::Timeout))
    }
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x4,
            2 => Float32x3,
            3 => Float32x2
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Bind group 0 for both pipelines.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub viewport_px: [f32; 2],
    pub _pad: [f32; 2],
}

impl SceneUniforms {
    pub fn new(view_proj: Mat4, viewport_px: [f32; 2]) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            viewport_px,
            _pad: [0.0; 2],
        }
    }
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, [1.0, 1.0])
    }
}

struct LabelTexture {
    width: u32,
    height: u32,
    bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

struct LineBatch {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

pub struct SceneRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    format: wgpu::TextureFormat,
    background: wgpu::Color,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group_layout: wgpu::BindGroupLayout,
    uniform_bind_group: wgpu::BindGroup,
    label_bind_group_layout: wgpu::BindGroupLayout,
    label_sampler: wgpu::Sampler,

    line_pipeline: Option<wgpu::RenderPipeline>,
    label_pipeline: Option<wgpu::RenderPipeline>,

    lines: BTreeMap<PrimitiveKind, LineBatch>,
    label_buffer: Option<wgpu::Buffer>,
    /// Texture key per quad in `label_buffer`, in draw order.
    label_draws: Vec<LabelKey>,
    label_textures: LabelCache<LabelTexture>,
    uploaded_generation: Option<u64>,
}

impl SceneRenderer {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        format: wgpu::TextureFormat,
        background: wgpu::Color,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniforms"),
            contents: bytemuck::cast_slice(&[SceneUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let label_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Label Texture Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                ],
            });

        let label_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Label Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            device,
            queue,
            format,
            background,
            uniform_buffer,
            uniform_bind_group_layout,
            uniform_bind_group,
            label_bind_group_layout,
            label_sampler,
            line_pipeline: None,
            label_pipeline: None,
            lines: BTreeMap::new(),
            label_buffer: None,
            label_draws: Vec::new(),
            label_textures: LabelCache::default(),
            uploaded_generation: None,
        }
    }

    pub fn set_background(&mut self, background: wgpu::Color) {
        self.background = background;
    }

    /// Force a full re-upload on the next frame.
    pub fn invalidate(&mut self) {
        self.uploaded_generation = None;
    }

    /// Draw one frame into `target`: grid, trajectory, axes, ticks, labels.
    pub fn render(
        &mut self,
        target: &wgpu::TextureView,
        frame: &FrameSnapshot,
        registry: &PrimitiveRegistry,
        rasterizer: &mut dyn LabelRasterizer,
    ) {
        self.ensure_pipelines();
        if self.uploaded_generation != Some(registry.generation()) {
            self.upload(registry, rasterizer);
        }

        let uniforms = SceneUniforms::new(frame.view_proj, frame.viewport.size().to_array());
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            if let Some(pipeline) = &self.line_pipeline {
                pass.set_pipeline(pipeline);
                for batch in self.lines.values() {
                    pass.set_vertex_buffer(0, batch.buffer.slice(..));
                    pass.draw(0..batch.vertex_count, 0..1);
                }
            }

            if let (Some(pipeline), Some(buffer)) = (&self.label_pipeline, &self.label_buffer) {
                pass.set_pipeline(pipeline);
                pass.set_vertex_buffer(0, buffer.slice(..));
                for (i, key) in self.label_draws.iter().enumerate() {
                    let Some(texture) = self.label_textures.get(key) else {
                        continue;
                    };
                    let first = (i * 6) as u32;
                    pass.set_bind_group(1, &texture.bind_group, &[]);
                    pass.draw(first..first + 6, 0..1);
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn upload(&mut self, registry: &PrimitiveRegistry, rasterizer: &mut dyn LabelRasterizer) {
        self.lines.clear();
        for kind in PrimitiveKind::ALL {
            let vertices = registry.lines(kind);
            if vertices.is_empty() {
                continue;
            }
            let buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Scene Line Buffer"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            self.lines.insert(
                kind,
                LineBatch {
                    buffer,
                    vertex_count: vertices.len() as u32,
                },
            );
        }

        let sprites = registry.labels();
        let mut quads: Vec<Vertex> = Vec::with_capacity(sprites.len() * 6);
        let mut draws = Vec::with_capacity(sprites.len());
        for sprite in sprites {
            let key = LabelKey::for_sprite(sprite);
            if !self.label_textures.contains(&key) {
                match rasterizer.rasterize(&sprite.text, sprite.size_px, sprite.color) {
                    Ok(bitmap) if !bitmap.is_empty() && bitmap.is_well_formed() => {
                        let texture = self.create_label_texture(&bitmap);
                        self.label_textures.insert(key.clone(), texture);
                    }
                    Ok(_) => continue,
                    Err(reason) => {
                        let err = RenderError::Rasterize {
                            text: sprite.text.clone(),
                            reason,
                        };
                        log::warn!(target: LOG_TARGET, "{err}");
                        continue;
                    }
                }
            }
            let Some(texture) = self.label_textures.get(&key) else {
                continue;
            };
            quads.extend(label_quad(sprite, texture.width as f32, texture.height as f32));
            draws.push(key);
        }
        let pruned = self.label_textures.prune(draws.iter());

        self.label_buffer = (!quads.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Scene Label Buffer"),
                    contents: bytemuck::cast_slice(&quads),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        self.label_draws = draws;
        self.uploaded_generation = Some(registry.generation());

        log::debug!(
            target: LOG_TARGET,
            "uploaded generation {}: {} line batches, {} labels, {} cached textures ({} pruned)",
            registry.generation(),
            self.lines.len(),
            self.label_draws.len(),
            self.label_textures.len(),
            pruned
        );
    }

    fn create_label_texture(&self, bitmap: &LabelBitmap) -> LabelTexture {
        let size = wgpu::Extent3d {
            width: bitmap.width,
            height: bitmap.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Label Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap.rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * bitmap.width),
                rows_per_image: Some(bitmap.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Label Bind Group"),
            layout: &self.label_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&self.label_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });
        LabelTexture {
            width: bitmap.width,
            height: bitmap.height,
            bind_group,
            _texture: texture,
        }
    }

    fn ensure_pipelines(&mut self) {
        if self.line_pipeline.is_none() {
            self.line_pipeline = Some(self.create_pipeline(
                "Line",
                shaders::LINE,
                wgpu::PrimitiveTopology::LineList,
                false,
            ));
        }
        if self.label_pipeline.is_none() {
            self.label_pipeline = Some(self.create_pipeline(
                "Label",
                shaders::LABEL,
                wgpu::PrimitiveTopology::TriangleList,
                true,
            ));
        }
    }

    fn create_pipeline(
        &self,
        name: &str,
        source: &str,
        topology: wgpu::PrimitiveTopology,
        textured: bool,
    ) -> wgpu::RenderPipeline {
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{name} Shader")),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let mut layouts = vec![&self.uniform_bind_group_layout];
        if textured {
            layouts.push(&self.label_bind_group_layout);
        }
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{name} Pipeline Layout")),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{name} Pipeline")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[Vertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                // draw order alone decides what sits on top
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
    }
}
