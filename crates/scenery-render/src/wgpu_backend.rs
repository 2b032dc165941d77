//! wgpu implementation of [`RenderBackend`].
//!
//! Targets map to textures with one view per layer. The cubemap reprojection
//! draw is executed here; material batches are handed to a host
//! [`SceneEncoder`], which owns the scene's vertex data and material
//! textures.
//!
//! Matrices handed to the backend use OpenGL clip conventions (depth in
//! `[-1, 1]`); [`GL_TO_WGPU_DEPTH`] remaps them to wgpu's `[0, 1]`.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::{
    Attachment, BackendCapabilities, BatchDraw, CubeMeshDraw, CubeSource, DrawCommand, Pass,
    PassUniforms, RasterState, RenderBackend, RenderError, RenderTarget, TargetDesc,
};

/// Maps OpenGL clip depth onto wgpu clip depth: `z' = (z + w) / 2`.
pub const GL_TO_WGPU_DEPTH: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.5, 0.0, //
    0.0, 0.0, 0.5, 1.0,
]);

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A texture with a sampling view and one attachment view per layer.
pub struct WgpuTarget {
    pub desc: TargetDesc,
    pub texture: wgpu::Texture,
    /// 2-D view for single-layer targets, cube view otherwise.
    pub sample_view: wgpu::TextureView,
    pub layer_views: Vec<wgpu::TextureView>,
}

impl std::fmt::Debug for WgpuTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTarget").field("desc", &self.desc).finish()
    }
}

/// What a [`SceneEncoder`] needs to record one batch.
pub struct ScenePassContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub uniforms: &'a PassUniforms,
    pub raster: &'a RasterState,
    pub color_format: Option<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub shadow_maps: &'a [&'a WgpuTarget],
    /// Comparison sampler for the shadow maps.
    pub shadow_sampler: &'a wgpu::Sampler,
}

/// Host hook that records material batches of the scene mesh.
pub trait SceneEncoder {
    fn encode_batch(
        &mut self,
        context: &ScenePassContext<'_>,
        render_pass: &mut wgpu::RenderPass<'_>,
        batch: &BatchDraw,
    );
}

struct ScreenTarget {
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ScreenUniform {
    matrix: [[f32; 4]; 4],
}

struct CubeBuffers {
    positions: wgpu::Buffer,
    directions: wgpu::Buffer,
    texcoords: wgpu::Buffer,
    indices: wgpu::Buffer,
    vertex_count: usize,
    index_count: usize,
}

/// Pipelines drawing the projected cube mesh onto the screen.
struct CubeReprojection {
    cube_pipeline: wgpu::RenderPipeline,
    face_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    face_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    buffers: Option<CubeBuffers>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    screen: Option<ScreenTarget>,
    shadow_sampler: wgpu::Sampler,
    cube: Option<CubeReprojection>,
    scene_encoder: Option<Box<dyn SceneEncoder>>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-comparison-sampler"),
            compare: Some(wgpu::CompareFunction::LessEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });
        Self {
            device,
            queue,
            screen: None,
            shadow_sampler,
            cube: None,
            scene_encoder: None,
            encoder: None,
        }
    }

    /// Open a device without a surface and draw the screen into an
    /// offscreen texture of the given size.
    pub fn new_headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let (device, queue) = pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|_| RenderError::NoAdapter)?;
            let info = adapter.get_info();
            log::info!("Selected GPU: {} ({:?})", info.name, info.backend);
            let device = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("scenery3d-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                    experimental_features: wgpu::ExperimentalFeatures::default(),
                    trace: wgpu::Trace::Off,
                })
                .await?;
            Ok::<_, RenderError>(device)
        })?;

        let mut backend = Self::new(device, queue);
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let color = backend.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless-screen-color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = backend.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless-screen-depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        backend.set_screen(
            color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth.create_view(&wgpu::TextureViewDescriptor::default()),
            COLOR_FORMAT,
        );
        Ok(backend)
    }

    /// Bind the host framebuffer. The depth view must be `Depth32Float`.
    pub fn set_screen(
        &mut self,
        color: wgpu::TextureView,
        depth: wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) {
        if self.screen.as_ref().is_some_and(|s| s.format != format) {
            self.cube = None;
        }
        self.screen = Some(ScreenTarget {
            color,
            depth,
            format,
        });
    }

    pub fn set_scene_encoder(&mut self, encoder: Box<dyn SceneEncoder>) {
        self.scene_encoder = Some(encoder);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Submit every pass recorded since the last call.
    pub fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn ensure_cube_pipelines(&mut self, color_format: wgpu::TextureFormat) {
        if self.cube.is_none() {
            self.cube = Some(CubeReprojection::new(&self.device, color_format));
        }
    }
}

type ResolvedViews<'a> = (
    Option<&'a wgpu::TextureView>,
    Option<&'a wgpu::TextureView>,
    Option<wgpu::TextureFormat>,
    Option<wgpu::TextureFormat>,
);

fn attachment_view<'a>(
    attachment: &Attachment<'a, WgpuTarget>,
) -> Result<&'a wgpu::TextureView, RenderError> {
    let target = attachment.target();
    match attachment.layer() {
        Some(layer) => target.layer_views.get(layer as usize).ok_or_else(|| {
            RenderError::UnsupportedHardware(format!(
                "layer {layer} of {} does not exist",
                target.desc.label
            ))
        }),
        None if target.desc.kind.layers() > 1 => Err(RenderError::UnsupportedHardware(
            "layered cube rendering".to_string(),
        )),
        None => Ok(&target.layer_views[0]),
    }
}

fn attachment_format(attachment: &Attachment<'_, WgpuTarget>) -> wgpu::TextureFormat {
    if attachment.target().desc.kind.is_depth() {
        DEPTH_FORMAT
    } else {
        COLOR_FORMAT
    }
}

fn resolve_target<'a>(
    screen: Option<&'a ScreenTarget>,
    target: &RenderTarget<'a, WgpuTarget>,
) -> Result<ResolvedViews<'a>, RenderError> {
    match target {
        RenderTarget::Screen => {
            let screen = screen.ok_or(RenderError::NoScreen)?;
            Ok((
                Some(&screen.color),
                Some(&screen.depth),
                Some(screen.format),
                Some(DEPTH_FORMAT),
            ))
        }
        RenderTarget::Offscreen { color, depth } => Ok((
            color.as_ref().map(attachment_view).transpose()?,
            depth.as_ref().map(attachment_view).transpose()?,
            color.as_ref().map(attachment_format),
            depth.as_ref().map(attachment_format),
        )),
    }
}

impl RenderBackend for WgpuBackend {
    type Target = WgpuTarget;

    fn capabilities(&self) -> BackendCapabilities {
        let limits = self.device.limits();
        BackendCapabilities {
            layered_rendering: false,
            max_texture_size: limits.max_texture_dimension_2d,
            max_texture_units: limits.max_sampled_textures_per_shader_stage,
        }
    }

    fn create_target(&mut self, desc: &TargetDesc) -> Result<WgpuTarget, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.size == 0 || desc.size > max {
            return Err(RenderError::ResourceAllocation {
                label: desc.label.clone(),
                reason: format!("size {} outside 1..={max}", desc.size),
            });
        }

        let layers = desc.kind.layers();
        let format = if desc.kind.is_depth() {
            DEPTH_FORMAT
        } else {
            COLOR_FORMAT
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.size,
                height: desc.size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{}-sample", desc.label)),
            dimension: Some(if layers > 1 {
                wgpu::TextureViewDimension::Cube
            } else {
                wgpu::TextureViewDimension::D2
            }),
            ..Default::default()
        });
        let layer_views = (0..layers)
            .map(|i| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{}-layer-{i}", desc.label)),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: i,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        log::debug!("created {:?} target '{}' ({}px)", desc.kind, desc.label, desc.size);
        Ok(WgpuTarget {
            desc: desc.clone(),
            texture,
            sample_view,
            layer_views,
        })
    }

    fn execute(&mut self, pass: &Pass<'_, WgpuTarget>) -> Result<(), RenderError> {
        let has_cube_mesh = pass
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::CubeMesh(_)));
        if has_cube_mesh {
            let format = self.screen.as_ref().map_or(COLOR_FORMAT, |s| s.format);
            self.ensure_cube_pipelines(format);
        }
        // Vertex data goes to the queue before the pass is recorded.
        if let Some(cube) = self.cube.as_mut() {
            for command in &pass.commands {
                if let DrawCommand::CubeMesh(mesh) = command {
                    cube.upload(&self.device, &self.queue, mesh, pass.uniforms.projection);
                }
            }
        }

        let (color_view, depth_view, color_format, depth_format) =
            resolve_target(self.screen.as_ref(), &pass.target)?;

        let mut encoder = self.encoder.take().unwrap_or_else(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scenery3d-frame-encoder"),
                })
        });

        {
            let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_view
                .into_iter()
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: if pass.clear.color {
                                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
                            } else {
                                wgpu::LoadOp::Load
                            },
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })
                })
                .collect();
            let depth_stencil_attachment =
                depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: if pass.clear.depth {
                            wgpu::LoadOp::Clear(1.0)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            let vp = pass.viewport;
            render_pass.set_viewport(
                vp.x as f32,
                vp.y as f32,
                vp.width as f32,
                vp.height as f32,
                0.0,
                1.0,
            );

            let context = ScenePassContext {
                device: &self.device,
                queue: &self.queue,
                uniforms: &pass.uniforms,
                raster: &pass.raster,
                color_format,
                depth_format,
                shadow_maps: &pass.shadow_maps,
                shadow_sampler: &self.shadow_sampler,
            };
            for command in &pass.commands {
                match command {
                    DrawCommand::Batch(batch) => match self.scene_encoder.as_mut() {
                        Some(scene) => scene.encode_batch(&context, &mut render_pass, batch),
                        None => log::trace!("no scene encoder; skipping batch"),
                    },
                    DrawCommand::CubeMesh(mesh) => {
                        if let Some(cube) = self.cube.as_ref() {
                            cube.draw(&self.device, &mut render_pass, mesh);
                        }
                    }
                }
            }
        }

        self.encoder = Some(encoder);
        Ok(())
    }
}

fn vertex_attribute(location: u32, format: wgpu::VertexFormat) -> [wgpu::VertexAttribute; 1] {
    [wgpu::VertexAttribute {
        offset: 0,
        shader_location: location,
        format,
    }]
}

impl CubeReprojection {
    fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(64),
            },
            count: None,
        };
        let sampler_entry = wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let texture_entry = |dimension| wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: dimension,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cube-reprojection-layout"),
            entries: &[
                uniform_entry,
                texture_entry(wgpu::TextureViewDimension::Cube),
                sampler_entry,
            ],
        });
        let face_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("cube-face-reprojection-layout"),
                entries: &[
                    uniform_entry,
                    texture_entry(wgpu::TextureViewDimension::D2),
                    sampler_entry,
                ],
            });

        let cube_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cube-reprojection-shader"),
            source: wgpu::ShaderSource::Wgsl(CUBE_SHADER_SOURCE.into()),
        });
        let face_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cube-face-reprojection-shader"),
            source: wgpu::ShaderSource::Wgsl(FACE_SHADER_SOURCE.into()),
        });

        let position_attributes = vertex_attribute(0, wgpu::VertexFormat::Float32x3);
        let direction_attributes = vertex_attribute(1, wgpu::VertexFormat::Float32x3);
        let texcoord_attributes = vertex_attribute(1, wgpu::VertexFormat::Float32x2);
        let position_buffer = wgpu::VertexBufferLayout {
            array_stride: 12,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &position_attributes,
        };

        let build = |label: &str,
                     layout: &wgpu::BindGroupLayout,
                     shader: &wgpu::ShaderModule,
                     second: wgpu::VertexBufferLayout<'_>| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[layout],
                immediate_size: 0,
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[position_buffer.clone(), second],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            })
        };

        let cube_pipeline = build(
            "cube-reprojection-pipeline",
            &bind_group_layout,
            &cube_shader,
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &direction_attributes,
            },
        );
        let face_pipeline = build(
            "cube-face-reprojection-pipeline",
            &face_bind_group_layout,
            &face_shader,
            wgpu::VertexBufferLayout {
                array_stride: 8,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &texcoord_attributes,
            },
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cube-reprojection-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube-reprojection-uniform"),
            contents: bytemuck::cast_slice(&[ScreenUniform {
                matrix: Mat4::IDENTITY.to_cols_array_2d(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            cube_pipeline,
            face_pipeline,
            bind_group_layout,
            face_bind_group_layout,
            sampler,
            uniform_buffer,
            buffers: None,
        }
    }

    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mesh: &CubeMeshDraw<'_, WgpuTarget>,
        screen_matrix: Mat4,
    ) {
        let positions: Vec<[f32; 3]> = mesh.positions.iter().map(|p| p.to_array()).collect();
        let directions: Vec<[f32; 3]> = mesh.directions.iter().map(|d| d.to_array()).collect();
        let mut texcoords: Vec<[f32; 2]> = mesh.texcoords.iter().map(|t| t.to_array()).collect();
        texcoords.resize(positions.len(), [0.0; 2]);
        // Index buffers must be a multiple of four bytes.
        let mut indices = mesh.indices.to_vec();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }

        let fits = self
            .buffers
            .as_ref()
            .is_some_and(|b| b.vertex_count == positions.len() && b.index_count == indices.len());
        if !fits {
            let vertex_buffer = |label: &str, contents: &[u8]| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                })
            };
            self.buffers = Some(CubeBuffers {
                positions: vertex_buffer("cube-positions", bytemuck::cast_slice(&positions)),
                directions: vertex_buffer("cube-directions", bytemuck::cast_slice(&directions)),
                texcoords: vertex_buffer("cube-texcoords", bytemuck::cast_slice(&texcoords)),
                indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("cube-indices"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                }),
                vertex_count: positions.len(),
                index_count: indices.len(),
            });
        } else if let Some(buffers) = self.buffers.as_ref() {
            queue.write_buffer(&buffers.positions, 0, bytemuck::cast_slice(&positions));
            queue.write_buffer(&buffers.directions, 0, bytemuck::cast_slice(&directions));
            queue.write_buffer(&buffers.texcoords, 0, bytemuck::cast_slice(&texcoords));
        }

        let uniform = ScreenUniform {
            matrix: (GL_TO_WGPU_DEPTH * screen_matrix).to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cube-reprojection-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn draw(
        &self,
        device: &wgpu::Device,
        render_pass: &mut wgpu::RenderPass<'_>,
        mesh: &CubeMeshDraw<'_, WgpuTarget>,
    ) {
        let Some(buffers) = self.buffers.as_ref() else {
            return;
        };
        render_pass.set_vertex_buffer(0, buffers.positions.slice(..));
        render_pass.set_index_buffer(buffers.indices.slice(..), wgpu::IndexFormat::Uint16);

        match &mesh.source {
            CubeSource::Cube(target) => {
                let bind_group =
                    self.bind_group(device, &self.bind_group_layout, &target.sample_view);
                render_pass.set_pipeline(&self.cube_pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                render_pass.set_vertex_buffer(1, buffers.directions.slice(..));
                render_pass.draw_indexed(0..mesh.indices.len() as u32, 0, 0..1);
            }
            CubeSource::Faces(faces) => {
                let per_face = mesh.face_index_count() as u32;
                render_pass.set_pipeline(&self.face_pipeline);
                render_pass.set_vertex_buffer(1, buffers.texcoords.slice(..));
                for (i, face) in faces.iter().enumerate() {
                    let bind_group =
                        self.bind_group(device, &self.face_bind_group_layout, &face.sample_view);
                    render_pass.set_bind_group(0, &bind_group, &[]);
                    let first = i as u32 * per_face;
                    render_pass.draw_indexed(first..first + per_face, 0, 0..1);
                }
            }
        }
    }
}

const CUBE_SHADER_SOURCE: &str = r#"
struct ScreenUniform {
    matrix: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> screen: ScreenUniform;
@group(0) @binding(1) var cube_texture: texture_cube<f32>;
@group(0) @binding(2) var cube_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) direction: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = screen.matrix * vec4<f32>(position, 1.0);
    out.direction = direction;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(cube_texture, cube_sampler, in.direction);
}
"#;

const FACE_SHADER_SOURCE: &str = r#"
struct ScreenUniform {
    matrix: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> screen: ScreenUniform;
@group(0) @binding(1) var face_texture: texture_2d<f32>;
@group(0) @binding(2) var face_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = screen.matrix * vec4<f32>(position, 1.0);
    // Face targets are stored top row first.
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(face_texture, face_sampler, in.uv);
}
"#;
