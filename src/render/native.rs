use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use glam::Mat4;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::common::{FlatGlobals, FlatObject, LitGlobals, LitObject, FRUSTUM_COLOR};
use super::shaders::{FLAT_SHADER, LIT_SHADER};
use crate::frame::FrameBackend;
use crate::mesh::{LineMesh, Mesh, Vertex};
use crate::rig::{CameraRig, LightRig};
use crate::scene::{Checkerboard, Scene};
use crate::settings::{FrameConfig, SHADOW_MAP_SIZE};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Position attribute of the interleaved [`Vertex`], for the depth pass.
const DEPTH_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x3,
    offset: 0,
    shader_location: 0,
}];

const LINE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// wgpu backend for the frame driver.
///
/// Owns every GPU resource the demo needs. All binds are explicit: each
/// pass names its pipeline, bind groups and attachments when it is
/// encoded, and nothing carries over between passes except the shadow map
/// the depth pass writes and the color pass reads.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    shadow_map: ShadowMap,
    depth_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    lit_pipeline: wgpu::RenderPipeline,
    light_globals: UniformBlock,
    frustum_globals: UniformBlock,
    frustum_object: UniformBlock,
    lit_globals_buffer: wgpu::Buffer,
    lit_globals: wgpu::BindGroup,
    objects: Vec<GpuDrawable>,
    frustum_lines: LineBuffers,
    frame: Option<FrameInFlight>,
}

struct FrameInFlight {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

impl Renderer {
    /// Initializes the GPU for `window` and uploads the scene.
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("shadow-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: Default::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&surface_caps.formats)
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let shadow_map = ShadowMap::create(&device, SHADOW_MAP_SIZE);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let flat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flat-shader"),
            source: wgpu::ShaderSource::Wgsl(FLAT_SHADER.into()),
        });
        let lit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit-shader"),
            source: wgpu::ShaderSource::Wgsl(LIT_SHADER.into()),
        });

        let flat_globals_layout = uniform_layout::<FlatGlobals>(&device, "flat-globals-layout")?;
        let flat_object_layout = uniform_layout::<FlatObject>(&device, "flat-object-layout")?;
        let lit_object_layout = uniform_layout::<LitObject>(&device, "lit-object-layout")?;
        let lit_globals_layout = lit_globals_layout(&device)?;

        let flat_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flat-pipeline-layout"),
            bind_group_layouts: &[&flat_globals_layout, &flat_object_layout],
            push_constant_ranges: &[],
        });
        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lit-pipeline-layout"),
            bind_group_layouts: &[&lit_globals_layout, &lit_object_layout],
            push_constant_ranges: &[],
        });

        let depth_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("depth-pipeline"),
            layout: Some(&flat_layout),
            vertex: wgpu::VertexState {
                module: &flat_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &DEPTH_ATTRIBUTES,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ShadowMap::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview: None,
            cache: None,
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line-pipeline"),
            layout: Some(&flat_layout),
            vertex: wgpu::VertexState {
                module: &flat_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &LINE_ATTRIBUTES,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &flat_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        let lit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lit-pipeline"),
            layout: Some(&lit_layout),
            vertex: wgpu::VertexState {
                module: &lit_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &lit_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        check_programs(device.pop_error_scope().await)?;

        let base_texture = upload_checkerboard(&device, &queue, &scene.texture);
        let base_view = base_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let base_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("base-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let lit_globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lit-globals"),
            size: std::mem::size_of::<LitGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lit_globals = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-globals-bind-group"),
            layout: &lit_globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lit_globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&base_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&base_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
            ],
        });

        let light_globals = UniformBlock::new(
            &device,
            &flat_globals_layout,
            "light-globals",
            &FlatGlobals::new(&Mat4::IDENTITY),
        );
        let frustum_globals = UniformBlock::new(
            &device,
            &flat_globals_layout,
            "frustum-globals",
            &FlatGlobals::new(&Mat4::IDENTITY),
        );
        let frustum_object = UniformBlock::new(
            &device,
            &flat_object_layout,
            "frustum-object",
            &FlatObject::new(&Mat4::IDENTITY, FRUSTUM_COLOR),
        );

        let objects = scene
            .drawables
            .iter()
            .map(|drawable| {
                let label = drawable.shape.to_string();
                GpuDrawable {
                    mesh: MeshBuffers::from_mesh(&device, &drawable.mesh, &label),
                    depth_object: UniformBlock::new(
                        &device,
                        &flat_object_layout,
                        &format!("{label}-depth-object"),
                        &FlatObject::from(&drawable.uniforms),
                    ),
                    lit_object: UniformBlock::new(
                        &device,
                        &lit_object_layout,
                        &format!("{label}-lit-object"),
                        &LitObject::from(&drawable.uniforms),
                    ),
                }
            })
            .collect();
        let frustum_lines = LineBuffers::from_lines(&device, &scene.frustum_lines, "frustum");

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            shadow_map,
            depth_pipeline,
            line_pipeline,
            lit_pipeline,
            light_globals,
            frustum_globals,
            frustum_object,
            lit_globals_buffer,
            lit_globals,
            objects,
            frustum_lines,
            frame: None,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Viewport width over height.
    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height.max(1) as f32
    }

    /// Resizes the swap chain and the camera depth buffer.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(output) => Ok(output),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .context("surface unavailable after reconfigure")
            }
            Err(err) => Err(anyhow!(err).context("unable to acquire surface texture")),
        }
    }
}

impl FrameBackend for Renderer {
    fn begin_frame(&mut self, _config: &FrameConfig) -> Result<()> {
        let output = self.acquire()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.frame = Some(FrameInFlight {
            output,
            view,
            encoder,
        });
        Ok(())
    }

    fn depth_pass(&mut self, light: &LightRig) -> Result<()> {
        self.light_globals
            .write(&self.queue, &FlatGlobals::new(&light.view_projection));

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| anyhow!("no frame in flight"))?;
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("depth-pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(0, &self.light_globals.bind_group, &[]);
        for object in &self.objects {
            pass.set_bind_group(1, &object.depth_object.bind_group, &[]);
            object.mesh.draw(&mut pass);
        }
        Ok(())
    }

    fn color_pass(
        &mut self,
        camera: &CameraRig,
        light: &LightRig,
        config: &FrameConfig,
    ) -> Result<()> {
        let globals = LitGlobals::new(camera, light, config, self.shadow_map.size);
        self.queue
            .write_buffer(&self.lit_globals_buffer, 0, bytes_of(&globals));

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| anyhow!("no frame in flight"))?;
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("color-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.lit_pipeline);
        pass.set_bind_group(0, &self.lit_globals, &[]);
        for object in &self.objects {
            pass.set_bind_group(1, &object.lit_object.bind_group, &[]);
            object.mesh.draw(&mut pass);
        }
        Ok(())
    }

    fn draw_frustum(&mut self, camera: &CameraRig, light: &LightRig) -> Result<()> {
        self.frustum_globals
            .write(&self.queue, &FlatGlobals::new(&camera.view_projection));
        self.frustum_object
            .write(&self.queue, &FlatObject::frustum(light));

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| anyhow!("no frame in flight"))?;
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("frustum-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.line_pipeline);
        pass.set_bind_group(0, &self.frustum_globals.bind_group, &[]);
        pass.set_bind_group(1, &self.frustum_object.bind_group, &[]);
        pass.set_vertex_buffer(0, self.frustum_lines.vertex.slice(..));
        pass.set_index_buffer(self.frustum_lines.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.frustum_lines.index_count, 0, 0..1);
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        let Some(frame) = self.frame.take() else {
            return Err(anyhow!("no frame in flight"));
        };
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
        debug!("frame presented at {}x{}", self.size.width, self.size.height);
        Ok(())
    }
}

/// One drawable's GPU resources: geometry plus a uniform block per pass.
struct GpuDrawable {
    mesh: MeshBuffers,
    depth_object: UniformBlock,
    lit_object: UniformBlock,
}

/// A uniform buffer and the bind group exposing it at binding 0.
struct UniformBlock {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBlock {
    fn new<T: bytemuck::Pod>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        contents: &T,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes_of(contents),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, contents: &T) {
        queue.write_buffer(&self.buffer, 0, bytes_of(contents));
    }
}

/// The lit program writes display values directly, so a non-sRGB target keeps
/// them unencoded.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

fn check_programs(error: Option<wgpu::Error>) -> Result<()> {
    match error {
        Some(error) => Err(anyhow::Error::new(error).context("shader program construction failed")),
        None => Ok(()),
    }
}

fn uniform_layout<T>(device: &wgpu::Device, label: &str) -> Result<wgpu::BindGroupLayout> {
    Ok(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(uniform_size::<T>()?),
            },
            count: None,
        }],
    }))
}

fn lit_globals_layout(device: &wgpu::Device) -> Result<wgpu::BindGroupLayout> {
    Ok(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lit-globals-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(uniform_size::<LitGlobals>()?),
                },
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
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    }))
}

fn uniform_size<T>() -> Result<wgpu::BufferSize> {
    wgpu::BufferSize::new(std::mem::size_of::<T>() as u64)
        .ok_or_else(|| anyhow!("uniform block has zero size"))
}

fn upload_checkerboard(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    board: &Checkerboard,
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("checkerboard"),
            size: wgpu::Extent3d {
                width: board.size(),
                height: board.size(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        board.texels(),
    )
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct LineBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl LineBuffers {
    fn from_lines(device: &wgpu::Device, lines: &LineMesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&lines.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&lines.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: lines.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("camera-depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Square 32-bit float depth texture written by the depth pass and read
/// with `textureLoad` by the lit program.
struct ShadowMap {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: u32,
}

impl ShadowMap {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn create(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow-map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn surface_format_skips_srgb_variants() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(pick_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        assert_eq!(
            pick_surface_format(&[TextureFormat::Rgba8UnormSrgb]),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn validation_error_becomes_startup_error() {
        assert!(check_programs(None).is_ok());
        let error = wgpu::Error::Validation {
            source: "unknown identifier `lit`".into(),
            description: "shader module is invalid".to_string(),
        };
        let err = check_programs(Some(error)).unwrap_err();
        assert_eq!(err.to_string(), "shader program construction failed");
        assert_eq!(err.root_cause().to_string(), "unknown identifier `lit`");
    }
}
