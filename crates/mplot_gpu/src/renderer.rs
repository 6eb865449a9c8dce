//! GPU renderer implementation
//!
//! Owns the wgpu device, the instance buffer and the three pipelines used
//! for plot frames: faces (depth writing), overlays (depth tested only) and
//! textured quads.

use std::sync::Arc;

use mplot_core::{Circle, Line, Mat4, Rect, Triangle};

use crate::batch::{InstanceBatch, INITIAL_INSTANCE_CAPACITY, INSTANCE_HEADROOM};
use crate::capture::DEPTH_FORMAT;
use crate::error::GpuError;
use crate::instance::{
    pack_circle, pack_line, pack_rect, pack_textured_quad, pack_triangle, Instance, QuadPlacement,
    FULL_UV,
};
use crate::primitives::Uniforms;
use crate::shaders::{PRIMITIVE_SHADER, TEXTURED_QUAD_SHADER};

/// Configuration for creating a renderer
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Color target format; readback expects an RGBA8 format
    pub texture_format: wgpu::TextureFormat,
    /// Instance buffer size before the first growth
    pub initial_capacity: usize,
    pub power_preference: wgpu::PowerPreference,
    /// Load a system font for text quads
    pub text_enabled: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            texture_format: wgpu::TextureFormat::Rgba8Unorm,
            initial_capacity: INITIAL_INSTANCE_CAPACITY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            text_enabled: true,
        }
    }
}

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x4, // pos_a_radius
    1 => Float32x4, // pos_b_width
    2 => Float32x4, // color
    3 => Float32x4, // params
    4 => Float32x4, // pos_c_pad
];

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Instance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    }
}

struct Pipelines {
    /// Rects, markers and triangles: depth test + write
    faces: wgpu::RenderPipeline,
    /// Lines: depth test, no write
    overlays: wgpu::RenderPipeline,
    /// Text and images, drawn last over everything
    quads: wgpu::RenderPipeline,
}

/// A textured quad with its own texture and bind group
struct QuadDraw {
    instance: Instance,
    bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

/// Instanced primitive renderer
///
/// Primitives are appended with the `draw_*` methods, uploaded by
/// [`prepare`](Self::prepare) and recorded into a caller-owned pass by
/// [`render`](Self::render). The pass needs a color attachment in
/// [`texture_format`](Self::texture_format) and a `Depth32Float` depth
/// attachment.
pub struct GpuRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipelines: Pipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    quad_bind_group_layout: wgpu::BindGroupLayout,
    quad_sampler: wgpu::Sampler,
    instance_buffer: wgpu::Buffer,
    quad_buffer: wgpu::Buffer,
    quad_capacity: usize,
    batch: InstanceBatch,
    quads: Vec<QuadDraw>,
    /// First overlay instance after the last `prepare`
    split: u32,
    viewport_size: (u32, u32),
    view_proj: Option<Mat4>,
    camera_pos: [f32; 3],
    texture_format: wgpu::TextureFormat,
}

impl GpuRenderer {
    /// Get the preferred backend for the current platform
    fn preferred_backends() -> wgpu::Backends {
        #[cfg(target_os = "macos")]
        {
            wgpu::Backends::METAL
        }
        #[cfg(target_os = "windows")]
        {
            wgpu::Backends::DX12
        }
        #[cfg(target_os = "linux")]
        {
            wgpu::Backends::VULKAN | wgpu::Backends::GL
        }
        #[cfg(target_arch = "wasm32")]
        {
            wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL
        }
        #[cfg(not(any(
            target_os = "macos",
            target_os = "windows",
            target_os = "linux",
            target_arch = "wasm32"
        )))]
        {
            wgpu::Backends::PRIMARY
        }
    }

    /// Create a headless renderer; adapter and device failures are fatal
    pub async fn new(config: RendererConfig) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: Self::preferred_backends(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::AdapterNotFound)?;

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            "selected GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("mplot GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        Ok(Self::from_device(Arc::new(device), Arc::new(queue), &config))
    }

    /// Build the renderer on a device the caller already owns
    pub fn from_device(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        config: &RendererConfig,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniforms Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Texture + sampler for one quad
        let quad_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Quad Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniforms Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniforms Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipelines = Self::create_pipelines(
            &device,
            &uniform_layout,
            &quad_bind_group_layout,
            config.texture_format,
        );

        let quad_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Quad Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let batch = InstanceBatch::with_capacity(config.initial_capacity);
        let instance_buffer = create_instance_buffer(&device, "Instance Buffer", batch.capacity());
        let quad_capacity = 16;
        let quad_buffer = create_instance_buffer(&device, "Quad Instance Buffer", quad_capacity);

        let renderer = Self {
            device,
            queue,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            quad_bind_group_layout,
            quad_sampler,
            instance_buffer,
            quad_buffer,
            quad_capacity,
            batch,
            quads: Vec::new(),
            split: 0,
            viewport_size: (800, 600),
            view_proj: None,
            camera_pos: [0.0; 3],
            texture_format: config.texture_format,
        };
        renderer.write_uniforms();
        renderer
    }

    fn create_pipelines(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        quad_layout: &wgpu::BindGroupLayout,
        texture_format: wgpu::TextureFormat,
    ) -> Pipelines {
        let primitive_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Primitive Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(PRIMITIVE_SHADER)),
        });
        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Textured Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(TEXTURED_QUAD_SHADER)),
        });

        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let color_targets = &[Some(wgpu::ColorTargetState {
            format: texture_format,
            blend: Some(blend_state),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let primitive_state = wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        };

        let depth_state = |write: bool, compare: wgpu::CompareFunction| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };

        let primitive_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Primitive Pipeline Layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });
        let quad_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Pipeline Layout"),
            bind_group_layouts: &[uniform_layout, quad_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str,
                     layout: &wgpu::PipelineLayout,
                     shader: &wgpu::ShaderModule,
                     depth: wgpu::DepthStencilState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[instance_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: primitive_state,
                depth_stencil: Some(depth),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Pipelines {
            faces: build(
                "Face Pipeline",
                &primitive_layout,
                &primitive_shader,
                depth_state(true, wgpu::CompareFunction::LessEqual),
            ),
            overlays: build(
                "Overlay Pipeline",
                &primitive_layout,
                &primitive_shader,
                depth_state(false, wgpu::CompareFunction::LessEqual),
            ),
            quads: build(
                "Textured Quad Pipeline",
                &quad_pipeline_layout,
                &quad_shader,
                depth_state(false, wgpu::CompareFunction::Always),
            ),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Appending primitives
    // ─────────────────────────────────────────────────────────────────────────

    pub fn draw_rect(&mut self, rect: &Rect) {
        self.batch.push(pack_rect(rect));
    }

    pub fn draw_line(&mut self, line: &Line) {
        self.batch.push(pack_line(line));
    }

    pub fn draw_circle(&mut self, circle: &Circle) {
        self.batch.push(pack_circle(circle));
    }

    pub fn draw_triangle(&mut self, triangle: &Triangle) {
        self.batch.push(pack_triangle(triangle));
    }

    /// Queue an RGBA8 bitmap drawn at `placement`
    ///
    /// Each call gets its own texture and bind group. Bitmaps whose byte
    /// count does not match `width * height * 4` are dropped.
    pub fn draw_textured_quad(&mut self, rgba: &[u8], width: u32, height: u32, placement: QuadPlacement) {
        if width == 0 || height == 0 || rgba.len() != (width as usize * height as usize * 4) {
            tracing::warn!(width, height, bytes = rgba.len(), "dropping malformed quad bitmap");
            return;
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Quad Texture"),
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
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Bind Group"),
            layout: &self.quad_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.quad_sampler),
                },
            ],
        });

        self.quads.push(QuadDraw {
            instance: pack_textured_quad(&placement, mplot_core::Color::WHITE, FULL_UV),
            bind_group,
            _texture: texture,
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Frame
    // ─────────────────────────────────────────────────────────────────────────

    /// Order faces first, grow buffers if needed and upload this frame's instances
    pub fn prepare(&mut self) {
        self.batch.partition_faces_first();
        self.split = self.batch.split_index() as u32;

        if let Some(capacity) = self.batch.reserve_for(self.batch.len()) {
            tracing::debug!(capacity, "growing instance buffer");
            self.instance_buffer = create_instance_buffer(&self.device, "Instance Buffer", capacity);
        }
        if !self.batch.is_empty() {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(self.batch.instances()),
            );
        }

        if self.quads.len() > self.quad_capacity {
            self.quad_capacity = self.quads.len() + INSTANCE_HEADROOM;
            self.quad_buffer =
                create_instance_buffer(&self.device, "Quad Instance Buffer", self.quad_capacity);
        }
        if !self.quads.is_empty() {
            let quads: Vec<Instance> = self.quads.iter().map(|q| q.instance).collect();
            self.queue
                .write_buffer(&self.quad_buffer, 0, bytemuck::cast_slice(&quads));
        }

        tracing::debug!(
            faces = self.split,
            overlays = self.batch.len() as u32 - self.split,
            quads = self.quads.len(),
            "prepared instance batch"
        );
    }

    /// Record the prepared frame: faces, then overlays, then one draw per quad
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        let total = self.batch.len() as u32;
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);

        if total > 0 {
            pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
            if self.split > 0 {
                pass.set_pipeline(&self.pipelines.faces);
                pass.draw(0..6, 0..self.split);
            }
            if self.split < total {
                pass.set_pipeline(&self.pipelines.overlays);
                pass.draw(0..6, self.split..total);
            }
        }

        if !self.quads.is_empty() {
            pass.set_pipeline(&self.pipelines.quads);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            for (i, quad) in self.quads.iter().enumerate() {
                let i = i as u32;
                pass.set_bind_group(1, &quad.bind_group, &[]);
                pass.draw(0..6, i..i + 1);
            }
        }
    }

    /// Drop all queued instances and quads; buffer capacity is kept
    pub fn clear(&mut self) {
        self.batch.clear();
        self.quads.clear();
        self.split = 0;
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }
        self.viewport_size = (width, height);
        self.write_uniforms();
        Ok(())
    }

    /// Replace the pixel-space projection, or restore it with `None`
    pub fn set_view_projection(&mut self, view_proj: Option<Mat4>) {
        self.view_proj = view_proj;
        self.write_uniforms();
    }

    pub fn set_camera_position(&mut self, position: [f32; 3]) {
        self.camera_pos = position;
        self.write_uniforms();
    }

    fn write_uniforms(&self) {
        let (width, height) = self.viewport_size;
        let uniforms = Uniforms::new(width, height, self.view_proj, self.camera_pos);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Error scopes
    // ─────────────────────────────────────────────────────────────────────────

    /// Start capturing validation errors for a frame
    pub fn push_error_scope(&self) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
    }

    /// Stop capturing; any validation error becomes [`GpuError::Validation`]
    pub fn pop_error_scope(&self) -> Result<(), GpuError> {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GpuError::Validation(err.to_string())),
            None => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Instances the GPU buffer can hold without reallocating
    pub fn instance_capacity(&self) -> usize {
        self.batch.capacity()
    }

    pub fn instance_count(&self) -> usize {
        self.batch.len()
    }

    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn texture_format(&self) -> wgpu::TextureFormat {
        self.texture_format
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport_size
    }

    /// Poll the device for completed work without blocking
    pub fn poll(&self) {
        self.device.poll(wgpu::Maintain::Poll);
    }
}

fn create_instance_buffer(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (std::mem::size_of::<Instance>() * capacity.max(1)) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
