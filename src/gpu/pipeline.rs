/// wgpu compositor for the live preview
///
/// This module manages the wgpu boilerplate:
/// - Device and queue initialization (once per app, shared through `Arc`)
/// - Source texture upload, re-done only when the photo or preview scale changes
/// - Uniform buffer for the transform and filter values
/// - Offscreen render and padded readback into an `RgbaImage`
///
/// Overlay commands are painted on the CPU after readback.

// Use wgpu from iced to avoid dependency conflicts
use iced_wgpu::wgpu;
use image::RgbaImage;
use std::sync::Arc;

use crate::error::{EditorError, EditorResult};
use crate::render::compositor::{paint_overlay_command, Compositor, ScaledSourceCache};
use crate::render::filters::FilterChain;
use crate::render::preview::{DrawCommand, PreviewFrame};
use crate::render::transform::Orientation;
use crate::state::{PixelRect, SourceImage};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Preview parameters in a GPU-friendly format.
/// Must match the WGSL `PreviewParams` layout (five vec4s).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuPreviewParams {
    inverse_row0: [f32; 4],
    inverse_row1: [f32; 4],
    region: [f32; 4],
    sizes: [f32; 4],
    tone: [f32; 4],
}

impl GpuPreviewParams {
    fn new(
        src: PixelRect,
        orientation: Orientation,
        filters: &FilterChain,
        texture_size: (u32, u32),
        scale: f32,
    ) -> Self {
        let [row0, row1] = orientation
            .pivot(src.width as f64, src.height as f64)
            .inverse_rows();
        let [brightness, contrast, saturate] = filters.tone();
        Self {
            inverse_row0: [row0[0], row0[1], row0[2], 0.0],
            inverse_row1: [row1[0], row1[1], row1[2], 0.0],
            region: [
                src.x as f32,
                src.y as f32,
                src.width as f32,
                src.height as f32,
            ],
            sizes: [texture_size.0 as f32, texture_size.1 as f32, scale, 0.0],
            tone: [
                brightness as f32 / 100.0,
                contrast as f32 / 100.0,
                saturate as f32 / 100.0,
                filters.blur(),
            ],
        }
    }
}

/// Device, queue and pipeline state, created once and shared
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    adapter_name: String,
}

// Manual Debug implementation (wgpu types don't implement Debug)
impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter_name)
            .finish_non_exhaustive()
    }
}

impl GpuContext {
    /// Request an adapter and device and build the preview pipeline
    pub async fn new() -> EditorResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| EditorError::render("Failed to find suitable GPU adapter"))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Preview Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| EditorError::render(format!("Failed to create device: {:?}", e)))?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Source Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Preview Params Uniform Buffer"),
            size: std::mem::size_of::<GpuPreviewParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Preview Bind Group Layout"),
            entries: &[
                // Source texture (filterable RGBA)
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
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Uniform buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Preview Shader"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::get_shader().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Preview Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Preview Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // Disable culling for full-screen triangle
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        tracing::info!(adapter = %adapter_name, "GPU preview pipeline ready");

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
            adapter_name,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Source texture currently resident on the device
struct UploadedSource {
    key: (String, u32, u32),
    size: (u32, u32),
    bind_group: wgpu::BindGroup,
}

/// Preview compositor backed by a shared `GpuContext`
pub struct GpuCompositor {
    context: Arc<GpuContext>,
    cache: ScaledSourceCache,
    uploaded: Option<UploadedSource>,
}

impl std::fmt::Debug for GpuCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuCompositor")
            .field("context", &self.context)
            .field("uploaded", &self.uploaded.as_ref().map(|u| &u.key))
            .finish_non_exhaustive()
    }
}

impl GpuCompositor {
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self {
            context,
            cache: ScaledSourceCache::default(),
            uploaded: None,
        }
    }
}

impl Compositor for GpuCompositor {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn composite(&mut self, source: &SourceImage, frame: &PreviewFrame) -> EditorResult<RgbaImage> {
        let surface_size = frame.surface_size();
        let scaled = self.cache.get(source, frame.scale);
        let texture_size = ensure_uploaded(&self.context, &mut self.uploaded, &source.photo_id, scaled)?;

        let mut surface = RgbaImage::new(surface_size.0, surface_size.1);
        for command in &frame.commands {
            match command {
                DrawCommand::DrawSource {
                    src,
                    orientation,
                    filters,
                } => {
                    let uploaded = self
                        .uploaded
                        .as_ref()
                        .ok_or_else(|| EditorError::render("No source texture uploaded"))?;
                    let params = GpuPreviewParams::new(*src, *orientation, filters, texture_size, frame.scale);
                    surface = draw_source(&self.context, uploaded, &params, surface_size)?;
                }
                other => paint_overlay_command(&mut surface, scaled, other, frame.scale),
            }
        }
        Ok(surface)
    }
}

/// Upload the scaled source when it differs from the resident texture.
/// Returns the texture size.
fn ensure_uploaded(
    ctx: &GpuContext,
    uploaded: &mut Option<UploadedSource>,
    photo_id: &str,
    scaled: &RgbaImage,
) -> EditorResult<(u32, u32)> {
    let (width, height) = scaled.dimensions();
    let key = (photo_id.to_string(), width, height);
    if let Some(current) = uploaded.as_ref().filter(|u| u.key == key) {
        return Ok(current.size);
    }

    let max = ctx.max_texture_dimension();
    if width > max || height > max {
        return Err(EditorError::render(format!(
            "Preview source {}x{} exceeds GPU texture limit {}",
            width, height, max
        )));
    }

    let texture_size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Preview Source Texture"),
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        scaled.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        texture_size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Preview Bind Group"),
        layout: &ctx.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&ctx.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: ctx.uniform_buffer.as_entire_binding(),
            },
        ],
    });

    tracing::debug!(photo_id, width, height, "uploaded preview source texture");
    *uploaded = Some(UploadedSource {
        key,
        size: (width, height),
        bind_group,
    });
    Ok((width, height))
}

/// Draw the source with the shader and read the surface back
fn draw_source(
    ctx: &GpuContext,
    uploaded: &UploadedSource,
    params: &GpuPreviewParams,
    surface: (u32, u32),
) -> EditorResult<RgbaImage> {
    let (width, height) = surface;
    ctx.queue
        .write_buffer(&ctx.uniform_buffer, 0, bytemuck::cast_slice(&[*params]));

    let output_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Preview Output Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Preview Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Preview Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&ctx.pipeline);
        render_pass.set_bind_group(0, &uploaded.bind_group, &[]);
        render_pass.draw(0..3, 0..1); // Full-screen triangle
    }

    let padded_bytes_per_row = padded_row_bytes(width);
    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Preview Readback Buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &output_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &output_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(Some(encoder.finish()));

    let buffer_slice = output_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| EditorError::render(format!("Readback channel closed: {}", e)))?
        .map_err(|e| EditorError::render(format!("Failed to map readback buffer: {:?}", e)))?;

    let data = buffer_slice.get_mapped_range();
    let pixels = unpad_rows(&data, width, height, padded_bytes_per_row);
    drop(data);
    output_buffer.unmap();

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| EditorError::render("Readback size mismatch"))
}

/// Row pitch rounded up to wgpu's 256-byte copy alignment
fn padded_row_bytes(width: u32) -> u32 {
    let bytes_per_row = width * 4;
    (bytes_per_row + 255) & !255
}

fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let mut output = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        let start = (y * padded_bytes_per_row) as usize;
        let end = start + (width * 4) as usize;
        output.extend_from_slice(&data[start..end]);
    }
    output
}
