//! GPU render context
//!
//! [`RenderContext`] owns the wgpu device and queue plus the single sampler
//! every stage shares (clamp-to-edge, linear filtering, no mipmaps). It is
//! threaded explicitly through every stage constructor and call; no stage
//! touches ambient global device state.

use crate::error::PipelineError;
use crate::pixel::PixelBuffer;

/// Texture format used for every intermediate and output texture.
pub(crate) const WORKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Owns the GPU device, queue, and shared sampler used by all stages.
#[derive(Debug)]
pub struct RenderContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    sampler: wgpu::Sampler,
}

impl RenderContext {
    /// Creates a headless context on the first available high-performance
    /// adapter.
    pub fn new() -> Result<Self, PipelineError> {
        pollster::block_on(Self::new_async())
    }

    /// Async variant of [`RenderContext::new`].
    pub async fn new_async() -> Result<Self, PipelineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
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
            .map_err(|e| PipelineError::Gpu(format!("no suitable GPU adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("BeautyPixel Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| PipelineError::Gpu(format!("device request failed: {e}")))?;

        Ok(Self::from_device(device, queue))
    }

    /// Wraps an existing device/queue pair, e.g. one shared with a windowing
    /// surface.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Stage Sampler"),
            // Clamp to edge to avoid artifacts when sampling at texture boundaries
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            // No mipmapping for processing textures
            mipmap_filter: wgpu::FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 0.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        });

        Self { device, queue, sampler }
    }

    /// The wgpu device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu command queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The shared clamp-to-edge linear sampler
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Creates an RGBA8 render target sized to the working resolution.
    pub(crate) fn create_target(&self, label: &str, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WORKING_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Uploads a decoded RGBA8 buffer into a sampleable texture.
    pub(crate) fn upload_rgba8(&self, label: &str, pixels: &PixelBuffer) -> wgpu::Texture {
        let (width, height) = (pixels.width(), pixels.height());
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WORKING_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        texture
    }
}
