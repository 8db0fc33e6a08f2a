//! Separable box blur
//!
//! Two chained 1-D convolution passes (horizontal then vertical) over the
//! data-driven tap table from [`crate::kernel`]. The taps live in a storage
//! buffer read by one generic convolution shader, so changing the radius
//! rewrites a buffer instead of regenerating shader text.

use std::collections::HashMap;

use crate::context::RenderContext;
use crate::error::StageError;
use crate::kernel::TapTable;
use crate::params::Params;
use crate::stage::{BindingKind, ShaderStage};

const CONVOLUTION_FS: &str = r#"
struct ConvUniforms {
    direction: vec2<f32>,
    tap_count: u32,
    _pad: u32,
}

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> conv: ConvUniforms;
@group(0) @binding(3) var<storage, read> taps: array<vec2<f32>>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var sum = vec4<f32>(0.0);
    for (var i = 0u; i < conv.tap_count; i = i + 1u) {
        let tap = taps[i];
        sum += textureSampleLevel(source, source_sampler, in.uv + conv.direction * tap.x, 0.0) * tap.y;
    }
    return sum;
}
"#;

const CONVOLUTION_BINDINGS: &[BindingKind] = &[
    BindingKind::Texture,
    BindingKind::Sampler,
    BindingKind::Uniform,
    BindingKind::Storage,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvUniforms {
    direction: [f32; 2],
    tap_count: u32,
    _pad: u32,
}

/// One 1-D convolution pass along a fixed axis.
#[derive(Debug)]
struct ConvolutionStage {
    stage: ShaderStage,
    uniforms: wgpu::Buffer,
    taps: wgpu::Buffer,
    tap_capacity: usize,
}

impl ConvolutionStage {
    fn new(ctx: &RenderContext, label: &'static str) -> Self {
        let uniforms = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<ConvUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let tap_capacity = 32;
        let taps = Self::create_tap_buffer(ctx, label, tap_capacity);

        Self {
            stage: ShaderStage::new(label, CONVOLUTION_FS, CONVOLUTION_BINDINGS),
            uniforms,
            taps,
            tap_capacity,
        }
    }

    fn create_tap_buffer(ctx: &RenderContext, label: &str, capacity: usize) -> wgpu::Buffer {
        ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<[f32; 2]>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        table: &TapTable,
        direction: [f32; 2],
    ) -> Result<wgpu::Texture, StageError> {
        if table.len() > self.tap_capacity {
            self.tap_capacity = table.len().next_power_of_two();
            self.taps = Self::create_tap_buffer(ctx, "Convolution Taps", self.tap_capacity);
        }

        ctx.queue().write_buffer(&self.taps, 0, bytemuck::cast_slice(table.taps()));
        ctx.queue().write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&ConvUniforms {
                direction,
                tap_count: table.len() as u32,
                _pad: 0,
            }),
        );

        let output = ctx.create_target("Convolution Output", input.width(), input.height());
        let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.stage.execute(
            ctx,
            encoder,
            &[
                wgpu::BindingResource::TextureView(&input_view),
                wgpu::BindingResource::Sampler(ctx.sampler()),
                self.uniforms.as_entire_binding(),
                self.taps.as_entire_binding(),
            ],
            &output_view,
        )?;

        Ok(output)
    }
}

/// 2-D box blur as two chained 1-D passes.
///
/// A constant-color image blurs to itself for any radius; for even radii the
/// two-pass result equals the exact discrete `(2R+1)x(2R+1)` box average
/// (clamp-to-edge at borders).
#[derive(Debug)]
pub struct BoxBlurEngine {
    horizontal: ConvolutionStage,
    vertical: ConvolutionStage,
    spacing: f32,
    tables: HashMap<u32, TapTable>,
}

impl BoxBlurEngine {
    /// Creates the engine with the given texel spacing multiplier.
    pub fn new(ctx: &RenderContext, spacing: f32) -> Self {
        Self {
            horizontal: ConvolutionStage::new(ctx, "Box Blur Horizontal"),
            vertical: ConvolutionStage::new(ctx, "Box Blur Vertical"),
            spacing,
            tables: HashMap::new(),
        }
    }

    /// Adjusts the spacing between taps, in texels.
    pub fn set_texel_spacing_multiplier(&mut self, spacing: f32) {
        self.spacing = spacing;
    }

    /// Runs horizontal then vertical passes at the radius currently set in
    /// `params` and returns the blurred texture.
    pub fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        params: &Params,
    ) -> Result<wgpu::Texture, StageError> {
        let radius = params.blur_radius();
        let table = self.tables.entry(radius).or_insert_with(|| TapTable::new(radius)).clone();

        let width = input.width() as f32;
        let height = input.height() as f32;

        let blurred_h = self.horizontal.run(ctx, encoder, input, &table, [self.spacing / width, 0.0])?;
        self.vertical.run(ctx, encoder, &blurred_h, &table, [0.0, self.spacing / height])
    }
}
