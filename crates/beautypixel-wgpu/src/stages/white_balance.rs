//! White-balance correction
//!
//! Converts to YIQ, clamps the tint-shifted chroma channel to +-0.5226,
//! converts back, and blends toward a fixed warm-filter curve by the
//! temperature factor. The matrix layout reproduces the reference filter
//! verbatim (column-major as written).

use crate::context::RenderContext;
use crate::error::StageError;
use crate::params::Params;
use crate::stage::{BindingKind, ShaderStage};

const WHITE_BALANCE_FS: &str = r#"
struct WhiteBalanceUniforms {
    temperature: f32,
    tint: f32,
    _pad0: f32,
    _pad1: f32,
}

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> u: WhiteBalanceUniforms;

const WARM_FILTER = vec3<f32>(0.93, 0.54, 0.0);

const RGB_TO_YIQ = mat3x3<f32>(
    vec3<f32>(0.299, 0.587, 0.114),
    vec3<f32>(0.596, -0.274, -0.322),
    vec3<f32>(0.212, -0.523, 0.311),
);

const YIQ_TO_RGB = mat3x3<f32>(
    vec3<f32>(1.0, 0.956, 0.621),
    vec3<f32>(1.0, -0.272, -0.647),
    vec3<f32>(1.0, -1.105, 1.702),
);

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSampleLevel(source, source_sampler, in.uv, 0.0);

    var yiq = RGB_TO_YIQ * color.rgb;
    yiq.z = clamp(yiq.z + u.tint * 0.5226 * 0.1, -0.5226, 0.5226);
    let rgb = YIQ_TO_RGB * yiq;

    let processed = vec3<f32>(
        select(1.0 - 2.0 * (1.0 - rgb.r) * (1.0 - WARM_FILTER.r), 2.0 * rgb.r * WARM_FILTER.r, rgb.r < 0.5),
        select(1.0 - 2.0 * (1.0 - rgb.g) * (1.0 - WARM_FILTER.g), 2.0 * rgb.g * WARM_FILTER.g, rgb.g < 0.5),
        select(1.0 - 2.0 * (1.0 - rgb.b) * (1.0 - WARM_FILTER.b), 2.0 * rgb.b * WARM_FILTER.b, rgb.b < 0.5),
    );

    return vec4<f32>(mix(rgb, processed, u.temperature), color.a);
}
"#;

const WHITE_BALANCE_BINDINGS: &[BindingKind] = &[
    BindingKind::Texture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct WhiteBalanceUniforms {
    temperature: f32,
    tint: f32,
    _pad: [f32; 2],
}

/// Temperature/tint color-correction pass.
#[derive(Debug)]
pub struct WhiteBalanceStage {
    stage: ShaderStage,
    uniforms: wgpu::Buffer,
}

impl WhiteBalanceStage {
    pub fn new(ctx: &RenderContext) -> Self {
        let uniforms = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("White Balance Uniforms"),
            size: std::mem::size_of::<WhiteBalanceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            stage: ShaderStage::new("White Balance", WHITE_BALANCE_FS, WHITE_BALANCE_BINDINGS),
            uniforms,
        }
    }

    /// Applies the correction with the temperature/tint currently in `params`.
    pub fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        params: &Params,
    ) -> Result<wgpu::Texture, StageError> {
        ctx.queue().write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&WhiteBalanceUniforms {
                temperature: params.temperature_factor(),
                tint: params.tint(),
                _pad: [0.0; 2],
            }),
        );

        let output = ctx.create_target("White Balance Output", input.width(), input.height());
        let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.stage.execute(
            ctx,
            encoder,
            &[
                wgpu::BindingResource::TextureView(&input_view),
                wgpu::BindingResource::Sampler(ctx.sampler()),
                self.uniforms.as_entire_binding(),
            ],
            &output_view,
        )?;

        Ok(output)
    }
}
