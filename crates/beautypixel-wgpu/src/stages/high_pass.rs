//! Local variance / edge-energy estimation
//!
//! Blurs the input with its own box-blur engine (tap spacing 1), then squares
//! the scaled difference against the original. The result is a magnitude, not
//! a signed residual; the composite stage uses it to modulate denoise
//! strength.

use crate::context::RenderContext;
use crate::error::StageError;
use crate::params::Params;
use crate::stage::{BindingKind, ShaderStage};
use crate::stages::BoxBlurEngine;

const DIFFERENCE_FS: &str = r#"
struct DifferenceUniforms {
    delta: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0) var original: texture_2d<f32>;
@group(0) @binding(1) var blurred: texture_2d<f32>;
@group(0) @binding(2) var shared_sampler: sampler;
@group(0) @binding(3) var<uniform> u: DifferenceUniforms;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color1 = textureSampleLevel(original, shared_sampler, in.uv, 0.0).rgb;
    let color2 = textureSampleLevel(blurred, shared_sampler, in.uv, 0.0).rgb;
    var diff = (color1 - color2) * u.delta;
    diff = min(diff * diff, vec3<f32>(1.0));
    return vec4<f32>(diff, 1.0);
}
"#;

const DIFFERENCE_BINDINGS: &[BindingKind] = &[
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DifferenceUniforms {
    delta: f32,
    _pad: [f32; 3],
}

/// Box blur composed with a squared-difference pass.
#[derive(Debug)]
pub struct HighPassStage {
    blur: BoxBlurEngine,
    difference: ShaderStage,
    uniforms: wgpu::Buffer,
}

impl HighPassStage {
    /// Creates the stage; the internal blur uses unit tap spacing.
    pub fn new(ctx: &RenderContext) -> Self {
        let uniforms = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("High Pass Uniforms"),
            size: std::mem::size_of::<DifferenceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            blur: BoxBlurEngine::new(ctx, 1.0),
            difference: ShaderStage::new("High Pass Difference", DIFFERENCE_FS, DIFFERENCE_BINDINGS),
            uniforms,
        }
    }

    /// Produces the per-channel variance map
    /// `min(((original - blurred) * delta)^2, 1)`.
    pub fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        params: &Params,
    ) -> Result<wgpu::Texture, StageError> {
        let blurred = self.blur.run(ctx, encoder, input, params)?;

        ctx.queue().write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&DifferenceUniforms {
                delta: params.diff_delta(),
                _pad: [0.0; 3],
            }),
        );

        let output = ctx.create_target("High Pass Output", input.width(), input.height());
        let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let blurred_view = blurred.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.difference.execute(
            ctx,
            encoder,
            &[
                wgpu::BindingResource::TextureView(&input_view),
                wgpu::BindingResource::TextureView(&blurred_view),
                wgpu::BindingResource::Sampler(ctx.sampler()),
                self.uniforms.as_entire_binding(),
            ],
            &output_view,
        )?;

        Ok(output)
    }
}
