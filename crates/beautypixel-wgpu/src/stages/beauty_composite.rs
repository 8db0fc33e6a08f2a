//! Adaptive denoise/sharpen and 4-LUT skin grading
//!
//! Single pass over the white-balanced image, the box-blurred mean, and the
//! high-pass variance map. Step A (gated on blurAlpha) blends toward the mean
//! where variance is low and re-adds a local high-pass scaled by the sharpen
//! amount. Step B (gated on whiten) applies a level adjust, a gray-ramp pass,
//! two 16-tile cube LUTs and one 64-level cube LUT.
//!
//! The tile-address constants (0.25, 0.234375, 0.0078125, 1/8, 0.5/512,
//! 1/8 - 1/512) encode the physical LUT image layout; they must not change.

use crate::context::RenderContext;
use crate::error::StageError;
use crate::lut::LutSet;
use crate::params::Params;
use crate::stage::{BindingKind, ShaderStage};

const COMPOSITE_FS: &str = r#"
struct CompositeUniforms {
    texel: vec2<f32>,
    sharpen: f32,
    blur_alpha: f32,
    whiten: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var mean_texture: texture_2d<f32>;
@group(0) @binding(2) var variance_texture: texture_2d<f32>;
@group(0) @binding(3) var lookup_gray: texture_2d<f32>;
@group(0) @binding(4) var lookup_origin: texture_2d<f32>;
@group(0) @binding(5) var lookup_skin: texture_2d<f32>;
@group(0) @binding(6) var lookup_custom: texture_2d<f32>;
@group(0) @binding(7) var shared_sampler: sampler;
@group(0) @binding(8) var<uniform> u: CompositeUniforms;

const LEVEL_RANGE_INV: f32 = 1.02657;
const LEVEL_BLACK: f32 = 0.0258820;
const ALPHA: f32 = 0.7;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let i_color = textureSampleLevel(source, shared_sampler, in.uv, 0.0);
    let mean_color = textureSampleLevel(mean_texture, shared_sampler, in.uv, 0.0);
    let var_color = textureSampleLevel(variance_texture, shared_sampler, in.uv, 0.0);

    var color = i_color.rgb;
    if (u.blur_alpha > 0.0) {
        let theta = 0.1;
        let p = clamp((min(i_color.r, mean_color.r - 0.1) - 0.2) * 4.0, 0.0, 1.0);
        let mean_var = (var_color.r + var_color.g + var_color.b) / 3.0;
        var k_min = (1.0 - mean_var / (mean_var + theta)) * p * u.blur_alpha;
        k_min = clamp(k_min, 0.0, 1.0);
        let result_color = mix(i_color.rgb, mean_color.rgb, k_min);

        var sum = 0.25 * i_color.rgb;
        sum += 0.125 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(-u.texel.x, 0.0), 0.0).rgb;
        sum += 0.125 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(u.texel.x, 0.0), 0.0).rgb;
        sum += 0.125 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(0.0, -u.texel.y), 0.0).rgb;
        sum += 0.125 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(0.0, u.texel.y), 0.0).rgb;
        sum += 0.0625 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(u.texel.x, u.texel.y), 0.0).rgb;
        sum += 0.0625 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(-u.texel.x, -u.texel.y), 0.0).rgb;
        sum += 0.0625 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(-u.texel.x, u.texel.y), 0.0).rgb;
        sum += 0.0625 * textureSampleLevel(source, shared_sampler, in.uv + vec2<f32>(u.texel.x, -u.texel.y), 0.0).rgb;

        let h_pass = i_color.rgb - sum;
        color = result_color + u.sharpen * h_pass * 2.0;
    }

    if (u.whiten > 0.0) {
        let color_epm = color;
        color = clamp((color_epm - vec3<f32>(LEVEL_BLACK)) * LEVEL_RANGE_INV, vec3<f32>(0.0), vec3<f32>(1.0));
        var texel = vec3<f32>(
            textureSampleLevel(lookup_gray, shared_sampler, vec2<f32>(color.r, 0.5), 0.0).r,
            textureSampleLevel(lookup_gray, shared_sampler, vec2<f32>(color.g, 0.5), 0.0).g,
            textureSampleLevel(lookup_gray, shared_sampler, vec2<f32>(color.b, 0.5), 0.0).b,
        );
        texel = mix(color, texel, 0.5);
        texel = mix(color_epm, texel, ALPHA);

        texel = clamp(texel, vec3<f32>(0.0), vec3<f32>(1.0));
        var blue_color = texel.b * 15.0;
        var quad1 = vec2<f32>(0.0);
        quad1.y = floor(floor(blue_color) * 0.25);
        quad1.x = floor(blue_color) - quad1.y * 4.0;
        var quad2 = vec2<f32>(0.0);
        quad2.y = floor(ceil(blue_color) * 0.25);
        quad2.x = ceil(blue_color) - quad2.y * 4.0;
        var tex_pos2 = texel.rg * 0.234375 + vec2<f32>(0.0078125);
        var tex_pos1 = quad1 * 0.25 + tex_pos2;
        tex_pos2 = quad2 * 0.25 + tex_pos2;
        let new_color1_origin = textureSampleLevel(lookup_origin, shared_sampler, tex_pos1, 0.0).rgb;
        let new_color2_origin = textureSampleLevel(lookup_origin, shared_sampler, tex_pos2, 0.0).rgb;
        let color_origin = mix(new_color1_origin, new_color2_origin, fract(blue_color));
        texel = mix(color_origin, color, ALPHA);

        texel = clamp(texel, vec3<f32>(0.0), vec3<f32>(1.0));
        blue_color = texel.b * 15.0;
        quad1.y = floor(floor(blue_color) * 0.25);
        quad1.x = floor(blue_color) - quad1.y * 4.0;
        quad2.y = floor(ceil(blue_color) * 0.25);
        quad2.x = ceil(blue_color) - quad2.y * 4.0;
        tex_pos2 = texel.rg * 0.234375 + vec2<f32>(0.0078125);
        tex_pos1 = quad1 * 0.25 + tex_pos2;
        tex_pos2 = quad2 * 0.25 + tex_pos2;
        let new_color1 = textureSampleLevel(lookup_skin, shared_sampler, tex_pos1, 0.0).rgb;
        let new_color2 = textureSampleLevel(lookup_skin, shared_sampler, tex_pos2, 0.0).rgb;
        color = mix(new_color1, new_color2, fract(blue_color));
        color = clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));

        let blue_custom = color.b * 63.0;
        var quad1_custom = vec2<f32>(0.0);
        quad1_custom.y = floor(floor(blue_custom) / 8.0);
        quad1_custom.x = floor(blue_custom) - quad1_custom.y * 8.0;
        var quad2_custom = vec2<f32>(0.0);
        quad2_custom.y = floor(ceil(blue_custom) / 8.0);
        quad2_custom.x = ceil(blue_custom) - quad2_custom.y * 8.0;
        var tex_pos1_custom = vec2<f32>(
            quad1_custom.x / 8.0 + 0.5 / 512.0 + (1.0 / 8.0 - 1.0 / 512.0) * color.r,
            quad1_custom.y / 8.0 + 0.5 / 512.0 + (1.0 / 8.0 - 1.0 / 512.0) * color.g,
        );
        var tex_pos2_custom = vec2<f32>(
            quad2_custom.x / 8.0 + 0.5 / 512.0 + (1.0 / 8.0 - 1.0 / 512.0) * color.r,
            quad2_custom.y / 8.0 + 0.5 / 512.0 + (1.0 / 8.0 - 1.0 / 512.0) * color.g,
        );
        let new_color1_custom = textureSampleLevel(lookup_custom, shared_sampler, tex_pos1_custom, 0.0).rgb;
        let new_color2_custom = textureSampleLevel(lookup_custom, shared_sampler, tex_pos2_custom, 0.0).rgb;
        let color_custom = mix(new_color1_custom, new_color2_custom, fract(blue_custom));
        color = mix(color, color_custom, u.whiten);
    }

    return vec4<f32>(color, 1.0);
}
"#;

const COMPOSITE_BINDINGS: &[BindingKind] = &[
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeUniforms {
    texel: [f32; 2],
    sharpen: f32,
    blur_alpha: f32,
    whiten: f32,
    _pad: [f32; 3],
}

/// The four LUT images uploaded once per source-image session.
#[derive(Debug)]
pub struct LutTextures {
    gray: wgpu::Texture,
    origin: wgpu::Texture,
    skin: wgpu::Texture,
    custom: wgpu::Texture,
}

impl LutTextures {
    /// Uploads all four decoded LUT buffers.
    pub fn upload(ctx: &RenderContext, luts: &LutSet) -> Self {
        Self {
            gray: ctx.upload_rgba8("LUT Gray", &luts.gray),
            origin: ctx.upload_rgba8("LUT Origin", &luts.origin),
            skin: ctx.upload_rgba8("LUT Skin", &luts.skin),
            custom: ctx.upload_rgba8("LUT Custom", &luts.custom),
        }
    }
}

/// Denoise/sharpen plus chained LUT grading in one pass.
#[derive(Debug)]
pub struct FaceBeautyCompositeStage {
    stage: ShaderStage,
    uniforms: wgpu::Buffer,
}

impl FaceBeautyCompositeStage {
    pub fn new(ctx: &RenderContext) -> Self {
        let uniforms = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            stage: ShaderStage::new("Face Beauty Composite", COMPOSITE_FS, COMPOSITE_BINDINGS),
            uniforms,
        }
    }

    /// Composites the white-balanced original with the mean and variance maps
    /// and applies the LUT chain.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        original: &wgpu::Texture,
        mean: &wgpu::Texture,
        variance: &wgpu::Texture,
        luts: &LutTextures,
        params: &Params,
    ) -> Result<wgpu::Texture, StageError> {
        let (width, height) = (original.width(), original.height());
        ctx.queue().write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&CompositeUniforms {
                texel: [1.0 / width as f32, 1.0 / height as f32],
                sharpen: params.sharpen(),
                blur_alpha: params.blur_alpha(),
                whiten: params.whiten(),
                _pad: [0.0; 3],
            }),
        );

        let output = ctx.create_target("Composite Output", width, height);
        let original_view = original.create_view(&wgpu::TextureViewDescriptor::default());
        let mean_view = mean.create_view(&wgpu::TextureViewDescriptor::default());
        let variance_view = variance.create_view(&wgpu::TextureViewDescriptor::default());
        let gray_view = luts.gray.create_view(&wgpu::TextureViewDescriptor::default());
        let origin_view = luts.origin.create_view(&wgpu::TextureViewDescriptor::default());
        let skin_view = luts.skin.create_view(&wgpu::TextureViewDescriptor::default());
        let custom_view = luts.custom.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.stage.execute(
            ctx,
            encoder,
            &[
                wgpu::BindingResource::TextureView(&original_view),
                wgpu::BindingResource::TextureView(&mean_view),
                wgpu::BindingResource::TextureView(&variance_view),
                wgpu::BindingResource::TextureView(&gray_view),
                wgpu::BindingResource::TextureView(&origin_view),
                wgpu::BindingResource::TextureView(&skin_view),
                wgpu::BindingResource::TextureView(&custom_view),
                wgpu::BindingResource::Sampler(ctx.sampler()),
                self.uniforms.as_entire_binding(),
            ],
            &output_view,
        )?;

        Ok(output)
    }
}
