//! Output blit
//!
//! Blits the final frame through the vertically flipped quad so the readback
//! buffer comes back bottom-up (row 0 = image bottom); the export path flips
//! rows again to hand the caller an upright image.

use crate::context::RenderContext;
use crate::error::StageError;
use crate::stage::{BindingKind, ShaderStage, FLIPPED_QUAD_VS};

const OUTPUT_FS: &str = r#"
@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSampleLevel(source, source_sampler, in.uv, 0.0);
}
"#;

const OUTPUT_BINDINGS: &[BindingKind] = &[BindingKind::Texture, BindingKind::Sampler];

/// Y-flipped passthrough blit ahead of readback.
#[derive(Debug)]
pub struct OutputStage {
    stage: ShaderStage,
}

impl OutputStage {
    pub fn new(_ctx: &RenderContext) -> Self {
        Self {
            stage: ShaderStage::with_vertex("Output Blit", FLIPPED_QUAD_VS, OUTPUT_FS, OUTPUT_BINDINGS),
        }
    }

    /// Renders `input` flipped into a fresh target and returns it.
    pub fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
    ) -> Result<wgpu::Texture, StageError> {
        let output = ctx.create_target("Output Blit Target", input.width(), input.height());
        let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.stage.execute(
            ctx,
            encoder,
            &[
                wgpu::BindingResource::TextureView(&input_view),
                wgpu::BindingResource::Sampler(ctx.sampler()),
            ],
            &output_view,
        )?;

        Ok(output)
    }
}
