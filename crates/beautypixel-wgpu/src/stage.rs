//! Shader stage lifecycle
//!
//! [`ShaderStage`] is the single stage type every pass in the pipeline is
//! built from: one fragment shader paired with the shared full-screen-quad
//! vertex shader, a declared binding list, and a lazily built render pipeline.
//! Executing a stage issues exactly one full-screen quad draw (4 vertices,
//! triangle strip) into an RGBA8 target at the working resolution.
//!
//! Compilation and link failures are captured with wgpu validation error
//! scopes and surface as [`StageError`]; a stage whose pipeline failed to
//! build never executes with a missing program.

use tracing::debug;

use crate::context::{RenderContext, WORKING_FORMAT};
use crate::error::StageError;

/// Full-screen quad vertex shader shared by all processing stages.
///
/// Generates the quad from the vertex index; uv (0,0) maps to the top-left of
/// the render target so passes preserve image orientation.
pub(crate) const FULLSCREEN_QUAD_VS: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let pos = vec2<f32>(
        f32(index & 1u) * 2.0 - 1.0,
        f32(index >> 1u) * 2.0 - 1.0,
    );
    var out: VertexOutput;
    out.position = vec4<f32>(pos, 0.0, 1.0);
    out.uv = vec2<f32>(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    return out;
}
"#;

/// Vertically flipped variant used by the output blit so that readback rows
/// come back bottom-up, matching the export contract.
pub(crate) const FLIPPED_QUAD_VS: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let pos = vec2<f32>(
        f32(index & 1u) * 2.0 - 1.0,
        f32(index >> 1u) * 2.0 - 1.0,
    );
    var out: VertexOutput;
    out.position = vec4<f32>(pos, 0.0, 1.0);
    out.uv = vec2<f32>(pos.x * 0.5 + 0.5, pos.y * 0.5 + 0.5);
    return out;
}
"#;

/// Kinds of fragment-stage resources a stage binds, in binding-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    /// A filterable 2D float texture
    Texture,
    /// A filtering sampler
    Sampler,
    /// A uniform buffer
    Uniform,
    /// A read-only storage buffer
    Storage,
}

impl BindingKind {
    fn layout_entry(self, binding: u32) -> wgpu::BindGroupLayoutEntry {
        let ty = match self {
            BindingKind::Texture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            BindingKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            BindingKind::Uniform => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::Storage => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        };
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty,
            count: None,
        }
    }
}

/// One GPU rasterization pass: a compiled shader program plus the machinery
/// to draw a full-screen quad with it.
#[derive(Debug)]
pub(crate) struct ShaderStage {
    /// Human-readable name used in labels and error reports
    label: &'static str,
    vertex_source: &'static str,
    fragment_source: &'static str,
    /// Declared resources in binding-index order
    bindings: &'static [BindingKind],
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
}

impl ShaderStage {
    /// Creates a stage using the shared full-screen-quad vertex shader.
    pub fn new(label: &'static str, fragment_source: &'static str, bindings: &'static [BindingKind]) -> Self {
        Self::with_vertex(label, FULLSCREEN_QUAD_VS, fragment_source, bindings)
    }

    /// Creates a stage with an explicit vertex shader (used by the flipped
    /// output blit).
    pub fn with_vertex(
        label: &'static str,
        vertex_source: &'static str,
        fragment_source: &'static str,
        bindings: &'static [BindingKind],
    ) -> Self {
        Self {
            label,
            vertex_source,
            fragment_source,
            bindings,
            pipeline: None,
            bind_group_layout: None,
        }
    }

    /// Drops the cached program so the next execution rebuilds it.
    ///
    /// Invalidation is explicit, never implicit: callers must invalidate when
    /// anything feeding the shader source changes.
    #[allow(dead_code)]
    pub fn invalidate(&mut self) {
        self.pipeline = None;
        self.bind_group_layout = None;
    }

    /// Compiles and links the program if it is not already cached.
    pub fn prepare(&mut self, ctx: &RenderContext) -> Result<(), StageError> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        let device = ctx.device();
        debug!(stage = self.label, "compiling shader program");

        // Module creation reports malformed WGSL through the validation scope.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let source = format!("{}\n{}", self.vertex_source, self.fragment_source);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(StageError::ShaderCompile {
                label: self.label,
                log: error.to_string(),
            });
        }

        let entries: Vec<wgpu::BindGroupLayoutEntry> = self
            .bindings
            .iter()
            .enumerate()
            .map(|(index, kind)| kind.layout_entry(index as u32))
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.label),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Entry-point and interface mismatches surface here rather than at
        // module creation.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: WORKING_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(StageError::ProgramLink {
                label: self.label,
                log: error.to_string(),
            });
        }

        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        Ok(())
    }

    /// Records one full-screen draw into `target`, binding `resources` in
    /// declared order. Compiles the program first if needed.
    pub fn execute(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        resources: &[wgpu::BindingResource<'_>],
        target: &wgpu::TextureView,
    ) -> Result<(), StageError> {
        self.prepare(ctx)?;
        let pipeline = self.pipeline.as_ref().expect("prepared above");
        let layout = self.bind_group_layout.as_ref().expect("prepared above");

        assert_eq!(
            resources.len(),
            self.bindings.len(),
            "stage `{}` bound {} resources but declares {}",
            self.label,
            resources.len(),
            self.bindings.len()
        );

        let entries: Vec<wgpu::BindGroupEntry> = resources
            .iter()
            .enumerate()
            .map(|(index, resource)| wgpu::BindGroupEntry {
                binding: index as u32,
                resource: resource.clone(),
            })
            .collect();

        let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout,
            entries: &entries,
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..4, 0..1);

        Ok(())
    }
}
