//! Landmark-driven geometric face reshaping
//!
//! Remaps the sample coordinate through nine fixed thin-face curve warps
//! (jaw/cheek points pulled toward central jaw anchors) followed by two
//! radial eye enlargements around the derived eye centroids. Without a valid
//! face the pass is an identity map.

use crate::context::RenderContext;
use crate::error::StageError;
use crate::landmarks::{FacialLandmarks, DERIVED_LANDMARK_COUNT};
use crate::params::Params;
use crate::stage::{BindingKind, ShaderStage};

const FACE_WARP_FS: &str = r#"
struct WarpUniforms {
    has_face: u32,
    thin_delta: f32,
    eye_delta: f32,
    _pad: u32,
}

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> u: WarpUniforms;
@group(0) @binding(3) var<storage, read> face_points: array<vec2<f32>, 72>;

fn curve_warp(coord: vec2<f32>, origin_pos: vec2<f32>, target_pos: vec2<f32>) -> vec2<f32> {
    let direction = (target_pos - origin_pos) * u.thin_delta;
    let radius = distance(target_pos, origin_pos);
    var ratio = distance(coord, origin_pos) / radius;
    ratio = 1.0 - ratio;
    ratio = clamp(ratio, 0.0, 1.0);
    return coord - direction * ratio;
}

fn enlarge_eye(coord: vec2<f32>, origin_pos: vec2<f32>, radius: f32, delta: f32) -> vec2<f32> {
    var weight = distance(coord, origin_pos) / radius;
    weight = 1.0 - (1.0 - weight * weight) * delta;
    weight = clamp(weight, 0.0, 1.0);
    return origin_pos + (coord - origin_pos) * weight;
}

fn thin_face(coord_in: vec2<f32>) -> vec2<f32> {
    var coord = coord_in;
    coord = curve_warp(coord, face_points[2], face_points[28]);
    coord = curve_warp(coord, face_points[14], face_points[28]);
    coord = curve_warp(coord, face_points[3], face_points[29]);
    coord = curve_warp(coord, face_points[13], face_points[29]);
    coord = curve_warp(coord, face_points[5], face_points[30]);
    coord = curve_warp(coord, face_points[11], face_points[30]);
    coord = curve_warp(coord, face_points[7], face_points[33]);
    coord = curve_warp(coord, face_points[9], face_points[33]);
    coord = curve_warp(coord, face_points[8], face_points[33]);
    return coord;
}

fn big_eye(coord_in: vec2<f32>) -> vec2<f32> {
    var coord = coord_in;

    let origin1 = face_points[69];
    let target1 = face_points[68];
    let radius1 = distance(target1, origin1) * 5.0;
    coord = enlarge_eye(coord, origin1, radius1, u.eye_delta);

    let origin2 = face_points[71];
    let target2 = face_points[70];
    let radius2 = distance(target2, origin2) * 5.0;
    coord = enlarge_eye(coord, origin2, radius2, u.eye_delta);

    return coord;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var position_to_use = in.uv;
    if (u.has_face == 1u) {
        position_to_use = thin_face(position_to_use);
        position_to_use = big_eye(position_to_use);
    }
    return textureSampleLevel(source, source_sampler, position_to_use, 0.0);
}
"#;

const FACE_WARP_BINDINGS: &[BindingKind] = &[
    BindingKind::Texture,
    BindingKind::Sampler,
    BindingKind::Uniform,
    BindingKind::Storage,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct WarpUniforms {
    has_face: u32,
    thin_delta: f32,
    eye_delta: f32,
    _pad: u32,
}

/// Thin-face plus eye-enlargement coordinate remap.
#[derive(Debug)]
pub struct FaceWarpStage {
    stage: ShaderStage,
    uniforms: wgpu::Buffer,
    points: wgpu::Buffer,
}

impl FaceWarpStage {
    pub fn new(ctx: &RenderContext) -> Self {
        let uniforms = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Face Warp Uniforms"),
            size: std::mem::size_of::<WarpUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let points = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Face Warp Landmarks"),
            size: (DERIVED_LANDMARK_COUNT * std::mem::size_of::<[f32; 2]>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            stage: ShaderStage::new("Face Warp", FACE_WARP_FS, FACE_WARP_BINDINGS),
            uniforms,
            points,
        }
    }

    /// Warps `input` according to the landmark set and current strengths.
    pub fn run(
        &mut self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        landmarks: &FacialLandmarks,
        params: &Params,
    ) -> Result<wgpu::Texture, StageError> {
        ctx.queue().write_buffer(&self.points, 0, bytemuck::cast_slice(landmarks.points()));
        ctx.queue().write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&WarpUniforms {
                has_face: landmarks.is_valid() as u32,
                thin_delta: params.thin_strength(),
                eye_delta: params.eye_strength(),
                _pad: 0,
            }),
        );

        let output = ctx.create_target("Face Warp Output", input.width(), input.height());
        let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.stage.execute(
            ctx,
            encoder,
            &[
                wgpu::BindingResource::TextureView(&input_view),
                wgpu::BindingResource::Sampler(ctx.sampler()),
                self.uniforms.as_entire_binding(),
                self.points.as_entire_binding(),
            ],
            &output_view,
        )?;

        Ok(output)
    }
}
