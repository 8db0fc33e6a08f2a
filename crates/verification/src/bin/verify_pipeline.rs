//! GPU-vs-CPU pipeline verification
//!
//! Runs the full GPU pipeline and the CPU reference chain over the same image
//! with the same parameters and reports the per-channel error. GPU
//! intermediates are quantized to RGBA8 between passes, so a max error of a
//! few 8-bit steps is expected; anything larger indicates a divergence.
//!
//! # Usage
//! ```bash
//! verify_pipeline <input-image> <lut-manifest.json> [landmarks.json]
//! ```

use std::path::Path;
use std::process::ExitCode;

use beautypixel_verification::compare::{compare_images, CompareResult};
use beautypixel_verification::cpu_reference::{render_reference, CpuLuts, ImageF32};
use beautypixel_wgpu::{
    BeautyPipeline, FacialLandmarks, LutManifest, LutSet, PixelBuffer, RenderContext,
};

/// Tolerance of 4 quantization steps across the five-pass chain.
const TOLERANCE: f32 = 4.0 / 255.0;

fn decode_rgba8(path: &Path) -> Result<PixelBuffer, String> {
    let image = image::open(path).map_err(|e| e.to_string())?.to_rgba8();
    let (width, height) = image.dimensions();
    PixelBuffer::new(width, height, image.into_raw()).map_err(|e| e.to_string())
}

fn run() -> Result<CompareResult, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return Err("usage: verify_pipeline <input-image> <lut-manifest.json> [landmarks.json]".into());
    }

    let source = decode_rgba8(Path::new(&args[1]))?;
    let manifest = LutManifest::from_json(&std::fs::read_to_string(&args[2])?)?;
    let luts = LutSet::load_with(&manifest, decode_rgba8)?;

    let landmarks = match args.get(3) {
        Some(path) => {
            let raw: Vec<[f32; 2]> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            FacialLandmarks::from_points(&raw)?
        }
        None => FacialLandmarks::invalid(),
    };

    // Exercise every branch of the chain.
    let ctx = RenderContext::new()?;
    let mut pipeline = BeautyPipeline::new(ctx);
    {
        let params = pipeline.params_mut();
        params.set_temperature(6500.0);
        params.set_tint(20);
        params.set_sharpen(0.5);
        params.set_blur(60);
        params.set_whiten(40);
        params.set_thin(3.0);
        params.set_eye(2.0);
        params.set_blur_radius(8.0);
    }
    if landmarks.is_valid() {
        pipeline.set_face_points(&landmarks.points()[..68])?;
    }
    pipeline.begin_session(&source, &luts);
    pipeline.process()?;
    let gpu_output = pipeline.export_rgba8()?;

    println!("GPU pipeline done: {}x{}", gpu_output.width(), gpu_output.height());

    let reference = render_reference(
        &ImageF32::from_rgba8(&source),
        &CpuLuts {
            gray: ImageF32::from_rgba8(&luts.gray),
            origin: ImageF32::from_rgba8(&luts.origin),
            skin: ImageF32::from_rgba8(&luts.skin),
            custom: ImageF32::from_rgba8(&luts.custom),
        },
        pipeline.params(),
        &landmarks,
    );

    Ok(compare_images(&reference, &ImageF32::from_rgba8(&gpu_output), TOLERANCE))
}

fn main() -> ExitCode {
    match run() {
        Ok(CompareResult::Match) => {
            println!("PASS: GPU output matches CPU reference within tolerance");
            ExitCode::SUCCESS
        }
        Ok(CompareResult::DimensionMismatch { reference, actual }) => {
            eprintln!("FAIL: dimension mismatch, reference {reference:?} vs GPU {actual:?}");
            ExitCode::FAILURE
        }
        Ok(CompareResult::PixelMismatch { max_error, worst_pixel }) => {
            eprintln!("FAIL: max per-channel error {max_error:?} at pixel {worst_pixel:?}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
