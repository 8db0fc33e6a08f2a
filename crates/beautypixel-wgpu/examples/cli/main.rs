//! BeautyPixel CLI
//!
//! Command-line front end for the face-beautification pipeline: decodes the
//! input image, the four LUT images named by a JSON manifest, and an optional
//! 68-point landmark file, runs one frame, and saves the exported result.
//!
//! # Usage
//! ```bash
//! cli input.jpg output.png --luts assets/luts.json \
//!     --landmarks face.json --blur 60 --whiten 40 --thin 4 --eye 2
//! ```

use std::path::{Path, PathBuf};

use beautypixel_wgpu::{BeautyPipeline, LutManifest, LutSet, PixelBuffer, RenderContext};
use clap::Parser;

/// Command-line arguments for the face beautifier
#[derive(Parser)]
#[command(version, about = "CLI tool for GPU face beautification")]
struct Args {
    /// Input image file path
    input: PathBuf,

    /// Output image file path
    output: PathBuf,

    /// Path to the JSON manifest naming the gray/origin/skin/custom LUTs
    #[arg(long)]
    luts: PathBuf,

    /// Optional JSON file with 68 normalized [x, y] landmark pairs
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// White-balance temperature in Kelvin
    #[arg(long, default_value_t = 5000.0)]
    temperature: f32,

    /// Tint, -100..100
    #[arg(long, default_value_t = 0)]
    tint: i32,

    /// Sharpen amount
    #[arg(long, default_value_t = 0.0)]
    sharpen: f32,

    /// Denoise strength, 0..100
    #[arg(long, default_value_t = 0)]
    blur: i32,

    /// Whitening/grading strength, 0..100
    #[arg(long, default_value_t = 0)]
    whiten: i32,

    /// Face-slimming strength (raw, divided by 10 internally)
    #[arg(long, default_value_t = 0.0)]
    thin: f32,

    /// Eye-enlargement strength (raw, divided by 4 internally)
    #[arg(long, default_value_t = 0.0)]
    eye: f32,

    /// Box-blur radius (rounded to the nearest even integer)
    #[arg(long, default_value_t = 4.0)]
    radius: f32,

    /// High-pass difference multiplier
    #[arg(long, default_value_t = 7.07)]
    delta: f32,
}

fn decode_rgba8(path: &Path) -> Result<PixelBuffer, String> {
    let image = image::open(path).map_err(|e| e.to_string())?.to_rgba8();
    let (width, height) = image.dimensions();
    PixelBuffer::new(width, height, image.into_raw()).map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("Loading image from: {}", args.input.display());
    let source = decode_rgba8(&args.input)?;
    println!("Input image: {}x{}", source.width(), source.height());

    let manifest = LutManifest::from_json(&std::fs::read_to_string(&args.luts)?)?;
    let luts = LutSet::load_with(&manifest, decode_rgba8)?;

    println!("Initializing GPU...");
    let ctx = RenderContext::new()?;
    let mut pipeline = BeautyPipeline::new(ctx);

    {
        let params = pipeline.params_mut();
        params.set_temperature(args.temperature);
        params.set_tint(args.tint);
        params.set_sharpen(args.sharpen);
        params.set_blur(args.blur);
        params.set_whiten(args.whiten);
        params.set_thin(args.thin);
        params.set_eye(args.eye);
        params.set_blur_radius(args.radius);
        params.set_diff_delta(args.delta);
    }

    if let Some(landmark_path) = &args.landmarks {
        let raw: Vec<[f32; 2]> = serde_json::from_str(&std::fs::read_to_string(landmark_path)?)?;
        pipeline.set_face_points(&raw)?;
        println!("Loaded {} landmarks", raw.len());
    }

    pipeline.begin_session(&source, &luts);

    println!("Processing...");
    pipeline.process()?;

    let exported = pipeline.export_rgba8()?;
    let image = image::RgbaImage::from_raw(
        exported.width(),
        exported.height(),
        exported.data().to_vec(),
    )
    .ok_or("exported buffer has unexpected size")?;
    image.save(&args.output)?;
    println!("Saved result to: {}", args.output.display());

    Ok(())
}
