//! BeautyPixel-wgpu: GPU face beautification pipeline
//!
//! This crate provides a wgpu-based implementation of a photographic face
//! beautification pipeline: white-balance correction, frequency-separated
//! denoise/sharpen, multi-pass 3D-LUT skin grading, and landmark-driven
//! geometric face reshaping (face slimming, eye enlargement). All processing
//! runs as a chain of full-screen rasterization passes over RGBA8 textures.
//!
//! Image decoding/encoding and landmark detection are caller responsibilities;
//! the pipeline consumes already-decoded [`PixelBuffer`]s and already-detected
//! [`FacialLandmarks`].

mod context;
mod error;
mod kernel;
mod landmarks;
mod lut;
mod params;
mod pipeline;
mod pixel;
mod stage;

pub mod stages;

pub use context::RenderContext;
pub use error::{PipelineError, StageError};
pub use kernel::TapTable;
pub use landmarks::{FacialLandmarks, DERIVED_LANDMARK_COUNT, RAW_LANDMARK_COUNT};
pub use lut::{LutManifest, LutSet};
pub use params::Params;
pub use pipeline::BeautyPipeline;
pub use pixel::PixelBuffer;
