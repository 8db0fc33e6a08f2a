//! Error taxonomy for the beautification pipeline
//!
//! Stage-level failures (shader compilation, program linking) are fatal to the
//! current run. Pipeline-level failures cover session setup, landmark input
//! contract violations, and the non-queueing single-flight guard.

use thiserror::Error;

/// Errors raised while preparing or executing a single shader stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The fragment or vertex shader failed to compile; carries the compiler log.
    #[error("shader compilation failed for stage `{label}`: {log}")]
    ShaderCompile {
        /// Stage label for diagnostics
        label: &'static str,
        /// Validation log reported by the shader compiler
        log: String,
    },

    /// The compiled shaders failed to link into a render pipeline.
    #[error("program link failed for stage `{label}`: {log}")]
    ProgramLink {
        /// Stage label for diagnostics
        label: &'static str,
        /// Validation log reported at pipeline creation
        log: String,
    },
}

/// Errors surfaced by [`crate::BeautyPipeline`] and session setup.
///
/// None of these are retried automatically; all are surfaced to the caller.
/// A failure in any stage aborts the whole frame.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A run is already in flight. Non-exceptional: the guard does not queue
    /// or block, the caller must retry.
    #[error("a pipeline run is already in flight")]
    Busy,

    /// A required asset (source image or one of the LUT images) could not be
    /// loaded or was malformed. Fatal to session start.
    #[error("asset load failed: {reason}")]
    AssetLoad {
        /// Human-readable description naming the failing asset
        reason: String,
    },

    /// The landmark input contract requires exactly 68 raw points.
    #[error("expected {expected} facial landmarks, got {actual}")]
    InvalidLandmarkCount {
        /// Required raw landmark count
        expected: usize,
        /// Count actually supplied by the caller
        actual: usize,
    },

    /// A stage failed to compile or link; the frame is aborted.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Device acquisition or submission-level GPU failure.
    #[error("GPU error: {0}")]
    Gpu(String),
}
