//! Pipeline orchestration
//!
//! [`BeautyPipeline`] sequences the stages per frame:
//! source -> white balance -> {box blur (mean), high pass (variance)} ->
//! face-beauty composite -> face warp. A single non-queueing in-flight guard
//! rejects overlapping runs; nothing is cached across frames except the
//! session-scoped source texture and the four LUTs.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::context::RenderContext;
use crate::error::PipelineError;
use crate::landmarks::FacialLandmarks;
use crate::lut::LutSet;
use crate::params::Params;
use crate::pixel::PixelBuffer;
use crate::stages::{
    BoxBlurEngine, FaceBeautyCompositeStage, FaceWarpStage, HighPassStage, LutTextures, OutputStage,
    WhiteBalanceStage,
};

/// Texel spacing multiplier used by the mean blur (the high-pass blur stays
/// at 1).
const MEAN_BLUR_SPACING: f32 = 4.0;

/// Non-queueing single-flight guard.
///
/// A rejected caller must retry; pending requests are never serialized.
#[derive(Debug, Default)]
pub(crate) struct InFlightGuard {
    busy: AtomicBool,
}

impl InFlightGuard {
    /// Claims the guard, returning a release token, or `None` if a run is
    /// already in flight.
    pub fn try_begin(&self) -> Option<RunToken<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunToken { guard: self })
    }
}

/// Releases the in-flight guard when dropped.
#[derive(Debug)]
pub(crate) struct RunToken<'a> {
    guard: &'a InFlightGuard,
}

impl Drop for RunToken<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// Session-scoped GPU state: the uploaded source image and LUT textures.
#[derive(Debug)]
struct Session {
    source: wgpu::Texture,
    luts: LutTextures,
    width: u32,
    height: u32,
}

/// The face-beautification pipeline orchestrator.
pub struct BeautyPipeline {
    ctx: RenderContext,
    params: Params,
    landmarks: FacialLandmarks,
    white_balance: WhiteBalanceStage,
    blur: BoxBlurEngine,
    high_pass: HighPassStage,
    composite: FaceBeautyCompositeStage,
    face_warp: FaceWarpStage,
    output: OutputStage,
    session: Option<Session>,
    last_frame: Option<wgpu::Texture>,
    in_flight: InFlightGuard,
}

impl BeautyPipeline {
    /// Builds the pipeline and all stages on the given context.
    pub fn new(ctx: RenderContext) -> Self {
        let white_balance = WhiteBalanceStage::new(&ctx);
        let blur = BoxBlurEngine::new(&ctx, MEAN_BLUR_SPACING);
        let high_pass = HighPassStage::new(&ctx);
        let composite = FaceBeautyCompositeStage::new(&ctx);
        let face_warp = FaceWarpStage::new(&ctx);
        let output = OutputStage::new(&ctx);

        Self {
            ctx,
            params: Params::default(),
            landmarks: FacialLandmarks::invalid(),
            white_balance,
            blur,
            high_pass,
            composite,
            face_warp,
            output,
            session: None,
            last_frame: None,
            in_flight: InFlightGuard::default(),
        }
    }

    /// The render context this pipeline runs on
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Current parameter record
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Mutable access to the parameter record; a running frame reads whatever
    /// values are current when each stage executes.
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Supplies the raw 68-point landmark set.
    ///
    /// A malformed count is surfaced to the caller and leaves the pipeline
    /// with no valid face, so a subsequent run warps nothing rather than
    /// warping garbage.
    pub fn set_face_points(&mut self, raw: &[[f32; 2]]) -> Result<(), PipelineError> {
        match FacialLandmarks::from_points(raw) {
            Ok(landmarks) => {
                self.landmarks = landmarks;
                Ok(())
            }
            Err(e) => {
                self.landmarks = FacialLandmarks::invalid();
                Err(e)
            }
        }
    }

    /// Toggles face validity without replacing the points.
    pub fn set_face(&mut self, valid: bool) {
        self.landmarks.set_valid(valid);
    }

    /// Uploads the decoded source image and LUT set, starting a new session.
    ///
    /// All five assets must be decoded before this point (the decode join is
    /// the caller's only asynchronous boundary).
    pub fn begin_session(&mut self, source: &PixelBuffer, luts: &LutSet) {
        info!(
            width = source.width(),
            height = source.height(),
            "starting source-image session"
        );
        self.session = Some(Session {
            source: self.ctx.upload_rgba8("Source Image", source),
            luts: LutTextures::upload(&self.ctx, luts),
            width: source.width(),
            height: source.height(),
        });
        self.last_frame = None;
    }

    /// Working resolution of the current session, if any
    pub fn working_size(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|s| (s.width, s.height))
    }

    /// Runs one frame through the full stage chain.
    ///
    /// Synchronous: all stages complete before this returns. A second call
    /// while one is executing fails immediately with [`PipelineError::Busy`]
    /// (it does not queue or block). A failure in any stage aborts the whole
    /// frame.
    pub fn process(&mut self) -> Result<(), PipelineError> {
        let _token = self.in_flight.try_begin().ok_or(PipelineError::Busy)?;
        let session = self.session.as_ref().ok_or_else(|| PipelineError::AssetLoad {
            reason: "no source-image session; call begin_session first".to_string(),
        })?;

        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Beauty Pipeline"),
            });

        debug!("white balance");
        let balanced = self
            .white_balance
            .run(&self.ctx, &mut encoder, &session.source, &self.params)?;

        debug!(radius = self.params.blur_radius(), "box blur (mean)");
        let mean = self.blur.run(&self.ctx, &mut encoder, &balanced, &self.params)?;

        debug!("high pass (variance)");
        let variance = self
            .high_pass
            .run(&self.ctx, &mut encoder, &balanced, &self.params)?;

        debug!("face beauty composite");
        let composed = self.composite.run(
            &self.ctx,
            &mut encoder,
            &balanced,
            &mean,
            &variance,
            &session.luts,
            &self.params,
        )?;

        debug!(has_face = self.landmarks.is_valid(), "face warp");
        let warped = self
            .face_warp
            .run(&self.ctx, &mut encoder, &composed, &self.landmarks, &self.params)?;

        self.ctx.queue().submit(std::iter::once(encoder.finish()));
        self.ctx
            .device()
            .poll(wgpu::PollType::Wait)
            .map_err(|e| PipelineError::Gpu(format!("device poll failed: {e}")))?;

        self.last_frame = Some(warped);
        Ok(())
    }

    /// The final texture of the last completed frame, if any
    pub fn last_frame(&self) -> Option<&wgpu::Texture> {
        self.last_frame.as_ref()
    }

    /// Reads the last frame back as an upright RGBA8 buffer.
    ///
    /// The readback itself is bottom-up (the frame is blitted through the
    /// flipped output stage first); rows are flipped back before returning.
    pub fn export_rgba8(&mut self) -> Result<PixelBuffer, PipelineError> {
        let frame = self.last_frame.take().ok_or_else(|| PipelineError::AssetLoad {
            reason: "no processed frame to export; call process first".to_string(),
        })?;

        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Export Encoder"),
            });
        let flipped = self.output.run(&self.ctx, &mut encoder, &frame)?;

        let (width, height) = (flipped.width(), flipped.height());
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = self.ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Export Readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            flipped.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue().submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.ctx
            .device()
            .poll(wgpu::PollType::Wait)
            .map_err(|e| PipelineError::Gpu(format!("device poll failed: {e}")))?;
        pollster::block_on(receiver.receive())
            .ok_or_else(|| PipelineError::Gpu("readback mapping channel closed".to_string()))?
            .map_err(|e| PipelineError::Gpu(format!("readback mapping failed: {e:?}")))?;

        // Strip row padding and flip the bottom-up readback into an upright
        // image.
        let mapped = slice.get_mapped_range();
        let unpadded = unpadded_bytes_per_row as usize;
        let padded = padded_bytes_per_row as usize;
        let mut pixels = vec![0u8; unpadded * height as usize];
        for row in 0..height as usize {
            let src = row * padded;
            let dst = (height as usize - 1 - row) * unpadded;
            pixels[dst..dst + unpadded].copy_from_slice(&mapped[src..src + unpadded]);
        }
        drop(mapped);
        readback.unmap();

        self.last_frame = Some(frame);
        PixelBuffer::new(width, height, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejects_second_begin() {
        let guard = InFlightGuard::default();
        let token = guard.try_begin().expect("first begin succeeds");
        assert!(guard.try_begin().is_none(), "overlapping run must be rejected");
        drop(token);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let guard = InFlightGuard::default();
        drop(guard.try_begin().unwrap());
        assert!(guard.try_begin().is_some(), "guard must be reusable after release");
    }

    #[test]
    fn test_guard_first_run_unaffected_by_rejection() {
        let guard = InFlightGuard::default();
        let token = guard.try_begin().unwrap();
        // A rejected attempt must not release the original claim.
        assert!(guard.try_begin().is_none());
        assert!(guard.try_begin().is_none());
        drop(token);
        assert!(guard.try_begin().is_some());
    }
}
