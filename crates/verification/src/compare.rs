//! Image comparison utilities
//!
//! Compares a GPU pipeline output against its CPU reference rendering within
//! a per-channel tolerance. GPU intermediates are quantized to RGBA8 between
//! passes while the reference stays in f32, so exact equality is only
//! expected for degenerate inputs.

use crate::cpu_reference::ImageF32;

/// Result of comparing two floating-point images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareResult {
    /// All channels within tolerance everywhere
    Match,
    /// Images have different dimensions
    DimensionMismatch {
        /// Dimensions of the reference image
        reference: (u32, u32),
        /// Dimensions of the image under test
        actual: (u32, u32),
    },
    /// Matching dimensions but at least one channel exceeds the tolerance
    PixelMismatch {
        /// Largest absolute error per channel
        max_error: [f32; 4],
        /// Pixel coordinates of the worst offender
        worst_pixel: (u32, u32),
    },
}

/// Compares two images channel by channel.
///
/// # Arguments
/// * `reference` - CPU reference rendering
/// * `actual` - GPU output under test
/// * `tolerance` - maximum allowed absolute per-channel error
pub fn compare_images(reference: &ImageF32, actual: &ImageF32, tolerance: f32) -> CompareResult {
    if reference.dimensions() != actual.dimensions() {
        return CompareResult::DimensionMismatch {
            reference: reference.dimensions(),
            actual: actual.dimensions(),
        };
    }

    let mut max_error = [0.0f32; 4];
    let mut worst_pixel = (0, 0);
    let mut worst = 0.0f32;

    let (width, height) = reference.dimensions();
    for y in 0..height {
        for x in 0..width {
            let a = reference.get(x as i64, y as i64);
            let b = actual.get(x as i64, y as i64);
            for channel in 0..4 {
                let error = (a[channel] - b[channel]).abs();
                if error > max_error[channel] {
                    max_error[channel] = error;
                }
                if error > worst {
                    worst = error;
                    worst_pixel = (x, y);
                }
            }
        }
    }

    if worst <= tolerance {
        CompareResult::Match
    } else {
        CompareResult::PixelMismatch { max_error, worst_pixel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_images_match() {
        let image = ImageF32::from_fn(4, 4, |x, y| [x as f32, y as f32, 0.0, 1.0]);
        assert_eq!(compare_images(&image, &image.clone(), 0.0), CompareResult::Match);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = ImageF32::new(4, 4);
        let b = ImageF32::new(4, 5);
        assert!(matches!(
            compare_images(&a, &b, 0.0),
            CompareResult::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn test_reports_worst_pixel() {
        let a = ImageF32::new(3, 3);
        let mut b = ImageF32::new(3, 3);
        b.set(2, 1, [0.5, 0.0, 0.0, 0.0]);
        match compare_images(&a, &b, 0.1) {
            CompareResult::PixelMismatch { max_error, worst_pixel } => {
                assert!((max_error[0] - 0.5).abs() < 1e-6);
                assert_eq!(worst_pixel, (2, 1));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_within_tolerance_matches() {
        let a = ImageF32::new(2, 2);
        let mut b = ImageF32::new(2, 2);
        b.set(0, 0, [0.003, 0.0, 0.0, 0.0]);
        assert_eq!(compare_images(&a, &b, 0.004), CompareResult::Match);
    }
}
