//! Facial landmark input
//!
//! The detector hands the pipeline exactly 68 normalized points (x, y in
//! [0, 1] relative to image width/height). Four derived anchors are appended
//! before upload: 68 and 70 are the inner-eye centroids, 69 and 71 the
//! full-eye centroids, used by the eye-enlargement warp.

use crate::error::PipelineError;

/// Number of raw detector points the input contract requires.
pub const RAW_LANDMARK_COUNT: usize = 68;

/// Total point count after deriving the eye anchors.
pub const DERIVED_LANDMARK_COUNT: usize = 72;

/// 72 normalized facial keypoints plus a validity flag gating the warp stage.
#[derive(Debug, Clone)]
pub struct FacialLandmarks {
    points: [[f32; 2]; DERIVED_LANDMARK_COUNT],
    valid: bool,
}

fn centroid(points: &[[f32; 2]], indices: &[usize]) -> [f32; 2] {
    let mut x = 0.0;
    let mut y = 0.0;
    for &i in indices {
        x += points[i][0];
        y += points[i][1];
    }
    let n = indices.len() as f32;
    [x / n, y / n]
}

impl FacialLandmarks {
    /// Builds the landmark set from exactly 68 raw detector points, deriving
    /// indices 68-71.
    ///
    /// Any other count violates the input contract and is rejected with
    /// [`PipelineError::InvalidLandmarkCount`].
    pub fn from_points(raw: &[[f32; 2]]) -> Result<Self, PipelineError> {
        if raw.len() != RAW_LANDMARK_COUNT {
            return Err(PipelineError::InvalidLandmarkCount {
                expected: RAW_LANDMARK_COUNT,
                actual: raw.len(),
            });
        }

        let mut points = [[0.0f32; 2]; DERIVED_LANDMARK_COUNT];
        points[..RAW_LANDMARK_COUNT].copy_from_slice(raw);

        // Right eye: inner centroid and full centroid.
        points[68] = centroid(raw, &[37, 38]);
        points[69] = centroid(raw, &[37, 38, 40, 41]);
        // Left eye: inner centroid and full centroid.
        points[70] = centroid(raw, &[43, 44]);
        points[71] = centroid(raw, &[43, 44, 46, 47]);

        Ok(Self { points, valid: true })
    }

    /// A landmark set with no face: the warp stage becomes an identity map.
    pub fn invalid() -> Self {
        Self {
            points: [[0.0; 2]; DERIVED_LANDMARK_COUNT],
            valid: false,
        }
    }

    /// All 72 points (raw plus derived)
    pub fn points(&self) -> &[[f32; 2]; DERIVED_LANDMARK_COUNT] {
        &self.points
    }

    /// Whether a face is present; false disables warping entirely
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Overrides the validity flag without touching the points.
    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_points() -> Vec<[f32; 2]> {
        (0..RAW_LANDMARK_COUNT)
            .map(|i| [i as f32 / 100.0, (i as f32 + 0.5) / 100.0])
            .collect()
    }

    #[test]
    fn test_rejects_wrong_count() {
        let err = FacialLandmarks::from_points(&raw_points()[..67]).unwrap_err();
        match err {
            PipelineError::InvalidLandmarkCount { expected, actual } => {
                assert_eq!(expected, 68);
                assert_eq!(actual, 67);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_derives_eye_anchors() {
        let raw = raw_points();
        let landmarks = FacialLandmarks::from_points(&raw).unwrap();
        let points = landmarks.points();

        let expect_inner = [(raw[37][0] + raw[38][0]) / 2.0, (raw[37][1] + raw[38][1]) / 2.0];
        assert!((points[68][0] - expect_inner[0]).abs() < 1e-6);
        assert!((points[68][1] - expect_inner[1]).abs() < 1e-6);

        let expect_full_x = (raw[43][0] + raw[44][0] + raw[46][0] + raw[47][0]) / 4.0;
        assert!((points[71][0] - expect_full_x).abs() < 1e-6);

        assert!(landmarks.is_valid());
    }

    #[test]
    fn test_invalid_set_disables_warp() {
        let landmarks = FacialLandmarks::invalid();
        assert!(!landmarks.is_valid());
        assert_eq!(landmarks.points()[0], [0.0, 0.0]);
    }

    #[test]
    fn test_raw_points_preserved() {
        let raw = raw_points();
        let landmarks = FacialLandmarks::from_points(&raw).unwrap();
        for (i, point) in raw.iter().enumerate() {
            assert_eq!(&landmarks.points()[i], point);
        }
    }
}
