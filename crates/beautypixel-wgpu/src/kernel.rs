//! Box-blur tap table generation
//!
//! The separable box filter is driven by data, not by generated shader text:
//! a pure function maps a radius to a `(offset, weight)` tap list consumed by
//! one generic 1-D convolution shader. For an even radius `R` the table is a
//! center tap of weight `1/(2R+1)` plus `ceil(R/2)` symmetric pairs sampled at
//! ±(2k+1.5) texels with weight `2/(2R+1)` each; linear texture filtering
//! makes every pair read two texels at once, so the result equals the exact
//! discrete `(2R+1)`-tap box average.

/// Tap list for a 1-D box convolution at a fixed radius.
#[derive(Debug, Clone, PartialEq)]
pub struct TapTable {
    radius: u32,
    /// `(offset_texels, weight)` pairs, center tap first
    taps: Vec<[f32; 2]>,
}

impl TapTable {
    /// Builds the tap table for `radius`.
    ///
    /// Radii below 1 produce a single identity tap (pass-through). Callers
    /// are expected to round radii to the nearest even value first (see
    /// [`crate::Params::set_blur_radius`]); odd radii are representable but
    /// the interpolated pairs only reproduce the discrete box exactly for
    /// even ones.
    pub fn new(radius: u32) -> Self {
        if radius < 1 {
            return Self {
                radius,
                taps: vec![[0.0, 1.0]],
            };
        }

        let weight = 1.0 / (radius * 2 + 1) as f32;
        let pair_count = radius.div_ceil(2);

        let mut taps = Vec::with_capacity(1 + pair_count as usize * 2);
        taps.push([0.0, weight]);
        for pair in 0..pair_count {
            let offset = (pair * 2) as f32 + 1.5;
            taps.push([offset, weight * 2.0]);
            taps.push([-offset, weight * 2.0]);
        }

        Self { radius, taps }
    }

    /// The radius this table was generated for
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Tap `(offset, weight)` pairs, center first
    pub fn taps(&self) -> &[[f32; 2]] {
        &self.taps
    }

    /// Number of taps
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// True only for the degenerate empty table (never produced)
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_radius_is_identity() {
        let table = TapTable::new(0);
        assert_eq!(table.taps(), &[[0.0, 1.0]]);
    }

    #[test]
    fn test_even_radius_weights_sum_to_one() {
        for radius in [2u32, 4, 8, 16, 32] {
            let table = TapTable::new(radius);
            let sum: f32 = table.taps().iter().map(|t| t[1]).sum();
            assert!(
                (sum - 1.0).abs() < 1e-5,
                "radius {radius}: tap weights sum to {sum}"
            );
        }
    }

    #[test]
    fn test_pair_offsets_step_by_two() {
        let table = TapTable::new(8);
        // Center plus 4 pairs at 1.5, 3.5, 5.5, 7.5.
        assert_eq!(table.len(), 9);
        let positive: Vec<f32> = table.taps().iter().map(|t| t[0]).filter(|o| *o > 0.0).collect();
        assert_eq!(positive, vec![1.5, 3.5, 5.5, 7.5]);
    }

    #[test]
    fn test_pair_weight_is_twice_center() {
        let table = TapTable::new(4);
        let center = table.taps()[0];
        assert_eq!(center[0], 0.0);
        for tap in &table.taps()[1..] {
            assert!((tap[1] - center[1] * 2.0).abs() < 1e-7);
        }
    }

    #[test]
    fn test_symmetric_offsets() {
        let table = TapTable::new(16);
        let sum: f32 = table.taps().iter().map(|t| t[0] * t[1]).sum();
        assert!(sum.abs() < 1e-6, "weighted offsets should cancel, got {sum}");
    }
}
