//! User-facing pipeline parameters
//!
//! One mutable record of the current scalar settings. There is no versioning:
//! a running frame reads whatever value is current at the instant each stage
//! executes. Setters accept the raw UI-facing values and apply the documented
//! scaling internally.

/// Mutable per-pipeline record of current user-set scalars.
#[derive(Debug, Clone)]
pub struct Params {
    temperature_kelvin: f32,
    tint: f32,
    sharpen: f32,
    blur_alpha: f32,
    whiten: f32,
    thin_strength: f32,
    eye_strength: f32,
    blur_radius: u32,
    diff_delta: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            temperature_kelvin: 5000.0,
            tint: 0.0,
            sharpen: 0.0,
            blur_alpha: 0.0,
            whiten: 0.0,
            thin_strength: 0.0,
            eye_strength: 0.0,
            blur_radius: 4,
            diff_delta: 7.07,
        }
    }
}

/// Derives the warm-filter blend factor from a raw Kelvin-like temperature.
///
/// Piecewise: slope 0.0004 below 5000 K, 0.00006 at or above, both scaled by
/// `(K - 5000)`. The input is intentionally unclamped.
pub(crate) fn temperature_factor(kelvin: f32) -> f32 {
    if kelvin < 5000.0 {
        0.0004 * (kelvin - 5000.0)
    } else {
        0.00006 * (kelvin - 5000.0)
    }
}

impl Params {
    /// Sets the white-balance temperature as a raw Kelvin-like value (no
    /// clamping).
    pub fn set_temperature(&mut self, kelvin: f32) {
        self.temperature_kelvin = kelvin;
    }

    /// Sets the tint from a raw value in -100..100.
    pub fn set_tint(&mut self, raw: i32) {
        self.tint = raw as f32 / 100.0;
    }

    /// Sets the sharpen amount (raw float, no scaling).
    pub fn set_sharpen(&mut self, value: f32) {
        self.sharpen = value;
    }

    /// Sets the denoise blend from a raw value in 0..100.
    pub fn set_blur(&mut self, raw: i32) {
        self.blur_alpha = raw as f32 / 100.0;
    }

    /// Sets the whitening/grading blend from a raw value in 0..100.
    pub fn set_whiten(&mut self, raw: i32) {
        self.whiten = raw as f32 / 100.0;
    }

    /// Sets the face-slimming strength from a raw value (divided by 10).
    pub fn set_thin(&mut self, raw: f32) {
        self.thin_strength = raw / 10.0;
    }

    /// Sets the eye-enlargement strength from a raw value (divided by 4).
    pub fn set_eye(&mut self, raw: f32) {
        self.eye_strength = raw / 4.0;
    }

    /// Sets the box-blur radius, rounded to the nearest even integer.
    pub fn set_blur_radius(&mut self, radius: f32) {
        self.blur_radius = ((radius / 2.0).round() * 2.0).round().max(0.0) as u32;
    }

    /// Sets the high-pass difference multiplier.
    pub fn set_diff_delta(&mut self, delta: f32) {
        self.diff_delta = delta;
    }

    /// Warm-filter blend factor derived from the current temperature
    pub fn temperature_factor(&self) -> f32 {
        temperature_factor(self.temperature_kelvin)
    }

    /// Tint in [-1, 1]
    pub fn tint(&self) -> f32 {
        self.tint
    }

    /// Sharpen amount
    pub fn sharpen(&self) -> f32 {
        self.sharpen
    }

    /// Denoise blend in [0, 1]
    pub fn blur_alpha(&self) -> f32 {
        self.blur_alpha
    }

    /// Grading blend in [0, 1]
    pub fn whiten(&self) -> f32 {
        self.whiten
    }

    /// Face-slimming warp strength
    pub fn thin_strength(&self) -> f32 {
        self.thin_strength
    }

    /// Eye-enlargement warp strength
    pub fn eye_strength(&self) -> f32 {
        self.eye_strength
    }

    /// Box-blur radius (always even)
    pub fn blur_radius(&self) -> u32 {
        self.blur_radius
    }

    /// High-pass difference multiplier
    pub fn diff_delta(&self) -> f32 {
        self.diff_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_factor_piecewise() {
        assert!((temperature_factor(4000.0) - (-0.4)).abs() < 1e-6);
        assert!((temperature_factor(7000.0) - 0.12).abs() < 1e-6);
        assert_eq!(temperature_factor(5000.0), 0.0);
    }

    #[test]
    fn test_raw_value_scaling() {
        let mut params = Params::default();
        params.set_tint(-50);
        params.set_blur(25);
        params.set_whiten(100);
        params.set_thin(5.0);
        params.set_eye(2.0);
        assert!((params.tint() + 0.5).abs() < 1e-6);
        assert!((params.blur_alpha() - 0.25).abs() < 1e-6);
        assert!((params.whiten() - 1.0).abs() < 1e-6);
        assert!((params.thin_strength() - 0.5).abs() < 1e-6);
        assert!((params.eye_strength() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_blur_radius_rounds_to_nearest_even() {
        let mut params = Params::default();
        for (raw, expected) in [(0.0, 0), (1.0, 2), (2.0, 2), (3.0, 4), (4.0, 4), (5.0, 6), (16.0, 16)] {
            params.set_blur_radius(raw);
            assert_eq!(params.blur_radius(), expected, "radius {raw}");
        }
    }

    #[test]
    fn test_defaults_match_session_bootstrap() {
        let params = Params::default();
        assert_eq!(params.blur_radius(), 4);
        assert!((params.diff_delta() - 7.07).abs() < 1e-6);
        assert_eq!(params.temperature_factor(), 0.0);
    }
}
