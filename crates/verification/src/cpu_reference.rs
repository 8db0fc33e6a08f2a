//! CPU reference implementations of the pipeline stages
//!
//! Every GPU pass has a pure-Rust twin here operating on f32 RGBA buffers
//! with an explicit clamp-to-edge bilinear sampler, mirroring the shader math
//! term for term. The references back both the property tests below and the
//! `verify_pipeline` binary.

use beautypixel_wgpu::{FacialLandmarks, Params, PixelBuffer, TapTable, DERIVED_LANDMARK_COUNT};

/// Row-major f32 RGBA image, values nominally in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageF32 {
    width: u32,
    height: u32,
    data: Vec<[f32; 4]>,
}

impl ImageF32 {
    /// All-zero image
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![[0.0; 4]; (width * height) as usize],
        }
    }

    /// Builds an image from a per-pixel function.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [f32; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Converts a decoded RGBA8 buffer to f32.
    pub fn from_rgba8(pixels: &PixelBuffer) -> Self {
        let bytes = pixels.data();
        Self::from_fn(pixels.width(), pixels.height(), |x, y| {
            let i = ((y * pixels.width() + x) * 4) as usize;
            [
                bytes[i] as f32 / 255.0,
                bytes[i + 1] as f32 / 255.0,
                bytes[i + 2] as f32 / 255.0,
                bytes[i + 3] as f32 / 255.0,
            ]
        })
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clamp-to-edge texel fetch.
    pub fn get(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.width as usize + x]
    }

    /// Overwrites one texel.
    pub fn set(&mut self, x: u32, y: u32, value: [f32; 4]) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// Bilinear sample at normalized coordinates with clamp-to-edge
    /// addressing; texel centers sit at `(i + 0.5) / size`, matching GPU
    /// linear filtering.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let mut out = [0.0f32; 4];
        let p00 = self.get(x0, y0);
        let p10 = self.get(x0 + 1, y0);
        let p01 = self.get(x0, y0 + 1);
        let p11 = self.get(x0 + 1, y0 + 1);
        for c in 0..4 {
            let top = p00[c] + (p10[c] - p00[c]) * fx;
            let bottom = p01[c] + (p11[c] - p01[c]) * fx;
            out[c] = top + (bottom - top) * fy;
        }
        out
    }
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [mix(a[0], b[0], t), mix(a[1], b[1], t), mix(a[2], b[2], t)]
}

fn clamp01_3(v: [f32; 3]) -> [f32; 3] {
    [v[0].clamp(0.0, 1.0), v[1].clamp(0.0, 1.0), v[2].clamp(0.0, 1.0)]
}

/// Convolution axis for the 1-D passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Applies one 1-D tap-table convolution pass, emulating the GPU's linear
/// sampling at fractional texel offsets.
pub fn convolve_taps(src: &ImageF32, table: &TapTable, axis: Axis, spacing: f32) -> ImageF32 {
    let (width, height) = src.dimensions();
    let direction = match axis {
        Axis::Horizontal => [spacing / width as f32, 0.0],
        Axis::Vertical => [0.0, spacing / height as f32],
    };

    ImageF32::from_fn(width, height, |x, y| {
        let u = (x as f32 + 0.5) / width as f32;
        let v = (y as f32 + 0.5) / height as f32;
        let mut sum = [0.0f32; 4];
        for tap in table.taps() {
            let sample = src.sample_bilinear(u + direction[0] * tap[0], v + direction[1] * tap[0]);
            for c in 0..4 {
                sum[c] += sample[c] * tap[1];
            }
        }
        sum
    })
}

/// Two-pass (horizontal then vertical) tap-table box blur.
pub fn box_blur_taps(src: &ImageF32, radius: u32, spacing: f32) -> ImageF32 {
    let table = TapTable::new(radius);
    let horizontal = convolve_taps(src, &table, Axis::Horizontal, spacing);
    convolve_taps(&horizontal, &table, Axis::Vertical, spacing)
}

/// Naive discrete `(2R+1) x (2R+1)` box average with clamp-to-edge borders.
pub fn box_blur_naive(src: &ImageF32, radius: u32) -> ImageF32 {
    let (width, height) = src.dimensions();
    let r = radius as i64;
    let norm = 1.0 / ((2 * r + 1) * (2 * r + 1)) as f32;
    ImageF32::from_fn(width, height, |x, y| {
        let mut sum = [0.0f32; 4];
        for dy in -r..=r {
            for dx in -r..=r {
                let sample = src.get(x as i64 + dx, y as i64 + dy);
                for c in 0..4 {
                    sum[c] += sample[c];
                }
            }
        }
        sum.map(|v| v * norm)
    })
}

/// Naive 1-D box average over a scalar sequence with clamp-to-edge borders.
pub fn box_blur_naive_1d(values: &[f32], radius: usize) -> Vec<f32> {
    let len = values.len() as i64;
    let r = radius as i64;
    let norm = 1.0 / (2 * r + 1) as f32;
    (0..len)
        .map(|x| {
            let mut sum = 0.0;
            for dx in -r..=r {
                sum += values[(x + dx).clamp(0, len - 1) as usize];
            }
            sum * norm
        })
        .collect()
}

/// High-pass variance map: `min(((original - blurred) * delta)^2, 1)` per
/// channel, alpha forced to 1. The internal blur uses unit tap spacing.
pub fn high_pass(src: &ImageF32, radius: u32, delta: f32) -> ImageF32 {
    let blurred = box_blur_taps(src, radius, 1.0);
    let (width, height) = src.dimensions();
    ImageF32::from_fn(width, height, |x, y| {
        let a = src.get(x as i64, y as i64);
        let b = blurred.get(x as i64, y as i64);
        let mut out = [0.0f32; 4];
        for c in 0..3 {
            let diff = (a[c] - b[c]) * delta;
            out[c] = (diff * diff).min(1.0);
        }
        out[3] = 1.0;
        out
    })
}

// Column-major matrices exactly as the white-balance shader declares them.
const RGB_TO_YIQ: [[f32; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [0.596, -0.274, -0.322],
    [0.212, -0.523, 0.311],
];
const YIQ_TO_RGB: [[f32; 3]; 3] = [
    [1.0, 0.956, 0.621],
    [1.0, -0.272, -0.647],
    [1.0, -1.105, 1.702],
];
const WARM_FILTER: [f32; 3] = [0.93, 0.54, 0.0];

fn mat3_mul(cols: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        cols[0][0] * v[0] + cols[1][0] * v[1] + cols[2][0] * v[2],
        cols[0][1] * v[0] + cols[1][1] * v[1] + cols[2][1] * v[2],
        cols[0][2] * v[0] + cols[1][2] * v[1] + cols[2][2] * v[2],
    ]
}

fn warm_channel(value: f32, filter: f32) -> f32 {
    if value < 0.5 {
        2.0 * value * filter
    } else {
        1.0 - 2.0 * (1.0 - value) * (1.0 - filter)
    }
}

/// White-balance correction: YIQ tint clamp then warm-filter temperature
/// blend.
pub fn white_balance(src: &ImageF32, temperature_factor: f32, tint: f32) -> ImageF32 {
    let (width, height) = src.dimensions();
    ImageF32::from_fn(width, height, |x, y| {
        let color = src.get(x as i64, y as i64);
        let mut yiq = mat3_mul(&RGB_TO_YIQ, [color[0], color[1], color[2]]);
        yiq[2] = (yiq[2] + tint * 0.5226 * 0.1).clamp(-0.5226, 0.5226);
        let rgb = mat3_mul(&YIQ_TO_RGB, yiq);
        let processed = [
            warm_channel(rgb[0], WARM_FILTER[0]),
            warm_channel(rgb[1], WARM_FILTER[1]),
            warm_channel(rgb[2], WARM_FILTER[2]),
        ];
        let blended = mix3(rgb, processed, temperature_factor);
        [blended[0], blended[1], blended[2], color[3]]
    })
}

/// The four LUT images used by the composite reference.
#[derive(Debug, Clone)]
pub struct CpuLuts {
    pub gray: ImageF32,
    pub origin: ImageF32,
    pub skin: ImageF32,
    pub custom: ImageF32,
}

const LEVEL_RANGE_INV: f32 = 1.02657;
const LEVEL_BLACK: f32 = 0.0258820;
const ALPHA: f32 = 0.7;

fn cube16_lookup(lut: &ImageF32, color: [f32; 3]) -> [f32; 3] {
    let blue = color[2] * 15.0;
    let q1y = (blue.floor() * 0.25).floor();
    let q1x = blue.floor() - q1y * 4.0;
    let q2y = (blue.ceil() * 0.25).floor();
    let q2x = blue.ceil() - q2y * 4.0;
    let base = [color[0] * 0.234375 + 0.0078125, color[1] * 0.234375 + 0.0078125];
    let pos1 = [q1x * 0.25 + base[0], q1y * 0.25 + base[1]];
    let pos2 = [q2x * 0.25 + base[0], q2y * 0.25 + base[1]];
    let c1 = lut.sample_bilinear(pos1[0], pos1[1]);
    let c2 = lut.sample_bilinear(pos2[0], pos2[1]);
    mix3([c1[0], c1[1], c1[2]], [c2[0], c2[1], c2[2]], blue.fract())
}

fn cube64_lookup(lut: &ImageF32, color: [f32; 3]) -> [f32; 3] {
    let blue = color[2] * 63.0;
    let q1y = (blue.floor() / 8.0).floor();
    let q1x = blue.floor() - q1y * 8.0;
    let q2y = (blue.ceil() / 8.0).floor();
    let q2x = blue.ceil() - q2y * 8.0;
    let scale = 1.0 / 8.0 - 1.0 / 512.0;
    let pos1 = [
        q1x / 8.0 + 0.5 / 512.0 + scale * color[0],
        q1y / 8.0 + 0.5 / 512.0 + scale * color[1],
    ];
    let pos2 = [
        q2x / 8.0 + 0.5 / 512.0 + scale * color[0],
        q2y / 8.0 + 0.5 / 512.0 + scale * color[1],
    ];
    let c1 = lut.sample_bilinear(pos1[0], pos1[1]);
    let c2 = lut.sample_bilinear(pos2[0], pos2[1]);
    mix3([c1[0], c1[1], c1[2]], [c2[0], c2[1], c2[2]], blue.fract())
}

/// Denoise/sharpen plus LUT grading, mirroring the composite shader.
pub fn beauty_composite(
    original: &ImageF32,
    mean: &ImageF32,
    variance: &ImageF32,
    luts: &CpuLuts,
    sharpen: f32,
    blur_alpha: f32,
    whiten: f32,
) -> ImageF32 {
    let (width, height) = original.dimensions();
    let texel = [1.0 / width as f32, 1.0 / height as f32];

    ImageF32::from_fn(width, height, |x, y| {
        let u = (x as f32 + 0.5) / width as f32;
        let v = (y as f32 + 0.5) / height as f32;
        let i_color = original.get(x as i64, y as i64);
        let mean_color = mean.get(x as i64, y as i64);
        let var_color = variance.get(x as i64, y as i64);

        let mut color = [i_color[0], i_color[1], i_color[2]];
        if blur_alpha > 0.0 {
            let theta = 0.1;
            let p = ((i_color[0].min(mean_color[0] - 0.1) - 0.2) * 4.0).clamp(0.0, 1.0);
            let mean_var = (var_color[0] + var_color[1] + var_color[2]) / 3.0;
            let k_min = ((1.0 - mean_var / (mean_var + theta)) * p * blur_alpha).clamp(0.0, 1.0);
            let result_color = mix3(
                color,
                [mean_color[0], mean_color[1], mean_color[2]],
                k_min,
            );

            let offsets: [([f32; 2], f32); 8] = [
                ([-texel[0], 0.0], 0.125),
                ([texel[0], 0.0], 0.125),
                ([0.0, -texel[1]], 0.125),
                ([0.0, texel[1]], 0.125),
                ([texel[0], texel[1]], 0.0625),
                ([-texel[0], -texel[1]], 0.0625),
                ([-texel[0], texel[1]], 0.0625),
                ([texel[0], -texel[1]], 0.0625),
            ];
            let mut sum = [color[0] * 0.25, color[1] * 0.25, color[2] * 0.25];
            for (offset, weight) in offsets {
                let sample = original.sample_bilinear(u + offset[0], v + offset[1]);
                for c in 0..3 {
                    sum[c] += sample[c] * weight;
                }
            }

            for c in 0..3 {
                let h_pass = i_color[c] - sum[c];
                color[c] = result_color[c] + sharpen * h_pass * 2.0;
            }
        }

        if whiten > 0.0 {
            let color_epm = color;
            color = clamp01_3([
                (color_epm[0] - LEVEL_BLACK) * LEVEL_RANGE_INV,
                (color_epm[1] - LEVEL_BLACK) * LEVEL_RANGE_INV,
                (color_epm[2] - LEVEL_BLACK) * LEVEL_RANGE_INV,
            ]);
            let mut texel_color = [
                luts.gray.sample_bilinear(color[0], 0.5)[0],
                luts.gray.sample_bilinear(color[1], 0.5)[1],
                luts.gray.sample_bilinear(color[2], 0.5)[2],
            ];
            texel_color = mix3(color, texel_color, 0.5);
            texel_color = mix3(color_epm, texel_color, ALPHA);

            texel_color = clamp01_3(texel_color);
            let color_origin = cube16_lookup(&luts.origin, texel_color);
            texel_color = mix3(color_origin, color, ALPHA);

            texel_color = clamp01_3(texel_color);
            color = clamp01_3(cube16_lookup(&luts.skin, texel_color));

            let color_custom = cube64_lookup(&luts.custom, color);
            color = mix3(color, color_custom, whiten);
        }

        [color[0], color[1], color[2], 1.0]
    })
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn curve_warp(coord: [f32; 2], origin: [f32; 2], target: [f32; 2], delta: f32) -> [f32; 2] {
    let direction = [(target[0] - origin[0]) * delta, (target[1] - origin[1]) * delta];
    let radius = distance(target, origin);
    let ratio = (1.0 - distance(coord, origin) / radius).clamp(0.0, 1.0);
    [coord[0] - direction[0] * ratio, coord[1] - direction[1] * ratio]
}

fn enlarge_eye(coord: [f32; 2], origin: [f32; 2], radius: f32, delta: f32) -> [f32; 2] {
    let d = distance(coord, origin) / radius;
    let weight = (1.0 - (1.0 - d * d) * delta).clamp(0.0, 1.0);
    [
        origin[0] + (coord[0] - origin[0]) * weight,
        origin[1] + (coord[1] - origin[1]) * weight,
    ]
}

/// Thin-face source/target landmark index pairs, applied in order.
const THIN_FACE_PAIRS: [(usize, usize); 9] = [
    (2, 28),
    (14, 28),
    (3, 29),
    (13, 29),
    (5, 30),
    (11, 30),
    (7, 33),
    (9, 33),
    (8, 33),
];

/// Composes the thin-face and eye-enlargement warps on one coordinate,
/// mirroring the face-warp shader.
pub fn warp_coordinate(
    points: &[[f32; 2]; DERIVED_LANDMARK_COUNT],
    thin_delta: f32,
    eye_delta: f32,
    coord: [f32; 2],
) -> [f32; 2] {
    let mut coord = coord;
    for (source, target) in THIN_FACE_PAIRS {
        coord = curve_warp(coord, points[source], points[target], thin_delta);
    }

    let radius1 = distance(points[68], points[69]) * 5.0;
    coord = enlarge_eye(coord, points[69], radius1, eye_delta);
    let radius2 = distance(points[70], points[71]) * 5.0;
    coord = enlarge_eye(coord, points[71], radius2, eye_delta);

    coord
}

/// Full face-warp pass: identity sampling without a valid face.
pub fn face_warp(
    src: &ImageF32,
    landmarks: &FacialLandmarks,
    thin_delta: f32,
    eye_delta: f32,
) -> ImageF32 {
    let (width, height) = src.dimensions();
    ImageF32::from_fn(width, height, |x, y| {
        let mut coord = [(x as f32 + 0.5) / width as f32, (y as f32 + 0.5) / height as f32];
        if landmarks.is_valid() {
            coord = warp_coordinate(landmarks.points(), thin_delta, eye_delta, coord);
        }
        src.sample_bilinear(coord[0], coord[1])
    })
}

/// Renders the complete reference chain with the same parameter record the
/// GPU pipeline reads. The mean blur uses tap spacing 4, the high-pass blur
/// spacing 1, matching the orchestrator.
pub fn render_reference(
    source: &ImageF32,
    luts: &CpuLuts,
    params: &Params,
    landmarks: &FacialLandmarks,
) -> ImageF32 {
    let balanced = white_balance(source, params.temperature_factor(), params.tint());
    let mean = box_blur_taps(&balanced, params.blur_radius(), 4.0);
    let variance = high_pass(&balanced, params.blur_radius(), params.diff_delta());
    let composed = beauty_composite(
        &balanced,
        &mean,
        &variance,
        luts,
        params.sharpen(),
        params.blur_alpha(),
        params.whiten(),
    );
    face_warp(&composed, landmarks, params.thin_strength(), params.eye_strength())
}

/// Identity gray-ramp LUT: sampling at `(c, 0.5)` returns `c`.
pub fn identity_gray_lut() -> ImageF32 {
    ImageF32::from_fn(256, 1, |x, _| {
        let value = (x as f32 + 0.5) / 256.0;
        [value, value, value, 1.0]
    })
}

/// Identity 16-level cube LUT (4x4 grid of 64 px tiles).
pub fn identity_cube_lut16() -> ImageF32 {
    ImageF32::from_fn(256, 256, |px, py| {
        let tile = (py / 64) * 4 + px / 64;
        let lx = (px % 64) as f32;
        let ly = (py % 64) as f32;
        // Inverse of the 16-tile addressing: texel centers span r*60 + 2 px.
        let r = (lx + 0.5 - 2.0) / 60.0;
        let g = (ly + 0.5 - 2.0) / 60.0;
        [r, g, tile as f32 / 15.0, 1.0]
    })
}

/// Identity 64-level cube LUT (8x8 grid of 64 px tiles).
pub fn identity_cube_lut64() -> ImageF32 {
    ImageF32::from_fn(512, 512, |px, py| {
        let tile = (py / 64) * 8 + px / 64;
        let r = (px % 64) as f32 / 63.0;
        let g = (py % 64) as f32 / 63.0;
        [r, g, tile as f32 / 63.0, 1.0]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> ImageF32 {
        ImageF32::from_fn(width, height, |x, y| {
            [
                x as f32 / (width - 1) as f32,
                y as f32 / (height - 1) as f32,
                (x + y) as f32 / (width + height - 2) as f32,
                1.0,
            ]
        })
    }

    fn uniform(width: u32, height: u32, color: [f32; 4]) -> ImageF32 {
        ImageF32::from_fn(width, height, |_, _| color)
    }

    fn max_channel_error(a: &ImageF32, b: &ImageF32) -> f32 {
        let (width, height) = a.dimensions();
        let mut worst = 0.0f32;
        for y in 0..height {
            for x in 0..width {
                let pa = a.get(x as i64, y as i64);
                let pb = b.get(x as i64, y as i64);
                for c in 0..4 {
                    worst = worst.max((pa[c] - pb[c]).abs());
                }
            }
        }
        worst
    }

    #[test]
    fn test_uniform_image_blur_is_identity() {
        let color = [0.31, 0.62, 0.18, 1.0];
        let image = uniform(16, 12, color);
        for radius in [0u32, 2, 4, 8, 16] {
            for spacing in [1.0f32, 4.0] {
                let blurred = box_blur_taps(&image, radius, spacing);
                assert!(
                    max_channel_error(&image, &blurred) < 1e-5,
                    "radius {radius}, spacing {spacing}"
                );
            }
        }
    }

    #[test]
    fn test_two_pass_blur_matches_naive_box() {
        let image = gradient(33, 21);
        for radius in [0u32, 2, 4, 8, 16] {
            let via_taps = box_blur_taps(&image, radius, 1.0);
            let naive = box_blur_naive(&image, radius);
            assert!(
                max_channel_error(&via_taps, &naive) < 1e-4,
                "radius {radius}: tap blur diverges from naive box"
            );
        }
    }

    #[test]
    fn test_three_tap_scenario() {
        let blurred = box_blur_naive_1d(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0], 1);
        let expected = [0.0, 0.0, 10.0 / 3.0, 10.0 / 3.0, 10.0 / 3.0, 0.0, 0.0];
        for (got, want) in blurred.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_high_pass_uniform_is_zero() {
        let image = uniform(12, 9, [0.5, 0.4, 0.3, 1.0]);
        let result = high_pass(&image, 4, 7.07);
        for y in 0..9 {
            for x in 0..12 {
                let pixel = result.get(x, y);
                for c in 0..3 {
                    assert!(pixel[c].abs() < 1e-6, "non-zero variance at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_white_balance_neutral_is_near_identity() {
        // Temperature factor 0 and zero tint leave only YIQ round-off.
        let image = gradient(9, 9);
        let balanced = white_balance(&image, 0.0, 0.0);
        assert!(max_channel_error(&image, &balanced) < 5e-3);
    }

    #[test]
    fn test_white_balance_respects_alpha() {
        let image = uniform(2, 2, [0.5, 0.5, 0.5, 0.25]);
        let balanced = white_balance(&image, 0.3, 0.1);
        assert!((balanced.get(0, 0)[3] - 0.25).abs() < 1e-6);
    }

    fn synthetic_landmarks() -> FacialLandmarks {
        // Rough frontal-face layout: jaw arc for the thin-face pairs, eye
        // clusters for the derived anchors.
        let mut raw = [[0.5f32, 0.5f32]; 68];
        raw[2] = [0.20, 0.55];
        raw[14] = [0.80, 0.55];
        raw[3] = [0.22, 0.62];
        raw[13] = [0.78, 0.62];
        raw[5] = [0.27, 0.70];
        raw[11] = [0.73, 0.70];
        raw[7] = [0.38, 0.78];
        raw[9] = [0.62, 0.78];
        raw[8] = [0.50, 0.80];
        raw[28] = [0.50, 0.55];
        raw[29] = [0.50, 0.62];
        raw[30] = [0.50, 0.68];
        raw[33] = [0.50, 0.74];
        raw[37] = [0.38, 0.40];
        raw[38] = [0.42, 0.40];
        raw[40] = [0.42, 0.43];
        raw[41] = [0.38, 0.43];
        raw[43] = [0.58, 0.40];
        raw[44] = [0.62, 0.40];
        raw[46] = [0.62, 0.43];
        raw[47] = [0.58, 0.43];
        FacialLandmarks::from_points(&raw).unwrap()
    }

    #[test]
    fn test_face_warp_invalid_is_identity() {
        let image = gradient(24, 24);
        let warped = face_warp(&image, &FacialLandmarks::invalid(), 0.9, 0.9);
        assert!(max_channel_error(&image, &warped) < 1e-6);
    }

    #[test]
    fn test_warp_identity_at_zero_strengths() {
        let landmarks = synthetic_landmarks();
        for coord in [[0.3, 0.4], [0.5, 0.5], [0.41, 0.41]] {
            let warped = warp_coordinate(landmarks.points(), 0.0, 0.0, coord);
            assert!((warped[0] - coord[0]).abs() < 1e-6);
            assert!((warped[1] - coord[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_eye_enlarge_anchor_is_fixed_point() {
        let landmarks = synthetic_landmarks();
        // With thin disabled, the right-eye full centroid maps to itself for
        // any strength: the displaced distance is zero.
        let anchor = landmarks.points()[69];
        for strength in [0.0, 0.25, 1.0] {
            let warped = warp_coordinate(landmarks.points(), 0.0, strength, anchor);
            assert!((warped[0] - anchor[0]).abs() < 1e-6);
            assert!((warped[1] - anchor[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_thin_face_moves_sample_coordinate() {
        let landmarks = synthetic_landmarks();
        let points = landmarks.points();
        // A coordinate near jaw point 2 is displaced opposite to the pull
        // direction (the sample moves so the pixel appears pulled inward).
        let coord = [points[2][0] + 0.01, points[2][1]];
        let warped = warp_coordinate(points, 0.5, 0.0, coord);
        let direction_x = points[28][0] - points[2][0];
        assert!(direction_x > 0.0);
        assert!(warped[0] < coord[0], "sample coordinate should move against the pull");
    }

    #[test]
    fn test_identity_lut_chain_reduces_to_level_adjust() {
        let luts = CpuLuts {
            gray: identity_gray_lut(),
            origin: identity_cube_lut16(),
            skin: identity_cube_lut16(),
            custom: identity_cube_lut64(),
        };
        let image = gradient(17, 13);
        let result = beauty_composite(&image, &image, &image, &luts, 0.0, 0.0, 1.0);

        let (width, height) = image.dimensions();
        for y in 0..height {
            for x in 0..width {
                let input = image.get(x as i64, y as i64);
                let output = result.get(x as i64, y as i64);
                for c in 0..3 {
                    let leveled = ((input[c] - LEVEL_BLACK) * LEVEL_RANGE_INV).clamp(0.0, 1.0);
                    // The documented chain folds to 0.09*c + 0.91*leveled with
                    // identity LUTs.
                    let expected = 0.09 * input[c] + 0.91 * leveled;
                    assert!(
                        (output[c] - expected).abs() < 5e-3,
                        "({x}, {y}) channel {c}: got {}, expected {expected}",
                        output[c]
                    );
                }
            }
        }
    }

    #[test]
    fn test_identity_lut_chain_keeps_gray_gray() {
        let luts = CpuLuts {
            gray: identity_gray_lut(),
            origin: identity_cube_lut16(),
            skin: identity_cube_lut16(),
            custom: identity_cube_lut64(),
        };
        let image = ImageF32::from_fn(8, 8, |x, y| {
            let v = (x + y * 8) as f32 / 63.0;
            [v, v, v, 1.0]
        });
        let result = beauty_composite(&image, &image, &image, &luts, 0.0, 0.0, 1.0);
        for y in 0..8 {
            for x in 0..8 {
                let pixel = result.get(x, y);
                assert!((pixel[0] - pixel[1]).abs() < 3e-3, "hue shift at ({x}, {y})");
                assert!((pixel[1] - pixel[2]).abs() < 3e-3, "hue shift at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_composite_disabled_is_passthrough() {
        let luts = CpuLuts {
            gray: identity_gray_lut(),
            origin: identity_cube_lut16(),
            skin: identity_cube_lut16(),
            custom: identity_cube_lut64(),
        };
        let image = gradient(11, 7);
        let result = beauty_composite(&image, &image, &image, &luts, 1.5, 0.0, 0.0);
        assert!(max_channel_error(&image, &result) < 1e-6);
    }
}
