//! Least-squares endpoint optimiser for `ColorDXT1` blocks (§4.2).

use super::refit_rgb;
use crate::block::dxt1::{get_block_colors, pack_color, SELECTOR_VALUES};
use crate::params::Quality;
use crate::pixel::Rgba;

/// Parameter pack consumed by [`optimize`].
#[derive(Debug, Clone, Copy)]
pub struct Dxt1OptParams {
    /// How many local-refinement iterations to run.
    pub quality: Quality,
    /// Luma-weight the squared-error metric instead of RGB-uniform.
    pub perceptual: bool,
    /// Collapse RGB to luma when deriving the initial principal axis.
    pub grayscale_sampling: bool,
    /// Allow the 3-color/punch-through palette if it reduces error.
    pub use_both_block_types: bool,
    /// Bias near-black pixels toward the punch-through transparent selector.
    pub use_transparent_indices_for_black: bool,
    /// DXT1A only: forces the 3-color branch and selector 3 below threshold.
    pub pixels_have_alpha: bool,
    /// DXT1A only: input alpha below this value is treated as transparent.
    pub dxt1a_alpha_threshold: u8,
    /// Per-channel error weights, `[r, g, b]`.
    pub color_weights: [u32; 3],
}

/// Packed endpoints plus the 16 selectors chosen for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dxt1Result {
    /// Packed low (first) endpoint.
    pub low: u16,
    /// Packed high (second) endpoint.
    pub high: u16,
    /// One selector (`0..4`) per pixel, row-major.
    pub selectors: [u8; 16],
}

const RAMP_4COLOR: [f32; 4] = [0.0, 1.0, 1.0 / 3.0, 2.0 / 3.0];
const RAMP_3COLOR: [f32; 3] = [0.0, 1.0, 0.5];

fn weights(params: &Dxt1OptParams) -> [f32; 3] {
    let base = if params.perceptual {
        [0.299, 0.587, 0.114]
    } else {
        [1.0, 1.0, 1.0]
    };
    [
        base[0] * params.color_weights[0] as f32,
        base[1] * params.color_weights[1] as f32,
        base[2] * params.color_weights[2] as f32,
    ]
}

fn sample_point(pixel: Rgba, grayscale: bool) -> [f32; 3] {
    let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
    if grayscale {
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        [luma, luma, luma]
    } else {
        [r, g, b]
    }
}

fn weighted_error(pixel: Rgba, candidate: [f32; 3], w: [f32; 3]) -> f32 {
    let dr = pixel[0] as f32 - candidate[0];
    let dg = pixel[1] as f32 - candidate[1];
    let db = pixel[2] as f32 - candidate[2];
    w[0] * dr * dr + w[1] * dg * dg + w[2] * db * db
}

/// Assigns each pixel its nearest palette entry; returns `(selectors, total error)`.
fn assign(pixels: &[Rgba; 16], palette: &[Rgba; SELECTOR_VALUES], w: [f32; 3]) -> ([u8; 16], f32) {
    let mut selectors = [0u8; 16];
    let mut total = 0f32;
    for (i, &pixel) in pixels.iter().enumerate() {
        let mut best = 0usize;
        let mut best_error = f32::INFINITY;
        for (index, &entry) in palette.iter().enumerate() {
            let candidate = [entry[0] as f32, entry[1] as f32, entry[2] as f32];
            let error = weighted_error(pixel, candidate, w);
            if error < best_error {
                best_error = error;
                best = index;
            }
        }
        selectors[i] = best as u8;
        total += best_error;
    }
    (selectors, total)
}

fn quantize(point: [f32; 3]) -> u16 {
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    pack_color(clamp(point[0]), clamp(point[1]), clamp(point[2]))
}

fn order_endpoints(low: &mut u16, high: &mut u16, force_low_gt_high: bool) {
    if force_low_gt_high && *low <= *high {
        std::mem::swap(low, high);
    } else if !force_low_gt_high && *low > *high {
        std::mem::swap(low, high);
    }
}

/// Runs one palette branch (4-color if `force_low_gt_high`, else 3-color
/// plus transparent) through PCA initialisation and `iterations` refinement
/// passes, returning the packed endpoints, selectors and total error.
fn solve_branch(
    pixels: &[Rgba; 16],
    grayscale: bool,
    w: [f32; 3],
    force_low_gt_high: bool,
    iterations: u32,
    excluded_selector: Option<u8>,
) -> (u16, u16, [u8; 16], f32) {
    let points: Vec<[f32; 3]> = pixels.iter().map(|&p| sample_point(p, grayscale)).collect();
    let n = points.len() as f32;
    let mean = points.iter().fold([0f32; 3], |acc, p| {
        [acc[0] + p[0] / n, acc[1] + p[1] / n, acc[2] + p[2] / n]
    });
    let mut cov = [[0f32; 3]; 3];
    for p in &points {
        let d = [p[0] - mean[0], p[1] - mean[1], p[2] - mean[2]];
        for (i, row) in cov.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell += d[i] * d[j];
            }
        }
    }

    // Power iteration for the dominant eigenvector of the covariance matrix.
    let mut axis = [1f32, 1.0, 1.0];
    for _ in 0..16 {
        let next = [
            cov[0][0] * axis[0] + cov[0][1] * axis[1] + cov[0][2] * axis[2],
            cov[1][0] * axis[0] + cov[1][1] * axis[1] + cov[1][2] * axis[2],
            cov[2][0] * axis[0] + cov[2][1] * axis[1] + cov[2][2] * axis[2],
        ];
        let norm = (next[0] * next[0] + next[1] * next[1] + next[2] * next[2]).sqrt();
        if norm < 1e-6 {
            break;
        }
        axis = [next[0] / norm, next[1] / norm, next[2] / norm];
    }

    let project = |p: &[f32; 3]| {
        (p[0] - mean[0]) * axis[0] + (p[1] - mean[1]) * axis[1] + (p[2] - mean[2]) * axis[2]
    };
    let (mut min_t, mut max_t) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in &points {
        let t = project(p);
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }
    let endpoint_at =
        |t: f32| [mean[0] + axis[0] * t, mean[1] + axis[1] * t, mean[2] + axis[2] * t];
    let (low_point, high_point) = if force_low_gt_high {
        (endpoint_at(max_t), endpoint_at(min_t))
    } else {
        (endpoint_at(min_t), endpoint_at(max_t))
    };

    let ramp: &[f32] = if force_low_gt_high { &RAMP_4COLOR } else { &RAMP_3COLOR };
    let mut low16 = quantize(low_point);
    let mut high16 = quantize(high_point);
    order_endpoints(&mut low16, &mut high16, force_low_gt_high);

    let palette = get_block_colors(low16, high16);
    let (mut selectors, mut error) = assign(pixels, &palette, w);

    for _ in 0..iterations {
        let samples: Vec<([f32; 3], Option<f32>)> = pixels
            .iter()
            .zip(selectors.iter())
            .map(|(&pixel, &selector)| {
                let point = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
                let t = if Some(selector) == excluded_selector {
                    None
                } else {
                    ramp.get(selector as usize).copied()
                };
                (point, t)
            })
            .collect();
        let (new_low_point, new_high_point) = match refit_rgb(&samples) {
            Some(fit) => fit,
            None => break,
        };
        let mut new_low16 = quantize(new_low_point);
        let mut new_high16 = quantize(new_high_point);
        order_endpoints(&mut new_low16, &mut new_high16, force_low_gt_high);
        let new_palette = get_block_colors(new_low16, new_high16);
        let (new_selectors, new_error) = assign(pixels, &new_palette, w);
        if new_error < error {
            low16 = new_low16;
            high16 = new_high16;
            selectors = new_selectors;
            error = new_error;
        } else {
            break;
        }
    }

    (low16, high16, selectors, error)
}

fn is_near_black(pixel: Rgba) -> bool {
    pixel[0] < 8 && pixel[1] < 8 && pixel[2] < 8
}

/// Picks packed endpoints and 16 selectors minimising squared error for the
/// given 16 pixels, per §4.2.
pub fn optimize(pixels: &[Rgba; 16], params: &Dxt1OptParams) -> Dxt1Result {
    let w = weights(params);
    let iterations = params.quality.refinement_iterations();

    let allow_4color = !params.pixels_have_alpha;
    let allow_3color = params.use_both_block_types || params.pixels_have_alpha;
    let transparent_selector = if params.pixels_have_alpha { Some(3u8) } else { None };

    let four = if allow_4color {
        Some(solve_branch(
            pixels,
            params.grayscale_sampling,
            w,
            true,
            iterations,
            None,
        ))
    } else {
        None
    };
    let three = if allow_3color {
        Some(solve_branch(
            pixels,
            params.grayscale_sampling,
            w,
            false,
            iterations,
            transparent_selector,
        ))
    } else {
        None
    };

    let (low, high, mut selectors, _) = match (four, three) {
        (Some(f), Some(t)) => {
            if f.3 <= t.3 {
                f
            } else {
                t
            }
        }
        (Some(f), None) => f,
        (None, Some(t)) => t,
        (None, None) => unreachable!("at least one palette branch is always evaluated"),
    };

    if params.pixels_have_alpha {
        for (i, pixel) in pixels.iter().enumerate() {
            if pixel[3] < params.dxt1a_alpha_threshold {
                selectors[i] = 3;
            }
        }
    } else if params.use_transparent_indices_for_black && low <= high {
        for (i, pixel) in pixels.iter().enumerate() {
            if is_near_black(*pixel) {
                selectors[i] = 3;
            }
        }
    }

    Dxt1Result { low, high, selectors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Dxt1OptParams {
        Dxt1OptParams {
            quality: Quality::Normal,
            perceptual: false,
            grayscale_sampling: false,
            use_both_block_types: true,
            use_transparent_indices_for_black: false,
            pixels_have_alpha: false,
            dxt1a_alpha_threshold: 128,
            color_weights: [1, 1, 1],
        }
    }

    #[test]
    fn solid_color_block_uses_a_single_selector_value() {
        let pixels = [[128, 64, 32, 255]; 16];
        let result = optimize(&pixels, &params());
        let first = result.selectors[0];
        assert!(result.selectors.iter().all(|&s| s == first));
    }

    #[test]
    fn alpha_threshold_forces_transparent_selector() {
        let mut pixels = [[200, 200, 200, 255]; 16];
        for p in pixels.iter_mut().take(8) {
            p[3] = 0;
        }
        let mut p = params();
        p.pixels_have_alpha = true;
        let result = optimize(&pixels, &p);
        assert!(result.low <= result.high);
        for i in 0..8 {
            assert_eq!(result.selectors[i], 3);
        }
    }

    #[test]
    fn disallowing_three_color_keeps_four_color_branch() {
        let mut pixels = [[10, 200, 30, 255]; 16];
        for p in pixels.iter_mut().take(8) {
            *p = [230, 10, 220, 255];
        }
        let mut p = params();
        p.use_both_block_types = false;
        let result = optimize(&pixels, &p);
        assert!(result.low > result.high);
    }

    #[test]
    fn transparent_index_bias_flags_near_black_pixels() {
        let mut pixels = [[200, 200, 200, 255]; 16];
        pixels[0] = [0, 0, 0, 255];
        let mut p = params();
        p.use_transparent_indices_for_black = true;
        let result = optimize(&pixels, &p);
        if result.low <= result.high {
            assert_eq!(result.selectors[0], 3);
        }
    }
}
