//! Least-squares endpoint optimiser for `AlphaDXT5` blocks (§4.2). One
//! dimensional analogue of [`crate::optimizer::dxt1`]: samples are scalar
//! (the already-selected component), not RGB triples.

use super::refit_scalar;
use crate::block::dxt5::{get_block_values, SELECTOR_VALUES};
use crate::params::Quality;

/// Parameter pack consumed by [`optimize`].
#[derive(Debug, Clone, Copy)]
pub struct Dxt5OptParams {
    /// How many local-refinement iterations to run.
    pub quality: Quality,
}

/// Packed endpoints plus the 16 selectors chosen for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dxt5Result {
    /// Packed low (first) endpoint.
    pub low: u8,
    /// Packed high (second) endpoint.
    pub high: u8,
    /// One selector (`0..8`) per sample, row-major.
    pub selectors: [u8; 16],
}

/// `t` position of each of the 8 palette entries on the `low..high` ramp for
/// the interpolated (`low > high`) branch; entries 2..7 at `t = i/7`.
const RAMP_INTERP: [f32; SELECTOR_VALUES] =
    [0.0, 1.0, 1.0 / 7.0, 2.0 / 7.0, 3.0 / 7.0, 4.0 / 7.0, 5.0 / 7.0, 6.0 / 7.0];

/// Same, for the 6-value-plus-sentinels branch (`low <= high`); entries 6
/// and 7 are the fixed 0/255 sentinels and never participate in the ramp.
const RAMP_SENTINEL: [f32; SELECTOR_VALUES] =
    [0.0, 1.0, 1.0 / 5.0, 2.0 / 5.0, 3.0 / 5.0, 4.0 / 5.0, 0.0, 0.0];

fn assign(samples: &[u8; 16], palette: &[u8; SELECTOR_VALUES]) -> ([u8; 16], f32) {
    let mut selectors = [0u8; 16];
    let mut total = 0f32;
    for (i, &sample) in samples.iter().enumerate() {
        let mut best = 0usize;
        let mut best_error = f32::INFINITY;
        for (index, &entry) in palette.iter().enumerate() {
            let d = sample as f32 - entry as f32;
            let error = d * d;
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

fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn order_endpoints(low: &mut u8, high: &mut u8, force_low_gt_high: bool) {
    if force_low_gt_high && *low <= *high {
        std::mem::swap(low, high);
    } else if !force_low_gt_high && *low > *high {
        std::mem::swap(low, high);
    }
}

/// Runs one palette branch (interpolated 8-value if `force_low_gt_high`,
/// else the 6-value-plus-sentinels branch) through min/max initialisation
/// and `iterations` refinement passes.
fn solve_branch(
    samples: &[u8; 16],
    force_low_gt_high: bool,
    iterations: u32,
) -> (u8, u8, [u8; 16], f32) {
    let (mut min_v, mut max_v) = (255u8, 0u8);
    for &s in samples {
        min_v = min_v.min(s);
        max_v = max_v.max(s);
    }
    let (mut low, mut high) = if force_low_gt_high { (max_v, min_v) } else { (min_v, max_v) };
    order_endpoints(&mut low, &mut high, force_low_gt_high);

    let ramp: &[f32; SELECTOR_VALUES] =
        if force_low_gt_high { &RAMP_INTERP } else { &RAMP_SENTINEL };
    let sentinel_indices: &[usize] = if force_low_gt_high { &[] } else { &[6, 7] };

    let palette = get_block_values(low, high);
    let (mut selectors, mut error) = assign(samples, &palette);

    for _ in 0..iterations {
        let fit_samples: Vec<(f32, Option<f32>)> = samples
            .iter()
            .zip(selectors.iter())
            .map(|(&value, &selector)| {
                let t = if sentinel_indices.contains(&(selector as usize)) {
                    None
                } else {
                    Some(ramp[selector as usize])
                };
                (value as f32, t)
            })
            .collect();
        let (new_low_f, new_high_f) = match refit_scalar(&fit_samples) {
            Some(fit) => fit,
            None => break,
        };
        let mut new_low = quantize(new_low_f);
        let mut new_high = quantize(new_high_f);
        order_endpoints(&mut new_low, &mut new_high, force_low_gt_high);
        let new_palette = get_block_values(new_low, new_high);
        let (new_selectors, new_error) = assign(samples, &new_palette);
        if new_error < error {
            low = new_low;
            high = new_high;
            selectors = new_selectors;
            error = new_error;
        } else {
            break;
        }
    }

    (low, high, selectors, error)
}

/// Picks a packed endpoint pair and 16 selectors minimising squared error
/// for the given 16 scalar samples, per §4.2.
pub fn optimize(samples: &[u8; 16], params: &Dxt5OptParams) -> Dxt5Result {
    let iterations = params.quality.refinement_iterations();

    let (low_i, high_i, sel_i, err_i) = solve_branch(samples, true, iterations);
    let (low_s, high_s, sel_s, err_s) = solve_branch(samples, false, iterations);

    let (low, high, selectors, _) =
        if err_i <= err_s { (low_i, high_i, sel_i, err_i) } else { (low_s, high_s, sel_s, err_s) };

    Dxt5Result { low, high, selectors }
}
