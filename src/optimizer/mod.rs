//! Least-squares endpoint optimisers (§4.2). Both codecs share the same
//! shape: derive a scalar parameter `t` for each palette entry, assign every
//! input sample its nearest entry, then refit the two endpoints by linear
//! regression against the `t` value of each sample's assigned entry, and
//! repeat for a quality-dependent number of iterations.

pub mod dxt1;
pub mod dxt5;

/// Solves the weighted least-squares fit `sample ≈ low*(1-t) + high*t` for
/// scalar samples, given each sample's already-assigned `t`. Samples with
/// `t = None` (the DXT5 0/255 sentinel entries, or selectors forced by the
/// 1-bit alpha threshold) don't participate in the fit.
///
/// Returns `None` if every sample was excluded or the system is singular
/// (fewer than two distinct `t` values); the caller keeps its prior guess.
pub(crate) fn refit_scalar(samples: &[(f32, Option<f32>)]) -> Option<(f32, f32)> {
    let (mut s00, mut s01, mut s11, mut b0, mut b1) = (0f64, 0f64, 0f64, 0f64, 0f64);
    for &(value, t) in samples {
        let t = match t {
            Some(t) => t as f64,
            None => continue,
        };
        let (x0, x1) = (1.0 - t, t);
        let value = value as f64;
        s00 += x0 * x0;
        s01 += x0 * x1;
        s11 += x1 * x1;
        b0 += x0 * value;
        b1 += x1 * value;
    }
    let det = s00 * s11 - s01 * s01;
    if det.abs() < 1e-9 {
        return None;
    }
    let low = (b0 * s11 - b1 * s01) / det;
    let high = (s00 * b1 - s01 * b0) / det;
    Some((low as f32, high as f32))
}

/// Vector form of [`refit_scalar`], fit independently per channel.
pub(crate) fn refit_rgb(samples: &[([f32; 3], Option<f32>)]) -> Option<([f32; 3], [f32; 3])> {
    let mut low = [0f32; 3];
    let mut high = [0f32; 3];
    for (channel, (low_c, high_c)) in low.iter_mut().zip(high.iter_mut()).enumerate() {
        let scalar_samples: Vec<(f32, Option<f32>)> =
            samples.iter().map(|&(c, t)| (c[channel], t)).collect();
        let (l, h) = refit_scalar(&scalar_samples)?;
        *low_c = l;
        *high_c = h;
    }
    Some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refit_scalar_recovers_exact_linear_ramp() {
        let samples = [(0.0, Some(0.0)), (10.0, Some(1.0)), (5.0, Some(0.5))];
        let (low, high) = refit_scalar(&samples).unwrap();
        assert!((low - 0.0).abs() < 1e-3);
        assert!((high - 10.0).abs() < 1e-3);
    }

    #[test]
    fn refit_scalar_ignores_excluded_samples() {
        let samples = [(0.0, Some(0.0)), (255.0, None), (10.0, Some(1.0))];
        let (low, high) = refit_scalar(&samples).unwrap();
        assert!((low - 0.0).abs() < 1e-3);
        assert!((high - 10.0).abs() < 1e-3);
    }

    #[test]
    fn refit_scalar_rejects_degenerate_single_t_value() {
        let samples = [(3.0, Some(0.0)), (3.0, Some(0.0))];
        assert!(refit_scalar(&samples).is_none());
    }
}
