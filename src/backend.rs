//! Per-element encoder dispatch (§4.4): given one 4x4 pixel tile and the
//! chosen compressor back-end, selects code by `(element.codec, compressor)`.
//!
//! `Crn` is the quality path backed by the least-squares optimisers in
//! [`crate::optimizer`]. `Crnf` and `Ryg` are the optional fast/reference
//! back-ends; per §4.4 "only their selection contract is specified, not
//! their internals", so both are simplified deterministic stand-ins: `Crnf`
//! runs the same optimiser at `Superfast` quality (its initial PCA/min-max
//! guess with zero refinement passes), and `Ryg` is an axis-aligned
//! bounding-box encoder that receives pixels in BGRA order.

use crate::block::{dxt1, dxt3, dxt5, Element};
use crate::format::{DxtFormat, ElementKind};
use crate::optimizer::dxt1::{self as opt1, Dxt1OptParams};
use crate::optimizer::dxt5::{self as opt5, Dxt5OptParams};
use crate::params::{Compressor, EncodeParams, Quality};
use crate::pixel::Rgba;

/// Encodes one block element (one 64-bit cell) from the 16-pixel tile.
pub(crate) fn encode_element(
    kind: ElementKind,
    component: i8,
    pixels: &[Rgba; 16],
    compressor: Compressor,
    format: DxtFormat,
    params: &EncodeParams,
) -> Element {
    match kind {
        ElementKind::ColorDxt1 => encode_color(pixels, compressor, format, params),
        ElementKind::AlphaDxt3 => encode_alpha_dxt3(pixels),
        ElementKind::AlphaDxt5 => encode_alpha_dxt5(pixels, component, compressor, params),
    }
}

fn channel(pixel: Rgba, component: i8) -> u8 {
    match component {
        0 => pixel[0],
        1 => pixel[1],
        2 => pixel[2],
        3 => pixel[3],
        _ => unreachable!("AlphaDXT5/AlphaDXT3 elements always target a concrete component"),
    }
}

fn pack_color_result(low: u16, high: u16, selectors: &[u8; 16]) -> Element {
    let mut element = Element::default();
    dxt1::set_low_color(&mut element, low);
    dxt1::set_high_color(&mut element, high);
    for (i, &sel) in selectors.iter().enumerate() {
        dxt1::set_selector(&mut element, (i % 4) as u32, (i / 4) as u32, sel);
    }
    element
}

fn pack_alpha_result(low: u8, high: u8, selectors: &[u8; 16]) -> Element {
    let mut element = Element::default();
    dxt5::set_low_alpha(&mut element, low);
    dxt5::set_high_alpha(&mut element, high);
    for (i, &sel) in selectors.iter().enumerate() {
        dxt5::set_selector(&mut element, (i % 4) as u32, (i / 4) as u32, sel);
    }
    element
}

fn encode_color(
    pixels: &[Rgba; 16],
    compressor: Compressor,
    format: DxtFormat,
    params: &EncodeParams,
) -> Element {
    let pixels_have_alpha = format == DxtFormat::Dxt1A;
    match compressor {
        Compressor::Crn => {
            let result = opt1::optimize(pixels, &dxt1_params(params, params.quality, pixels_have_alpha));
            pack_color_result(result.low, result.high, &result.selectors)
        }
        Compressor::Crnf => {
            let fast = dxt1_params(params, Quality::Superfast, pixels_have_alpha);
            let result = opt1::optimize(pixels, &fast);
            pack_color_result(result.low, result.high, &result.selectors)
        }
        Compressor::Ryg => {
            if pixels_have_alpha {
                // RYG can't honour the 1-bit alpha threshold; fall back to the
                // quality path for DXT1A (§4.4).
                log::debug!("Ryg compressor requested for DXT1A block, falling back to Crn");
                let result =
                    opt1::optimize(pixels, &dxt1_params(params, params.quality, true));
                pack_color_result(result.low, result.high, &result.selectors)
            } else {
                encode_color_ryg(pixels)
            }
        }
    }
}

fn dxt1_params(params: &EncodeParams, quality: Quality, pixels_have_alpha: bool) -> Dxt1OptParams {
    Dxt1OptParams {
        quality,
        perceptual: params.perceptual,
        grayscale_sampling: params.grayscale_sampling,
        use_both_block_types: params.use_both_block_types,
        use_transparent_indices_for_black: params.use_transparent_indices_for_black,
        pixels_have_alpha,
        dxt1a_alpha_threshold: params.dxt1a_alpha_threshold,
        color_weights: params.color_weights,
    }
}

/// Reference back-end: receives samples with R and B swapped (it assumes
/// BGRA input) and alpha forced opaque, per §4.4. No PCA: endpoints are the
/// axis-aligned bounding box of the (B,G,R)-reordered samples.
fn encode_color_ryg(pixels: &[Rgba; 16]) -> Element {
    let bgr: [[u8; 3]; 16] = std::array::from_fn(|i| [pixels[i][2], pixels[i][1], pixels[i][0]]);
    let mut min = [255u8; 3];
    let mut max = [0u8; 3];
    for p in &bgr {
        for c in 0..3 {
            min[c] = min[c].min(p[c]);
            max[c] = max[c].max(p[c]);
        }
    }
    // pack back from BGR to RGB for the on-wire RGB565 endpoints.
    let to_rgb565 = |bgr: [u8; 3]| dxt1::pack_color(bgr[2], bgr[1], bgr[0]);
    let mut low = to_rgb565(max);
    let mut high = to_rgb565(min);
    if low < high {
        std::mem::swap(&mut low, &mut high);
    }
    let palette = dxt1::get_block_colors(low, high);

    let mut element = Element::default();
    dxt1::set_low_color(&mut element, low);
    dxt1::set_high_color(&mut element, high);
    for (i, &pixel) in pixels.iter().enumerate() {
        let mut best = 0usize;
        let mut best_error = i32::MAX;
        for (index, &entry) in palette.iter().enumerate() {
            let dr = pixel[0] as i32 - entry[0] as i32;
            let dg = pixel[1] as i32 - entry[1] as i32;
            let db = pixel[2] as i32 - entry[2] as i32;
            let error = dr * dr + dg * dg + db * db;
            if error < best_error {
                best_error = error;
                best = index;
            }
        }
        dxt1::set_selector(&mut element, (i % 4) as u32, (i / 4) as u32, best as u8);
    }
    element
}

fn encode_alpha_dxt5(
    pixels: &[Rgba; 16],
    component: i8,
    compressor: Compressor,
    params: &EncodeParams,
) -> Element {
    let samples: [u8; 16] = std::array::from_fn(|i| channel(pixels[i], component));
    let quality = match compressor {
        Compressor::Crn => params.quality,
        // Crnf ("fast min/max") and Ryg ("RYG alpha") are both simplified as
        // the optimiser's zero-iteration min/max pass; see module docs.
        Compressor::Crnf | Compressor::Ryg => Quality::Superfast,
    };
    let result = opt5::optimize(&samples, &Dxt5OptParams { quality });
    pack_alpha_result(result.low, result.high, &result.selectors)
}

/// Straight 8-to-4-bit quantisation, identical across every back-end (§4.4):
/// `nibble = a >> 4`, no dithering.
fn encode_alpha_dxt3(pixels: &[Rgba; 16]) -> Element {
    let mut element = Element::default();
    for (i, &pixel) in pixels.iter().enumerate() {
        dxt3::set_alpha(&mut element, (i % 4) as u32, (i / 4) as u32, pixel[3], true);
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_dxt1_round_trips_through_every_backend() {
        let pixels = [[200u8, 100, 50, 255]; 16];
        for compressor in [Compressor::Crn, Compressor::Crnf, Compressor::Ryg] {
            let element = encode_color(&pixels, compressor, DxtFormat::Dxt1, &EncodeParams::default());
            let low = dxt1::low_color(&element);
            let high = dxt1::high_color(&element);
            let palette = dxt1::get_block_colors(low, high);
            let sel = dxt1::get_selector(&element, 0, 0);
            assert!(palette[sel as usize][0].abs_diff(200) <= 8);
        }
    }

    #[test]
    fn dxt1a_ryg_falls_back_and_honours_alpha_threshold() {
        let mut pixels = [[200u8, 100, 50, 255]; 16];
        for p in pixels.iter_mut().take(8) {
            p[3] = 0;
        }
        let element = encode_color(&pixels, Compressor::Ryg, DxtFormat::Dxt1A, &EncodeParams::default());
        let low = dxt1::low_color(&element);
        let high = dxt1::high_color(&element);
        assert!(low <= high);
        for i in 0..8u32 {
            assert_eq!(dxt1::get_selector(&element, i % 4, i / 4), 3);
        }
    }

    #[test]
    fn dxt3_alpha_quantises_via_right_shift_in_every_backend() {
        let mut pixels = [[0u8, 0, 0, 0]; 16];
        pixels[0][3] = 0xAB;
        let element = encode_alpha_dxt3(&pixels);
        assert_eq!(dxt3::get_alpha_nibble(&element, 0, 0), 0xA);
    }
}
