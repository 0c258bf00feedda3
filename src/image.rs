//! Block-image container (§3, §4.4–4.7): owns (or, via [`BlockImageView`],
//! borrows) the compressed element array and provides block/pixel-level
//! addressing and operations.
//!
//! Per the "borrowed vs owned" design note (§9), ownership is modelled as
//! two distinct container types rather than a mode flag: [`BlockImage`]
//! owns its element buffer, [`BlockImageView`] wraps a caller-owned slice
//! and never frees it. Both delegate to the same free functions operating
//! on `(&Shape, &[Element])` / `(&Shape, &mut [Element])`, so the two types
//! share every bit-exact behaviour without duplicating it.

use crate::backend;
use crate::block::{dxt1, dxt3, dxt5, Element};
use crate::error::{Error, Result};
use crate::format::{DxtFormat, ElementKind};
use crate::params::{Compressor, EncodeParams};
use crate::pixel::{PixelSurface, Rgba, Surface};
use crate::scheduler;

/// Immutable shape fields shared by [`BlockImage`] and [`BlockImageView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    pub width: u32,
    pub height: u32,
    pub blocks_x: u32,
    pub blocks_y: u32,
    pub format: DxtFormat,
}

impl Shape {
    pub(crate) fn new(format: DxtFormat, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let blocks_x = (width + 3) / 4;
        let blocks_y = (height + 3) / 4;
        Ok(Self { width, height, blocks_x, blocks_y, format })
    }

    pub(crate) fn element_count(&self) -> usize {
        self.blocks_x as usize * self.blocks_y as usize * self.format.elements_per_block()
    }

    fn block_offset(&self, block_x: u32, block_y: u32) -> usize {
        debug_assert!(block_x < self.blocks_x && block_y < self.blocks_y, "block coordinate out of range");
        (block_y as usize * self.blocks_x as usize + block_x as usize) * self.format.elements_per_block()
    }

    fn can_flip_x(&self) -> bool {
        self.width % 4 == 0 || self.width <= 4
    }

    fn can_flip_y(&self) -> bool {
        self.height % 4 == 0 || self.height <= 4
    }
}

/// The full decoded palette for one block element, per §9's supplemented
/// `get_block_colors` accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPalette {
    /// The 4-entry `ColorDXT1` palette.
    Color([Rgba; dxt1::SELECTOR_VALUES]),
    /// The 8-entry `AlphaDXT5` palette.
    Alpha([u8; dxt5::SELECTOR_VALUES]),
    /// The 16 possible `AlphaDXT3` values (every 4-bit nibble, replicated to 8 bits).
    ExplicitAlpha([u8; 16]),
}

/// The raw packed endpoint pair for one block element, per §9's supplemented
/// `get_block_endpoints` accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEndpoints {
    /// Packed RGB565 `(low, high)` for a `ColorDXT1` element.
    Color { low: u16, high: u16 },
    /// Packed `(low, high)` scalars for an `AlphaDXT5` element.
    Alpha { low: u8, high: u8 },
    /// `AlphaDXT3` has no endpoint pair: every pixel's nibble is explicit.
    ExplicitAlpha,
}

fn element_at(shape: &Shape, elements: &[Element], block_x: u32, block_y: u32, element_index: usize) -> &Element {
    let base = shape.block_offset(block_x, block_y);
    &elements[base + element_index]
}

fn block_endpoints_impl(shape: &Shape, elements: &[Element], block_x: u32, block_y: u32, element_index: usize) -> BlockEndpoints {
    let desc = shape.format.elements()[element_index];
    let element = element_at(shape, elements, block_x, block_y, element_index);
    match desc.kind {
        ElementKind::ColorDxt1 => {
            BlockEndpoints::Color { low: dxt1::low_color(element), high: dxt1::high_color(element) }
        }
        ElementKind::AlphaDxt3 => BlockEndpoints::ExplicitAlpha,
        ElementKind::AlphaDxt5 => {
            BlockEndpoints::Alpha { low: dxt5::low_alpha(element), high: dxt5::high_alpha(element) }
        }
    }
}

fn block_colors_impl(shape: &Shape, elements: &[Element], block_x: u32, block_y: u32, element_index: usize) -> BlockPalette {
    let desc = shape.format.elements()[element_index];
    let element = element_at(shape, elements, block_x, block_y, element_index);
    match desc.kind {
        ElementKind::ColorDxt1 => {
            BlockPalette::Color(dxt1::get_block_colors(dxt1::low_color(element), dxt1::high_color(element)))
        }
        ElementKind::AlphaDxt3 => {
            let mut table = [0u8; 16];
            for (i, entry) in table.iter_mut().enumerate() {
                *entry = ((i as u8) << 4) | i as u8;
            }
            BlockPalette::ExplicitAlpha(table)
        }
        ElementKind::AlphaDxt5 => {
            BlockPalette::Alpha(dxt5::get_block_values(dxt5::low_alpha(element), dxt5::high_alpha(element)))
        }
    }
}

fn selector_impl(shape: &Shape, elements: &[Element], block_x: u32, block_y: u32, element_index: usize, x: u32, y: u32) -> u8 {
    let desc = shape.format.elements()[element_index];
    let element = element_at(shape, elements, block_x, block_y, element_index);
    match desc.kind {
        ElementKind::ColorDxt1 => dxt1::get_selector(element, x, y),
        ElementKind::AlphaDxt3 => dxt3::get_alpha_nibble(element, x, y),
        ElementKind::AlphaDxt5 => dxt5::get_selector(element, x, y),
    }
}

fn get_pixel_impl(shape: &Shape, elements: &[Element], x: u32, y: u32) -> Rgba {
    let (block_x, block_y) = (x / 4, y / 4);
    let (sx, sy) = (x % 4, y % 4);
    let base = shape.block_offset(block_x, block_y);
    let mut result: Rgba = [0, 0, 0, 255];
    for (i, desc) in shape.format.elements().iter().enumerate() {
        let element = &elements[base + i];
        match desc.kind {
            ElementKind::ColorDxt1 => {
                let palette = dxt1::get_block_colors(dxt1::low_color(element), dxt1::high_color(element));
                let color = palette[dxt1::get_selector(element, sx, sy) as usize];
                result[0] = color[0];
                result[1] = color[1];
                result[2] = color[2];
                if matches!(shape.format, DxtFormat::Dxt1 | DxtFormat::Dxt1A) {
                    result[3] = color[3];
                }
            }
            ElementKind::AlphaDxt3 => {
                result[3] = dxt3::get_alpha(element, sx, sy, true);
            }
            ElementKind::AlphaDxt5 => {
                let table = dxt5::get_block_values(dxt5::low_alpha(element), dxt5::high_alpha(element));
                let value = table[dxt5::get_selector(element, sx, sy) as usize];
                match desc.component {
                    0 => result[0] = value,
                    1 => result[1] = value,
                    2 => result[2] = value,
                    3 => result[3] = value,
                    _ => unreachable!("AlphaDXT5 elements always target a concrete component"),
                }
            }
        }
    }
    result
}

fn get_pixel_alpha_impl(shape: &Shape, elements: &[Element], x: u32, y: u32, element_index: usize) -> u8 {
    let (sx, sy) = (x % 4, y % 4);
    let desc = shape.format.elements()[element_index];
    let element = element_at(shape, elements, x / 4, y / 4, element_index);
    match desc.kind {
        ElementKind::ColorDxt1 => {
            let low = dxt1::low_color(element);
            let high = dxt1::high_color(element);
            if low <= high && dxt1::get_selector(element, sx, sy) == 3 {
                0
            } else {
                255
            }
        }
        ElementKind::AlphaDxt3 => dxt3::get_alpha(element, sx, sy, true),
        ElementKind::AlphaDxt5 => {
            let table = dxt5::get_block_values(dxt5::low_alpha(element), dxt5::high_alpha(element));
            table[dxt5::get_selector(element, sx, sy) as usize]
        }
    }
}

fn has_alpha_impl(shape: &Shape, elements: &[Element]) -> bool {
    if shape.format.always_has_alpha() {
        return true;
    }
    if shape.format != DxtFormat::Dxt1 {
        // DXN_XY/DXN_YX: two color components, no alpha, ever.
        return false;
    }
    // DXT1: alpha only exists if some block is 3-color and actually uses
    // the transparent selector (§3 invariants).
    for by in 0..shape.blocks_y {
        for bx in 0..shape.blocks_x {
            let base = shape.block_offset(bx, by);
            let element = &elements[base];
            let low = dxt1::low_color(element);
            let high = dxt1::high_color(element);
            if low <= high {
                for y in 0..4 {
                    for x in 0..4 {
                        if dxt1::get_selector(element, x, y) == 3 {
                            return true;
                        }
                    }
                }
            }
        }
    }
    false
}

fn luma_weight(perceptual: bool) -> [f32; 3] {
    if perceptual { [0.299, 0.587, 0.114] } else { [1.0, 1.0, 1.0] }
}

fn set_pixel_impl(shape: &Shape, elements: &mut [Element], x: u32, y: u32, color: Rgba, perceptual: bool) {
    let (block_x, block_y) = (x / 4, y / 4);
    let (sx, sy) = (x % 4, y % 4);
    let base = shape.block_offset(block_x, block_y);
    let w = luma_weight(perceptual);
    for (i, desc) in shape.format.elements().iter().enumerate() {
        let element = &mut elements[base + i];
        match desc.kind {
            ElementKind::ColorDxt1 => {
                if shape.format == DxtFormat::Dxt1A && color[3] < 128 {
                    dxt1::set_selector(element, sx, sy, 3);
                    continue;
                }
                let palette = dxt1::get_block_colors(dxt1::low_color(element), dxt1::high_color(element));
                let mut best = 0usize;
                let mut best_error = f32::INFINITY;
                for (index, &entry) in palette.iter().enumerate() {
                    let dr = color[0] as f32 - entry[0] as f32;
                    let dg = color[1] as f32 - entry[1] as f32;
                    let db = color[2] as f32 - entry[2] as f32;
                    let error = w[0] * dr * dr + w[1] * dg * dg + w[2] * db * db;
                    if error < best_error {
                        best_error = error;
                        best = index;
                    }
                }
                dxt1::set_selector(element, sx, sy, best as u8);
            }
            ElementKind::AlphaDxt3 => {
                dxt3::set_alpha(element, sx, sy, color[3], true);
            }
            ElementKind::AlphaDxt5 => {
                let component = desc.component.max(0) as usize;
                let value = color[component.min(3)];
                let table = dxt5::get_block_values(dxt5::low_alpha(element), dxt5::high_alpha(element));
                let mut best = 0usize;
                let mut best_error = i32::MAX;
                for (index, &entry) in table.iter().enumerate() {
                    let d = value as i32 - entry as i32;
                    let error = d * d;
                    if error < best_error {
                        best_error = error;
                        best = index;
                    }
                }
                dxt5::set_selector(element, sx, sy, best as u8);
            }
        }
    }
}

fn get_block_pixels_impl(shape: &Shape, elements: &[Element], block_x: u32, block_y: u32) -> [Rgba; 16] {
    let mut out = [[0u8, 0, 0, 255]; 16];
    for sy in 0..4u32 {
        for sx in 0..4u32 {
            out[(sy * 4 + sx) as usize] =
                get_pixel_impl(shape, elements, block_x * 4 + sx, block_y * 4 + sy);
        }
    }
    out
}

fn component_validity(format: DxtFormat) -> [bool; 4] {
    let mut valid = [false; 4];
    for desc in format.elements() {
        match desc.component {
            -1 => {
                valid[0] = true;
                valid[1] = true;
                valid[2] = true;
                if format == DxtFormat::Dxt1A {
                    valid[3] = true;
                }
            }
            c @ 0..=3 => valid[c as usize] = true,
            _ => {}
        }
    }
    valid
}

fn decode_into_impl(shape: &Shape, elements: &[Element], surface: &mut dyn PixelSurface) {
    surface.resize(shape.width, shape.height);
    surface.reset_comp_flags();
    for (i, valid) in component_validity(shape.format).iter().enumerate() {
        surface.set_component_valid(i, *valid);
    }
    for y in 0..shape.height {
        for x in 0..shape.width {
            surface.set_pixel(x, y, get_pixel_impl(shape, elements, x, y));
        }
    }
}

fn flip_block_elements(shape: &Shape, elements: &mut [Element], block_x: u32, block_y: u32, w: u32, h: u32, horizontal: bool) {
    let base = shape.block_offset(block_x, block_y);
    for (i, desc) in shape.format.elements().iter().enumerate() {
        let element = &mut elements[base + i];
        match desc.kind {
            ElementKind::ColorDxt1 => {
                if horizontal {
                    dxt1::flip_x(element, w, h)
                } else {
                    dxt1::flip_y(element, w, h)
                }
            }
            ElementKind::AlphaDxt3 => {
                if horizontal {
                    dxt3::flip_x(element, w, h)
                } else {
                    dxt3::flip_y(element, w, h)
                }
            }
            ElementKind::AlphaDxt5 => {
                if horizontal {
                    dxt5::flip_x(element, w, h)
                } else {
                    dxt5::flip_y(element, w, h)
                }
            }
        }
    }
}

fn swap_blocks(shape: &Shape, elements: &mut [Element], a: (u32, u32), b: (u32, u32)) {
    let off_a = shape.block_offset(a.0, a.1);
    let off_b = shape.block_offset(b.0, b.1);
    for i in 0..shape.format.elements_per_block() {
        elements.swap(off_a + i, off_b + i);
    }
}

fn flip_x_impl(shape: &Shape, elements: &mut [Element]) -> Result<()> {
    if !shape.can_flip_x() {
        return Err(Error::FlipNotSupported(shape.width));
    }
    if shape.width % 4 == 0 {
        for by in 0..shape.blocks_y {
            for bx in 0..shape.blocks_x / 2 {
                let other = shape.blocks_x - 1 - bx;
                swap_blocks(shape, elements, (bx, by), (other, by));
            }
        }
        for by in 0..shape.blocks_y {
            for bx in 0..shape.blocks_x {
                flip_block_elements(shape, elements, bx, by, 4, 4, true);
            }
        }
    } else {
        // width <= 4: a single column of blocks; flip the partial tile in place.
        for by in 0..shape.blocks_y {
            flip_block_elements(shape, elements, 0, by, shape.width, 4, true);
        }
    }
    Ok(())
}

fn flip_y_impl(shape: &Shape, elements: &mut [Element]) -> Result<()> {
    if !shape.can_flip_y() {
        return Err(Error::FlipNotSupported(shape.height));
    }
    if shape.height % 4 == 0 {
        for bx in 0..shape.blocks_x {
            for by in 0..shape.blocks_y / 2 {
                let other = shape.blocks_y - 1 - by;
                swap_blocks(shape, elements, (bx, by), (bx, other));
            }
        }
        for by in 0..shape.blocks_y {
            for bx in 0..shape.blocks_x {
                flip_block_elements(shape, elements, bx, by, 4, 4, false);
            }
        }
    } else {
        for bx in 0..shape.blocks_x {
            flip_block_elements(shape, elements, bx, 0, 4, shape.height, false);
        }
    }
    Ok(())
}

/// Owned block-image container: the primary type this crate exposes.
///
/// Created empty, from a copied or caller-owned element buffer, or by
/// [`BlockImage::encode`]. See the crate root for a usage example.
#[derive(Debug, Clone)]
pub struct BlockImage {
    shape: Shape,
    elements: Vec<Element>,
}

impl BlockImage {
    /// Creates an all-zero block image of the given format and dimensions.
    pub fn new(format: DxtFormat, width: u32, height: u32) -> Result<Self> {
        let shape = Shape::new(format, width, height)?;
        Ok(Self { elements: vec![Element::default(); shape.element_count()], shape })
    }

    /// Builds a block image by copying a caller-supplied element buffer.
    /// `elements.len()` must equal `blocks_x * blocks_y * elements_per_block`.
    pub fn from_elements(format: DxtFormat, width: u32, height: u32, elements: &[Element]) -> Result<Self> {
        let shape = Shape::new(format, width, height)?;
        let expected = shape.element_count();
        if elements.len() != expected {
            return Err(Error::SizeMismatch { expected, actual: elements.len() });
        }
        Ok(Self { shape, elements: elements.to_vec() })
    }

    /// Encodes a pixel surface into a new block image (§4.3), using the
    /// default `T = num_helper_threads + 1` worker threads and no progress
    /// reporting.
    pub fn encode(format: DxtFormat, surface: &dyn PixelSurface, params: &EncodeParams) -> Result<Self> {
        scheduler::encode(surface, format, params, None)
    }

    /// Like [`Self::encode`], but polls `progress` (returning the current
    /// percentage) from the calling thread's worker only; a `false` return
    /// requests cooperative cancellation (§4.3 point 4, §5).
    pub fn encode_with_progress(
        format: DxtFormat,
        surface: &dyn PixelSurface,
        params: &EncodeParams,
        progress: &mut dyn FnMut(u32) -> bool,
    ) -> Result<Self> {
        scheduler::encode(surface, format, params, Some(progress))
    }

    pub(crate) fn from_parts(shape: Shape, elements: Vec<Element>) -> Self {
        Self { shape, elements }
    }

    /// Width, in pixels.
    pub fn width(&self) -> u32 {
        self.shape.width
    }

    /// Height, in pixels.
    pub fn height(&self) -> u32 {
        self.shape.height
    }

    /// Block-grid width, `ceil(width / 4)`.
    pub fn blocks_x(&self) -> u32 {
        self.shape.blocks_x
    }

    /// Block-grid height, `ceil(height / 4)`.
    pub fn blocks_y(&self) -> u32 {
        self.shape.blocks_y
    }

    /// The logical format tag.
    pub fn format(&self) -> DxtFormat {
        self.shape.format
    }

    /// Number of 64-bit elements per block (1 or 2).
    pub fn elements_per_block(&self) -> usize {
        self.shape.format.elements_per_block()
    }

    /// Number of bytes per block (8 or 16).
    pub fn bytes_per_block(&self) -> usize {
        self.shape.format.bytes_per_block()
    }

    /// Borrows the dense, row-major element array.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Decodes this block image into a fresh [`Surface`].
    pub fn decode(&self) -> Surface {
        let mut surface = Surface::new(self.shape.width, self.shape.height);
        self.decode_into(&mut surface);
        surface
    }

    /// Decodes into a caller-supplied [`PixelSurface`], resizing it first.
    pub fn decode_into(&self, surface: &mut dyn PixelSurface) {
        decode_into_impl(&self.shape, &self.elements, surface)
    }

    /// Reads the pixel at `(x, y)`, `x < width()`, `y < height()`.
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba {
        debug_assert!(x < self.shape.width && y < self.shape.height);
        get_pixel_impl(&self.shape, &self.elements, x, y)
    }

    /// Reads the alpha contribution of a single element at `(x, y)`,
    /// honouring the DXT1/DXT1A transparent-selector convention.
    pub fn get_pixel_alpha(&self, x: u32, y: u32, element_index: usize) -> u8 {
        get_pixel_alpha_impl(&self.shape, &self.elements, x, y, element_index)
    }

    /// True iff this image can encode a non-opaque pixel: unconditionally
    /// for DXT1A/DXT3/DXT5/DXT5A/DXN, and for DXT1 iff some block uses the
    /// 3-color palette with at least one transparent selector (§3).
    pub fn has_alpha(&self) -> bool {
        has_alpha_impl(&self.shape, &self.elements)
    }

    /// Re-derives the current palette and writes the nearest selector for
    /// `color` at `(x, y)` without touching stored endpoints (§4.5). Lossy
    /// and non-iterative; re-encode the block for a higher-quality result.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba, perceptual: bool) {
        debug_assert!(x < self.shape.width && y < self.shape.height);
        set_pixel_impl(&self.shape, &mut self.elements, x, y, color, perceptual)
    }

    /// Vectorised [`Self::get_pixel`] over an entire block.
    pub fn get_block_pixels(&self, block_x: u32, block_y: u32) -> [Rgba; 16] {
        get_block_pixels_impl(&self.shape, &self.elements, block_x, block_y)
    }

    /// The full per-block encode path (§4.4): overwrites every element of
    /// block `(block_x, block_y)` from a 16-pixel tile.
    pub fn set_block_pixels(
        &mut self,
        block_x: u32,
        block_y: u32,
        pixels: &[Rgba; 16],
        compressor: Compressor,
        params: &EncodeParams,
    ) {
        let base = self.shape.block_offset(block_x, block_y);
        for (i, desc) in self.shape.format.elements().iter().enumerate() {
            self.elements[base + i] =
                backend::encode_element(desc.kind, desc.component, pixels, compressor, self.shape.format, params);
        }
    }

    /// The packed endpoint pair for one block element (§9 supplemented
    /// accessor, grounded on `crnlib::dxt_image::get_block_endpoints`).
    pub fn block_endpoints(&self, block_x: u32, block_y: u32, element_index: usize) -> BlockEndpoints {
        block_endpoints_impl(&self.shape, &self.elements, block_x, block_y, element_index)
    }

    /// The full decoded palette for one block element (§9 supplemented
    /// accessor, grounded on `crnlib::dxt_image::get_block_colors`).
    pub fn block_colors(&self, block_x: u32, block_y: u32, element_index: usize) -> BlockPalette {
        block_colors_impl(&self.shape, &self.elements, block_x, block_y, element_index)
    }

    /// The raw per-pixel selector for one block element (§9 supplemented
    /// accessor, grounded on `crnlib::dxt_image::get_selector`).
    pub fn selector(&self, block_x: u32, block_y: u32, element_index: usize, x: u32, y: u32) -> u8 {
        selector_impl(&self.shape, &self.elements, block_x, block_y, element_index, x, y)
    }

    /// Zero-cost retag from DXT1 to DXT1A once the caller knows alpha
    /// matters (§9, grounded on `crnlib::dxt_image::change_dxt1_to_dxt1a`).
    /// Both formats share the same on-wire layout; only interpretation of
    /// `get_pixel`'s alpha channel changes.
    pub fn promote_to_dxt1a(&mut self) {
        debug_assert_eq!(self.shape.format, DxtFormat::Dxt1, "promote_to_dxt1a expects a DXT1 image");
        self.shape.format = DxtFormat::Dxt1A;
    }

    /// Whether [`Self::flip_x`] is well-defined for this image's width (§4.6).
    pub fn can_flip_x(&self) -> bool {
        self.shape.can_flip_x()
    }

    /// Whether [`Self::flip_y`] is well-defined for this image's height (§4.6).
    pub fn can_flip_y(&self) -> bool {
        self.shape.can_flip_y()
    }

    /// Flips the image horizontally in place, without decoding (§4.6).
    pub fn flip_x(&mut self) -> Result<()> {
        flip_x_impl(&self.shape, &mut self.elements)
    }

    /// Flips the image vertically in place, without decoding (§4.6).
    pub fn flip_y(&mut self) -> Result<()> {
        flip_y_impl(&self.shape, &mut self.elements)
    }

    /// Byte-swaps every 16-bit word of the element buffer in place (§4.7).
    /// Self-inverse: applying it twice is a no-op.
    pub fn endian_swap(&mut self) {
        for element in &mut self.elements {
            element.endian_swap();
        }
    }

    /// Borrows a mutable, non-owning [`BlockImageView`] over this image's
    /// element buffer, sharing the exact same operations.
    pub fn as_view(&mut self) -> BlockImageView<'_> {
        BlockImageView { shape: self.shape, elements: &mut self.elements }
    }
}

/// A non-owning view over a caller-owned element buffer (§9 "borrowed vs
/// owned element buffer" design note, §5 "resource ownership"). No
/// destructor frees `elements`; the borrow must outlive the view.
pub struct BlockImageView<'a> {
    shape: Shape,
    elements: &'a mut [Element],
}

impl<'a> BlockImageView<'a> {
    /// Wraps a caller-owned element slice without copying it.
    /// `elements.len()` must equal `blocks_x * blocks_y * elements_per_block`.
    pub fn new(format: DxtFormat, width: u32, height: u32, elements: &'a mut [Element]) -> Result<Self> {
        let shape = Shape::new(format, width, height)?;
        let expected = shape.element_count();
        if elements.len() != expected {
            return Err(Error::SizeMismatch { expected, actual: elements.len() });
        }
        Ok(Self { shape, elements })
    }

    /// Width, in pixels.
    pub fn width(&self) -> u32 {
        self.shape.width
    }

    /// Height, in pixels.
    pub fn height(&self) -> u32 {
        self.shape.height
    }

    /// The logical format tag.
    pub fn format(&self) -> DxtFormat {
        self.shape.format
    }

    /// Borrows the element slice.
    pub fn elements(&self) -> &[Element] {
        self.elements
    }

    /// See [`BlockImage::decode_into`].
    pub fn decode_into(&self, surface: &mut dyn PixelSurface) {
        decode_into_impl(&self.shape, self.elements, surface)
    }

    /// See [`BlockImage::get_pixel`].
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba {
        get_pixel_impl(&self.shape, self.elements, x, y)
    }

    /// See [`BlockImage::has_alpha`].
    pub fn has_alpha(&self) -> bool {
        has_alpha_impl(&self.shape, self.elements)
    }

    /// See [`BlockImage::set_pixel`].
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba, perceptual: bool) {
        set_pixel_impl(&self.shape, self.elements, x, y, color, perceptual)
    }

    /// See [`BlockImage::flip_x`].
    pub fn flip_x(&mut self) -> Result<()> {
        flip_x_impl(&self.shape, self.elements)
    }

    /// See [`BlockImage::flip_y`].
    pub fn flip_y(&mut self) -> Result<()> {
        flip_y_impl(&self.shape, self.elements)
    }

    /// See [`BlockImage::endian_swap`].
    pub fn endian_swap(&mut self) {
        for element in self.elements.iter_mut() {
            element.endian_swap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_has_expected_shape() {
        let image = BlockImage::new(DxtFormat::Dxt1, 9, 5).unwrap();
        assert_eq!(image.blocks_x(), 3);
        assert_eq!(image.blocks_y(), 2);
        assert_eq!(image.bytes_per_block(), 8);
        assert_eq!(image.elements().len(), 3 * 2 * 1);
    }

    #[test]
    fn dxt3_has_two_elements_per_block() {
        let image = BlockImage::new(DxtFormat::Dxt3, 4, 4).unwrap();
        assert_eq!(image.elements_per_block(), 2);
        assert_eq!(image.bytes_per_block(), 16);
    }

    #[test]
    fn from_elements_rejects_size_mismatch() {
        let elements = vec![Element::default(); 3];
        let err = BlockImage::from_elements(DxtFormat::Dxt1, 8, 8, &elements).unwrap_err();
        assert_eq!(err, Error::SizeMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(BlockImage::new(DxtFormat::Dxt1, 0, 4).is_err());
        assert!(BlockImage::new(DxtFormat::Dxt1, 4, 0).is_err());
    }

    #[test]
    fn solid_color_encode_decode_round_trips_quantised_color() {
        let surface = Surface::filled(4, 4, [128, 64, 32, 255]);
        let encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &EncodeParams::default()).unwrap();
        let decoded = encoded.decode();
        for y in 0..4 {
            for x in 0..4 {
                let p = decoded.pixel(x, y);
                assert!(p[0].abs_diff(128) <= 8);
                assert!(p[1].abs_diff(64) <= 4);
                assert!(p[2].abs_diff(32) <= 8);
            }
        }
    }

    #[test]
    fn dxt1a_half_transparent_block_selects_3_color_branch() {
        let mut surface = Surface::new(4, 4);
        for y in 0..4u32 {
            for x in 0..4u32 {
                let i = y * 4 + x;
                let a = if i < 8 { 0 } else { 255 };
                surface.set_pixel(x, y, [200, 180, 160, a]);
            }
        }
        let encoded = BlockImage::encode(DxtFormat::Dxt1A, &surface, &EncodeParams::default()).unwrap();
        for y in 0..4u32 {
            for x in 0..4u32 {
                let i = y * 4 + x;
                let expected = if i < 8 { 0 } else { 255 };
                assert_eq!(encoded.get_pixel_alpha(x, y, 0), expected);
            }
        }
    }

    #[test]
    fn flip_x_then_flip_x_on_multiple_of_4_width_is_identity() {
        let surface = Surface::filled(8, 4, [10, 20, 30, 255]);
        let mut encoded = BlockImage::encode(DxtFormat::Dxt5, &surface, &EncodeParams::default()).unwrap();
        let original = encoded.elements().to_vec();
        encoded.flip_x().unwrap();
        assert_ne!(encoded.elements(), original.as_slice());
        encoded.flip_x().unwrap();
        assert_eq!(encoded.elements(), original.as_slice());
    }

    #[test]
    fn flip_fails_on_non_multiple_of_4_width_over_4() {
        let surface = Surface::filled(7, 4, [1, 2, 3, 255]);
        let mut encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &EncodeParams::default()).unwrap();
        assert!(!encoded.can_flip_x());
        assert!(encoded.flip_x().is_err());
    }

    #[test]
    fn partial_flip_succeeds_for_narrow_image() {
        let surface = Surface::filled(3, 4, [1, 2, 3, 255]);
        let mut encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &EncodeParams::default()).unwrap();
        assert!(encoded.can_flip_x());
        assert!(encoded.flip_x().is_ok());
    }

    #[test]
    fn endian_swap_twice_is_identity() {
        let surface = Surface::filled(4, 4, [9, 8, 7, 255]);
        let mut encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &EncodeParams::default()).unwrap();
        let original = encoded.elements().to_vec();
        encoded.endian_swap();
        encoded.endian_swap();
        assert_eq!(encoded.elements(), original.as_slice());
    }

    #[test]
    fn encode_is_independent_of_thread_count() {
        let mut surface = Surface::new(16, 16);
        for y in 0..16u32 {
            for x in 0..16u32 {
                surface.set_pixel(x, y, [(x * 13) as u8, (y * 7) as u8, (x + y) as u8, 255]);
            }
        }
        let single = BlockImage::encode(
            DxtFormat::Dxt5,
            &surface,
            &EncodeParams::default().with_num_helper_threads(0),
        )
        .unwrap();
        let many = BlockImage::encode(
            DxtFormat::Dxt5,
            &surface,
            &EncodeParams::default().with_num_helper_threads(7),
        )
        .unwrap();
        assert_eq!(single.elements(), many.elements());
    }

    #[test]
    fn dxn_xy_leaves_blue_and_alpha_invalid() {
        let mut surface = Surface::new(4, 4);
        for y in 0..4u32 {
            for x in 0..4u32 {
                surface.set_pixel(x, y, [(x * 85) as u8, (y * 85) as u8, 0, 0]);
            }
        }
        let encoded = BlockImage::encode(DxtFormat::DxnXy, &surface, &EncodeParams::default()).unwrap();
        let mut decoded = Surface::new(1, 1);
        encoded.decode_into(&mut decoded);
        let valid = decoded.component_valid();
        assert!(valid[0] && valid[1]);
        assert!(!valid[2] && !valid[3]);
    }

    #[test]
    fn has_alpha_true_for_dxt1_with_transparent_selector() {
        let mut element = Element::default();
        dxt1::set_low_color(&mut element, dxt1::pack_color(0, 0, 0));
        dxt1::set_high_color(&mut element, dxt1::pack_color(255, 255, 255));
        dxt1::set_selector(&mut element, 0, 0, 3);
        let image = BlockImage::from_elements(DxtFormat::Dxt1, 4, 4, &[element]).unwrap();
        assert!(image.has_alpha());
    }

    #[test]
    fn has_alpha_false_for_dxt1_without_transparent_selector() {
        let mut element = Element::default();
        dxt1::set_low_color(&mut element, dxt1::pack_color(255, 255, 255));
        dxt1::set_high_color(&mut element, dxt1::pack_color(0, 0, 0));
        let image = BlockImage::from_elements(DxtFormat::Dxt1, 4, 4, &[element]).unwrap();
        assert!(!image.has_alpha());
    }

    #[test]
    fn has_alpha_false_for_dxn_two_channel_format() {
        let elements = [Element::default(), Element::default()];
        let image = BlockImage::from_elements(DxtFormat::DxnXy, 4, 4, &elements).unwrap();
        assert!(!image.has_alpha());
    }

    #[test]
    fn plain_dxt1_pixel_reports_transparent_selector_as_zero_alpha() {
        let mut element = Element::default();
        dxt1::set_low_color(&mut element, dxt1::pack_color(0, 0, 0));
        dxt1::set_high_color(&mut element, dxt1::pack_color(255, 255, 255));
        dxt1::set_selector(&mut element, 0, 0, 3);
        let image = BlockImage::from_elements(DxtFormat::Dxt1, 4, 4, &[element]).unwrap();
        assert_eq!(image.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn set_pixel_then_get_pixel_is_no_worse_than_nearest_existing_palette_entry() {
        let surface = Surface::filled(4, 4, [100, 120, 140, 255]);
        let mut encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &EncodeParams::default()).unwrap();
        let palette = match encoded.block_colors(0, 0, 0) {
            BlockPalette::Color(palette) => palette,
            other => panic!("DXT1 block must report a color palette, got {other:?}"),
        };

        let target: Rgba = [10, 200, 30, 255];
        let nearest_existing = palette
            .iter()
            .map(|entry| {
                let dr = target[0] as i32 - entry[0] as i32;
                let dg = target[1] as i32 - entry[1] as i32;
                let db = target[2] as i32 - entry[2] as i32;
                dr * dr + dg * dg + db * db
            })
            .min()
            .unwrap();

        encoded.set_pixel(0, 0, target, false);
        let got = encoded.get_pixel(0, 0);
        let dr = target[0] as i32 - got[0] as i32;
        let dg = target[1] as i32 - got[1] as i32;
        let db = target[2] as i32 - got[2] as i32;
        let got_error = dr * dr + dg * dg + db * db;

        assert!(got_error <= nearest_existing);
    }

    #[test]
    fn dxt5_alpha_gradient_nearest_palette_entry_round_trips() {
        let mut surface = Surface::new(8, 4);
        for y in 0..4u32 {
            for x in 0..8u32 {
                surface.set_pixel(x, y, [0, 0, 0, (x * 32).min(255) as u8]);
            }
        }
        let encoded = BlockImage::encode(DxtFormat::Dxt5, &surface, &EncodeParams::default()).unwrap();
        for y in 0..4u32 {
            for x in 0..8u32 {
                let expected_input = (x * 32).min(255) as u8;
                let got = encoded.get_pixel_alpha(x, y, 0);
                let bx = x / 4;
                let palette = match encoded.block_colors(bx, y / 4, 0) {
                    BlockPalette::Alpha(table) => table,
                    other => panic!("DXT5 alpha element must report an alpha palette, got {other:?}"),
                };
                let nearest = *palette
                    .iter()
                    .min_by_key(|&&entry| (entry as i32 - expected_input as i32).abs())
                    .unwrap();
                assert_eq!(got, nearest);
            }
        }
    }

    #[test]
    fn promote_to_dxt1a_changes_alpha_interpretation() {
        let mut surface = Surface::new(4, 4);
        for y in 0..4u32 {
            for x in 0..4u32 {
                let i = y * 4 + x;
                let a = if i < 8 { 0 } else { 255 };
                surface.set_pixel(x, y, [200, 180, 160, a]);
            }
        }
        let mut params = EncodeParams::default();
        params.use_both_block_types = true;
        let mut encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &params).unwrap();
        let before = encoded.get_pixel(0, 0)[3];
        encoded.promote_to_dxt1a();
        let after = encoded.get_pixel(0, 0)[3];
        assert_eq!(before, 255);
        assert!(after == 0 || after == 255);
    }
}
