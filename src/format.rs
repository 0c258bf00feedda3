//! Format descriptor: maps each logical DXT/BC format to the ordered list
//! of block *elements* (up to two) that make up one compressed block, per
//! the table in §3 of the original distilled specification.

use crate::error::{Error, Result};

/// The seven logical formats this crate recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxtFormat {
    /// BC1: 64-bit RGB with no alpha.
    Dxt1,
    /// BC1 with 1-bit alpha via the punch-through palette branch.
    Dxt1A,
    /// BC2: 64-bit explicit 4-bit alpha plus a DXT1 color block.
    Dxt3,
    /// BC3: 64-bit interpolated 8-bit alpha plus a DXT1 color block.
    Dxt5,
    /// BC4: a single interpolated 8-bit scalar channel (alpha-only storage).
    Dxt5A,
    /// BC5 with the X (red) component stored first, Y (green) second.
    DxnXy,
    /// BC5 with the Y (green) component stored first, X (red) second.
    DxnYx,
}

impl DxtFormat {
    /// Parses a format from its canonical lowercase-hyphenated name, e.g. `"dxt1a"`.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dxt1" => Ok(Self::Dxt1),
            "dxt1a" => Ok(Self::Dxt1A),
            "dxt3" => Ok(Self::Dxt3),
            "dxt5" => Ok(Self::Dxt5),
            "dxt5a" => Ok(Self::Dxt5A),
            "dxn_xy" => Ok(Self::DxnXy),
            "dxn_yx" => Ok(Self::DxnYx),
            other => Err(Error::InvalidFormat(other.to_string())),
        }
    }

    /// Number of 64-bit elements one block of this format occupies (1 or 2).
    pub const fn elements_per_block(self) -> usize {
        match self {
            Self::Dxt1 | Self::Dxt1A | Self::Dxt5A => 1,
            Self::Dxt3 | Self::Dxt5 | Self::DxnXy | Self::DxnYx => 2,
        }
    }

    /// Number of bytes one block of this format occupies (8 or 16).
    pub const fn bytes_per_block(self) -> usize {
        self.elements_per_block() * 8
    }

    /// Returns true for formats that unconditionally carry alpha. DXT1 is
    /// excluded: its alpha depends on per-block palette choice, see
    /// [`crate::BlockImage::has_alpha`]. DXN_XY/DXN_YX are also excluded:
    /// they store two color components, not alpha.
    pub const fn always_has_alpha(self) -> bool {
        matches!(self, Self::Dxt1A | Self::Dxt3 | Self::Dxt5 | Self::Dxt5A)
    }

    /// The ordered element descriptors for this format: `(codec, component)`
    /// pairs, where component `-1` means "RGB (and alpha, for DXT1A)".
    pub fn elements(self) -> &'static [ElementDescriptor] {
        use ElementKind::*;
        const fn e(kind: ElementKind, component: i8) -> ElementDescriptor {
            ElementDescriptor { kind, component }
        }
        match self {
            Self::Dxt1 | Self::Dxt1A => &[e(ColorDxt1, -1)],
            Self::Dxt3 => &[e(AlphaDxt3, 3), e(ColorDxt1, -1)],
            Self::Dxt5 => &[e(AlphaDxt5, 3), e(ColorDxt1, -1)],
            Self::Dxt5A => &[e(AlphaDxt5, 3)],
            Self::DxnXy => &[e(AlphaDxt5, 0), e(AlphaDxt5, 1)],
            Self::DxnYx => &[e(AlphaDxt5, 1), e(AlphaDxt5, 0)],
        }
    }
}

/// Which of the three block codecs an element uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// `ColorDXT1`: RGB565 endpoints plus a 2-bit selector per pixel.
    ColorDxt1,
    /// `AlphaDXT3`: explicit 4-bit alpha per pixel.
    AlphaDxt3,
    /// `AlphaDXT5`: interpolated 8-bit endpoints plus a 3-bit selector per pixel.
    AlphaDxt5,
}

/// One element slot within a block: which codec it uses, and which pixel
/// component it targets (`-1` for "RGB" / "RGB + punch-through alpha").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementDescriptor {
    /// The codec used to encode/decode this element.
    pub kind: ElementKind,
    /// Destination component index, or `-1` for RGB (DXT1/DXT1A).
    pub component: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_all_formats() {
        let formats = [
            ("dxt1", DxtFormat::Dxt1),
            ("dxt1a", DxtFormat::Dxt1A),
            ("dxt3", DxtFormat::Dxt3),
            ("dxt5", DxtFormat::Dxt5),
            ("dxt5a", DxtFormat::Dxt5A),
            ("dxn_xy", DxtFormat::DxnXy),
            ("dxn_yx", DxtFormat::DxnYx),
        ];
        for (name, format) in formats {
            assert_eq!(DxtFormat::parse(name).unwrap(), format);
        }
    }

    #[test]
    fn parse_rejects_unknown_format() {
        assert!(DxtFormat::parse("bc7").is_err());
    }

    #[test]
    fn elements_per_block_matches_bytes_per_block() {
        for format in [
            DxtFormat::Dxt1,
            DxtFormat::Dxt1A,
            DxtFormat::Dxt3,
            DxtFormat::Dxt5,
            DxtFormat::Dxt5A,
            DxtFormat::DxnXy,
            DxtFormat::DxnYx,
        ] {
            assert_eq!(format.bytes_per_block(), format.elements_per_block() * 8);
            assert_eq!(format.elements().len(), format.elements_per_block());
        }
    }

    #[test]
    fn dxn_xy_and_yx_swap_component_order() {
        assert_eq!(DxtFormat::DxnXy.elements()[0].component, 0);
        assert_eq!(DxtFormat::DxnXy.elements()[1].component, 1);
        assert_eq!(DxtFormat::DxnYx.elements()[0].component, 1);
        assert_eq!(DxtFormat::DxnYx.elements()[1].component, 0);
    }
}
