//! Encoder and decoder for the DXT/BC family of fixed-rate 4x4-block GPU
//! texture compression formats (DXT1, DXT1A, DXT3, DXT5, DXT5A, DXN).
//!
//! This crate implements the block codec and block-image container: the
//! bit-layout and arithmetic of each format, a quality-first per-block
//! encoder with a least-squares endpoint optimiser, a block-parallel encode
//! scheduler, the decode path, random-access pixel get/set over compressed
//! blocks, and in-place flip.
//!
//! File containers (DDS/KTX), mipmap construction and gamma handling are
//! out of scope; callers plug this crate in at the point where they already
//! have a decoded pixel surface or a raw element buffer.
//!
//! # Examples
//! ```rust
//! use block_compression::{BlockImage, DxtFormat, EncodeParams, Surface};
//!
//! let surface = Surface::filled(4, 4, [128, 64, 32, 255]);
//! let encoded = BlockImage::encode(DxtFormat::Dxt1, &surface, &EncodeParams::default()).unwrap();
//! let pixel = encoded.get_pixel(0, 0);
//! assert_eq!(pixel[3], 255);
//! ```

#![deny(missing_docs)]

mod backend;
mod block;
mod error;
mod format;
mod image;
mod optimizer;
mod params;
mod pixel;
mod scheduler;

pub use block::Element;
pub use error::{Error, Result};
pub use format::{DxtFormat, ElementDescriptor, ElementKind};
pub use image::{BlockEndpoints, BlockImage, BlockImageView, BlockPalette};
pub use params::{Compressor, EncodeParams, Quality};
pub use pixel::{PixelSurface, Rgba, Surface};
