//! Error type for the library.

use thiserror::Error;

/// Type returned by most of the library's functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// The requested format tag is not one of the seven recognised DXT/BC formats.
    #[error("invalid DXT/BC format tag: {0}")]
    InvalidFormat(String),

    /// Width or height was zero.
    #[error("invalid dimensions: width={width}, height={height} (both must be non-zero)")]
    InvalidDimensions {
        /// Requested width, in pixels.
        width: u32,
        /// Requested height, in pixels.
        height: u32,
    },

    /// The caller-supplied element buffer does not match `blocks_x * blocks_y * elements_per_block`.
    #[error("element buffer size mismatch: expected {expected} elements, found {actual}")]
    SizeMismatch {
        /// Number of elements the format/dimensions require.
        expected: usize,
        /// Number of elements actually supplied.
        actual: usize,
    },

    /// The progress callback requested cancellation.
    #[error("encode was canceled by the progress callback")]
    Canceled,

    /// Flip was requested on a dimension that is neither a multiple of 4 nor at most 4.
    #[error("cannot flip along this axis: dimension {0} is not a multiple of 4 and exceeds 4")]
    FlipNotSupported(u32),

    /// A block's element type did not match the format descriptor (only possible for
    /// images reconstructed from untrusted/foreign element buffers).
    #[error("corrupt block at ({block_x}, {block_y}): element type does not match format")]
    CorruptBlock {
        /// Column of the corrupt block, in blocks.
        block_x: u32,
        /// Row of the corrupt block, in blocks.
        block_y: u32,
    },
}
