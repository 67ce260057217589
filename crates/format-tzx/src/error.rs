//! Fatal decode errors.
//!
//! Recoverable conditions (unsupported blocks, odd symbol tables) never end
//! up here; they go through [`crate::Diagnostics`] and decoding continues.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TapeError>;

/// Errors that abort a decode session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapeError {
    /// Image shorter than the 10-byte TZX header.
    #[error("tape image too small: {len} bytes (need at least 10)")]
    TooSmall {
        /// Length of the image in bytes.
        len: usize,
    },
    /// The first 8 bytes are not `"ZXTape!"` + 0x1A.
    #[error("invalid TZX signature (expected \"ZXTape!\" + 0x1A)")]
    BadSignature,
    /// Major version newer than this decoder understands.
    #[error("unsupported TZX version {major}.{minor:02} (newest supported major is {supported})")]
    UnsupportedVersion {
        major: u8,
        minor: u8,
        supported: u8,
    },
    /// Header present but no blocks follow it.
    #[error("TZX image contains no blocks")]
    Empty,
    /// A block's declared fields or payload run past the end of the image.
    #[error(
        "block {index} (${id:02X}) at offset {offset} is truncated: needs {needed} bytes, {available} remain"
    )]
    TruncatedBlock {
        /// Position of the block in the block table (TAP: block ordinal).
        index: usize,
        /// Byte offset of the block's ID byte (TAP: of its length prefix).
        offset: usize,
        /// Block ID. TAP blocks report as standard speed (0x10).
        id: u8,
        /// Bytes the block declares after its ID byte.
        needed: usize,
        /// Bytes actually present after its ID byte.
        available: usize,
    },
}
