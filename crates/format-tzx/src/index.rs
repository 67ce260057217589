//! TZX header check and block table.
//!
//! The table is built in one pass over the image before any signal is
//! produced. Loop blocks jump by table position, so it has to exist up
//! front.

use crate::block::block_len;
use crate::error::{Result, TapeError};

/// `"ZXTape!"` followed by the end-of-text marker.
pub const SIGNATURE: &[u8; 8] = b"ZXTape!\x1A";

/// Signature plus major and minor version bytes.
pub const HEADER_LEN: usize = 10;

/// Newest major version this decoder plays.
pub const SUPPORTED_MAJOR: u8 = 1;

/// TZX file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzxHeader {
    pub major: u8,
    pub minor: u8,
}

impl TzxHeader {
    /// Validate the signature and version.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(TapeError::TooSmall { len: data.len() });
        }
        if &data[..8] != SIGNATURE {
            return Err(TapeError::BadSignature);
        }

        let header = Self {
            major: data[8],
            minor: data[9],
        };
        if header.major > SUPPORTED_MAJOR {
            return Err(TapeError::UnsupportedVersion {
                major: header.major,
                minor: header.minor,
                supported: SUPPORTED_MAJOR,
            });
        }
        Ok(header)
    }
}

/// Position and type of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Offset of the ID byte from the start of the image.
    pub offset: usize,
    pub id: u8,
}

/// Every block of an image, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTable {
    header: TzxHeader,
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Check the header and walk the image block by block.
    ///
    /// Never fails on a malformed block: a length field that can't be read
    /// makes its block run to the end of the image.
    pub fn build(data: &[u8]) -> Result<Self> {
        let header = TzxHeader::parse(data)?;

        let mut entries = Vec::new();
        let mut offset = HEADER_LEN;
        while offset < data.len() {
            entries.push(BlockEntry {
                offset,
                id: data[offset],
            });
            offset = offset.saturating_add(block_len(data, offset));
        }

        if entries.is_empty() {
            return Err(TapeError::Empty);
        }
        Ok(Self { header, entries })
    }

    #[must_use]
    pub fn header(&self) -> TzxHeader {
        self.header
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<BlockEntry> {
        self.entries.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockEntry> {
        self.entries.iter()
    }
}
