//! TZX block layouts.
//!
//! A block is an ID byte followed by a type-specific body. [`block_len`] is
//! the cheap size calculation the indexer uses to hop from block to block;
//! [`Block::decode`] reads the fields the interpreter needs, bounds-checking
//! every one. Payloads are never copied: a decoded block holds byte ranges
//! into the tape image.
//!
//! Reference: <https://worldofspectrum.net/TZXformat.html>

use std::ops::Range;

use crate::error::{Result, TapeError};
use crate::index::BlockEntry;
use crate::timing::PulseTiming;

/// Block IDs.
pub mod id {
    pub const STANDARD_SPEED: u8 = 0x10;
    pub const TURBO_SPEED: u8 = 0x11;
    pub const PURE_TONE: u8 = 0x12;
    pub const PULSE_SEQUENCE: u8 = 0x13;
    pub const PURE_DATA: u8 = 0x14;
    pub const DIRECT_RECORDING: u8 = 0x15;
    pub const C64_ROM: u8 = 0x16;
    pub const C64_TURBO: u8 = 0x17;
    pub const CSW_RECORDING: u8 = 0x18;
    pub const GENERALIZED: u8 = 0x19;
    pub const PAUSE: u8 = 0x20;
    pub const GROUP_START: u8 = 0x21;
    pub const GROUP_END: u8 = 0x22;
    pub const JUMP: u8 = 0x23;
    pub const LOOP_START: u8 = 0x24;
    pub const LOOP_END: u8 = 0x25;
    pub const CALL_SEQUENCE: u8 = 0x26;
    pub const RETURN: u8 = 0x27;
    pub const SELECT: u8 = 0x28;
    pub const STOP_IF_48K: u8 = 0x2A;
    pub const SET_SIGNAL_LEVEL: u8 = 0x2B;
    pub const TEXT_DESCRIPTION: u8 = 0x30;
    pub const MESSAGE: u8 = 0x31;
    pub const ARCHIVE_INFO: u8 = 0x32;
    pub const HARDWARE_TYPE: u8 = 0x33;
    pub const EMULATION_INFO: u8 = 0x34;
    pub const CUSTOM_INFO: u8 = 0x35;
    pub const SNAPSHOT: u8 = 0x40;
    pub const GLUE: u8 = 0x5A;
}

/// Display name of a block ID.
#[must_use]
pub fn block_name(block_id: u8) -> &'static str {
    match block_id {
        id::STANDARD_SPEED => "Standard speed data",
        id::TURBO_SPEED => "Turbo speed data",
        id::PURE_TONE => "Pure tone",
        id::PULSE_SEQUENCE => "Pulse sequence",
        id::PURE_DATA => "Pure data",
        id::DIRECT_RECORDING => "Direct recording",
        id::C64_ROM => "C64 ROM type data",
        id::C64_TURBO => "C64 turbo tape data",
        id::CSW_RECORDING => "CSW recording",
        id::GENERALIZED => "Generalized data",
        id::PAUSE => "Pause / stop the tape",
        id::GROUP_START => "Group start",
        id::GROUP_END => "Group end",
        id::JUMP => "Jump to block",
        id::LOOP_START => "Loop start",
        id::LOOP_END => "Loop end",
        id::CALL_SEQUENCE => "Call sequence",
        id::RETURN => "Return from sequence",
        id::SELECT => "Select block",
        id::STOP_IF_48K => "Stop the tape if in 48K mode",
        id::SET_SIGNAL_LEVEL => "Set signal level",
        id::TEXT_DESCRIPTION => "Text description",
        id::MESSAGE => "Message",
        id::ARCHIVE_INFO => "Archive info",
        id::HARDWARE_TYPE => "Hardware type",
        id::EMULATION_INFO => "Emulation info",
        id::CUSTOM_INFO => "Custom info",
        id::SNAPSHOT => "Snapshot",
        id::GLUE => "Glue",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Block sizes (indexer)
// ---------------------------------------------------------------------------

/// Little-endian field of `width` bytes at `pos`, if present.
fn le_field(body: &[u8], pos: usize, width: usize) -> Option<usize> {
    let bytes = body.get(pos..pos + width)?;
    Some(
        bytes
            .iter()
            .rev()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b)),
    )
}

/// Total size in bytes, ID included, of the block whose ID is at `offset`.
///
/// Only length fields are read. If one of them lies past the end of the
/// image the block is taken to run to the end; the interpreter reports the
/// truncation when it gets there.
pub(crate) fn block_len(data: &[u8], offset: usize) -> usize {
    let body = &data[offset + 1..];
    let field = |pos, width| le_field(body, pos, width);

    let body_len = match data[offset] {
        id::STANDARD_SPEED => field(2, 2).map(|n| 4 + n),
        id::TURBO_SPEED => field(15, 3).map(|n| 18 + n),
        id::PURE_TONE => Some(4),
        id::PULSE_SEQUENCE => field(0, 1).map(|n| 1 + 2 * n),
        id::PURE_DATA => field(7, 3).map(|n| 10 + n),
        id::DIRECT_RECORDING => field(5, 3).map(|n| 8 + n),
        id::PAUSE | id::JUMP | id::LOOP_START => Some(2),
        id::GROUP_START | id::TEXT_DESCRIPTION => field(0, 1).map(|n| 1 + n),
        id::GROUP_END | id::LOOP_END | id::RETURN => Some(0),
        id::CALL_SEQUENCE => field(0, 2).map(|n| 2 + 2 * n),
        id::SELECT | id::ARCHIVE_INFO => field(0, 2).map(|n| 2 + n),
        id::MESSAGE => field(1, 1).map(|n| 2 + n),
        id::HARDWARE_TYPE => field(0, 1).map(|n| 1 + 3 * n),
        id::EMULATION_INFO => Some(8),
        id::CUSTOM_INFO => field(16, 4).map(|n| 20 + n),
        id::SNAPSHOT => field(1, 3).map(|n| 4 + n),
        id::GLUE => Some(9),
        // 0x16-0x19, 0x2A, 0x2B and anything unknown: 4-byte length prefix.
        _ => field(0, 4).map(|n| 4usize.saturating_add(n)),
    };

    1usize.saturating_add(body_len.unwrap_or(body.len()))
}

// ---------------------------------------------------------------------------
// Bounds-checked field access
// ---------------------------------------------------------------------------

/// View of one block's bytes that turns every out-of-range read into
/// [`TapeError::TruncatedBlock`].
///
/// Positions are relative to `base`; `within` narrows the view to a
/// sub-region (e.g. the body of a length-prefixed block) while errors keep
/// pointing at the block's ID byte.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockReader<'a> {
    data: &'a [u8],
    base: usize,
    limit: usize,
    index: usize,
    offset: usize,
    id: u8,
}

impl<'a> BlockReader<'a> {
    pub(crate) fn new(data: &'a [u8], index: usize, entry: BlockEntry) -> Self {
        Self {
            data,
            base: entry.offset + 1,
            limit: data.len(),
            index,
            offset: entry.offset,
            id: entry.id,
        }
    }

    fn truncated(&self, end: usize) -> TapeError {
        let body_start = self.offset + 1;
        TapeError::TruncatedBlock {
            index: self.index,
            offset: self.offset,
            id: self.id,
            needed: end.saturating_sub(body_start),
            available: self.limit.saturating_sub(body_start),
        }
    }

    /// Absolute range of `len` bytes at `pos`.
    pub(crate) fn range(&self, pos: usize, len: usize) -> Result<Range<usize>> {
        let start = self.base.saturating_add(pos);
        let end = start.saturating_add(len);
        if end > self.limit {
            return Err(self.truncated(end));
        }
        Ok(start..end)
    }

    pub(crate) fn bytes(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        let range = self.range(pos, len)?;
        Ok(&self.data[range])
    }

    pub(crate) fn u8(&self, pos: usize) -> Result<u8> {
        Ok(self.bytes(pos, 1)?[0])
    }

    pub(crate) fn u16(&self, pos: usize) -> Result<u16> {
        let b = self.bytes(pos, 2)?;
        Ok(u16::from(b[0]) | (u16::from(b[1]) << 8))
    }

    pub(crate) fn u24(&self, pos: usize) -> Result<u32> {
        let b = self.bytes(pos, 3)?;
        Ok(u32::from(b[0]) | (u32::from(b[1]) << 8) | (u32::from(b[2]) << 16))
    }

    pub(crate) fn u32(&self, pos: usize) -> Result<u32> {
        let b = self.bytes(pos, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Narrow to `len` bytes at `pos`.
    pub(crate) fn within(&self, pos: usize, len: usize) -> Result<Self> {
        let range = self.range(pos, len)?;
        Ok(Self {
            base: range.start,
            limit: range.end,
            ..*self
        })
    }

    /// Confine to `range`, an absolute range previously handed out by
    /// this block's reader.
    pub(crate) fn confine(&self, range: Range<usize>) -> Self {
        Self {
            base: range.start,
            limit: range.end.min(self.limit),
            ..*self
        }
    }
}

// ---------------------------------------------------------------------------
// Decoded blocks
// ---------------------------------------------------------------------------

/// Shape of one symbol stream in a generalized data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSet {
    /// Number of symbols in the stream (TOTP / TOTD).
    pub total: u32,
    /// Pulses per symbol definition (NPP / NPD).
    pub max_pulses: u8,
    /// Alphabet size, 1..=256 (ASP / ASD; a stored 0 means 256).
    pub alphabet_size: u16,
    /// The stored alphabet field was 0.
    pub clamped: bool,
}

impl SymbolSet {
    fn new(total: u32, max_pulses: u8, stored_size: u8) -> Self {
        let clamped = stored_size == 0 && total > 0;
        Self {
            total,
            max_pulses,
            alphabet_size: if clamped { 256 } else { u16::from(stored_size) },
            clamped,
        }
    }

    /// Bytes per symbol definition: polarity flag plus `max_pulses` u16s.
    #[must_use]
    pub fn definition_len(&self) -> usize {
        1 + 2 * usize::from(self.max_pulses)
    }

    #[must_use]
    pub fn table_len(&self) -> usize {
        self.definition_len() * usize::from(self.alphabet_size)
    }
}

/// Header of a generalized data block (0x19).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralizedBlock {
    pub pause_ms: u16,
    pub pilot: SymbolSet,
    pub data: SymbolSet,
    /// Symbol tables and streams following the header.
    pub tables: Range<usize>,
}

/// A block as the interpreter sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Block $10: Standard speed data (ROM timing).
    StandardSpeed {
        pause_ms: u16,
        data: Range<usize>,
    },
    /// Block $11: Turbo speed data (custom timing).
    TurboSpeed {
        timing: PulseTiming,
        pause_ms: u16,
        data: Range<usize>,
    },
    /// Block $12: Pure tone (repeated single pulse).
    PureTone {
        pulse_len: u16,
        count: u16,
    },
    /// Block $13: Pulse sequence. `pulses` covers the little-endian u16
    /// lengths.
    PulseSequence {
        pulses: Range<usize>,
    },
    /// Block $14: Pure data (no pilot or sync, just data bits).
    PureData {
        zero_pulse: u16,
        one_pulse: u16,
        used_bits: u8,
        pause_ms: u16,
        data: Range<usize>,
    },
    /// Block $15: Direct recording (one level sample per bit).
    DirectRecording {
        tstates_per_sample: u16,
        pause_ms: u16,
        used_bits: u8,
        data: Range<usize>,
    },
    /// Block $19: Generalized data (block-defined symbol alphabets).
    Generalized(GeneralizedBlock),
    /// Block $20: Pause / stop the tape.
    Pause {
        duration_ms: u16,
    },
    /// Block $21: Group start.
    GroupStart {
        name: Range<usize>,
    },
    /// Block $22: Group end.
    GroupEnd,
    /// Block $24: Loop start.
    LoopStart {
        repetitions: u16,
    },
    /// Block $25: Loop end.
    LoopEnd,
    /// Block $2B: Set signal level.
    SetSignalLevel {
        high: bool,
    },
    /// Block $30: Text description.
    TextDescription {
        text: Range<usize>,
    },
    /// Block $31: Message shown for `seconds`.
    Message {
        seconds: u8,
        text: Range<usize>,
    },
    /// Block $32: Archive info. `body` is the count byte plus entries, as
    /// declared by the block's length field.
    ArchiveInfo {
        body: Range<usize>,
    },
    /// Block $33: Hardware type (3-byte records).
    HardwareType {
        entries: Range<usize>,
    },
    /// Block $35: Custom info.
    CustomInfo {
        ident: Range<usize>,
        data: Range<usize>,
    },
    /// Block $5A: Glue (start of a concatenated TZX file).
    Glue,
    /// Blocks $16, $17, $34, $40: dropped from the format (skipped).
    Deprecated {
        id: u8,
    },
    /// Unknown or unsupported block (skipped gracefully).
    Unsupported {
        id: u8,
    },
}

impl Block {
    /// Decode the block at `entry`, the `index`-th entry of the block table.
    pub fn decode(data: &[u8], index: usize, entry: BlockEntry) -> Result<Self> {
        let r = BlockReader::new(data, index, entry);

        let block = match entry.id {
            id::STANDARD_SPEED => {
                let len = r.u16(2)?;
                Self::StandardSpeed {
                    pause_ms: r.u16(0)?,
                    data: r.range(4, usize::from(len))?,
                }
            }
            id::TURBO_SPEED => {
                let timing = PulseTiming {
                    pilot_pulse: r.u16(0)?,
                    sync1: r.u16(2)?,
                    sync2: r.u16(4)?,
                    zero_pulse: r.u16(6)?,
                    one_pulse: r.u16(8)?,
                    pilot_count: r.u16(10)?,
                    used_bits: r.u8(12)?,
                };
                let len = r.u24(15)?;
                Self::TurboSpeed {
                    timing,
                    pause_ms: r.u16(13)?,
                    data: r.range(18, len as usize)?,
                }
            }
            id::PURE_TONE => Self::PureTone {
                pulse_len: r.u16(0)?,
                count: r.u16(2)?,
            },
            id::PULSE_SEQUENCE => {
                let count = r.u8(0)?;
                Self::PulseSequence {
                    pulses: r.range(1, 2 * usize::from(count))?,
                }
            }
            id::PURE_DATA => {
                let len = r.u24(7)?;
                Self::PureData {
                    zero_pulse: r.u16(0)?,
                    one_pulse: r.u16(2)?,
                    used_bits: r.u8(4)?,
                    pause_ms: r.u16(5)?,
                    data: r.range(10, len as usize)?,
                }
            }
            id::DIRECT_RECORDING => {
                let len = r.u24(5)?;
                Self::DirectRecording {
                    tstates_per_sample: r.u16(0)?,
                    pause_ms: r.u16(2)?,
                    used_bits: r.u8(4)?,
                    data: r.range(8, len as usize)?,
                }
            }
            id::GENERALIZED => Self::Generalized(decode_generalized(&r)?),
            id::PAUSE => Self::Pause {
                duration_ms: r.u16(0)?,
            },
            id::GROUP_START => {
                let len = r.u8(0)?;
                Self::GroupStart {
                    name: r.range(1, usize::from(len))?,
                }
            }
            id::GROUP_END => Self::GroupEnd,
            id::LOOP_START => Self::LoopStart {
                repetitions: r.u16(0)?,
            },
            id::LOOP_END => Self::LoopEnd,
            id::SET_SIGNAL_LEVEL => Self::SetSignalLevel {
                high: r.u8(4)? != 0,
            },
            id::TEXT_DESCRIPTION => {
                let len = r.u8(0)?;
                Self::TextDescription {
                    text: r.range(1, usize::from(len))?,
                }
            }
            id::MESSAGE => {
                let len = r.u8(1)?;
                Self::Message {
                    seconds: r.u8(0)?,
                    text: r.range(2, usize::from(len))?,
                }
            }
            id::ARCHIVE_INFO => {
                let len = r.u16(0)?;
                Self::ArchiveInfo {
                    body: r.range(2, usize::from(len))?,
                }
            }
            id::HARDWARE_TYPE => {
                let count = r.u8(0)?;
                Self::HardwareType {
                    entries: r.range(1, 3 * usize::from(count))?,
                }
            }
            id::CUSTOM_INFO => {
                let len = r.u32(16)?;
                Self::CustomInfo {
                    ident: r.range(0, 16)?,
                    data: r.range(20, len as usize)?,
                }
            }
            id::GLUE => {
                r.range(0, 9)?;
                Self::Glue
            }
            id::C64_ROM | id::C64_TURBO | id::EMULATION_INFO | id::SNAPSHOT => {
                check_skipped(&r, entry.id)?;
                Self::Deprecated { id: entry.id }
            }
            other => {
                check_skipped(&r, other)?;
                Self::Unsupported { id: other }
            }
        };

        Ok(block)
    }
}

/// Bounds-check the declared extent of a block that is skipped rather
/// than played. Same layouts as [`block_len`].
fn check_skipped(r: &BlockReader<'_>, block_id: u8) -> Result<()> {
    let len = match block_id {
        id::JUMP => 2,
        id::RETURN => 0,
        id::CALL_SEQUENCE => 2 + 2 * usize::from(r.u16(0)?),
        id::SELECT => 2 + usize::from(r.u16(0)?),
        id::EMULATION_INFO => 8,
        id::SNAPSHOT => 4 + r.u24(1)? as usize,
        _ => 4usize.saturating_add(r.u32(0)? as usize),
    };
    r.range(0, len).map(|_| ())
}

/// Generalized data block header. Field positions are relative to the
/// block body that follows the 4-byte length.
fn decode_generalized(r: &BlockReader<'_>) -> Result<GeneralizedBlock> {
    const HEADER_LEN: usize = 14;

    let len = r.u32(0)? as usize;
    let body = r.within(4, len)?;
    let pilot = SymbolSet::new(body.u32(2)?, body.u8(6)?, body.u8(7)?);
    let data = SymbolSet::new(body.u32(8)?, body.u8(12)?, body.u8(13)?);

    Ok(GeneralizedBlock {
        pause_ms: body.u16(0)?,
        pilot,
        data,
        tables: body.range(HEADER_LEN, len.saturating_sub(HEADER_LEN))?,
    })
}
