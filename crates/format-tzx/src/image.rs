//! Tape images and decode sessions.

use std::path::Path;
use std::time::Duration;

use crate::diagnostics::{Diagnostics, Silent};
use crate::error::Result;
use crate::index::{BlockTable, SIGNATURE};
use crate::interpreter::play_tzx;
use crate::sink::{SignalSink, TickCounter};
use crate::tap::play_tap;
use crate::timing::ticks_to_duration;

/// Container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeFormat {
    Tzx,
    Tap,
}

impl TapeFormat {
    /// TZX if the image starts with the TZX signature, TAP otherwise.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(SIGNATURE) {
            Self::Tzx
        } else {
            Self::Tap
        }
    }

    /// Format implied by a `.tzx` / `.tap` extension, any case.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tzx" => Some(Self::Tzx),
            "tap" => Some(Self::Tap),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Tzx => "TZX",
            Self::Tap => "TAP",
        }
    }
}

/// An immutable tape image and its container kind.
///
/// Owns the only copy of the tape bytes; decoded blocks refer back into it
/// by range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeImage {
    bytes: Vec<u8>,
    format: TapeFormat,
}

impl TapeImage {
    /// Wrap `bytes`, detecting the format from the signature.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let format = TapeFormat::detect(&bytes);
        Self { bytes, format }
    }

    #[must_use]
    pub fn with_format(bytes: Vec<u8>, format: TapeFormat) -> Self {
        Self { bytes, format }
    }

    /// Read a tape file. The extension decides the format; unknown
    /// extensions fall back to signature detection.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(match TapeFormat::from_path(path) {
            Some(format) => Self::with_format(bytes, format),
            None => Self::new(bytes),
        })
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn format(&self) -> TapeFormat {
        self.format
    }

    /// Validate the TZX header and build the block table.
    ///
    /// TAP images have no header and fail here with `BadSignature` (or
    /// `TooSmall`).
    pub fn index(&self) -> Result<BlockTable> {
        BlockTable::build(&self.bytes)
    }

    /// Replay the whole tape into `sink`.
    ///
    /// A malformed TZX container fails before the sink sees any call.
    /// `finish()` is only called when the whole tape decoded; after an
    /// error the sink holds a partial, unfinished session.
    pub fn play<S, D>(&self, sink: &mut S, diagnostics: &mut D) -> Result<()>
    where
        S: SignalSink + ?Sized,
        D: Diagnostics + ?Sized,
    {
        match self.format {
            TapeFormat::Tzx => {
                let table = self.index()?;
                sink.start();
                play_tzx(&self.bytes, &table, sink, diagnostics)?;
            }
            TapeFormat::Tap => {
                sink.start();
                play_tap(&self.bytes, sink)?;
            }
        }
        sink.finish();
        Ok(())
    }

    /// Length of the tape in ticks, from a counting dry run.
    pub fn total_ticks(&self) -> Result<u64> {
        let mut counter = TickCounter::new();
        self.play(&mut counter, &mut Silent)?;
        Ok(counter.total_ticks())
    }

    /// Playing time of the tape.
    pub fn duration(&self) -> Result<Duration> {
        self.total_ticks().map(ticks_to_duration)
    }
}
