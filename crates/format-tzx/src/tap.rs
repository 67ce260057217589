//! TAP images: bare length-prefixed standard-speed blocks.
//!
//! No header and no block table. Each block is played straight off the
//! byte stream with ROM timing and a one-second pause.

use crate::block::id;
use crate::error::{Result, TapeError};
use crate::pulse::{pause, pulse_train};
use crate::sink::SignalSink;
use crate::timing::{PulseTiming, TAP_PAUSE_MS};

/// Iterator over the payloads of a TAP image.
///
/// Yields `TruncatedBlock` once, and then stops, if a length prefix or
/// payload runs past the end.
pub struct TapBlocks<'a> {
    data: &'a [u8],
    pos: usize,
    index: usize,
}

impl<'a> TapBlocks<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            index: 0,
        }
    }

    fn truncated(&self, needed: usize) -> TapeError {
        TapeError::TruncatedBlock {
            index: self.index,
            offset: self.pos,
            id: id::STANDARD_SPEED,
            needed,
            available: self.data.len() - self.pos,
        }
    }
}

impl<'a> Iterator for TapBlocks<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.data.len().checked_sub(self.pos).filter(|&n| n > 0)?;

        if remaining < 2 {
            let err = self.truncated(2);
            self.pos = self.data.len();
            return Some(Err(err));
        }

        let len = usize::from(self.data[self.pos]) | (usize::from(self.data[self.pos + 1]) << 8);
        let start = self.pos + 2;
        let end = start + len;
        if end > self.data.len() {
            let err = self.truncated(2 + len);
            self.pos = self.data.len();
            return Some(Err(err));
        }

        self.pos = end;
        self.index += 1;
        Some(Ok(&self.data[start..end]))
    }
}

/// Replay a TAP image. `start()` and `finish()` are the caller's.
pub(crate) fn play_tap<S: SignalSink + ?Sized>(data: &[u8], sink: &mut S) -> Result<()> {
    for payload in TapBlocks::new(data) {
        let payload = payload?;
        pulse_train(sink, &PulseTiming::standard(payload), payload);
        pause(sink, TAP_PAUSE_MS);
    }
    Ok(())
}
