//! Generalized data blocks (0x19).
//!
//! Instead of fixed pilot and bit timing, the block carries its own symbol
//! alphabets. Each symbol is a starting-polarity flag plus up to
//! `max_pulses` pulse lengths (a zero length ends the list early). Two
//! streams follow their alphabets:
//!
//! * pilot/sync: run-length triples of `(symbol: u8, repeat: u16)`
//! * data: symbol indices packed `ceil(log2(alphabet))` bits wide, MSB
//!   first, running across byte boundaries
//!
//! Each alphabet is only present when its stream is non-empty.

use crate::block::{BlockReader, GeneralizedBlock, SymbolSet};
use crate::diagnostics::{Diagnostic, Diagnostics, SymbolStream};
use crate::error::Result;
use crate::pulse::pulse;
use crate::sink::SignalSink;

/// One alphabet: `alphabet_size` definitions of `def_len` bytes each.
struct Alphabet<'a> {
    defs: &'a [u8],
    def_len: usize,
    size: u16,
}

impl<'a> Alphabet<'a> {
    fn read(r: &BlockReader<'a>, pos: usize, set: &SymbolSet) -> Result<Self> {
        Ok(Self {
            defs: r.bytes(pos, set.table_len())?,
            def_len: set.definition_len(),
            size: set.alphabet_size,
        })
    }

    fn play<S, D>(&self, sink: &mut S, diagnostics: &mut D, symbol: u16)
    where
        S: SignalSink + ?Sized,
        D: Diagnostics + ?Sized,
    {
        if symbol >= self.size {
            diagnostics.report(Diagnostic::SymbolOutOfRange {
                symbol,
                alphabet_size: self.size,
            });
            return;
        }

        let start = usize::from(symbol) * self.def_len;
        let def = &self.defs[start..start + self.def_len];
        match def[0] {
            0 => {}
            1 => sink.toggle_level(),
            2 => sink.set_level_low(),
            3 => sink.set_level_high(),
            value => diagnostics.report(Diagnostic::InvalidPolarity { value }),
        }

        for len in def[1..].chunks_exact(2) {
            let len = u16::from(len[0]) | (u16::from(len[1]) << 8);
            if len == 0 {
                break;
            }
            pulse(sink, len);
        }
    }
}

/// Bits per packed data symbol.
pub(crate) fn symbol_width(alphabet_size: u16) -> u32 {
    if alphabet_size <= 1 {
        0
    } else {
        u16::BITS - (alphabet_size - 1).leading_zeros()
    }
}

/// MSB-first bit reader over a packed symbol stream.
struct PackedSymbols<'a> {
    data: &'a [u8],
    bit: usize,
    width: u32,
}

impl Iterator for PackedSymbols<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let mut symbol = 0u16;
        for _ in 0..self.width {
            let byte = *self.data.get(self.bit / 8)?;
            let set = byte & (0x80 >> (self.bit % 8)) != 0;
            symbol = (symbol << 1) | u16::from(set);
            self.bit += 1;
        }
        Some(symbol)
    }
}

/// Replay both symbol streams of a generalized block.
///
/// `r` must be confined to `block.tables`. The block's pause is left to the
/// caller.
pub(crate) fn play<S, D>(
    sink: &mut S,
    diagnostics: &mut D,
    r: &BlockReader<'_>,
    block: &GeneralizedBlock,
) -> Result<()>
where
    S: SignalSink + ?Sized,
    D: Diagnostics + ?Sized,
{
    let mut pos = 0;

    if block.pilot.total > 0 {
        if block.pilot.clamped {
            diagnostics.report(Diagnostic::AlphabetClamped {
                stream: SymbolStream::PilotSync,
            });
        }
        let alphabet = Alphabet::read(r, pos, &block.pilot)?;
        pos += block.pilot.table_len();

        let runs = r.bytes(pos, 3 * block.pilot.total as usize)?;
        pos += runs.len();
        for run in runs.chunks_exact(3) {
            let symbol = u16::from(run[0]);
            let repeat = u16::from(run[1]) | (u16::from(run[2]) << 8);
            for _ in 0..repeat {
                alphabet.play(sink, diagnostics, symbol);
            }
        }
    }

    if block.data.total > 0 {
        if block.data.clamped {
            diagnostics.report(Diagnostic::AlphabetClamped {
                stream: SymbolStream::Data,
            });
        }
        let alphabet = Alphabet::read(r, pos, &block.data)?;
        pos += block.data.table_len();

        let width = symbol_width(block.data.alphabet_size);
        let stream_bits = u64::from(block.data.total) * u64::from(width);
        let stream = r.bytes(pos, stream_bits.div_ceil(8) as usize)?;
        let symbols = PackedSymbols {
            data: stream,
            bit: 0,
            width,
        };
        for symbol in symbols.take(block.data.total as usize) {
            alphabet.play(sink, diagnostics, symbol);
        }
    }

    Ok(())
}
