//! Signal primitives shared by the TZX interpreter and the TAP adapter.

use crate::sink::SignalSink;
use crate::timing::PulseTiming;

/// Hold the level for `len` ticks, then flip it.
pub(crate) fn pulse<S: SignalSink + ?Sized>(sink: &mut S, len: u16) {
    sink.advance(u64::from(len));
    sink.toggle_level();
}

/// Pilot tone, optional sync pulses, then the payload bits.
pub(crate) fn pulse_train<S: SignalSink + ?Sized>(sink: &mut S, timing: &PulseTiming, data: &[u8]) {
    for _ in 0..timing.pilot_count {
        pulse(sink, timing.pilot_pulse);
    }
    if timing.sync1 > 0 {
        pulse(sink, timing.sync1);
    }
    if timing.sync2 > 0 {
        pulse(sink, timing.sync2);
    }
    data_bits(sink, data, timing.zero_pulse, timing.one_pulse, timing.used_bits);
}

/// Bits of the final byte actually sent.
fn bits_in_byte(index: usize, len: usize, used_bits: u8) -> u8 {
    if index + 1 == len {
        used_bits.min(8)
    } else {
        8
    }
}

/// Payload bits, MSB first, each as two equal half-pulses.
pub(crate) fn data_bits<S: SignalSink + ?Sized>(
    sink: &mut S,
    data: &[u8],
    zero_pulse: u16,
    one_pulse: u16,
    used_bits: u8,
) {
    for (i, &byte) in data.iter().enumerate() {
        for bit in 0..bits_in_byte(i, data.len(), used_bits) {
            let len = if byte & (0x80 >> bit) != 0 {
                one_pulse
            } else {
                zero_pulse
            };
            pulse(sink, len);
            pulse(sink, len);
        }
    }
}

/// Raw level samples: each bit sets the level outright and holds it.
pub(crate) fn direct_samples<S: SignalSink + ?Sized>(
    sink: &mut S,
    data: &[u8],
    tstates_per_sample: u16,
    used_bits: u8,
) {
    for (i, &byte) in data.iter().enumerate() {
        for bit in 0..bits_in_byte(i, data.len(), used_bits) {
            if byte & (0x80 >> bit) != 0 {
                sink.set_level_high();
            } else {
                sink.set_level_low();
            }
            sink.advance(u64::from(tstates_per_sample));
        }
    }
}

/// Inter-block silence.
///
/// One millisecond at the current level lets the last edge settle; the
/// line then goes low for the remaining `duration_ms - 1`.
pub(crate) fn pause<S: SignalSink + ?Sized>(sink: &mut S, duration_ms: u16) {
    sink.advance_one_millisecond();
    sink.set_level_low();
    for _ in 1..duration_ms {
        sink.advance_one_millisecond();
    }
}
