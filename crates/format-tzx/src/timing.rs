//! Tape timing in Z80 T-states.
//!
//! Every duration the decoder emits is a count of 3.5 MHz CPU cycles. The
//! standard values below are the ones the 48K ROM saver produces and the ROM
//! loader expects.

use std::time::Duration;

/// CPU clock the tick unit is defined against.
pub const CPU_FREQ: u64 = 3_500_000;

/// Ticks in one millisecond of tape.
pub const TICKS_PER_MS: u64 = CPU_FREQ / 1000;

// ---------------------------------------------------------------------------
// Standard ROM timing
// ---------------------------------------------------------------------------

pub const PILOT_PULSE: u16 = 2168;
pub const SYNC1_PULSE: u16 = 667;
pub const SYNC2_PULSE: u16 = 735;
pub const ZERO_PULSE: u16 = 855;
pub const ONE_PULSE: u16 = 1710;
pub const HEADER_PILOT_COUNT: u16 = 8063;
pub const DATA_PILOT_COUNT: u16 = 3223;

/// Pause after every TAP block.
pub const TAP_PAUSE_MS: u16 = 1000;

/// Pause inserted for a "stop the tape" block (pause block with duration 0).
pub const STOP_TAPE_PAUSE_MS: u16 = 5000;

/// Pulse layout of a pilot-train block.
///
/// Standard speed and turbo blocks share one signal primitive; they differ
/// only in which of these fields come from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub pilot_pulse: u16,
    pub pilot_count: u16,
    /// Zero means "no first sync pulse".
    pub sync1: u16,
    /// Zero means "no second sync pulse".
    pub sync2: u16,
    pub zero_pulse: u16,
    pub one_pulse: u16,
    /// Bits of the final payload byte to send, MSB first.
    pub used_bits: u8,
}

impl PulseTiming {
    /// ROM timing for a standard-speed payload.
    ///
    /// The pilot length depends on the flag byte: headers (flag < 0x80) get
    /// the long pilot, data blocks the short one.
    #[must_use]
    pub fn standard(payload: &[u8]) -> Self {
        Self {
            pilot_pulse: PILOT_PULSE,
            pilot_count: standard_pilot_count(payload),
            sync1: SYNC1_PULSE,
            sync2: SYNC2_PULSE,
            zero_pulse: ZERO_PULSE,
            one_pulse: ONE_PULSE,
            used_bits: 8,
        }
    }
}

/// Pilot pulse count for a standard-speed payload.
#[must_use]
pub fn standard_pilot_count(payload: &[u8]) -> u16 {
    match payload.first() {
        Some(&flag) if flag < 0x80 => HEADER_PILOT_COUNT,
        _ => DATA_PILOT_COUNT,
    }
}

/// Wall-clock duration of a tick count.
#[must_use]
pub fn ticks_to_duration(ticks: u64) -> Duration {
    let secs = ticks / CPU_FREQ;
    let nanos = (ticks % CPU_FREQ) * 1_000_000_000 / CPU_FREQ;
    Duration::new(secs, nanos as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_flag_selects_long_pilot() {
        assert_eq!(standard_pilot_count(&[0x00, 0x03]), HEADER_PILOT_COUNT);
        assert_eq!(standard_pilot_count(&[0x7F]), HEADER_PILOT_COUNT);
    }

    #[test]
    fn data_flag_selects_short_pilot() {
        assert_eq!(standard_pilot_count(&[0xFF, 0x00]), DATA_PILOT_COUNT);
        assert_eq!(standard_pilot_count(&[0x80]), DATA_PILOT_COUNT);
    }

    #[test]
    fn empty_payload_uses_data_pilot() {
        assert_eq!(standard_pilot_count(&[]), DATA_PILOT_COUNT);
    }

    #[test]
    fn one_millisecond_is_3500_ticks() {
        assert_eq!(TICKS_PER_MS, 3500);
    }

    #[test]
    fn duration_conversion() {
        assert_eq!(ticks_to_duration(CPU_FREQ), Duration::from_secs(1));
        assert_eq!(ticks_to_duration(TICKS_PER_MS * 1500), Duration::from_millis(1500));
        assert_eq!(ticks_to_duration(7), Duration::from_nanos(2000));
    }
}
