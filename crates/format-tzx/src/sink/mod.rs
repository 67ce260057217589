//! Signal sinks: the consumers of decoded tape edges.
//!
//! The decoder never owns a level or a clock. It tells a sink to hold the
//! current level for a number of ticks and when to change it; what the sink
//! does with that (count it, render audio, run a CPU) is its own business.

mod counter;
mod machine;
mod pcm;

pub use counter::TickCounter;
pub use machine::{MachineSink, TapeMachine};
pub use pcm::PcmSink;

use crate::timing::TICKS_PER_MS;

/// Receiver of a tape's mic-line transitions.
///
/// Ticks are 3.5 MHz CPU cycles. A "pulse" is `advance(len)` followed by
/// `toggle_level()`.
pub trait SignalSink {
    /// Begin a session. Called once before any other call.
    fn start(&mut self);

    fn set_level_high(&mut self);

    fn set_level_low(&mut self);

    fn toggle_level(&mut self);

    /// Hold the current level for `ticks` cycles.
    fn advance(&mut self, ticks: u64);

    /// Hold the current level for exactly [`TICKS_PER_MS`] cycles.
    fn advance_one_millisecond(&mut self) {
        self.advance(TICKS_PER_MS);
    }

    /// End a session. Only called after a successful decode.
    fn finish(&mut self);

    /// Ticks advanced since `start()`.
    fn total_ticks(&self) -> u64;
}

/// Ten 48K scanlines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10 * 224;

/// Tick accumulator that fires at a fixed tick cadence.
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    total: u64,
    since_report: u64,
    interval: u64,
}

impl ProgressMeter {
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self {
            total: 0,
            since_report: 0,
            interval: interval.max(1),
        }
    }

    /// Account for `ticks`. Returns the running total when a report is due.
    pub fn add(&mut self, ticks: u64) -> Option<u64> {
        self.total += ticks;
        self.since_report += ticks;
        if self.since_report >= self.interval {
            self.since_report = 0;
            Some(self.total)
        } else {
            None
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn reset(&mut self) {
        self.total = 0;
        self.since_report = 0;
    }
}

impl Default for ProgressMeter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

/// Call-by-call log of a session, for asserting exact edge sequences.
#[cfg(test)]
pub(crate) mod testing {
    use super::SignalSink;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        Start,
        High,
        Low,
        Toggle,
        Advance(u64),
        Finish,
    }

    #[derive(Debug, Default)]
    pub struct EventLog {
        pub events: Vec<Event>,
        total: u64,
    }

    impl EventLog {
        pub fn toggles(&self) -> usize {
            self.events.iter().filter(|e| **e == Event::Toggle).count()
        }

        pub fn advances(&self) -> Vec<u64> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Advance(t) => Some(*t),
                    _ => None,
                })
                .collect()
        }
    }

    impl SignalSink for EventLog {
        fn start(&mut self) {
            self.events.push(Event::Start);
        }

        fn set_level_high(&mut self) {
            self.events.push(Event::High);
        }

        fn set_level_low(&mut self) {
            self.events.push(Event::Low);
        }

        fn toggle_level(&mut self) {
            self.events.push(Event::Toggle);
        }

        fn advance(&mut self, ticks: u64) {
            self.total += ticks;
            self.events.push(Event::Advance(ticks));
        }

        fn finish(&mut self) {
            self.events.push(Event::Finish);
        }

        fn total_ticks(&self) -> u64 {
            self.total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_fires_at_interval() {
        let mut meter = ProgressMeter::new(100);
        assert_eq!(meter.add(60), None);
        assert_eq!(meter.add(40), Some(100));
        assert_eq!(meter.add(99), None);
        assert_eq!(meter.add(500), Some(699));
        assert_eq!(meter.total(), 699);
    }

    #[test]
    fn meter_reset_clears_total() {
        let mut meter = ProgressMeter::new(10);
        let _ = meter.add(25);
        meter.reset();
        assert_eq!(meter.total(), 0);
        assert_eq!(meter.add(5), None);
    }

    #[test]
    fn default_millisecond_is_one_advance() {
        let mut log = testing::EventLog::default();
        log.advance_one_millisecond();
        assert_eq!(log.advances(), vec![3500]);
    }
}
