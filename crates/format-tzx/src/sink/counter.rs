//! Dry-run sink: counts ticks and edges, nothing else.

use super::SignalSink;

/// Counts the ticks and toggles of a session.
///
/// Hosts run a tape through this first to learn its total length, which
/// turns the tick count of the real run into a percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickCounter {
    total: u64,
    toggles: u64,
}

impl TickCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `toggle_level` calls seen.
    #[must_use]
    pub fn toggles(&self) -> u64 {
        self.toggles
    }
}

impl SignalSink for TickCounter {
    fn start(&mut self) {
        self.total = 0;
        self.toggles = 0;
    }

    fn set_level_high(&mut self) {}

    fn set_level_low(&mut self) {}

    fn toggle_level(&mut self) {
        self.toggles += 1;
    }

    fn advance(&mut self, ticks: u64) {
        self.total += ticks;
    }

    fn finish(&mut self) {}

    fn total_ticks(&self) -> u64 {
        self.total
    }
}
