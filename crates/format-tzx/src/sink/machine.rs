//! Live sink: feeds the tape into a running machine.

use std::time::{Duration, Instant};

use super::{ProgressMeter, SignalSink};
use crate::config::ProgressConfig;

/// The emulated machine a tape is played into.
///
/// Implemented by the host around its CPU/ULA emulation.
pub trait TapeMachine {
    /// Drive the EAR/mic input.
    fn set_tape_level(&mut self, high: bool);

    /// Execute `cycles` T-states of emulation.
    fn run_cycles(&mut self, cycles: u64);
}

/// Forwards ticks into a [`TapeMachine`] and reports progress.
///
/// `on_progress` receives the running tick total every
/// `ProgressConfig::interval_ticks` ticks of tape. Hosts that need to yield
/// to a scheduler do it from there.
pub struct MachineSink<'m, M: TapeMachine + ?Sized, F: FnMut(u64)> {
    machine: &'m mut M,
    level: bool,
    meter: ProgressMeter,
    on_progress: F,
    busy: Duration,
}

impl<'m, M: TapeMachine + ?Sized, F: FnMut(u64)> MachineSink<'m, M, F> {
    pub fn new(machine: &'m mut M, on_progress: F) -> Self {
        Self::with_config(machine, ProgressConfig::default(), on_progress)
    }

    pub fn with_config(machine: &'m mut M, config: ProgressConfig, on_progress: F) -> Self {
        Self {
            machine,
            level: false,
            meter: ProgressMeter::new(config.interval_ticks),
            on_progress,
            busy: Duration::ZERO,
        }
    }

    /// Wall time spent inside `run_cycles`.
    #[must_use]
    pub fn execution_time(&self) -> Duration {
        self.busy
    }

    /// Current mic level as last sent to the machine.
    #[must_use]
    pub fn level(&self) -> bool {
        self.level
    }

    fn drive(&mut self, high: bool) {
        self.level = high;
        self.machine.set_tape_level(high);
    }
}

impl<M: TapeMachine + ?Sized, F: FnMut(u64)> SignalSink for MachineSink<'_, M, F> {
    fn start(&mut self) {
        self.meter.reset();
        self.busy = Duration::ZERO;
    }

    fn set_level_high(&mut self) {
        self.drive(true);
    }

    fn set_level_low(&mut self) {
        self.drive(false);
    }

    fn toggle_level(&mut self) {
        self.drive(!self.level);
    }

    fn advance(&mut self, ticks: u64) {
        if let Some(total) = self.meter.add(ticks) {
            (self.on_progress)(total);
        }
        let started = Instant::now();
        self.machine.run_cycles(ticks);
        self.busy += started.elapsed();
    }

    fn finish(&mut self) {}

    fn total_ticks(&self) -> u64 {
        self.meter.total()
    }
}
