//! Loading a tape into a running machine.
//!
//! Two passes over the same image: a counting dry run for the total
//! length, then the real run through a [`MachineSink`], so progress can be
//! reported as a fraction of the whole tape.

use std::time::Duration;

use crate::config::ProgressConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::image::TapeImage;
use crate::sink::{MachineSink, SignalSink, TapeMachine};

/// Position of a load in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub ticks: u64,
    pub total_ticks: u64,
}

impl LoadProgress {
    /// Whole percent played, 0..=100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total_ticks == 0 {
            return 100;
        }
        let done = u128::from(self.ticks.min(self.total_ticks));
        (done * 100 / u128::from(self.total_ticks)) as u8
    }
}

/// Outcome of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Ticks played into the machine.
    pub total_ticks: u64,
    /// Wall time the machine spent emulating them.
    pub execution_time: Duration,
}

/// Play `image` into `machine` with the default progress cadence.
pub fn load_into<M, D, F>(
    image: &TapeImage,
    machine: &mut M,
    diagnostics: &mut D,
    on_progress: F,
) -> Result<LoadReport>
where
    M: TapeMachine + ?Sized,
    D: Diagnostics + ?Sized,
    F: FnMut(LoadProgress),
{
    load_with_config(image, machine, diagnostics, ProgressConfig::default(), on_progress)
}

pub fn load_with_config<M, D, F>(
    image: &TapeImage,
    machine: &mut M,
    diagnostics: &mut D,
    config: ProgressConfig,
    mut on_progress: F,
) -> Result<LoadReport>
where
    M: TapeMachine + ?Sized,
    D: Diagnostics + ?Sized,
    F: FnMut(LoadProgress),
{
    let total_ticks = image.total_ticks()?;

    let mut sink = MachineSink::with_config(machine, config, |ticks| {
        on_progress(LoadProgress { ticks, total_ticks });
    });
    image.play(&mut sink, diagnostics)?;

    Ok(LoadReport {
        total_ticks: sink.total_ticks(),
        execution_time: sink.execution_time(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Silent;
    use crate::error::TapeError;
    use crate::index::SIGNATURE;

    #[derive(Default)]
    struct Cpu {
        cycles: u64,
        edges: usize,
    }

    impl TapeMachine for Cpu {
        fn set_tape_level(&mut self, _high: bool) {
            self.edges += 1;
        }

        fn run_cycles(&mut self, cycles: u64) {
            self.cycles += cycles;
        }
    }

    fn pause_tape(ms: u16) -> TapeImage {
        let mut data = SIGNATURE.to_vec();
        data.extend_from_slice(&[1, 20, 0x20]);
        data.extend_from_slice(&ms.to_le_bytes());
        TapeImage::new(data)
    }

    #[test]
    fn percent_math() {
        let p = |ticks, total_ticks| LoadProgress { ticks, total_ticks }.percent();
        assert_eq!(p(0, 200), 0);
        assert_eq!(p(50, 200), 25);
        assert_eq!(p(199, 200), 99);
        assert_eq!(p(300, 200), 100);
        assert_eq!(p(0, 0), 100);
    }

    #[test]
    fn machine_receives_every_tick() {
        let image = pause_tape(100);
        let mut cpu = Cpu::default();
        let report = load_into(&image, &mut cpu, &mut Silent, |_| {}).expect("load");
        assert_eq!(report.total_ticks, 101 * 3500);
        assert_eq!(cpu.cycles, report.total_ticks);
    }

    #[test]
    fn progress_is_relative_to_dry_run() {
        let image = pause_tape(10);
        let mut cpu = Cpu::default();
        let mut seen = Vec::new();
        let config = ProgressConfig {
            interval_ticks: 3500,
        };
        load_with_config(&image, &mut cpu, &mut Silent, config, |p| seen.push(p)).expect("load");

        assert_eq!(seen.len(), 11);
        assert!(seen.iter().all(|p| p.total_ticks == 11 * 3500));
        assert_eq!(seen.last().map(LoadProgress::percent), Some(100));
    }

    #[test]
    fn malformed_image_never_touches_the_machine() {
        let image = TapeImage::new(b"ZXTape!\x1A\x01\x14".to_vec());
        let mut cpu = Cpu::default();
        let err = load_into(&image, &mut cpu, &mut Silent, |_| {}).expect_err("empty");
        assert_eq!(err, TapeError::Empty);
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.edges, 0);
    }
}
