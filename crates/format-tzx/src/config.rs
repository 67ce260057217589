//! Sink configuration.

use crate::sink::DEFAULT_PROGRESS_INTERVAL;

/// Output format of the PCM renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Peak sample value. Low is `-amplitude`, high is `+amplitude`.
    pub amplitude: i16,
}

impl PcmConfig {
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
    pub const DEFAULT_AMPLITUDE: i16 = 0x5A9E;
}

impl Default for PcmConfig {
    fn default() -> Self {
        Self {
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            amplitude: Self::DEFAULT_AMPLITUDE,
        }
    }
}

/// Cadence of progress callbacks, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressConfig {
    pub interval_ticks: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_ticks: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}
