//! PCM renderer: turns tape edges into a 16-bit mono waveform.

#[cfg(feature = "wav")]
use std::io::{Cursor, Seek, Write};
#[cfg(feature = "wav")]
use std::path::Path;

use super::SignalSink;
use crate::config::PcmConfig;
use crate::timing::CPU_FREQ;

/// Renders the mic line as signed 16-bit samples.
///
/// Tick spans are resampled to the output rate with a carried remainder,
/// so the sample count tracks the tick count exactly over a whole tape.
#[derive(Debug, Clone)]
pub struct PcmSink {
    config: PcmConfig,
    level: i16,
    samples: Vec<i16>,
    total_ticks: u64,
    remainder: u64,
    complete: bool,
}

impl PcmSink {
    #[must_use]
    pub fn new(config: PcmConfig) -> Self {
        Self {
            config,
            level: 0,
            samples: Vec::new(),
            total_ticks: 0,
            remainder: 0,
            complete: false,
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    #[must_use]
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// True once `finish()` ran. A failed decode leaves a partial render
    /// with this still false.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn low(&self) -> i16 {
        -self.config.amplitude
    }

    fn high(&self) -> i16 {
        self.config.amplitude
    }

    #[cfg(feature = "wav")]
    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Encode the render as a WAV stream.
    #[cfg(feature = "wav")]
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<(), hound::Error> {
        let mut wav = hound::WavWriter::new(writer, self.wav_spec())?;
        for &sample in &self.samples {
            wav.write_sample(sample)?;
        }
        wav.finalize()
    }

    #[cfg(feature = "wav")]
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_wav(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    #[cfg(feature = "wav")]
    pub fn save_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let file = std::fs::File::create(path)?;
        self.write_wav(std::io::BufWriter::new(file))
    }
}

impl Default for PcmSink {
    fn default() -> Self {
        Self::new(PcmConfig::default())
    }
}

impl SignalSink for PcmSink {
    fn start(&mut self) {
        self.level = 0;
        self.samples.clear();
        self.total_ticks = 0;
        self.remainder = 0;
        self.complete = false;
    }

    fn set_level_high(&mut self) {
        self.level = self.high();
    }

    fn set_level_low(&mut self) {
        self.level = self.low();
    }

    fn toggle_level(&mut self) {
        self.level = if self.level == self.low() {
            self.high()
        } else {
            self.low()
        };
    }

    fn advance(&mut self, ticks: u64) {
        self.total_ticks += ticks;
        let scaled = self.remainder + ticks * u64::from(self.config.sample_rate);
        let count = (scaled / CPU_FREQ) as usize;
        self.remainder = scaled % CPU_FREQ;
        self.samples.resize(self.samples.len() + count, self.level);
    }

    fn finish(&mut self) {
        self.complete = true;
    }

    fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::TICKS_PER_MS;

    #[test]
    fn one_second_is_one_second_of_samples() {
        let mut pcm = PcmSink::default();
        pcm.start();
        for _ in 0..1000 {
            pcm.advance_one_millisecond();
        }
        assert_eq!(pcm.samples().len(), 44_100);
        assert_eq!(pcm.total_ticks(), 1000 * TICKS_PER_MS);
    }

    #[test]
    fn reused_sink_renders_the_same_samples() {
        // TAP playback does not force the level low, so a second render
        // must start from the null level again.
        let image = crate::TapeImage::new(vec![1, 0, 0xFF]);
        let mut pcm = PcmSink::default();
        image.play(&mut pcm, &mut crate::Silent).expect("first");
        let first = pcm.samples().to_vec();
        image.play(&mut pcm, &mut crate::Silent).expect("second");
        assert_eq!(pcm.samples(), first.as_slice());
    }

    #[test]
    fn short_spans_carry_their_remainder() {
        // 855 ticks is ~10.77 samples at 44.1 kHz; the fractions must add up.
        let mut pcm = PcmSink::default();
        pcm.start();
        for _ in 0..1000 {
            pcm.advance(855);
        }
        let expected = 855 * 1000 * 44_100 / CPU_FREQ;
        assert_eq!(pcm.samples().len() as u64, expected);
    }

    #[test]
    fn toggle_from_null_goes_low_then_high() {
        let config = PcmConfig {
            sample_rate: 3500,
            amplitude: 1000,
        };
        let mut pcm = PcmSink::new(config);
        pcm.start();
        pcm.advance(1000);
        pcm.toggle_level();
        pcm.advance(1000);
        pcm.toggle_level();
        pcm.advance(1000);
        assert_eq!(pcm.samples(), &[0, -1000, 1000]);
    }

    #[test]
    fn forced_levels() {
        let config = PcmConfig {
            sample_rate: 3500,
            amplitude: 7,
        };
        let mut pcm = PcmSink::new(config);
        pcm.start();
        pcm.set_level_high();
        pcm.advance(2000);
        pcm.set_level_low();
        pcm.advance(1000);
        assert_eq!(pcm.samples(), &[7, 7, -7]);
    }

    #[test]
    fn complete_only_after_finish() {
        let mut pcm = PcmSink::default();
        pcm.start();
        pcm.advance(10_000);
        assert!(!pcm.is_complete());
        pcm.finish();
        assert!(pcm.is_complete());
        pcm.start();
        assert!(!pcm.is_complete());
        assert!(pcm.samples().is_empty());
    }

    #[cfg(feature = "wav")]
    #[test]
    fn wav_bytes_round_trip_through_hound() {
        let mut pcm = PcmSink::default();
        pcm.start();
        pcm.set_level_high();
        pcm.advance(35_000);
        pcm.finish();

        let bytes = pcm.to_wav_bytes().expect("wav encode");
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).expect("wav decode");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .expect("samples");
        assert_eq!(samples.len(), 441);
        assert!(samples.iter().all(|&s| s == PcmConfig::DEFAULT_AMPLITUDE));
    }
}
