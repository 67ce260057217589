//! TZX and TAP tape decoding for ZX Spectrum emulation.
//!
//! A tape image is turned into a sequence of mic-line edges timed in 3.5 MHz
//! T-states and pushed into a [`SignalSink`]. The same decode drives any of
//! the three shipped sinks:
//!
//! - [`TickCounter`]: counts ticks, for tape length and progress math
//! - [`PcmSink`]: renders 16-bit mono audio (WAV export behind `wav`)
//! - [`MachineSink`]: feeds a running [`TapeMachine`] with throttled progress
//!
//! ```no_run
//! use format_tzx::{Diagnostic, PcmSink, TapeImage};
//!
//! let image = TapeImage::open(std::path::Path::new("game.tzx"))?;
//! let mut pcm = PcmSink::default();
//! let mut notes: Vec<Diagnostic> = Vec::new();
//! image.play(&mut pcm, &mut notes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! TZX reference: <https://worldofspectrum.net/TZXformat.html>

pub mod block;
mod config;
mod diagnostics;
mod error;
mod generalized;
mod image;
mod index;
mod interpreter;
pub mod loader;
mod pulse;
pub mod sink;
mod tap;
pub mod timing;

pub use block::{Block, GeneralizedBlock, SymbolSet, block_name};
pub use config::{PcmConfig, ProgressConfig};
pub use diagnostics::{ArchiveEntry, Diagnostic, Diagnostics, HardwareEntry, Silent, SymbolStream};
pub use error::{Result, TapeError};
pub use image::{TapeFormat, TapeImage};
pub use index::{BlockEntry, BlockTable, HEADER_LEN, SIGNATURE, SUPPORTED_MAJOR, TzxHeader};
pub use loader::{LoadProgress, LoadReport, load_into, load_with_config};
pub use sink::{MachineSink, PcmSink, ProgressMeter, SignalSink, TapeMachine, TickCounter};
pub use tap::TapBlocks;
