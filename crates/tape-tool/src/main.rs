//! Command-line front end for the tape decoder.
//!
//! ```text
//! tape-tool info game.tzx
//! tape-tool duration game.tap
//! tape-tool wav game.tzx game.wav --rate 48000
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use format_tzx::timing::ticks_to_duration;
use format_tzx::{
    Diagnostic, PcmConfig, PcmSink, SignalSink, TapBlocks, TapeFormat, TapeImage, TickCounter,
    block_name,
};

#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the blocks of a tape and its playing time
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Container format (default: from the extension, then the signature)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Print the playing time of a tape in T-states and seconds
    Duration {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Render a tape to a 16-bit mono WAV file
    Wav {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "OUT")]
        out: PathBuf,
        /// Output sample rate in Hz
        #[arg(long, default_value_t = PcmConfig::DEFAULT_SAMPLE_RATE)]
        rate: u32,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Tap,
    Tzx,
}

impl From<FormatArg> for TapeFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Tap => Self::Tap,
            FormatArg::Tzx => Self::Tzx,
        }
    }
}

fn load(path: &Path, format: Option<FormatArg>) -> Result<TapeImage> {
    let context = || format!("failed to read {}", path.display());
    match format {
        Some(format) => {
            let bytes = std::fs::read(path).with_context(context)?;
            Ok(TapeImage::with_format(bytes, format.into()))
        }
        None => TapeImage::open(path).with_context(context),
    }
}

fn print_notes(notes: &[Diagnostic]) {
    for note in notes {
        eprintln!("{note}");
    }
}

fn info(path: &Path, format: Option<FormatArg>) -> Result<()> {
    let image = load(path, format)?;
    println!("File:    {}", path.display());
    println!("Format:  {}", image.format().name());
    println!("Size:    {} bytes", image.bytes().len());

    match image.format() {
        TapeFormat::Tzx => {
            let table = image.index()?;
            let header = table.header();
            println!("Version: {}.{:02}", header.major, header.minor);
            println!("Blocks:  {}", table.len());
            for (i, entry) in table.iter().enumerate() {
                println!(
                    "  {i:4}  @{:06X}  ${:02X}  {}",
                    entry.offset,
                    entry.id,
                    block_name(entry.id)
                );
            }
        }
        TapeFormat::Tap => {
            for (i, payload) in TapBlocks::new(image.bytes()).enumerate() {
                let payload = payload?;
                let kind = match payload.first() {
                    Some(&flag) if flag < 0x80 => "header",
                    Some(_) => "data",
                    None => "empty",
                };
                println!("  {i:4}  {:5} bytes  {kind}", payload.len());
            }
        }
    }

    let mut notes: Vec<Diagnostic> = Vec::new();
    let mut counter = TickCounter::new();
    image.play(&mut counter, &mut notes)?;
    print_notes(&notes);
    print_duration(counter.total_ticks());
    Ok(())
}

fn print_duration(ticks: u64) {
    let duration = ticks_to_duration(ticks);
    println!("Length:  {ticks} T-states ({:.3} s)", duration.as_secs_f64());
}

fn wav(path: &Path, out: &Path, rate: u32, format: Option<FormatArg>) -> Result<()> {
    let image = load(path, format)?;
    let config = PcmConfig {
        sample_rate: rate,
        ..PcmConfig::default()
    };
    let mut pcm = PcmSink::new(config);
    let mut notes: Vec<Diagnostic> = Vec::new();

    let decoded = image.play(&mut pcm, &mut notes);
    print_notes(&notes);
    if let Err(e) = &decoded {
        eprintln!("Decode stopped early: {e}");
        eprintln!("Writing incomplete render ({} samples)", pcm.samples().len());
    }

    pcm.save_wav(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "Wrote {} ({} samples at {} Hz)",
        out.display(),
        pcm.samples().len(),
        pcm.sample_rate()
    );

    decoded.context("tape did not decode completely")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file, format } => info(&file, format)?,
        Commands::Duration { file, format } => {
            let image = load(&file, format)?;
            print_duration(image.total_ticks()?);
        }
        Commands::Wav {
            file,
            out,
            rate,
            format,
        } => wav(&file, &out, rate, format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn wav_defaults_to_44k() {
        let cli = Cli::try_parse_from(["tape-tool", "wav", "in.tzx", "out.wav"]).expect("parse");
        match cli.command {
            Commands::Wav { rate, format, .. } => {
                assert_eq!(rate, 44_100);
                assert!(format.is_none());
            }
            _ => panic!("Expected wav command"),
        }
    }

    #[test]
    fn format_override() {
        let cli = Cli::try_parse_from(["tape-tool", "duration", "x.bin", "--format", "tap"])
            .expect("parse");
        match cli.command {
            Commands::Duration { format, .. } => {
                assert!(matches!(format, Some(FormatArg::Tap)));
            }
            _ => panic!("Expected duration command"),
        }
    }
}
