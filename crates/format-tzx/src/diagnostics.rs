//! Side channel for recoverable conditions and tape metadata.
//!
//! Nothing reported here stops a decode. Hosts that don't care pass
//! [`Silent`]; tests and tools collect into a `Vec<Diagnostic>`.

use std::fmt;

/// Which symbol stream of a generalized data block a report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStream {
    PilotSync,
    Data,
}

/// One text field of an archive info block (0x32).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub field: u8,
    pub text: String,
}

impl ArchiveEntry {
    /// Human-readable name of the field ID.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self.field {
            0x00 => "Full title",
            0x01 => "Software house/publisher",
            0x02 => "Author(s)",
            0x03 => "Year of publication",
            0x04 => "Language",
            0x05 => "Game/utility type",
            0x06 => "Price",
            0x07 => "Protection scheme/loader",
            0x08 => "Origin",
            _ => "Comment(s)",
        }
    }
}

/// One record of a hardware type block (0x33).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareEntry {
    pub hardware_type: u8,
    pub hardware_id: u8,
    pub relation: u8,
}

impl HardwareEntry {
    #[must_use]
    pub fn relation_name(&self) -> &'static str {
        match self.relation {
            0 => "runs on this hardware",
            1 => "needs this hardware",
            2 => "runs on this hardware but does not use its special features",
            3 => "does not run on this hardware",
            _ => "unknown relation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Block type this decoder does not play. Skipped.
    Unsupported { index: usize, id: u8 },
    /// Block type dropped from the format in TZX 1.20. Skipped.
    Deprecated { index: usize, id: u8 },
    GroupStart { name: String },
    Text { text: String },
    Message { seconds: u8, text: String },
    ArchiveInfo { entries: Vec<ArchiveEntry> },
    /// The archive info text lengths don't add up to the declared length.
    ArchiveLengthMismatch { declared: usize, actual: usize },
    HardwareInfo { entries: Vec<HardwareEntry> },
    CustomInfo { ident: String, len: usize },
    /// Merge point of two concatenated TZX files.
    Glue,
    /// Symbol definition with a starting polarity outside 0..=3.
    InvalidPolarity { value: u8 },
    /// Symbol index at or beyond the alphabet size. Skipped.
    SymbolOutOfRange { symbol: u16, alphabet_size: u16 },
    /// Alphabet size field of 0 read as 256.
    AlphabetClamped { stream: SymbolStream },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { index, id } => {
                write!(f, "block {index}: unsupported block type ${id:02X}, skipped")
            }
            Self::Deprecated { index, id } => {
                write!(f, "block {index}: deprecated block type ${id:02X}, skipped")
            }
            Self::GroupStart { name } => write!(f, "group: {name}"),
            Self::Text { text } => write!(f, "text: {text}"),
            Self::Message { seconds, text } => write!(f, "message ({seconds}s): {text}"),
            Self::ArchiveInfo { entries } => {
                write!(f, "archive info:")?;
                for entry in entries {
                    write!(f, "\n  {}: {}", entry.field_name(), entry.text)?;
                }
                Ok(())
            }
            Self::ArchiveLengthMismatch { declared, actual } => write!(
                f,
                "archive info declares {declared} bytes but its entries use {actual}"
            ),
            Self::HardwareInfo { entries } => {
                write!(f, "hardware info:")?;
                for entry in entries {
                    write!(
                        f,
                        "\n  type ${:02X} id ${:02X}: {}",
                        entry.hardware_type,
                        entry.hardware_id,
                        entry.relation_name()
                    )?;
                }
                Ok(())
            }
            Self::CustomInfo { ident, len } => write!(f, "custom info \"{ident}\" ({len} bytes)"),
            Self::Glue => write!(f, "glue block: concatenated TZX files"),
            Self::InvalidPolarity { value } => {
                write!(f, "symbol definition has invalid starting polarity {value}")
            }
            Self::SymbolOutOfRange {
                symbol,
                alphabet_size,
            } => write!(
                f,
                "symbol {symbol} outside alphabet of {alphabet_size}, skipped"
            ),
            Self::AlphabetClamped { stream } => {
                write!(f, "{stream:?} alphabet size 0 read as 256")
            }
        }
    }
}

/// Receiver of [`Diagnostic`] reports.
pub trait Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Diagnostics for Silent {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

impl Diagnostics for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_field_names() {
        let title = ArchiveEntry {
            field: 0x00,
            text: "Manic Miner".to_string(),
        };
        let comment = ArchiveEntry {
            field: 0xFF,
            text: "cracked".to_string(),
        };
        assert_eq!(title.field_name(), "Full title");
        assert_eq!(comment.field_name(), "Comment(s)");
    }

    #[test]
    fn vec_collects_reports() {
        let mut log: Vec<Diagnostic> = Vec::new();
        log.report(Diagnostic::Glue);
        log.report(Diagnostic::Unsupported { index: 2, id: 0x18 });
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[1].to_string(),
            "block 2: unsupported block type $18, skipped"
        );
    }

    #[test]
    fn archive_display_lists_entries() {
        let diag = Diagnostic::ArchiveInfo {
            entries: vec![
                ArchiveEntry {
                    field: 0x02,
                    text: "Matthew Smith".to_string(),
                },
                ArchiveEntry {
                    field: 0x03,
                    text: "1983".to_string(),
                },
            ],
        };
        assert_eq!(
            diag.to_string(),
            "archive info:\n  Author(s): Matthew Smith\n  Year of publication: 1983"
        );
    }
}
