//! TZX block interpreter.
//!
//! Walks the block table with a cursor and replays each block into a
//! [`SignalSink`]. Loop blocks move the cursor backwards; everything else
//! advances it by one.

use std::ops::Range;

use crate::block::{Block, BlockReader};
use crate::diagnostics::{ArchiveEntry, Diagnostic, Diagnostics, HardwareEntry};
use crate::error::Result;
use crate::generalized;
use crate::index::BlockTable;
use crate::pulse::{data_bits, direct_samples, pause, pulse, pulse_train};
use crate::sink::SignalSink;
use crate::timing::{PulseTiming, STOP_TAPE_PAUSE_MS};

/// Active loop (0x24 .. 0x25). Loops don't nest; a new loop start
/// replaces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoopContext {
    remaining: u16,
    return_index: usize,
}

struct Interpreter<'a, S: ?Sized, D: ?Sized> {
    data: &'a [u8],
    table: &'a BlockTable,
    sink: &'a mut S,
    diagnostics: &'a mut D,
    cursor: usize,
    active_loop: Option<LoopContext>,
}

/// Replay every block of an indexed TZX image.
///
/// Brackets the blocks with the initial low level and the trailing
/// settling millisecond. `start()` and `finish()` are the caller's.
pub(crate) fn play_tzx<S, D>(
    data: &[u8],
    table: &BlockTable,
    sink: &mut S,
    diagnostics: &mut D,
) -> Result<()>
where
    S: SignalSink + ?Sized,
    D: Diagnostics + ?Sized,
{
    let mut interpreter = Interpreter {
        data,
        table,
        sink,
        diagnostics,
        cursor: 0,
        active_loop: None,
    };
    interpreter.run()
}

impl<S, D> Interpreter<'_, S, D>
where
    S: SignalSink + ?Sized,
    D: Diagnostics + ?Sized,
{
    fn run(&mut self) -> Result<()> {
        self.sink.set_level_low();
        while let Some(entry) = self.table.get(self.cursor) {
            let block = Block::decode(self.data, self.cursor, entry)?;
            self.cursor = self.step(block, BlockReader::new(self.data, self.cursor, entry))?;
        }
        self.sink.advance_one_millisecond();
        Ok(())
    }

    /// Play one block and return the index of the next one.
    fn step(&mut self, block: Block, reader: BlockReader<'_>) -> Result<usize> {
        let index = self.cursor;
        let data = self.data;

        match block {
            Block::StandardSpeed { pause_ms, data: range } => {
                let payload = &data[range];
                pulse_train(self.sink, &PulseTiming::standard(payload), payload);
                pause(self.sink, pause_ms);
            }
            Block::TurboSpeed {
                timing,
                pause_ms,
                data: range,
            } => {
                pulse_train(self.sink, &timing, &data[range]);
                pause(self.sink, pause_ms);
            }
            Block::PureTone { pulse_len, count } => {
                for _ in 0..count {
                    pulse(self.sink, pulse_len);
                }
            }
            Block::PulseSequence { pulses } => {
                for len in data[pulses].chunks_exact(2) {
                    pulse(self.sink, u16::from(len[0]) | (u16::from(len[1]) << 8));
                }
            }
            Block::PureData {
                zero_pulse,
                one_pulse,
                used_bits,
                pause_ms,
                data: range,
            } => {
                data_bits(self.sink, &data[range], zero_pulse, one_pulse, used_bits);
                pause(self.sink, pause_ms);
            }
            Block::DirectRecording {
                tstates_per_sample,
                pause_ms,
                used_bits,
                data: range,
            } => {
                direct_samples(self.sink, &data[range], tstates_per_sample, used_bits);
                pause(self.sink, pause_ms);
            }
            Block::Generalized(gdb) => {
                let tables = reader.confine(gdb.tables.clone());
                generalized::play(self.sink, self.diagnostics, &tables, &gdb)?;
                pause(self.sink, gdb.pause_ms);
            }
            Block::Pause { duration_ms } => {
                let duration_ms = if duration_ms == 0 {
                    STOP_TAPE_PAUSE_MS
                } else {
                    duration_ms
                };
                pause(self.sink, duration_ms);
            }
            Block::LoopStart { repetitions } => {
                self.active_loop = Some(LoopContext {
                    remaining: repetitions,
                    return_index: index + 1,
                });
            }
            Block::LoopEnd => {
                if let Some(ctx) = self.active_loop.as_mut() {
                    if ctx.remaining > 0 {
                        ctx.remaining -= 1;
                        return Ok(ctx.return_index);
                    }
                    self.active_loop = None;
                }
            }
            Block::SetSignalLevel { high } => {
                if high {
                    self.sink.set_level_high();
                } else {
                    self.sink.set_level_low();
                }
            }
            Block::GroupStart { name } => self.diagnostics.report(Diagnostic::GroupStart {
                name: text(data, name),
            }),
            Block::GroupEnd => {}
            Block::TextDescription { text: range } => {
                self.diagnostics.report(Diagnostic::Text {
                    text: text(data, range),
                });
            }
            Block::Message {
                seconds,
                text: range,
            } => self.diagnostics.report(Diagnostic::Message {
                seconds,
                text: text(data, range),
            }),
            Block::ArchiveInfo { body } => self.report_archive_info(&data[body]),
            Block::HardwareType { entries } => {
                let entries = data[entries]
                    .chunks_exact(3)
                    .map(|e| HardwareEntry {
                        hardware_type: e[0],
                        hardware_id: e[1],
                        relation: e[2],
                    })
                    .collect();
                self.diagnostics.report(Diagnostic::HardwareInfo { entries });
            }
            Block::CustomInfo { ident, data: range } => {
                self.diagnostics.report(Diagnostic::CustomInfo {
                    ident: text(data, ident).trim_end().to_string(),
                    len: range.len(),
                });
            }
            Block::Glue => self.diagnostics.report(Diagnostic::Glue),
            Block::Deprecated { id } => self
                .diagnostics
                .report(Diagnostic::Deprecated { index, id }),
            Block::Unsupported { id } => self
                .diagnostics
                .report(Diagnostic::Unsupported { index, id }),
        }

        Ok(index + 1)
    }

    /// Archive info body: count byte, then `(field, len, text)` entries.
    fn report_archive_info(&mut self, body: &[u8]) {
        let count = body.first().copied().unwrap_or(0);
        let mut entries = Vec::with_capacity(usize::from(count));
        let mut pos = 1;

        for _ in 0..count {
            let (Some(&field), Some(&len)) = (body.get(pos), body.get(pos + 1)) else {
                break;
            };
            let start = pos + 2;
            let end = start + usize::from(len);
            let text = body.get(start..end.min(body.len())).unwrap_or_default();
            entries.push(ArchiveEntry {
                field,
                text: String::from_utf8_lossy(text).to_string(),
            });
            pos = end;
        }

        self.diagnostics.report(Diagnostic::ArchiveInfo { entries });
        if pos != body.len() {
            self.diagnostics.report(Diagnostic::ArchiveLengthMismatch {
                declared: body.len(),
                actual: pos,
            });
        }
    }
}

fn text(data: &[u8], range: Range<usize>) -> String {
    String::from_utf8_lossy(&data[range]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{BlockTable, SIGNATURE};
    use crate::sink::TickCounter;
    use crate::sink::testing::{Event, EventLog};
    use crate::timing::TICKS_PER_MS;

    fn tzx(blocks: &[&[u8]]) -> Vec<u8> {
        let mut data = SIGNATURE.to_vec();
        data.extend_from_slice(&[1, 20]);
        for block in blocks {
            data.extend_from_slice(block);
        }
        data
    }

    fn play(data: &[u8]) -> (EventLog, Vec<Diagnostic>) {
        let table = BlockTable::build(data).expect("index");
        let mut log = EventLog::default();
        let mut diags = Vec::new();
        play_tzx(data, &table, &mut log, &mut diags).expect("play");
        (log, diags)
    }

    fn ticks(data: &[u8]) -> u64 {
        let table = BlockTable::build(data).expect("index");
        let mut counter = TickCounter::new();
        play_tzx(data, &table, &mut counter, &mut crate::Silent).expect("play");
        counter.total_ticks()
    }

    const PURE_TONE_3X100: &[u8] = &[0x12, 100, 0, 3, 0];

    #[test]
    fn brackets_with_low_level_and_final_millisecond() {
        let (log, _) = play(&tzx(&[PURE_TONE_3X100]));
        assert_eq!(log.events.first(), Some(&Event::Low));
        assert_eq!(log.events.last(), Some(&Event::Advance(TICKS_PER_MS)));
        assert_eq!(log.toggles(), 3);
    }

    #[test]
    fn pulse_sequence_plays_each_length() {
        let (log, _) = play(&tzx(&[&[0x13, 3, 10, 0, 20, 0, 0x2C, 0x01]]));
        assert_eq!(log.advances(), vec![10, 20, 300, TICKS_PER_MS]);
    }

    #[test]
    fn pause_zero_stops_for_five_seconds() {
        assert_eq!(ticks(&tzx(&[&[0x20, 0, 0]])), 5000 * TICKS_PER_MS + TICKS_PER_MS);
        assert_eq!(ticks(&tzx(&[&[0x20, 10, 0]])), 10 * TICKS_PER_MS + TICKS_PER_MS);
    }

    #[test]
    fn loop_replays_body_count_plus_one_times() {
        let data = tzx(&[&[0x24, 2, 0], PURE_TONE_3X100, &[0x25]]);
        let (log, _) = play(&data);
        assert_eq!(log.toggles(), 3 * 3);
    }

    #[test]
    fn loop_of_zero_plays_once() {
        let data = tzx(&[&[0x24, 0, 0], PURE_TONE_3X100, &[0x25]]);
        let (log, _) = play(&data);
        assert_eq!(log.toggles(), 3);
    }

    #[test]
    fn loop_end_without_start_is_ignored() {
        let data = tzx(&[&[0x25], PURE_TONE_3X100, &[0x25]]);
        let (log, diags) = play(&data);
        assert_eq!(log.toggles(), 3);
        assert!(diags.is_empty());
    }

    #[test]
    fn second_loop_start_replaces_the_first() {
        let data = tzx(&[
            &[0x24, 5, 0],
            &[0x24, 1, 0],
            PURE_TONE_3X100,
            &[0x25],
        ]);
        let (log, _) = play(&data);
        assert_eq!(log.toggles(), 3 * 2);
    }

    #[test]
    fn set_signal_level_forces_level() {
        let (log, _) = play(&tzx(&[
            &[0x2B, 1, 0, 0, 0, 1],
            &[0x2B, 1, 0, 0, 0, 0],
        ]));
        assert_eq!(
            log.events,
            vec![
                Event::Low,
                Event::High,
                Event::Low,
                Event::Advance(TICKS_PER_MS)
            ]
        );
    }

    #[test]
    fn unsupported_and_deprecated_are_skipped_with_reports() {
        let data = tzx(&[
            &[0x18, 2, 0, 0, 0, 0xAA, 0xBB],
            &[0x34, 0, 0, 0, 0, 0, 0, 0, 0],
            PURE_TONE_3X100,
        ]);
        let (log, diags) = play(&data);
        assert_eq!(log.toggles(), 3);
        assert_eq!(
            diags,
            vec![
                Diagnostic::Unsupported { index: 0, id: 0x18 },
                Diagnostic::Deprecated { index: 1, id: 0x34 },
            ]
        );
    }

    #[test]
    fn metadata_blocks_are_reported() {
        let mut custom = vec![0x35];
        custom.extend_from_slice(b"POKEs           ");
        custom.extend_from_slice(&[3, 0, 0, 0, 1, 2, 3]);
        let data = tzx(&[
            &[0x21, 4, b'S', b'i', b'd', b'e'],
            &[0x22],
            &[0x30, 2, b'h', b'i'],
            &[0x31, 3, 2, b'o', b'k'],
            &[0x33, 1, 0x00, 0x01, 0x00],
            &custom,
            &[0x5A, b'X', b'T', b'a', b'p', b'e', b'!', 0x1A, 1, 20],
        ]);
        let (log, diags) = play(&data);
        assert_eq!(log.toggles(), 0);
        assert_eq!(
            diags,
            vec![
                Diagnostic::GroupStart {
                    name: "Side".to_string()
                },
                Diagnostic::Text {
                    text: "hi".to_string()
                },
                Diagnostic::Message {
                    seconds: 3,
                    text: "ok".to_string()
                },
                Diagnostic::HardwareInfo {
                    entries: vec![HardwareEntry {
                        hardware_type: 0,
                        hardware_id: 1,
                        relation: 0,
                    }]
                },
                Diagnostic::CustomInfo {
                    ident: "POKEs".to_string(),
                    len: 3
                },
                Diagnostic::Glue,
            ]
        );
    }

    #[test]
    fn archive_info_checks_declared_length() {
        // count 1, field 0, len 3, "Foo"
        let (_, diags) = play(&tzx(&[&[0x32, 6, 0, 1, 0x00, 3, b'F', b'o', b'o']]));
        assert_eq!(
            diags,
            vec![Diagnostic::ArchiveInfo {
                entries: vec![ArchiveEntry {
                    field: 0,
                    text: "Foo".to_string()
                }]
            }]
        );

        // Declared 7 bytes, entries only use 6.
        let (_, diags) = play(&tzx(&[&[0x32, 7, 0, 1, 0x00, 3, b'F', b'o', b'o', 0]]));
        assert_eq!(
            diags[1],
            Diagnostic::ArchiveLengthMismatch {
                declared: 7,
                actual: 6
            }
        );
    }

    #[test]
    fn truncated_block_aborts_after_earlier_blocks() {
        let data = tzx(&[PURE_TONE_3X100, &[0x10, 0, 0, 0x20, 0, 0xFF]]);
        let table = BlockTable::build(&data).expect("index");
        let mut log = EventLog::default();
        let err = play_tzx(&data, &table, &mut log, &mut crate::Silent).expect_err("truncated");
        assert!(matches!(
            err,
            crate::TapeError::TruncatedBlock { index: 1, id: 0x10, .. }
        ));
        assert_eq!(log.toggles(), 3);
        assert_ne!(log.events.last(), Some(&Event::Advance(TICKS_PER_MS)));
    }

    #[test]
    fn direct_recording_then_pause() {
        // 79 T-states per sample, pause 2 ms, 2 bits of one byte.
        let (log, _) = play(&tzx(&[&[0x15, 79, 0, 2, 0, 2, 1, 0, 0, 0b1000_0000]]));
        assert_eq!(
            log.events,
            vec![
                Event::Low,
                Event::High,
                Event::Advance(79),
                Event::Low,
                Event::Advance(79),
                Event::Advance(TICKS_PER_MS),
                Event::Low,
                Event::Advance(TICKS_PER_MS),
                Event::Advance(TICKS_PER_MS),
            ]
        );
    }

    #[test]
    fn pure_data_has_no_pilot() {
        // zero 100, one 200, 8 bits used, pause 0, one byte 0x80
        let (log, _) = play(&tzx(&[&[0x14, 100, 0, 200, 0, 8, 0, 0, 1, 0, 0, 0x80]]));
        let mut expected = vec![200, 200];
        expected.extend(std::iter::repeat_n(100, 14));
        expected.extend([TICKS_PER_MS, TICKS_PER_MS]);
        assert_eq!(log.advances(), expected);
    }
}
