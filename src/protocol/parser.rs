//! Bitmap-Driven Command Parser
//!
//! This module walks a buffer of pipelined RESP commands and writes
//! [`ParsedSlot`] records into a caller-provided array. The buffer is never
//! copied: every slot is a byte range into it.
//!
//! ## How the Parser Works
//!
//! Before parsing, the caller scans the buffer once into [`Bitmaps`]. The
//! state machine then moves a [`Lockstep`] cursor over the buffer and the
//! bitmaps together:
//!
//! ```text
//! ExpectArrayHeader ──► ExpectArgumentLength ──► ExpectArgumentBody ──► Done
//!                              ▲                        │
//!                              └──────── N times ───────┘
//! ```
//!
//! Each command either commits completely or not at all. A call reports one
//! of three outcomes:
//! - **Incomplete**: wait for more bytes and parse again from the start of
//!   the uncommitted tail
//! - **Capacity-limited**: drain the written slots and parse again with room
//!   for more
//! - **Malformed**: a terminal [`SlotKind::Malformed`] slot was written and
//!   the connection should be dropped
//!
//! The parser holds no state between calls. After `Incomplete` the caller
//! keeps the unconsumed tail, appends the new bytes and rescans.
//!
//! ## Framing Modes
//!
//! [`CommandParser::take_command`] frames without resolving the name: the
//! command slot spans the `*<count>\r\n` header and every bulk string,
//! command name included, gets its own argument slot (`count + 1` slots).
//!
//! [`CommandParser::take_resolved_command`] and the batch loop fold the name
//! into the command slot, which then spans the name and carries the
//! resolved [`Command`] (`count` slots).
//!
//! [`SlotKind::Malformed`]: crate::protocol::types::SlotKind::Malformed

use crate::commands::{Command, CommandTable, ResolveCommand};
use crate::protocol::number::{parse_positive_int, take_positive_number, NumberError};
use crate::protocol::types::{ParsedSlot, ProtocolError, CRLF, MAX_BULK_SIZE};
use crate::scan::{Bitmaps, ByteClass, Lockstep};
use tracing::trace;

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Longest bulk string accepted, in bytes
    pub max_bulk_len: usize,

    /// Reject count and length fields with leading zeros (`$03`)
    pub strict_numbers: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_bulk_len: MAX_BULK_SIZE,
            strict_numbers: false,
        }
    }
}

/// A command that was parsed completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Offset of the command's `*`.
    pub start: usize,
    /// Offset just past the command's final `\r\n`.
    pub end: usize,
    /// Slots written for this command.
    pub slots: usize,
    /// The resolved name ([`Command::Unknown`] when framing raw).
    pub command: Command,
}

impl Frame {
    /// Bytes the command occupies.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the frame covers no bytes. Never true for a parsed command.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Why a single command was not parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The buffer ends inside the command.
    Incomplete,
    /// The output array has no room for the command.
    CapacityLimited,
    /// The command violates the grammar at byte offset `at`. A malformed
    /// slot was written at index 0 of the output array.
    Malformed { error: ProtocolError, at: usize },
}

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchStatus {
    /// Every byte of the buffer was consumed.
    #[default]
    Drained,
    /// The buffer ends inside a command.
    Incomplete,
    /// The next command does not fit in the remaining slots.
    CapacityLimited,
    /// Malformed input at byte offset `at`. The last used slot is the
    /// malformed marker.
    Malformed { error: ProtocolError, at: usize },
}

/// The outcome of [`CommandParser::take_multiple_commands`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Batch {
    /// Slots written, including a trailing malformed marker.
    pub used_slots: usize,
    /// Bytes covered by committed commands.
    pub bytes_consumed: usize,
    /// Number of committed commands.
    pub commands: usize,
    /// Why the batch stopped.
    pub status: BatchStatus,
}

impl Batch {
    /// Slots that belong to committed commands.
    pub fn committed_slots(&self) -> usize {
        match self.status {
            BatchStatus::Malformed { .. } => self.used_slots - 1,
            _ => self.used_slots,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.status, BatchStatus::Malformed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Raw,
    Resolved,
}

/// The command-frame state machine.
#[derive(Debug, Clone, Default)]
pub struct CommandParser<R = CommandTable> {
    resolver: R,
    config: ParserConfig,
}

impl CommandParser<CommandTable> {
    /// A parser over the built-in command table.
    pub fn new() -> Self {
        Self::with_resolver(CommandTable)
    }
}

impl<R: ResolveCommand> CommandParser<R> {
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Scans `buf` and parses as many commands as fit in `out`.
    pub fn parse(&self, buf: &[u8], out: &mut [ParsedSlot]) -> Batch {
        let maps = Bitmaps::scan(buf);
        self.take_multiple_commands(buf, &maps, out)
    }

    /// Frames one command starting at `start` without resolving its name.
    ///
    /// On success `out[0]` spans the array header and `out[1..=count]` hold
    /// one argument slot per bulk string.
    pub fn take_command(
        &self,
        buf: &[u8],
        maps: &Bitmaps,
        start: usize,
        out: &mut [ParsedSlot],
    ) -> Result<Frame, Stop> {
        self.take(buf, maps, start, out, Framing::Raw)
    }

    /// Parses one command starting at `start` and resolves its name.
    ///
    /// On success `out[0]` is the command slot spanning the name and
    /// `out[1..count]` hold the remaining arguments.
    pub fn take_resolved_command(
        &self,
        buf: &[u8],
        maps: &Bitmaps,
        start: usize,
        out: &mut [ParsedSlot],
    ) -> Result<Frame, Stop> {
        self.take(buf, maps, start, out, Framing::Resolved)
    }

    /// Parses commands from the start of `buf` until it runs out of bytes,
    /// out of slots, or hits malformed input.
    ///
    /// `maps` must have been scanned over exactly `buf`.
    pub fn take_multiple_commands(
        &self,
        buf: &[u8],
        maps: &Bitmaps,
        out: &mut [ParsedSlot],
    ) -> Batch {
        let mut batch = Batch::default();

        while batch.bytes_consumed < buf.len() {
            let slots = &mut out[batch.used_slots..];
            match self.take_resolved_command(buf, maps, batch.bytes_consumed, slots) {
                Ok(frame) => {
                    batch.used_slots += frame.slots;
                    batch.bytes_consumed = frame.end;
                    batch.commands += 1;
                }
                Err(Stop::Incomplete) => {
                    batch.status = BatchStatus::Incomplete;
                    break;
                }
                Err(Stop::CapacityLimited) => {
                    batch.status = BatchStatus::CapacityLimited;
                    break;
                }
                Err(Stop::Malformed { error, at }) => {
                    batch.used_slots += 1;
                    batch.status = BatchStatus::Malformed { error, at };
                    break;
                }
            }
        }

        trace!(
            len = buf.len(),
            commands = batch.commands,
            slots = batch.used_slots,
            consumed = batch.bytes_consumed,
            status = ?batch.status,
            "parsed batch"
        );
        batch
    }

    fn take(
        &self,
        buf: &[u8],
        maps: &Bitmaps,
        start: usize,
        out: &mut [ParsedSlot],
        framing: Framing,
    ) -> Result<Frame, Stop> {
        if start >= buf.len() {
            return Err(Stop::Incomplete);
        }
        if out.is_empty() {
            return Err(Stop::CapacityLimited);
        }

        let mut cursor = Lockstep::new(buf, maps, start);
        match self.frame(&mut cursor, out, framing) {
            Err(Stop::Malformed { error, at }) => {
                let end = (at + 1).min(buf.len());
                out[0] = ParsedSlot::malformed(error, start, end);
                Err(Stop::Malformed { error, at })
            }
            result => result,
        }
    }

    fn frame(
        &self,
        cursor: &mut Lockstep<'_>,
        out: &mut [ParsedSlot],
        framing: Framing,
    ) -> Result<Frame, Stop> {
        let start = cursor.position();

        // ExpectArrayHeader
        if cursor.remaining() == 0 {
            return Err(Stop::Incomplete);
        }
        if !cursor.is_set(ByteClass::Asterisk) {
            return Err(malformed(ProtocolError::ExpectedArray, start));
        }
        cursor.advance(1);

        let count = self.number(cursor)?;
        if count == 0 {
            return Err(malformed(ProtocolError::EmptyCommand, start + 1));
        }
        let header_end = cursor.position();

        let count = count as usize;
        let slots = match framing {
            Framing::Raw => count + 1,
            Framing::Resolved => count,
        };
        if slots > out.len() {
            return Err(Stop::CapacityLimited);
        }

        // ExpectArgumentLength / ExpectArgumentBody, N times. Arguments are
        // written ahead of the command slot, which is only written once the
        // whole command is known to be valid.
        let mut command = Command::Unknown;
        let mut name = (start, header_end);
        for index in 0..count {
            let (payload, end) = self.bulk_string(cursor)?;

            match framing {
                Framing::Raw => out[index + 1] = ParsedSlot::argument(payload, end),
                Framing::Resolved if index == 0 => {
                    let bytes = &cursor.buffer()[payload..end - CRLF.len()];
                    command = self
                        .resolver
                        .resolve(bytes)
                        .ok_or_else(|| malformed(ProtocolError::UnknownCommand, payload))?;
                    name = (payload, end);
                }
                Framing::Resolved => out[index] = ParsedSlot::argument(payload, end),
            }
        }

        out[0] = ParsedSlot::command(command, count as u32, name.0, name.1);
        Ok(Frame {
            start,
            end: cursor.position(),
            slots,
            command,
        })
    }

    /// `$<len>\r\n<payload>\r\n`. Returns the payload range, CRLF included.
    fn bulk_string(&self, cursor: &mut Lockstep<'_>) -> Result<(usize, usize), Stop> {
        let at = cursor.position();
        if cursor.remaining() == 0 {
            return Err(Stop::Incomplete);
        }
        if !cursor.is_set(ByteClass::Dollar) {
            return Err(malformed(ProtocolError::ExpectedBulkString, at));
        }
        cursor.advance(1);

        let len = self.number(cursor)? as usize;
        if len > self.config.max_bulk_len {
            return Err(malformed(ProtocolError::BulkTooLarge, at + 1));
        }

        let payload = cursor.position();
        let remaining = cursor.remaining();
        if len + CRLF.len() > remaining {
            // The byte after the payload is already here and cannot start
            // the terminator.
            if len < remaining && cursor.rest()[len] != b'\r' {
                return Err(malformed(ProtocolError::MissingCrlf, payload + len));
            }
            return Err(Stop::Incomplete);
        }

        cursor.advance(len);
        if !cursor.is_set(ByteClass::CrLf) {
            return Err(malformed(ProtocolError::MissingCrlf, cursor.position()));
        }
        cursor.advance(CRLF.len());

        Ok((payload, cursor.position()))
    }

    /// A count or length field and its CRLF.
    fn number(&self, cursor: &mut Lockstep<'_>) -> Result<u32, Stop> {
        let field = cursor.rest();
        let start = cursor.position();

        let value = take_positive_number(cursor).map_err(|e| match e {
            NumberError::Incomplete => Stop::Incomplete,
            NumberError::Invalid(error) => malformed(error, cursor.position()),
        })?;

        if self.config.strict_numbers {
            let line = &field[..cursor.position() - start];
            if parse_positive_int(line).is_none() {
                return Err(malformed(ProtocolError::LeadingZero, start));
            }
        }
        Ok(value)
    }
}

#[inline]
fn malformed(error: ProtocolError, at: usize) -> Stop {
    Stop::Malformed { error, at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::PassThrough;
    use crate::protocol::types::SlotKind;
    use crate::scan::Kernel;
    use proptest::prelude::*;

    const PIPELINE: &[u8] = b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$5\r\nworld\r\n";

    fn encode(args: &[&[u8]]) -> Vec<u8> {
        let mut out = format!("*{}\r\n", args.len()).into_bytes();
        for arg in args {
            out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            out.extend_from_slice(arg);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    fn raw(buf: &[u8], capacity: usize) -> (Result<Frame, Stop>, Vec<ParsedSlot>) {
        let maps = Bitmaps::scan(buf);
        let mut out = vec![ParsedSlot::default(); capacity];
        let result = CommandParser::new().take_command(buf, &maps, 0, &mut out);
        (result, out)
    }

    fn batch(buf: &[u8], capacity: usize) -> (Batch, Vec<ParsedSlot>) {
        let mut out = vec![ParsedSlot::default(); capacity];
        let batch = CommandParser::new().parse(buf, &mut out);
        out.truncate(batch.used_slots);
        (batch, out)
    }

    #[test]
    fn test_take_command_single() {
        let buf = b"*1\r\n$12\r\nabcdefghijkl\r\n";
        let (result, out) = raw(buf, 4);
        let frame = result.unwrap();

        assert_eq!(frame.slots, 2);
        assert_eq!(frame.end, buf.len());
        assert_eq!(frame.command, Command::Unknown);

        assert_eq!(out[0].argument_count(), Some(1));
        assert_eq!(out[0].bytes(buf), b"*1\r\n");
        assert_eq!(out[1].kind, SlotKind::Argument);
        assert_eq!(out[1].bytes(buf), b"abcdefghijkl\r\n");
        assert_eq!(out[1].payload(buf), b"abcdefghijkl");
    }

    #[test]
    fn test_take_command_every_truncation_is_incomplete() {
        let full = b"*1\r\n$12\r\nabcdefghijkl\r\n";
        for len in 0..full.len() {
            let buf = &full[..len];
            let (result, _) = raw(buf, 4);
            assert_eq!(result, Err(Stop::Incomplete), "truncated to {len}");

            let mut out = vec![ParsedSlot::default(); 4];
            let batch = CommandParser::with_resolver(PassThrough).parse(buf, &mut out);
            assert_eq!(batch.used_slots, 0, "truncated to {len}");
            assert_eq!(batch.bytes_consumed, 0, "truncated to {len}");
            let expected = if len == 0 {
                BatchStatus::Drained
            } else {
                BatchStatus::Incomplete
            };
            assert_eq!(batch.status, expected, "truncated to {len}");
        }
    }

    #[test]
    fn test_take_command_capacity() {
        let buf = b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n";
        assert_eq!(raw(buf, 2).0, Err(Stop::CapacityLimited));
        assert_eq!(raw(buf, 0).0, Err(Stop::CapacityLimited));
        assert_eq!(raw(buf, 3).0.unwrap().slots, 3);
    }

    #[test]
    fn test_empty_input_is_incomplete_before_capacity() {
        let parser = CommandParser::new();
        let maps = Bitmaps::scan(b"");
        assert_eq!(raw(b"", 0).0, Err(Stop::Incomplete));
        assert_eq!(
            parser.take_resolved_command(b"", &maps, 0, &mut []),
            Err(Stop::Incomplete)
        );

        let buf = b"*1\r\n$4\r\nPING\r\n";
        let maps = Bitmaps::scan(buf);
        assert_eq!(
            parser.take_command(buf, &maps, buf.len(), &mut []),
            Err(Stop::Incomplete)
        );
    }

    #[test]
    fn test_take_resolved_command() {
        let buf = b"*2\r\n$3\r\nget\r\n$5\r\nworld\r\n";
        let maps = Bitmaps::scan(buf);
        let mut out = [ParsedSlot::default(); 2];
        let frame = CommandParser::new()
            .take_resolved_command(buf, &maps, 0, &mut out)
            .unwrap();

        assert_eq!(frame.slots, 2);
        assert_eq!(frame.command, Command::Get);
        assert_eq!(out[0].resolved_command(), Some(Command::Get));
        assert_eq!(out[0].argument_count(), Some(2));
        assert_eq!(out[0].payload(buf), b"get");
        assert_eq!(out[1].payload(buf), b"world");
    }

    #[test]
    fn test_batch_ping_get() {
        let (batch, out) = batch(PIPELINE, 16);

        assert_eq!(batch.status, BatchStatus::Drained);
        assert_eq!(batch.used_slots, 3);
        assert_eq!(batch.commands, 2);
        assert_eq!(batch.bytes_consumed, PIPELINE.len());

        assert_eq!(out[0].resolved_command(), Some(Command::Ping));
        assert_eq!(out[0].argument_count(), Some(1));
        assert_eq!(out[1].resolved_command(), Some(Command::Get));
        assert_eq!(out[1].argument_count(), Some(2));
        assert_eq!(out[2].payload(PIPELINE), b"world");
    }

    #[test]
    fn test_batch_capacity_limited() {
        let (batch, out) = batch(PIPELINE, 1);

        assert_eq!(batch.status, BatchStatus::CapacityLimited);
        assert_eq!(batch.used_slots, 1);
        assert_eq!(batch.bytes_consumed, 14);
        assert_eq!(out[0].resolved_command(), Some(Command::Ping));
    }

    #[test]
    fn test_batch_capacity_checked_before_malformed_tail() {
        // GET declares two elements; its body is garbage but is never looked at.
        let buf = b"*1\r\n$4\r\nPING\r\n*2\r\n!!!!";
        let (batch, _) = batch(buf, 2);
        assert_eq!(batch.status, BatchStatus::CapacityLimited);
        assert_eq!(batch.used_slots, 1);
        assert_eq!(batch.bytes_consumed, 14);
    }

    #[test]
    fn test_batch_incomplete_keeps_prior_commits() {
        let cut = PIPELINE.len() - 3;
        let (batch, _) = batch(&PIPELINE[..cut], 16);
        assert_eq!(batch.status, BatchStatus::Incomplete);
        assert_eq!(batch.used_slots, 1);
        assert_eq!(batch.bytes_consumed, 14);
    }

    #[test]
    fn test_batch_malformed_termination() {
        let mut pipeline = PIPELINE.to_vec();
        pipeline.extend_from_slice(&encode(&[b"ECHO", b"hi"]));
        let first = 14;
        let ends = [first, PIPELINE.len(), pipeline.len()];
        let slots = [1, 3, 5];

        // Every sigil and terminator outside the first command.
        let structural: Vec<usize> = (first..pipeline.len())
            .filter(|&i| matches!(pipeline[i], b'*' | b'$' | b'\r' | b'\n'))
            .collect();
        assert_eq!(structural.len(), 2 * (3 + 2 * 5));

        for pos in structural {
            let mut buf = pipeline.clone();
            buf[pos] = b'x';
            let (batch, out) = batch(&buf, 16);

            let done = ends.iter().rposition(|&end| end <= pos).unwrap();
            assert!(batch.is_malformed(), "corrupted byte {pos}: {:?}", batch.status);
            assert_eq!(batch.bytes_consumed, ends[done], "corrupted byte {pos}");
            assert_eq!(batch.used_slots, slots[done] + 1, "corrupted byte {pos}");
            assert_eq!(batch.committed_slots(), slots[done]);

            let marker = out[batch.used_slots - 1];
            assert!(marker.is_malformed());
            assert_eq!(marker.start, ends[done]);
            assert!(marker.end >= pos && marker.end <= buf.len());
        }
    }

    #[test]
    fn test_malformed_headers() {
        let cases: &[(&[u8], ProtocolError)] = &[
            (b"$1\r\na\r\n", ProtocolError::ExpectedArray),
            (b"PING\r\n", ProtocolError::ExpectedArray),
            (b"*0\r\n", ProtocolError::EmptyCommand),
            (b"*-1\r\n", ProtocolError::InvalidNumber),
            (b"*12345678901\r\n", ProtocolError::NumberTooLong),
            (b"*2147483648\r\n", ProtocolError::NumberOverflow),
            (b"*1\r\n+PING\r\n", ProtocolError::ExpectedBulkString),
            (b"*1\r\n$4\r\nPINGxx", ProtocolError::MissingCrlf),
            (b"*1\r\n$4\r\nPINGx", ProtocolError::MissingCrlf),
            (b"*1\r\n$4\r\nHELO\r\n", ProtocolError::UnknownCommand),
        ];

        for &(buf, expected) in cases {
            let (batch, out) = batch(buf, 8);
            match batch.status {
                BatchStatus::Malformed { error, .. } => {
                    assert_eq!(error, expected, "{}", buf.escape_ascii())
                }
                other => panic!("{} gave {other:?}", buf.escape_ascii()),
            }
            assert_eq!(batch.used_slots, 1);
            assert_eq!(batch.bytes_consumed, 0);
            assert_eq!(out[0].kind, SlotKind::Malformed(expected));
            assert_eq!(out[0].start, 0);
        }
    }

    #[test]
    fn test_unknown_command_in_name_discards_whole_command() {
        let mut buf = encode(&[b"PING"]);
        buf.extend_from_slice(&encode(&[b"NOPE", b"a", b"b"]));
        let (batch, out) = batch(&buf, 8);

        assert_eq!(batch.used_slots, 2);
        assert_eq!(batch.bytes_consumed, 14);
        assert_eq!(out[1].kind, SlotKind::Malformed(ProtocolError::UnknownCommand));
        assert_eq!(out[1].start, 14);
    }

    #[test]
    fn test_zero_length_argument() {
        let buf = encode(&[b"ECHO", b""]);
        let (batch, out) = batch(&buf, 4);
        assert_eq!(batch.status, BatchStatus::Drained);
        assert_eq!(out[1].payload(&buf), b"");
        assert_eq!(out[1].len(), 2);
    }

    #[test]
    fn test_binary_safe_payload() {
        let buf = encode(&[b"SET", b"key", b"\r\n*1\r\n$\x00\xff"]);
        let (batch, out) = batch(&buf, 4);
        assert_eq!(batch.status, BatchStatus::Drained);
        assert_eq!(batch.used_slots, 3);
        assert_eq!(out[2].payload(&buf), b"\r\n*1\r\n$\x00\xff");
    }

    #[test]
    fn test_strict_numbers() {
        let buf = b"*1\r\n$04\r\nPING\r\n";

        let (lenient, _) = batch(buf, 4);
        assert_eq!(lenient.status, BatchStatus::Drained);

        let parser = CommandParser::new().with_config(ParserConfig {
            strict_numbers: true,
            ..ParserConfig::default()
        });
        let mut out = [ParsedSlot::default(); 4];
        let strict = parser.parse(buf, &mut out);
        assert_eq!(
            strict.status,
            BatchStatus::Malformed {
                error: ProtocolError::LeadingZero,
                at: 5
            }
        );
        assert_eq!(out[0].bytes(buf), b"*1\r\n$0");
    }

    #[test]
    fn test_bulk_too_large() {
        let parser = CommandParser::new().with_config(ParserConfig {
            max_bulk_len: 8,
            ..ParserConfig::default()
        });
        let mut out = [ParsedSlot::default(); 4];

        let ok = encode(&[b"ECHO", b"12345678"]);
        assert_eq!(parser.parse(&ok, &mut out).status, BatchStatus::Drained);

        let big = encode(&[b"ECHO", b"123456789"]);
        let batch = parser.parse(&big, &mut out);
        assert!(matches!(
            batch.status,
            BatchStatus::Malformed {
                error: ProtocolError::BulkTooLarge,
                ..
            }
        ));
    }

    #[test]
    fn test_custom_resolver() {
        let only_ping = |name: &[u8]| name.eq_ignore_ascii_case(b"PING").then_some(Command::Ping);
        let parser = CommandParser::with_resolver(only_ping);
        let mut out = [ParsedSlot::default(); 8];

        let batch = parser.parse(PIPELINE, &mut out);
        assert_eq!(batch.commands, 1);
        assert_eq!(out[1].kind, SlotKind::Malformed(ProtocolError::UnknownCommand));
    }

    #[test]
    fn test_resume_after_incomplete() {
        let parser = CommandParser::new();
        let mut out = [ParsedSlot::default(); 8];
        let mut pending = Vec::new();
        let mut names = Vec::new();

        for chunk in PIPELINE.chunks(5) {
            pending.extend_from_slice(chunk);
            let batch = parser.parse(&pending, &mut out);
            for slot in &out[..batch.used_slots] {
                names.extend(slot.resolved_command());
            }
            pending.drain(..batch.bytes_consumed);
        }

        assert!(pending.is_empty());
        assert_eq!(names, [Command::Ping, Command::Get]);
    }

    fn command_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
        let name = prop::sample::select(Command::ALL).prop_map(|c| c.name().as_bytes().to_vec());
        let args = prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 0..4);
        (name, args).prop_map(|(name, mut args)| {
            args.insert(0, name);
            args
        })
    }

    proptest! {
        #[test]
        fn prop_pipelines_parse_on_every_kernel(
            commands in prop::collection::vec(command_strategy(), 1..12),
        ) {
            let mut buf = Vec::new();
            let mut expected_slots = 0;
            for args in &commands {
                let args: Vec<&[u8]> = args.iter().map(Vec::as_slice).collect();
                buf.extend_from_slice(&encode(&args));
                expected_slots += args.len();
            }

            for kernel in Kernel::available() {
                let maps = Bitmaps::scan_with(kernel, &buf);
                let mut out = vec![ParsedSlot::default(); expected_slots];
                let batch = CommandParser::new().take_multiple_commands(&buf, &maps, &mut out);

                prop_assert_eq!(batch.status, BatchStatus::Drained);
                prop_assert_eq!(batch.commands, commands.len());
                prop_assert_eq!(batch.used_slots, expected_slots);
                prop_assert_eq!(batch.bytes_consumed, buf.len());
            }
        }

        #[test]
        fn prop_truncation_commits_whole_commands(
            commands in prop::collection::vec(command_strategy(), 1..8),
            cut in any::<prop::sample::Index>(),
        ) {
            let mut buf = Vec::new();
            let mut ends = vec![0];
            for args in &commands {
                let args: Vec<&[u8]> = args.iter().map(Vec::as_slice).collect();
                buf.extend_from_slice(&encode(&args));
                ends.push(buf.len());
            }

            let cut = cut.index(buf.len() + 1);
            let (batch, _) = batch(&buf[..cut], 256);
            let committed = ends.iter().rposition(|&end| end <= cut).unwrap_or(0);

            prop_assert_eq!(batch.bytes_consumed, ends[committed]);
            prop_assert_eq!(batch.commands, committed);
            prop_assert!(!batch.is_malformed());
        }
    }
}
