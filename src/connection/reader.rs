//! Async Command Reader
//!
//! This module is the caller side of the parser's re-entrancy contract. It
//! reads from any `AsyncRead`, keeps the uncommitted tail of the stream in a
//! padded buffer, and hands out batches of fully parsed commands.
//!
//! ## Reader Loop
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Drop previously handed bytes │
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │ Rescan bitmaps, parse batch  │◄─────────────┐
//! └──────────────┬───────────────┘              │
//!                │                              │
//!      committed commands? ── no ──► read more ─┘
//!                │                   (or grow slots)
//!               yes
//!                ▼
//!        return CommandBatch
//! ```
//!
//! ## Buffer Management
//!
//! The bytes of a batch stay valid until the next call to
//! [`CommandReader::next_batch`], which then drops them from the front of
//! the buffer. A partial command at the end of the buffer is kept and
//! parsed again, from its first byte, once more data arrives.

use crate::commands::{Command, CommandTable, ResolveCommand};
use crate::protocol::{BatchStatus, CommandParser, ParsedSlot, ProtocolError};
use crate::scan::{Bitmaps, Kernel, PaddedBuffer};
use std::iter::FusedIterator;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, trace, warn};

/// Largest single read from the underlying stream
const READ_CHUNK: usize = 16 * 1024;

/// Size of the smallest array element, an empty bulk string
const MIN_ELEMENT_LEN: usize = 6;

/// Reader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Initial buffer capacity
    pub initial_buffer: usize,

    /// Maximum bytes buffered while waiting for a command to complete
    pub max_buffer: usize,

    /// Initial size of the slot array
    pub initial_slots: usize,

    /// The slot array never grows past this many slots
    pub max_slots: usize,

    /// Bitmap kernel used for every rescan
    pub kernel: Kernel,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            initial_buffer: 4 * 1024,
            max_buffer: 64 * 1024 * 1024,
            initial_slots: 64,
            max_slots: 1024 * 1024,
            kernel: Kernel::detect(),
        }
    }
}

/// Counters for one reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Bytes read from the stream
    pub bytes_read: u64,
    /// Bytes released after their batch was handed out
    pub bytes_consumed: u64,
    /// Batches handed out
    pub batches: u64,
    /// Commands handed out
    pub commands: u64,
    /// Bytes scanned into bitmaps, counting rescans of a partial tail
    pub rescanned_bytes: u64,
}

/// Errors that can occur while reading commands.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input at byte `offset` of the stream
    #[error("protocol error at byte {offset}: {error}")]
    Protocol { error: ProtocolError, offset: u64 },

    /// The stream ended inside a command
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,

    /// A single command needs more slots than allowed
    #[error("command needs more than {max_slots} slots")]
    CommandTooLarge { max_slots: usize },
}

/// Reads pipelined commands from a stream.
pub struct CommandReader<R, C = CommandTable> {
    reader: R,
    buffer: PaddedBuffer,
    maps: Bitmaps,
    slots: Vec<ParsedSlot>,
    parser: CommandParser<C>,
    config: ReaderConfig,

    /// Bytes covered by the batch handed out last
    committed: usize,

    /// Malformed input found behind the last batch
    failed: Option<(ProtocolError, u64)>,

    stats: ReaderStats,
}

impl<R: AsyncRead + Unpin> CommandReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ReaderConfig::default())
    }

    pub fn with_config(reader: R, config: ReaderConfig) -> Self {
        Self::with_parser(reader, config, CommandParser::new())
    }
}

impl<R, C> CommandReader<R, C>
where
    R: AsyncRead + Unpin,
    C: ResolveCommand,
{
    pub fn with_parser(reader: R, config: ReaderConfig, parser: CommandParser<C>) -> Self {
        Self {
            reader,
            buffer: PaddedBuffer::with_capacity(config.initial_buffer),
            maps: Bitmaps::new(),
            slots: vec![ParsedSlot::default(); config.initial_slots],
            parser,
            config,
            committed: 0,
            failed: None,
            stats: ReaderStats::default(),
        }
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Bytes buffered but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.committed
    }

    /// Current size of the slot array.
    pub fn slot_capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Returns the next batch of complete commands.
    ///
    /// Returns `Ok(None)` once the stream ends cleanly between commands.
    /// Malformed input is reported after every command before it has been
    /// handed out, and is reported again on every later call.
    pub async fn next_batch(&mut self) -> Result<Option<CommandBatch<'_>>, ConnectionError> {
        self.release();
        if let Some((error, offset)) = self.failed {
            return Err(ConnectionError::Protocol { error, offset });
        }

        let (used, consumed, commands) = loop {
            self.maps.rescan_padded(self.config.kernel, &self.buffer);
            self.stats.rescanned_bytes += self.buffer.len() as u64;

            let batch =
                self.parser
                    .take_multiple_commands(self.buffer.as_slice(), &self.maps, &mut self.slots);

            match batch.status {
                BatchStatus::Malformed { error, at } => {
                    let offset = self.stats.bytes_consumed + at as u64;
                    warn!(%error, offset, "Malformed command");
                    self.failed = Some((error, offset));
                    if batch.commands == 0 {
                        return Err(ConnectionError::Protocol { error, offset });
                    }
                    break (batch.committed_slots(), batch.bytes_consumed, batch.commands);
                }
                BatchStatus::CapacityLimited if batch.commands == 0 => {
                    if self.grow_slots()? {
                        continue;
                    }
                }
                _ if batch.commands > 0 => {
                    break (batch.used_slots, batch.bytes_consumed, batch.commands);
                }
                _ => {}
            }

            if !self.fill().await? {
                return Ok(None);
            }
        };

        self.committed = consumed;
        self.stats.batches += 1;
        self.stats.commands += commands as u64;
        trace!(
            commands,
            consumed,
            buffered = self.buffer.len(),
            "Handing out batch"
        );

        Ok(Some(CommandBatch {
            buf: self.buffer.as_slice(),
            slots: &self.slots[..used],
            commands,
        }))
    }

    fn release(&mut self) {
        if self.committed > 0 {
            self.buffer.consume(self.committed);
            self.stats.bytes_consumed += self.committed as u64;
            self.committed = 0;
        }
    }

    /// Grows the slot array for a command that does not fit. Returns `false`
    /// when the buffered bytes cannot fill more slots yet, so the caller
    /// reads first.
    fn grow_slots(&mut self) -> Result<bool, ConnectionError> {
        let current = self.slots.len();
        if current >= self.config.max_slots {
            error!(slots = current, "Command exceeds slot limit");
            return Err(ConnectionError::CommandTooLarge {
                max_slots: self.config.max_slots,
            });
        }

        // Every element takes at least `$0\r\n\r\n`.
        let fillable = self.buffer.len() / MIN_ELEMENT_LEN + 1;
        if current >= fillable {
            trace!(
                slots = current,
                buffered = self.buffer.len(),
                "Waiting for data before growing"
            );
            return Ok(false);
        }

        let next = (current * 2).clamp(1, self.config.max_slots).min(fillable);
        debug!(from = current, to = next, "Growing slot array");
        self.slots.resize(next, ParsedSlot::default());
        Ok(true)
    }

    /// Reads more data into the buffer. Returns `false` on a clean end of
    /// stream.
    async fn fill(&mut self) -> Result<bool, ConnectionError> {
        let buffered = self.buffer.len();
        if buffered >= self.config.max_buffer {
            error!(size = buffered, "Buffer size limit exceeded");
            return Err(ConnectionError::BufferFull);
        }

        let want = READ_CHUNK.min(self.config.max_buffer - buffered);
        let n = self.reader.read(self.buffer.spare_mut(want)).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Ok(false);
            }
            return Err(ConnectionError::UnexpectedEof);
        }

        self.buffer.commit(n);
        self.stats.bytes_read += n as u64;
        trace!(bytes = n, buffered = self.buffer.len(), "Read data");
        Ok(true)
    }
}

/// The commands handed out by one [`CommandReader::next_batch`] call.
#[derive(Debug, Clone, Copy)]
pub struct CommandBatch<'a> {
    buf: &'a [u8],
    slots: &'a [ParsedSlot],
    commands: usize,
}

impl<'a> CommandBatch<'a> {
    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands == 0
    }

    /// The raw slots, one command slot followed by its arguments.
    pub fn slots(&self) -> &'a [ParsedSlot] {
        self.slots
    }

    /// The buffer the slots point into.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    pub fn iter(&self) -> Commands<'a> {
        Commands {
            buf: self.buf,
            slots: self.slots,
        }
    }
}

impl<'a> IntoIterator for CommandBatch<'a> {
    type Item = CommandView<'a>;
    type IntoIter = Commands<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the commands of a batch.
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    buf: &'a [u8],
    slots: &'a [ParsedSlot],
}

impl<'a> Iterator for Commands<'a> {
    type Item = CommandView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let count = self.slots.first()?.argument_count()? as usize;
        let (command, rest) = self.slots.split_at(count.clamp(1, self.slots.len()));
        self.slots = rest;
        Some(CommandView {
            buf: self.buf,
            slots: command,
        })
    }
}

impl FusedIterator for Commands<'_> {}

/// One parsed command.
#[derive(Debug, Clone, Copy)]
pub struct CommandView<'a> {
    buf: &'a [u8],
    slots: &'a [ParsedSlot],
}

impl<'a> CommandView<'a> {
    pub fn command(&self) -> Command {
        self.slots[0].resolved_command().unwrap_or_default()
    }

    /// The command name as sent by the client.
    pub fn name(&self) -> &'a [u8] {
        self.slots[0].payload(self.buf)
    }

    /// Number of bulk strings, name included.
    pub fn argument_count(&self) -> usize {
        self.slots.len()
    }

    /// The argument at `index`, counting from the first one after the name.
    pub fn arg(&self, index: usize) -> Option<&'a [u8]> {
        let buf = self.buf;
        self.slots.get(index + 1).map(|slot| slot.payload(buf))
    }

    /// The arguments after the name.
    pub fn args(&self) -> impl ExactSizeIterator<Item = &'a [u8]> + 'a {
        let buf = self.buf;
        self.slots[1..].iter().map(move |slot| slot.payload(buf))
    }
}
