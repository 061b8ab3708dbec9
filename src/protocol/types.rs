//! RESP Command Framing Types
//!
//! A client sends each command as a RESP array of bulk strings:
//!
//! ```text
//! *<count>\r\n
//! $<len>\r\n<len bytes>\r\n      (count times)
//! ```
//!
//! The parser does not build values. It writes fixed-size [`ParsedSlot`]
//! records that point back into the caller's buffer:
//!
//! ```text
//! *2\r\n$3\r\nGET\r\n$5\r\nworld\r\n
//!             └─────┘     └───────┘
//!            Command      Argument
//!        (GET, count=2)
//! ```

use crate::commands::Command;
use thiserror::Error;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// Protocol-significant bytes
pub mod sigil {
    pub const ARRAY: u8 = b'*';
    pub const BULK_STRING: u8 = b'$';
    pub const CR: u8 = b'\r';
    pub const LF: u8 = b'\n';
}

/// Longest accepted count or length field, in digits.
pub const MAX_DIGITS: usize = 10;

/// Largest value a count or length field may hold (`i32::MAX`).
pub const MAX_NUMBER: u32 = i32::MAX as u32;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Ways in which a byte stream can violate the command grammar.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolError {
    /// The command does not start with `*`
    #[error("expected '*' at start of command")]
    ExpectedArray,

    /// An argument does not start with `$`
    #[error("expected '$' at start of bulk string")]
    ExpectedBulkString,

    /// A count or length field holds a non-digit or lacks its CRLF
    #[error("invalid count or length field")]
    InvalidNumber,

    /// A count or length field has more than ten digits
    #[error("count or length field longer than 10 digits")]
    NumberTooLong,

    /// A count or length field exceeds `i32::MAX`
    #[error("count or length field exceeds 2147483647")]
    NumberOverflow,

    /// A count or length field has a leading zero (strict mode only)
    #[error("count or length field has a leading zero")]
    LeadingZero,

    /// The command declares zero elements
    #[error("command array must not be empty")]
    EmptyCommand,

    /// A bulk string payload is not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// A bulk string exceeds the configured maximum
    #[error("bulk string exceeds the configured maximum length")]
    BulkTooLarge,

    /// The command name is not in the resolver's vocabulary
    #[error("unknown command name")]
    UnknownCommand,
}

/// What a slot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotKind {
    /// Start of a command.
    Command {
        /// Number of bulk strings the array header declared.
        argument_count: u32,
        /// The resolved command name.
        command: Command,
    },

    /// One bulk string argument.
    #[default]
    Argument,

    /// The batch hit malformed input here. Always the last slot written.
    Malformed(ProtocolError),
}

/// One entry of the parser's output array.
///
/// `start..end` is a half-open byte range into the parsed buffer. For
/// command and argument slots the range ends with the frame's `\r\n`; for a
/// malformed slot it runs from the start of the failing command to one past
/// the offending byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsedSlot {
    pub kind: SlotKind,
    pub start: usize,
    pub end: usize,
}

impl ParsedSlot {
    pub fn command(command: Command, argument_count: u32, start: usize, end: usize) -> Self {
        Self {
            kind: SlotKind::Command {
                argument_count,
                command,
            },
            start,
            end,
        }
    }

    pub fn argument(start: usize, end: usize) -> Self {
        Self {
            kind: SlotKind::Argument,
            start,
            end,
        }
    }

    pub fn malformed(error: ProtocolError, start: usize, end: usize) -> Self {
        Self {
            kind: SlotKind::Malformed(error),
            start,
            end,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self.kind, SlotKind::Command { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, SlotKind::Malformed(_))
    }

    /// The command resolved for a command slot.
    pub fn resolved_command(&self) -> Option<Command> {
        match self.kind {
            SlotKind::Command { command, .. } => Some(command),
            _ => None,
        }
    }

    /// The declared element count of a command slot.
    pub fn argument_count(&self) -> Option<u32> {
        match self.kind {
            SlotKind::Command { argument_count, .. } => Some(argument_count),
            _ => None,
        }
    }

    /// Length of the byte range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// The full byte range, terminator included.
    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end]
    }

    /// The bytes without the trailing CRLF.
    ///
    /// For an argument this is the bulk string payload; for a command slot
    /// written by the resolving parser it is the command name.
    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        let bytes = self.bytes(buf);
        bytes.strip_suffix(CRLF).unwrap_or(bytes)
    }
}
