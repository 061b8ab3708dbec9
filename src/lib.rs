//! # FlashRESP - A Bitmap-Driven RESP Command Parser
//!
//! FlashRESP turns a stream of pipelined Redis commands into flat slot
//! records that point back into the input buffer. Payload bytes are never
//! copied.
//!
//! ## Features
//!
//! - **Bitmap Scanning**: one pass classifies every byte into per-class
//!   bitmaps (`*`, `$`, `\r`, `\n`, CRLF, digits) with SIMD kernels
//! - **Branch-Light Parsing**: field lengths and terminators are found by
//!   bit scans instead of byte-by-byte loops
//! - **Atomic Commands**: a command commits completely or not at all
//! - **Incremental**: stateless across calls, so partial reads are simply
//!   parsed again once more bytes arrive
//! - **Async I/O**: a Tokio reader drives the parser over any stream
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashRESP                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ AsyncRead   │───>│  Command    │───>│   Padded    │                  │
//! │  │  (stream)   │    │  Reader     │    │   Buffer    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │  Command    │    │                 Bitmaps                      │    │
//! │  │  Table      │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │    │
//! │  │             │    │  │   *    │ │   $    │ │  CRLF  │ │ digits │ │    │
//! │  └──────▲──────┘    │  └────────┘ └────────┘ └────────┘ └────────┘ │    │
//! │         │           └──────────────────────┬───────────────────────┘    │
//! │         │                                  │                            │
//! │         │           ┌──────────────────────▼───────────────────────┐    │
//! │         └───────────│             CommandParser                    │    │
//! │                     │   (state machine, writes ParsedSlot array)   │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashresp::{Bitmaps, Command, CommandParser, ParsedSlot};
//!
//! let buf = b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n";
//! let maps = Bitmaps::scan(buf);
//! let mut slots = [ParsedSlot::default(); 4];
//!
//! let batch = CommandParser::new().take_multiple_commands(buf, &maps, &mut slots);
//! assert_eq!(batch.bytes_consumed, buf.len());
//! assert_eq!(slots[0].resolved_command(), Some(Command::Set));
//! assert_eq!(slots[1].payload(buf), b"name");
//! assert_eq!(slots[2].payload(buf), b"Ariz");
//! ```
//!
//! ## Module Overview
//!
//! - [`scan`]: buffer layout, bitmap kernels, CRLF combining and bit cursors
//! - [`protocol`]: slot types, number fields and the command parser
//! - [`commands`]: command-name resolution
//! - [`connection`]: async reader over a byte stream

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod scan;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandTable, PassThrough, ResolveCommand};
pub use connection::{CommandReader, ConnectionError, ReaderConfig};
pub use protocol::{Batch, BatchStatus, CommandParser, ParsedSlot, ParserConfig, ProtocolError};
pub use scan::{Bitmaps, Kernel};

/// Version of FlashRESP
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
