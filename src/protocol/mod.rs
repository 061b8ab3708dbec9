//! RESP Command Parsing
//!
//! This module turns pipelined RESP commands into flat [`ParsedSlot`] records
//! describing byte ranges in the input buffer.
//!
//! ## Modules
//!
//! - `types`: slot records, protocol error kinds and wire constants
//! - `number`: count and length fields
//! - `parser`: the command-frame state machine and batch loop
//!
//! ## Example
//!
//! ```
//! use flashresp::commands::Command;
//! use flashresp::protocol::{BatchStatus, CommandParser, ParsedSlot};
//!
//! let buf = b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$5\r\nworld\r\n";
//! let mut slots = [ParsedSlot::default(); 8];
//!
//! let batch = CommandParser::new().parse(buf, &mut slots);
//! assert_eq!(batch.status, BatchStatus::Drained);
//! assert_eq!(batch.used_slots, 3);
//! assert_eq!(slots[1].resolved_command(), Some(Command::Get));
//! assert_eq!(slots[2].payload(buf), b"world");
//! ```

pub mod number;
pub mod parser;
pub mod types;

pub use number::{parse_positive_int, take_positive_number, NumberError};
pub use parser::{Batch, BatchStatus, CommandParser, Frame, ParserConfig, Stop};
pub use types::{ParsedSlot, ProtocolError, SlotKind, CRLF, MAX_BULK_SIZE};
