//! Connection Reading Module
//!
//! This module drives the parser over a byte stream. The parser itself is
//! synchronous and stateless; a [`CommandReader`] owns everything that has
//! to survive between reads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               AsyncRead (socket, file, stdin)               │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ read()
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CommandReader                            │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ PaddedBuffer│───>│  Bitmaps    │───>│CommandParser│      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │  ParsedSlot │        │
//! │                                      │    array    │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: any `tokio::io::AsyncRead`
//! - **Pipelining**: every complete command in the buffer is handed out at once
//! - **Bounded memory**: limits on buffered bytes and slots per command
//! - **Statistics**: bytes read, rescanned and consumed
//!
//! ## Example
//!
//! ```no_run
//! use flashresp::connection::CommandReader;
//!
//! # async fn run() -> Result<(), flashresp::connection::ConnectionError> {
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:6379").await?;
//! let mut reader = CommandReader::new(stream);
//!
//! while let Some(batch) = reader.next_batch().await? {
//!     for command in batch {
//!         println!("{} with {} arguments", command.command(), command.args().len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod reader;

// Re-export commonly used types
pub use reader::{
    CommandBatch, CommandReader, CommandView, Commands, ConnectionError, ReaderConfig,
    ReaderStats,
};
