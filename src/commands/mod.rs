//! Command Name Resolution
//!
//! The parser hands the byte range of each command's first bulk string to a
//! resolver and records the answer in the command slot.
//!
//! ```text
//! *2\r\n$3\r\nget\r\n$5\r\nworld\r\n
//!             └─┘
//!              │
//!              ▼
//!     ┌─────────────────┐
//!     │ ResolveCommand  │  (this module)
//!     └────────┬────────┘
//!              ▼
//!        Command::Get
//! ```
//!
//! ## Vocabulary
//!
//! ### String Commands
//! - `SET`, `GET`, `DEL`, `EXISTS`
//! - `INCR`, `INCRBY`, `DECR`, `DECRBY`
//! - `APPEND`, `STRLEN`
//! - `MSET`, `MGET`
//! - `SETNX`, `SETEX`, `PSETEX`, `GETSET`, `GETDEL`
//!
//! ### List Commands
//! - `LPUSH`, `RPUSH`, `LPOP`, `RPOP`
//! - `LLEN`, `LINDEX`, `LRANGE`, `LSET`, `LREM`
//!
//! ### Key Commands
//! - `EXPIRE`, `PEXPIRE`, `EXPIREAT`
//! - `TTL`, `PTTL`, `PERSIST`
//! - `KEYS`, `TYPE`, `RENAME`, `RENAMENX`
//!
//! ### Server Commands
//! - `PING`, `ECHO`, `INFO`
//! - `DBSIZE`, `FLUSHDB`, `FLUSHALL`
//! - `COMMAND`, `CONFIG`, `TIME`, `DEBUG`, `QUIT`

pub mod table;

pub use table::{Command, CommandTable, PassThrough, ResolveCommand};
