//! Command Name Table
//!
//! Maps the byte range of a command-name bulk string to a [`Command`]. The
//! comparison is case-insensitive ASCII and allocation-free: the name is
//! upper-cased into a small stack buffer and matched against the vocabulary.

use std::fmt;

/// Longest name in the vocabulary, in bytes.
const MAX_NAME_LEN: usize = 8;

macro_rules! commands {
    ($($variant:ident => $name:literal,)+) => {
        /// The commands FlashRESP recognizes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum Command {
            /// A name outside the vocabulary (only produced by permissive
            /// resolvers and by the raw framing parser).
            #[default]
            Unknown,
            $($variant,)+
        }

        impl Command {
            /// Every known command, in table order.
            pub const ALL: &'static [Command] = &[$(Command::$variant,)+];

            /// The canonical upper-case name.
            pub const fn name(self) -> &'static str {
                match self {
                    Command::Unknown => "UNKNOWN",
                    $(Command::$variant => $name,)+
                }
            }

            /// Case-insensitive lookup of `name`.
            pub fn lookup(name: &[u8]) -> Option<Command> {
                if name.len() > MAX_NAME_LEN {
                    return None;
                }
                let mut upper = [0u8; MAX_NAME_LEN];
                let upper = &mut upper[..name.len()];
                upper.copy_from_slice(name);
                upper.make_ascii_uppercase();

                match &*upper {
                    $(n if n == $name.as_bytes() => Some(Command::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

commands! {
    // String commands
    Set => "SET",
    Get => "GET",
    Del => "DEL",
    Exists => "EXISTS",
    Append => "APPEND",
    Strlen => "STRLEN",
    Incr => "INCR",
    IncrBy => "INCRBY",
    Decr => "DECR",
    DecrBy => "DECRBY",
    MSet => "MSET",
    MGet => "MGET",
    SetNx => "SETNX",
    SetEx => "SETEX",
    PSetEx => "PSETEX",
    GetSet => "GETSET",
    GetDel => "GETDEL",

    // List commands
    LPush => "LPUSH",
    RPush => "RPUSH",
    LPop => "LPOP",
    RPop => "RPOP",
    LLen => "LLEN",
    LIndex => "LINDEX",
    LRange => "LRANGE",
    LSet => "LSET",
    LRem => "LREM",

    // Key commands
    Expire => "EXPIRE",
    PExpire => "PEXPIRE",
    ExpireAt => "EXPIREAT",
    Ttl => "TTL",
    PTtl => "PTTL",
    Persist => "PERSIST",
    Keys => "KEYS",
    Type => "TYPE",
    Rename => "RENAME",
    RenameNx => "RENAMENX",

    // Server commands
    Ping => "PING",
    Echo => "ECHO",
    Info => "INFO",
    DbSize => "DBSIZE",
    FlushDb => "FLUSHDB",
    FlushAll => "FLUSHALL",
    Command => "COMMAND",
    Config => "CONFIG",
    Time => "TIME",
    Debug => "DEBUG",
    Quit => "QUIT",
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves a command-name byte range.
///
/// Returning `None` makes the parser treat the command as malformed.
pub trait ResolveCommand {
    fn resolve(&self, name: &[u8]) -> Option<Command>;
}

/// The fixed vocabulary. Unknown names are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandTable;

impl ResolveCommand for CommandTable {
    #[inline]
    fn resolve(&self, name: &[u8]) -> Option<Command> {
        Command::lookup(name)
    }
}

/// The fixed vocabulary, with unknown names passed through as
/// [`Command::Unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ResolveCommand for PassThrough {
    #[inline]
    fn resolve(&self, name: &[u8]) -> Option<Command> {
        Some(Command::lookup(name).unwrap_or(Command::Unknown))
    }
}

impl<F> ResolveCommand for F
where
    F: Fn(&[u8]) -> Option<Command>,
{
    fn resolve(&self, name: &[u8]) -> Option<Command> {
        self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Command::lookup(b"GET"), Some(Command::Get));
        assert_eq!(Command::lookup(b"get"), Some(Command::Get));
        assert_eq!(Command::lookup(b"gEt"), Some(Command::Get));
        assert_eq!(Command::lookup(b"flushall"), Some(Command::FlushAll));
    }

    #[test]
    fn test_lookup_rejects_unknown() {
        assert_eq!(Command::lookup(b""), None);
        assert_eq!(Command::lookup(b"GETT"), None);
        assert_eq!(Command::lookup(b"abcdefghijkl"), None);
        assert_eq!(Command::lookup(b"G\x00T"), None);
    }

    #[test]
    fn test_every_name_resolves_to_itself() {
        for &command in Command::ALL {
            assert!(command.name().len() <= MAX_NAME_LEN);
            assert_eq!(Command::lookup(command.name().as_bytes()), Some(command));
            assert_eq!(
                Command::lookup(command.name().to_lowercase().as_bytes()),
                Some(command)
            );
        }
    }

    #[test]
    fn test_resolvers() {
        assert_eq!(CommandTable.resolve(b"ping"), Some(Command::Ping));
        assert_eq!(CommandTable.resolve(b"HELLO"), None);
        assert_eq!(PassThrough.resolve(b"HELLO"), Some(Command::Unknown));
        assert_eq!(PassThrough.resolve(b"echo"), Some(Command::Echo));

        let only_ping = |name: &[u8]| (name == b"PING").then_some(Command::Ping);
        assert_eq!(only_ping.resolve(b"PING"), Some(Command::Ping));
        assert_eq!(only_ping.resolve(b"GET"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::SetNx.to_string(), "SETNX");
        assert_eq!(Command::Unknown.to_string(), "UNKNOWN");
    }
}
