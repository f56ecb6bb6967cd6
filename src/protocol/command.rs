//! Command definitions
//!
//! Represents commands sent to the server.

use bytes::Bytes;

/// Command verbs understood by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    // Connection
    Ping,
    Echo,
    Select,

    // Strings
    Set,
    SetNx,
    Get,
    Incr,
    IncrBy,
    Decr,
    DecrBy,

    // Keyspace
    Exists,
    Del,
    Type,
    Keys,
    RandomKey,
    Rename,
    RenameNx,
    Move,

    // Lists
    RPush,
    LPush,
    LLen,
    LRange,
    LTrim,
    LIndex,
    LPop,
    RPop,
    LSet,

    // Sets
    SAdd,
    SRem,
    SIsMember,
    SMembers,
    SInter,

    // Persistence
    Save,
    BgSave,
    LastSave,
}

impl Verb {
    /// The verb as written on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Ping => "PING",
            Verb::Echo => "ECHO",
            Verb::Select => "SELECT",
            Verb::Set => "SET",
            Verb::SetNx => "SETNX",
            Verb::Get => "GET",
            Verb::Incr => "INCR",
            Verb::IncrBy => "INCRBY",
            Verb::Decr => "DECR",
            Verb::DecrBy => "DECRBY",
            Verb::Exists => "EXISTS",
            Verb::Del => "DEL",
            Verb::Type => "TYPE",
            Verb::Keys => "KEYS",
            Verb::RandomKey => "RANDOMKEY",
            Verb::Rename => "RENAME",
            Verb::RenameNx => "RENAMENX",
            Verb::Move => "MOVE",
            Verb::RPush => "RPUSH",
            Verb::LPush => "LPUSH",
            Verb::LLen => "LLEN",
            Verb::LRange => "LRANGE",
            Verb::LTrim => "LTRIM",
            Verb::LIndex => "LINDEX",
            Verb::LPop => "LPOP",
            Verb::RPop => "RPOP",
            Verb::LSet => "LSET",
            Verb::SAdd => "SADD",
            Verb::SRem => "SREM",
            Verb::SIsMember => "SISMEMBER",
            Verb::SMembers => "SMEMBERS",
            Verb::SInter => "SINTER",
            Verb::Save => "SAVE",
            Verb::BgSave => "BGSAVE",
            Verb::LastSave => "LASTSAVE",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command ready for encoding
///
/// Inline arguments travel on the command line separated by single spaces.
/// A binary value travels as a length-prefixed payload after the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    args: Vec<String>,
    payload: Option<Bytes>,
}

impl Command {
    /// Create a command with no arguments
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            args: Vec::new(),
            payload: None,
        }
    }

    /// Append an inline argument
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Attach the length-prefixed payload
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn payload_bytes(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }
}
