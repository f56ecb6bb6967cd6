//! Reply definitions
//!
//! Represents one decoded server reply.

use bytes::Bytes;

/// A reply from the server
///
/// Exactly one case is active. Replies are built by the decoder, never
/// mutated, and consumed once by the client layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK\r\n`
    Status(String),

    /// `-ERR message\r\n`
    Error(String),

    /// `:1000\r\n`
    Integer(i64),

    /// `$6\r\nfoobar\r\n`, or `$-1\r\n` for nil
    Bulk(Option<Bytes>),

    /// `*2\r\n$1\r\na\r\n$1\r\nb\r\n`, or `*-1\r\n` for nil
    MultiBulk(Option<Vec<Reply>>),
}

impl Reply {
    /// Short name of the reply kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Status(_) => "status",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk",
            Reply::MultiBulk(_) => "multi-bulk",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// True for `$-1` and `*-1`
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Bulk(None) | Reply::MultiBulk(None))
    }
}
