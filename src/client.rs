//! Client Module
//!
//! The typed command client that coordinates the codec and the connection.
//!
//! ## Responsibilities
//! - One method per store operation
//! - Exactly one command in flight per connection
//! - Map each reply to the operation's return type
//! - Surface error replies as `RedwireError::Server`, whatever was expected

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RedwireError, Result};
use crate::network::{Connection, ConnectionState, Connector, TcpConnector};
use crate::protocol::{Command, Reply, Verb};

/// A synchronous client for one server
///
/// ## Concurrency Model
///
/// The connection sits behind a mutex held for the whole round-trip
/// (encode → write → read → map), so commands issued from several threads
/// are serialized and can never interleave on the stream.
///
/// ## Reconnect Policy
///
/// A command issued while the connection is disconnected or faulted
/// reconnects first. Nothing is retried: a failure is returned to the
/// caller as-is.
pub struct Client {
    connection: Mutex<Connection>,
}

impl Client {
    /// Create a TCP client. No connection is made until the first command.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    /// Create a client whose streams are opened by `connector`
    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            connection: Mutex::new(Connection::with_connector(config, connector)),
        })
    }

    /// Connect eagerly
    pub fn connect(&self) -> Result<()> {
        self.connection.lock().connect()
    }

    /// Close the stream; the next command reconnects
    pub fn disconnect(&self) {
        self.connection.lock().disconnect();
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.lock().state()
    }

    /// Send a raw command and return its reply
    ///
    /// An error reply is still returned as `RedwireError::Server`.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        self.call(command, |_, reply| Ok(reply))
    }

    /// Run one round-trip and map the reply while holding the connection
    fn call<T>(&self, command: Command, map: impl FnOnce(Verb, Reply) -> Result<T>) -> Result<T> {
        let mut connection = self.connection.lock();
        let reply = connection.round_trip(&command)?;

        if let Reply::Error(text) = &reply {
            return Err(RedwireError::server(text));
        }

        let result = map(command.verb(), reply);
        if let Err(e) = &result {
            // A well-formed but unexpected reply still means the client and
            // server disagree about the stream
            if e.is_fatal() {
                connection.fault();
            }
        }
        result
    }

    // =========================================================================
    // Connection Commands
    // =========================================================================

    /// PING, returns the status text (normally `PONG`)
    pub fn ping(&self) -> Result<String> {
        self.call(Command::new(Verb::Ping), into_status)
    }

    /// ECHO, returns the payload sent
    pub fn echo(&self, message: impl Into<Bytes>) -> Result<Bytes> {
        let command = Command::new(Verb::Echo).payload(message);
        self.call(command, |verb, reply| {
            into_bulk(verb, reply)?.ok_or_else(|| nil_reply(verb))
        })
    }

    /// SELECT a numbered database
    pub fn select(&self, db: u32) -> Result<String> {
        self.call(Command::new(Verb::Select).arg(db), into_status)
    }

    // =========================================================================
    // String Commands
    // =========================================================================

    /// SET, returns the status text
    pub fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<String> {
        let command = Command::new(Verb::Set).arg(key).payload(value);
        self.call(command, into_status)
    }

    /// SETNX, returns whether the value was written
    pub fn set_nx(&self, key: &str, value: impl Into<Bytes>) -> Result<bool> {
        let command = Command::new(Verb::SetNx).arg(key).payload(value);
        self.call(command, into_bool)
    }

    /// GET, `None` when the key does not exist
    pub fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.call(Command::new(Verb::Get).arg(key), into_bulk)
    }

    /// Increment by `amount` (INCR when 1, INCRBY otherwise)
    pub fn incr(&self, key: &str, amount: i64) -> Result<i64> {
        let command = if amount == 1 {
            Command::new(Verb::Incr).arg(key)
        } else {
            Command::new(Verb::IncrBy).arg(key).arg(amount)
        };
        self.call(command, into_integer)
    }

    /// Decrement by `amount` (DECR when 1, DECRBY otherwise)
    pub fn decr(&self, key: &str, amount: i64) -> Result<i64> {
        let command = if amount == 1 {
            Command::new(Verb::Decr).arg(key)
        } else {
            Command::new(Verb::DecrBy).arg(key).arg(amount)
        };
        self.call(command, into_integer)
    }

    // =========================================================================
    // Keyspace Commands
    // =========================================================================

    pub fn exists(&self, key: &str) -> Result<bool> {
        self.call(Command::new(Verb::Exists).arg(key), into_bool)
    }

    /// DEL, returns whether a key was removed
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.call(Command::new(Verb::Del).arg(key), into_bool)
    }

    /// TYPE, returns the type name (`none`, `string`, `list`, `set`)
    pub fn key_type(&self, key: &str) -> Result<String> {
        self.call(Command::new(Verb::Type).arg(key), into_status)
    }

    /// KEYS matching a glob pattern
    ///
    /// Accepts both the legacy reply (one bulk of space-separated names) and
    /// a multi-bulk of names. With the legacy form a key containing
    /// whitespace cannot be told apart from two keys. A name that is not
    /// valid UTF-8 is `InvalidData` and leaves the connection usable.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.call(Command::new(Verb::Keys).arg(pattern), |verb, reply| match reply {
            Reply::Bulk(None) | Reply::MultiBulk(None) => Ok(Vec::new()),
            Reply::Bulk(Some(joined)) => {
                let joined = into_utf8(verb, joined)?;
                Ok(joined.split_ascii_whitespace().map(str::to_string).collect())
            }
            Reply::MultiBulk(Some(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Reply::Bulk(Some(name)) => Some(into_utf8(verb, name)),
                    _ => None,
                })
                .collect(),
            other => Err(unexpected(verb, &other)),
        })
    }

    /// RANDOMKEY, `None` when the database is empty
    pub fn randomkey(&self) -> Result<Option<String>> {
        self.call(Command::new(Verb::RandomKey), |verb, reply| match reply {
            Reply::Status(key) => Ok(Some(key).filter(|k| !k.is_empty())),
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(key)) => Ok(Some(into_utf8(verb, key)?).filter(|k| !k.is_empty())),
            other => Err(unexpected(verb, &other)),
        })
    }

    /// RENAME, returns the status text
    pub fn rename(&self, src: &str, dst: &str) -> Result<String> {
        self.call(Command::new(Verb::Rename).arg(src).arg(dst), into_status)
    }

    /// RENAMENX, returns whether the key was renamed
    pub fn rename_nx(&self, src: &str, dst: &str) -> Result<bool> {
        self.call(Command::new(Verb::RenameNx).arg(src).arg(dst), into_bool)
    }

    /// MOVE a key to another database
    pub fn move_key(&self, key: &str, db: u32) -> Result<bool> {
        self.call(Command::new(Verb::Move).arg(key).arg(db), into_bool)
    }

    // =========================================================================
    // List Commands
    // =========================================================================

    /// Append to the tail of a list
    pub fn rpush(&self, key: &str, value: impl Into<Bytes>) -> Result<String> {
        self.call(Command::new(Verb::RPush).arg(key).payload(value), into_status)
    }

    /// Prepend to the head of a list
    pub fn lpush(&self, key: &str, value: impl Into<Bytes>) -> Result<String> {
        self.call(Command::new(Verb::LPush).arg(key).payload(value), into_status)
    }

    pub fn llen(&self, key: &str) -> Result<i64> {
        self.call(Command::new(Verb::LLen).arg(key), into_integer)
    }

    /// Elements `start..=end`; negative indexes count from the tail
    pub fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        let command = Command::new(Verb::LRange).arg(key).arg(start).arg(end);
        self.call(command, into_bulk_list)
    }

    pub fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<String> {
        let command = Command::new(Verb::LTrim).arg(key).arg(start).arg(end);
        self.call(command, into_status)
    }

    pub fn lindex(&self, key: &str, index: i64) -> Result<Option<Bytes>> {
        self.call(Command::new(Verb::LIndex).arg(key).arg(index), into_bulk)
    }

    pub fn lset(&self, key: &str, index: i64, value: impl Into<Bytes>) -> Result<String> {
        let command = Command::new(Verb::LSet).arg(key).arg(index).payload(value);
        self.call(command, into_status)
    }

    /// Remove and return the head of a list
    pub fn lpop(&self, key: &str) -> Result<Option<Bytes>> {
        self.call(Command::new(Verb::LPop).arg(key), into_bulk)
    }

    /// Remove and return the tail of a list
    pub fn rpop(&self, key: &str) -> Result<Option<Bytes>> {
        self.call(Command::new(Verb::RPop).arg(key), into_bulk)
    }

    // =========================================================================
    // Set Commands
    // =========================================================================

    pub fn sadd(&self, key: &str, member: impl Into<Bytes>) -> Result<bool> {
        self.call(Command::new(Verb::SAdd).arg(key).payload(member), into_bool)
    }

    pub fn srem(&self, key: &str, member: impl Into<Bytes>) -> Result<bool> {
        self.call(Command::new(Verb::SRem).arg(key).payload(member), into_bool)
    }

    pub fn sismember(&self, key: &str, member: impl Into<Bytes>) -> Result<bool> {
        let command = Command::new(Verb::SIsMember).arg(key).payload(member);
        self.call(command, into_bool)
    }

    pub fn smembers(&self, key: &str) -> Result<Vec<Bytes>> {
        self.call(Command::new(Verb::SMembers).arg(key), into_bulk_list)
    }

    /// Intersection of the sets stored at `keys`
    pub fn sinter(&self, keys: &[&str]) -> Result<Vec<Bytes>> {
        if keys.is_empty() {
            return Err(RedwireError::InvalidArgument(
                "SINTER: at least one key is required".to_string(),
            ));
        }
        let command = keys
            .iter()
            .fold(Command::new(Verb::SInter), |command, key| command.arg(key));
        self.call(command, into_bulk_list)
    }

    // =========================================================================
    // Persistence Commands
    // =========================================================================

    /// Synchronous SAVE
    pub fn save(&self) -> Result<String> {
        self.call(Command::new(Verb::Save), into_status)
    }

    /// Background save
    pub fn bgsave(&self) -> Result<String> {
        self.call(Command::new(Verb::BgSave), into_status)
    }

    /// Unix time of the last successful save
    pub fn lastsave(&self) -> Result<i64> {
        self.call(Command::new(Verb::LastSave), into_integer)
    }
}

// =============================================================================
// Reply Mapping
// =============================================================================

fn unexpected(verb: Verb, reply: &Reply) -> RedwireError {
    RedwireError::Protocol(format!("unexpected {} reply to {}", reply.kind(), verb))
}

fn nil_reply(verb: Verb) -> RedwireError {
    RedwireError::Protocol(format!("unexpected nil reply to {}", verb))
}

fn into_status(verb: Verb, reply: Reply) -> Result<String> {
    match reply {
        Reply::Status(text) => Ok(text),
        other => Err(unexpected(verb, &other)),
    }
}

fn into_integer(verb: Verb, reply: Reply) -> Result<i64> {
    match reply {
        Reply::Integer(n) => Ok(n),
        other => Err(unexpected(verb, &other)),
    }
}

/// 0 is false, any positive count is true
fn into_bool(verb: Verb, reply: Reply) -> Result<bool> {
    match into_integer(verb, reply)? {
        0 => Ok(false),
        n if n > 0 => Ok(true),
        n => Err(RedwireError::Protocol(format!(
            "negative integer {} in reply to {}",
            n, verb
        ))),
    }
}

fn into_bulk(verb: Verb, reply: Reply) -> Result<Option<Bytes>> {
    match reply {
        Reply::Bulk(payload) => Ok(payload),
        other => Err(unexpected(verb, &other)),
    }
}

/// Multi-bulk elements in order, nil elements skipped
fn into_bulk_list(verb: Verb, reply: Reply) -> Result<Vec<Bytes>> {
    match reply {
        Reply::MultiBulk(None) => Ok(Vec::new()),
        Reply::MultiBulk(Some(items)) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Reply::Bulk(payload) => payload,
                _ => None,
            })
            .collect()),
        other => Err(unexpected(verb, &other)),
    }
}

fn into_utf8(verb: Verb, bytes: Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        RedwireError::InvalidData(format!("key in reply to {} is not valid UTF-8", verb))
    })
}
