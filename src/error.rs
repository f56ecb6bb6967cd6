//! Error types for redwire
//!
//! Provides a unified error type for all client operations.

use thiserror::Error;

/// Result type alias using RedwireError
pub type Result<T> = std::result::Result<T, RedwireError>;

/// Unified error type for redwire operations
#[derive(Debug, Error)]
pub enum RedwireError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-formed error reply sent by the server
    #[error("Server error: {class} {message}")]
    Server { class: String, message: String },

    /// A well-formed reply whose data cannot be converted to the return type
    #[error("Invalid reply data: {0}")]
    InvalidData(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RedwireError {
    /// Build a server error from the text of an error reply.
    ///
    /// The first word is the error class (`ERR`, `WRONGTYPE`, ...), the rest
    /// is the message.
    pub fn server(text: &str) -> Self {
        let (class, message) = match text.split_once(' ') {
            Some((class, message)) => (class, message),
            None => (text, ""),
        };
        RedwireError::Server {
            class: class.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error leaves the stream in an untrustworthy position.
    ///
    /// Fatal errors move the connection to `Faulted`; server errors, rejected
    /// arguments and unconvertible reply data do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RedwireError::Io(_)
                | RedwireError::Connection(_)
                | RedwireError::ConnectionClosed
                | RedwireError::Protocol(_)
        )
    }
}
