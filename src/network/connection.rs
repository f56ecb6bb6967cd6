//! Connection
//!
//! Owns one transport stream and performs one request/reply round-trip at
//! a time.
//!
//! ## State Machine
//! ```text
//! Disconnected --connect()--> Connected --I/O or protocol error--> Faulted
//!      ^                                                              |
//!      +------------------------ disconnect() ------------------------+
//! ```
//!
//! A round-trip started while `Disconnected` or `Faulted` reconnects first.

use std::io::BufReader;
use std::sync::Arc;

use super::transport::{Connector, TcpConnector, Transport};
use crate::config::Config;
use crate::error::{RedwireError, Result};
use crate::protocol::{encode_command, read_reply, write_frame, Command, Reply};

/// Lifecycle of a connection's stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No stream open
    Disconnected,

    /// Stream open and positioned at a reply boundary
    Connected,

    /// Stream closed after an I/O or protocol failure
    Faulted,
}

/// A single client connection
pub struct Connection {
    /// Where and how to connect
    config: Config,

    /// Opens the transport
    connector: Arc<dyn Connector>,

    /// Buffered stream; reads go through the buffer, writes bypass it
    stream: Option<BufReader<Box<dyn Transport>>>,

    state: ConnectionState,
}

impl Connection {
    /// Create a disconnected TCP connection
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    /// Create a disconnected connection that opens streams with `connector`
    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the stream if it is not already open
    ///
    /// A failed attempt leaves the connection `Faulted`.
    pub fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        // Drop whatever a previous fault left behind
        self.close_stream();

        match self.connector.connect(&self.config) {
            Ok(transport) => {
                self.stream = Some(BufReader::new(transport));
                self.state = ConnectionState::Connected;
                tracing::debug!("Connected to {}", self.config.addr());
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Faulted;
                tracing::debug!("Connect to {} failed: {}", self.config.addr(), e);
                Err(e)
            }
        }
    }

    /// Close the stream and return to `Disconnected`
    pub fn disconnect(&mut self) {
        self.close_stream();
        if self.state != ConnectionState::Disconnected {
            tracing::debug!("Disconnected from {}", self.config.addr());
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Close the stream and mark the connection `Faulted`
    ///
    /// Used when the stream position can no longer be trusted.
    pub fn fault(&mut self) {
        self.close_stream();
        if self.state != ConnectionState::Faulted {
            tracing::debug!("Connection to {} faulted", self.config.addr());
        }
        self.state = ConnectionState::Faulted;
    }

    /// Send one command and read exactly one reply
    ///
    /// The command is encoded before any I/O, so an `InvalidArgument` never
    /// touches the stream. Error replies are returned as `Reply::Error`;
    /// transport and protocol failures fault the connection.
    pub fn round_trip(&mut self, command: &Command) -> Result<Reply> {
        let frame = encode_command(command)?;

        if self.state != ConnectionState::Connected {
            self.connect()?;
        }

        match self.exchange(&frame) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                if e.is_fatal() {
                    self.fault();
                }
                Err(e)
            }
        }
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<Reply> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| RedwireError::Connection("stream not open".to_string()))?;

        tracing::trace!(
            "Sending {} bytes to {}: {:?}",
            frame.len(),
            self.config.addr(),
            String::from_utf8_lossy(frame)
        );
        write_frame(stream.get_mut(), frame)?;

        let reply = read_reply(stream)?;
        tracing::trace!("Received {} reply from {}", reply.kind(), self.config.addr());

        Ok(reply)
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // Best effort; the stream is dropped either way
            let _ = stream.get_mut().shutdown();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close_stream();
    }
}
