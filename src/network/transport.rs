//! Transport
//!
//! The byte stream a connection talks over, and the factory that opens it.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::error::{RedwireError, Result};

/// A bidirectional byte stream
///
/// Writes may be partial; callers loop until the frame is flushed.
pub trait Transport: Read + Write + Send {
    /// Close both directions of the stream
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Opens transports for a connection
pub trait Connector: Send + Sync {
    /// Establish a new stream to the configured server
    fn connect(&self, config: &Config) -> Result<Box<dyn Transport>>;
}

/// Connects over TCP
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, config: &Config) -> Result<Box<dyn Transport>> {
        let addr = config.addr();
        let candidates = addr.to_socket_addrs().map_err(|e| {
            RedwireError::Connection(format!("cannot resolve {}: {}", addr, e))
        })?;

        // Try every resolved address, report the last failure
        let mut last_err = None;
        for sock_addr in candidates {
            let attempt = match config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(&sock_addr, timeout),
                None => TcpStream::connect(sock_addr),
            };

            match attempt {
                Ok(stream) => {
                    configure_stream(&stream, config).map_err(|e| {
                        RedwireError::Connection(format!(
                            "cannot configure socket to {}: {}",
                            addr, e
                        ))
                    })?;
                    return Ok(Box::new(stream));
                }
                Err(e) => {
                    tracing::debug!("Connect attempt to {} failed: {}", sock_addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(RedwireError::Connection(match last_err {
            Some(e) => format!("error connecting to {}: {}", addr, e),
            None => format!("{} resolved to no addresses", addr),
        }))
    }
}

fn configure_stream(stream: &TcpStream, config: &Config) -> io::Result<()> {
    stream.set_nodelay(config.nodelay)?;
    stream.set_read_timeout(config.read_timeout())?;
    stream.set_write_timeout(config.write_timeout())?;
    Ok(())
}
