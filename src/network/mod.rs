//! Network Module
//!
//! Transport streams and connection handling.
//!
//! ## Architecture
//! - `Connector` opens a `Transport` (TCP by default, fakes in tests)
//! - `Connection` owns one transport and tracks its state
//! - One command in flight per connection

mod connection;
mod transport;

pub use connection::{Connection, ConnectionState};
pub use transport::{Connector, TcpConnector, Transport};
