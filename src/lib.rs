//! # redwire
//!
//! A synchronous client for the Redis text wire protocol with:
//! - Binary-safe framing (bulk payloads are never line-scanned)
//! - Typed replies: status, error, integer, bulk, multi-bulk
//! - Typed results per command, with server errors kept distinct
//! - An explicit connection state machine
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Caller                               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  client.get("key")
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Client                                  │
//! │          (one command in flight, reply mapping)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Protocol   │          │ Connection  │
//!   │   (codec)   │          │  (state)    │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Transport  │
//!                           │   (TCP)     │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use redwire::{Client, Config};
//!
//! let client = Client::new(Config::builder().host("127.0.0.1").build())?;
//! client.set("greeting", "hello")?;
//! assert_eq!(client.get("greeting")?.as_deref(), Some(&b"hello"[..]));
//! # Ok::<(), redwire::RedwireError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RedwireError, Result};
pub use config::Config;
pub use client::Client;
pub use network::ConnectionState;
pub use protocol::{Command, Reply, Verb};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of redwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
