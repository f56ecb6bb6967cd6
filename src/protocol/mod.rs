//! Protocol Module
//!
//! Defines the text wire protocol spoken with the server.
//!
//! ## Protocol Format
//!
//! Every logical line ends with CRLF. Commands are a verb followed by
//! space-separated inline arguments; a binary value is sent as a
//! length-prefixed payload after the command line.
//!
//! ### Commands
//! ```text
//! GET mykey\r\n
//! SET mykey 5\r\nhello\r\n
//! ```
//!
//! ### Reply Types (selected by the first byte)
//! - `+` Status     - `+OK\r\n`
//! - `-` Error      - `-ERR no such key\r\n`
//! - `:` Integer    - `:-5\r\n`
//! - `$` Bulk       - `$3\r\nabc\r\n`, nil is `$-1\r\n`
//! - `*` MultiBulk  - `*2\r\n$1\r\na\r\n$1\r\nb\r\n`, nil is `*-1\r\n`

mod command;
mod reply;
mod codec;

pub use command::{Command, Verb};
pub use reply::Reply;
pub use codec::{
    decode_reply, encode_command, encode_reply, read_reply, write_command, write_frame,
};
pub use codec::{CRLF, MAX_BULK_LEN, MAX_LINE_LEN, MAX_MULTI_BULK_LEN};
