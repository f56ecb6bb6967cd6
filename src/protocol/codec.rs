//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Command Format
//! ```text
//! inline:   VERB arg1 arg2 ...\r\n
//! payload:  VERB arg1 ... <len>\r\n<len raw bytes>\r\n
//! ```
//!
//! ### Reply Format
//! ```text
//! +<status>\r\n
//! -<CLASS> <message>\r\n
//! :<signed decimal>\r\n
//! $<len>\r\n<len raw bytes>\r\n      ($-1\r\n = nil)
//! *<count>\r\n<count bulk replies>   (*-1\r\n = nil)
//! ```
//!
//! Header lines are read with a CRLF line reader. Bulk payloads are read
//! with a length-delimited read, so embedded CR, LF and NUL bytes survive.

use std::io::{BufRead, Cursor, ErrorKind, Read, Write};

use bytes::Bytes;

use super::{Command, Reply};
use crate::error::{RedwireError, Result};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Maximum length of a reply header line, excluding CRLF (64 KB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Maximum bulk payload size (512 MB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Maximum number of elements in a multi-bulk reply
pub const MAX_MULTI_BULK_LEN: i64 = 1024 * 1024;

/// Upfront buffer reservation for a bulk payload (64 KB)
const BULK_READ_CHUNK: usize = 64 * 1024;

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command to bytes
///
/// Fails with `InvalidArgument` if an inline argument is empty or contains
/// a space, CR or LF. Payloads are written raw and never escaped.
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let verb = command.verb().as_str();

    for arg in command.args() {
        validate_inline_arg(command, arg)?;
    }

    let args_len: usize = command.args().iter().map(|a| a.len() + 1).sum();
    let payload_len = command.payload_bytes().map(|p| p.len() + 24).unwrap_or(0);

    let mut message = Vec::with_capacity(verb.len() + args_len + payload_len + 2);
    message.extend_from_slice(verb.as_bytes());
    for arg in command.args() {
        message.push(b' ');
        message.extend_from_slice(arg.as_bytes());
    }

    if let Some(payload) = command.payload_bytes() {
        message.push(b' ');
        message.extend_from_slice(payload.len().to_string().as_bytes());
        message.extend_from_slice(CRLF);
        message.extend_from_slice(payload);
    }
    message.extend_from_slice(CRLF);

    Ok(message)
}

fn validate_inline_arg(command: &Command, arg: &str) -> Result<()> {
    if arg.is_empty() {
        return Err(RedwireError::InvalidArgument(format!(
            "{}: empty argument",
            command.verb()
        )));
    }
    if arg.bytes().any(|b| matches!(b, b' ' | b'\r' | b'\n')) {
        return Err(RedwireError::InvalidArgument(format!(
            "{}: argument {:?} contains a space or line break",
            command.verb(),
            arg
        )));
    }
    Ok(())
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    write_frame(writer, &bytes)
}

/// Write an encoded frame to a stream
///
/// Keeps writing until every byte has been accepted. A transport that
/// accepts zero bytes is treated as closed.
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    let mut remaining = frame;

    while !remaining.is_empty() {
        match writer.write(remaining) {
            Ok(0) => return Err(RedwireError::ConnectionClosed),
            Ok(n) => remaining = &remaining[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(map_io_error(e)),
        }
    }

    writer.flush().map_err(map_io_error)
}

// =============================================================================
// Reply Encoding
// =============================================================================

/// Encode a reply to bytes (the server side of the protocol)
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut message = Vec::new();
    encode_reply_into(reply, &mut message);
    message
}

fn encode_reply_into(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Status(text) => push_line(out, b'+', text.as_bytes()),
        Reply::Error(text) => push_line(out, b'-', text.as_bytes()),
        Reply::Integer(n) => push_line(out, b':', n.to_string().as_bytes()),
        Reply::Bulk(None) => push_line(out, b'$', b"-1"),
        Reply::Bulk(Some(payload)) => {
            push_line(out, b'$', payload.len().to_string().as_bytes());
            out.extend_from_slice(payload);
            out.extend_from_slice(CRLF);
        }
        Reply::MultiBulk(None) => push_line(out, b'*', b"-1"),
        Reply::MultiBulk(Some(items)) => {
            push_line(out, b'*', items.len().to_string().as_bytes());
            for item in items {
                encode_reply_into(item, out);
            }
        }
    }
}

fn push_line(out: &mut Vec<u8>, head: u8, body: &[u8]) {
    out.push(head);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

// =============================================================================
// Reply Decoding
// =============================================================================

/// Decode exactly one reply from an in-memory buffer
///
/// Trailing bytes after the reply are a protocol error.
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    let mut cursor = Cursor::new(bytes);
    let reply = read_reply(&mut cursor)?;

    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(RedwireError::Protocol(format!(
            "{} trailing bytes after reply",
            bytes.len() - consumed
        )));
    }

    Ok(reply)
}

/// Read exactly one reply from a stream
///
/// Blocks until a complete reply is received or an error occurs.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?;

    match line.split_first() {
        Some((b'+', rest)) => Ok(Reply::Status(line_text(rest))),
        Some((b'-', rest)) => Ok(Reply::Error(line_text(rest))),
        Some((b':', rest)) => Ok(Reply::Integer(parse_integer(rest)?)),
        Some((b'$', rest)) => read_bulk_body(reader, rest).map(Reply::Bulk),
        Some((b'*', rest)) => read_multi_bulk_body(reader, rest),
        _ => Err(RedwireError::Protocol(format!(
            "unparseable reply head: {:?}",
            String::from_utf8_lossy(&line)
        ))),
    }
}

/// Read the payload announced by a `$<len>` header
fn read_bulk_body<R: BufRead>(reader: &mut R, header: &[u8]) -> Result<Option<Bytes>> {
    let len = parse_integer(header)?;
    if len == -1 {
        return Ok(None);
    }
    if len < -1 || len > MAX_BULK_LEN {
        return Err(RedwireError::Protocol(format!(
            "invalid bulk length: {} (max {})",
            len, MAX_BULK_LEN
        )));
    }

    // Payload and its terminator by length, never line-scanned. The buffer
    // grows with the bytes that actually arrive, not the declared length.
    let len = len as usize;
    let expected = len + CRLF.len();
    let mut payload = Vec::with_capacity(expected.min(BULK_READ_CHUNK));
    reader
        .by_ref()
        .take(expected as u64)
        .read_to_end(&mut payload)
        .map_err(map_io_error)?;

    if payload.len() < expected {
        return Err(RedwireError::ConnectionClosed);
    }
    if !payload.ends_with(CRLF) {
        return Err(RedwireError::Protocol(format!(
            "bulk payload of {} bytes not terminated by CRLF",
            len
        )));
    }
    payload.truncate(len);

    Ok(Some(Bytes::from(payload)))
}

/// Read the elements announced by a `*<count>` header
fn read_multi_bulk_body<R: BufRead>(reader: &mut R, header: &[u8]) -> Result<Reply> {
    let count = parse_integer(header)?;
    if count == -1 {
        return Ok(Reply::MultiBulk(None));
    }
    if count < -1 || count > MAX_MULTI_BULK_LEN {
        return Err(RedwireError::Protocol(format!(
            "invalid multi-bulk count: {} (max {})",
            count, MAX_MULTI_BULK_LEN
        )));
    }

    let count = count as usize;
    let mut items = Vec::with_capacity(count.min(1024));
    for index in 0..count {
        let line = read_line(reader)?;
        match line.split_first() {
            Some((b'$', rest)) => items.push(Reply::Bulk(read_bulk_body(reader, rest)?)),
            _ => {
                return Err(RedwireError::Protocol(format!(
                    "multi-bulk element {} is not a bulk reply: {:?}",
                    index,
                    String::from_utf8_lossy(&line)
                )))
            }
        }
    }

    Ok(Reply::MultiBulk(Some(items)))
}

// =============================================================================
// Line Reading Helpers
// =============================================================================

/// Read one CRLF-terminated line, returning it without the terminator
///
/// End of stream before any byte, or in the middle of a line, is
/// `ConnectionClosed`. A bare LF terminator is a protocol error.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let limit = (MAX_LINE_LEN + CRLF.len()) as u64;
    let mut line = Vec::new();

    let read = reader
        .by_ref()
        .take(limit)
        .read_until(b'\n', &mut line)
        .map_err(map_io_error)?;

    if read == 0 {
        return Err(RedwireError::ConnectionClosed);
    }
    if line.last() != Some(&b'\n') {
        if read as u64 == limit {
            return Err(RedwireError::Protocol(format!(
                "reply line exceeds {} bytes",
                MAX_LINE_LEN
            )));
        }
        return Err(RedwireError::ConnectionClosed);
    }
    if !line.ends_with(CRLF) {
        return Err(RedwireError::Protocol(
            "reply line not terminated by CRLF".to_string(),
        ));
    }

    line.truncate(line.len() - CRLF.len());
    Ok(line)
}

fn line_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Signed decimal; only `-` is accepted as a sign
fn parse_integer(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|s| !s.starts_with('+'))
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            RedwireError::Protocol(format!(
                "invalid integer: {:?}",
                String::from_utf8_lossy(bytes)
            ))
        })
}

/// Fold the various "peer went away" errors into `ConnectionClosed`
fn map_io_error(err: std::io::Error) -> RedwireError {
    match err.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => RedwireError::ConnectionClosed,
        _ => RedwireError::Io(err),
    }
}
