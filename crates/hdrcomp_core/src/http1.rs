//! HTTP/1.1 wire framing of a message.
//!
//! This is the byte stream an unoptimised HTTP/1.1 connection would carry,
//! and the input the per-message and delta strategies compress.

use crate::error::{BenchError, BenchResult};
use crate::message::{Message, MessageKind};

/// Version used when a capture omits `:version`
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

const CRLF: &[u8] = b"\r\n";

/// Serialise the start line and header fields, ending with the blank line
///
/// # Errors
///
/// Returns `DecodeFailure` if a request lacks `:method` or `:path`, or a
/// response lacks `:status`.
pub fn header_block(message: &Message) -> BenchResult<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    let version = message.header(":version").unwrap_or(DEFAULT_VERSION);

    match message.kind() {
        MessageKind::Request => {
            let method = required(message, ":method")?;
            let path = required(message, ":path")?;
            push_line(&mut out, &[method, " ", path, " ", version]);
        }
        MessageKind::Response => {
            let status = required(message, ":status")?;
            let text = message.header(":status-text").unwrap_or("");
            push_line(&mut out, &[version, " ", status, " ", text]);
        }
    }

    for field in message.headers() {
        let name = match field.name.as_str() {
            ":host" => "host",
            name if name.starts_with(':') => continue,
            name => name,
        };
        push_line(&mut out, &[name, ": ", &field.value]);
    }
    out.extend_from_slice(CRLF);

    Ok(out)
}

/// Header block followed by the body
///
/// # Errors
///
/// Same as [`header_block`]
pub fn frame(message: &Message) -> BenchResult<Vec<u8>> {
    let mut out = header_block(message)?;
    out.extend_from_slice(message.body());
    Ok(out)
}

fn required<'a>(message: &'a Message, name: &str) -> BenchResult<&'a str> {
    message
        .header(name)
        .ok_or_else(|| BenchError::decode(format!("{} is missing {}", message.kind(), name)))
}

fn push_line(out: &mut Vec<u8>, parts: &[&str]) {
    for part in parts {
        out.extend_from_slice(part.as_bytes());
    }
    out.extend_from_slice(CRLF);
}
