//! A single request or response, reduced to header fields and a body.

use crate::error::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction a message travels in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    /// Client to server
    Request,
    /// Server to client
    Response,
}

impl MessageKind {
    /// Both kinds, request first
    pub const ALL: [MessageKind; 2] = [MessageKind::Request, MessageKind::Response];

    /// Short tag used in output file names (`req` / `res`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "req",
            Self::Response => "res",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One header line. Names are not unique within a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderField {
    /// Field name; a leading `:` marks a pseudo-header
    pub name: String,
    /// Field value
    pub value: String,
}

impl HeaderField {
    /// Create a header field
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this is a pseudo-header (`:method`, `:status`, ...)
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with(':')
    }
}

/// Immutable HTTP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    headers: Vec<HeaderField>,
    body: Vec<u8>,
    declared_body_len: Option<usize>,
}

impl Message {
    /// Create a message of the given kind
    #[must_use]
    pub fn new(kind: MessageKind, headers: Vec<HeaderField>, body: Vec<u8>) -> Self {
        Self {
            kind,
            headers,
            body,
            declared_body_len: None,
        }
    }

    /// Create a request
    #[must_use]
    pub fn request(headers: Vec<HeaderField>, body: Vec<u8>) -> Self {
        Self::new(MessageKind::Request, headers, body)
    }

    /// Create a response
    #[must_use]
    pub fn response(headers: Vec<HeaderField>, body: Vec<u8>) -> Self {
        Self::new(MessageKind::Response, headers, body)
    }

    /// Record the body length the capture claimed for this message
    #[must_use]
    pub fn with_declared_body_len(mut self, len: usize) -> Self {
        self.declared_body_len = Some(len);
        self
    }

    /// Message kind
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Header fields in capture order
    #[must_use]
    pub fn headers(&self) -> &[HeaderField] {
        &self.headers
    }

    /// Body bytes (possibly empty)
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body length claimed by the capture, if any
    #[must_use]
    pub const fn declared_body_len(&self) -> Option<usize> {
        self.declared_body_len
    }

    /// First value for `name` (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// Check the structural invariants every strategy relies on
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` for an empty header name, a CR, LF or NUL in
    /// a name or value, or a declared body length that differs from the
    /// body present.
    pub fn validate(&self) -> BenchResult<()> {
        for field in &self.headers {
            if field.name.is_empty() || field.name == ":" {
                return Err(BenchError::decode(format!(
                    "{} has an empty header name",
                    self.kind
                )));
            }
            if has_line_break(&field.name) {
                return Err(BenchError::decode(format!(
                    "{} header name {:?} contains a control character",
                    self.kind, field.name
                )));
            }
            if has_line_break(&field.value) {
                return Err(BenchError::decode(format!(
                    "{} header {} has a control character in its value",
                    self.kind, field.name
                )));
            }
        }

        if let Some(declared) = self.declared_body_len {
            if declared != self.body.len() {
                return Err(BenchError::decode(format!(
                    "{} body declared as {} bytes but {} present",
                    self.kind,
                    declared,
                    self.body.len()
                )));
            }
        }

        Ok(())
    }
}

fn has_line_break(s: &str) -> bool {
    s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0))
}
