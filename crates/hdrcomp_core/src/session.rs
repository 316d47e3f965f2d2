//! Ordered sequence of captured exchanges.
//!
//! Capture order is replay order. A session is never reordered or
//! deduplicated once loaded.

use crate::error::{BenchError, BenchResult};
use crate::message::{Message, MessageKind};
use serde::{Deserialize, Serialize};

/// A request and its response, if the capture recorded one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    request: Message,
    response: Option<Message>,
}

impl Exchange {
    /// Pair a request with an optional response
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if either message has the wrong kind
    pub fn new(request: Message, response: Option<Message>) -> BenchResult<Self> {
        if request.kind() != MessageKind::Request {
            return Err(BenchError::decode("exchange request slot holds a response"));
        }
        if let Some(res) = &response {
            if res.kind() != MessageKind::Response {
                return Err(BenchError::decode("exchange response slot holds a request"));
            }
        }
        Ok(Self { request, response })
    }

    /// The request
    #[must_use]
    pub fn request(&self) -> &Message {
        &self.request
    }

    /// The response, absent for an incomplete capture
    #[must_use]
    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }

    /// The message travelling in `kind`'s direction
    #[must_use]
    pub fn message(&self, kind: MessageKind) -> Option<&Message> {
        match kind {
            MessageKind::Request => Some(&self.request),
            MessageKind::Response => self.response.as_ref(),
        }
    }
}

/// Replayable capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    exchanges: Vec<Exchange>,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self {
            exchanges: Vec::new(),
        }
    }

    /// Create a session from exchanges in capture order
    #[must_use]
    pub fn from_exchanges(exchanges: Vec<Exchange>) -> Self {
        Self { exchanges }
    }

    /// Append an exchange
    pub fn push(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// Append every exchange of `other`, keeping its order
    pub fn append(&mut self, other: Session) {
        self.exchanges.extend(other.exchanges);
    }

    /// Exchanges in capture order
    #[must_use]
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Number of exchanges
    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Whether the session has no exchanges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Messages of one kind, in capture order, skipping absent responses
    pub fn messages(&self, kind: MessageKind) -> impl Iterator<Item = &Message> + '_ {
        self.exchanges.iter().filter_map(move |ex| ex.message(kind))
    }

    /// Number of messages of one kind
    #[must_use]
    pub fn message_count(&self, kind: MessageKind) -> usize {
        self.messages(kind).count()
    }
}
