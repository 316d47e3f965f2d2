//! Per-message compression with nothing carried between messages.

use crate::compressor::Compressor;
use crate::scheme::SchemeTag;
use crate::strategy::CompressionStrategy;
use hdrcomp_core::{BenchResult, Message, http1};

/// HTTP/1.1 header block plus body, compressed on its own
pub struct IndependentStrategy {
    compressor: Box<dyn Compressor>,
}

impl IndependentStrategy {
    /// Create the strategy around `compressor`
    #[must_use]
    pub fn new(compressor: Box<dyn Compressor>) -> Self {
        Self { compressor }
    }
}

impl CompressionStrategy for IndependentStrategy {
    fn scheme(&self) -> SchemeTag {
        SchemeTag::Http1Gzip
    }

    fn measure(&mut self, message: &Message) -> BenchResult<u64> {
        message.validate()?;
        let framed = http1::frame(message)?;
        self.compressor.compress(&framed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::{GzipCompressor, IdentityCompressor};
    use hdrcomp_core::{BenchError, HeaderField};

    fn get(path: &str) -> Message {
        Message::request(
            vec![
                HeaderField::new(":method", "GET"),
                HeaderField::new(":path", path),
                HeaderField::new(":version", "HTTP/1.1"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_pinned_identity_cost() {
        let mut strategy = IndependentStrategy::new(Box::new(IdentityCompressor));
        // "GET / HTTP/1.1\r\n\r\n"
        assert_eq!(strategy.measure(&get("/")).unwrap(), 18);
    }

    #[test]
    fn test_cost_independent_of_position() {
        let mut strategy = IndependentStrategy::new(Box::new(GzipCompressor::default()));
        let target = get("/style.css");
        let first = strategy.measure(&target).unwrap();
        strategy.measure(&get("/a")).unwrap();
        strategy.measure(&get("/style.css?v=2")).unwrap();
        let later = strategy.measure(&target).unwrap();
        assert_eq!(first, later);
    }

    #[test]
    fn test_body_is_included() {
        let mut strategy = IndependentStrategy::new(Box::new(IdentityCompressor));
        let msg = Message::response(vec![HeaderField::new(":status", "200")], b"abc".to_vec());
        // "HTTP/1.1 200 \r\n\r\nabc"
        assert_eq!(strategy.measure(&msg).unwrap(), 20);
    }

    #[test]
    fn test_malformed_message_fails() {
        let mut strategy = IndependentStrategy::new(Box::new(IdentityCompressor));
        let msg = get("/").with_declared_body_len(10);
        assert!(matches!(
            strategy.measure(&msg),
            Err(BenchError::DecodeFailure { .. })
        ));
    }
}
