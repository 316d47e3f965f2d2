//! The strategy abstraction and per-direction strategy sets.

use crate::compressor::GzipCompressor;
use crate::delta::DeltaStrategy;
use crate::independent::IndependentStrategy;
use crate::scheme::SchemeTag;
use crate::streaming::SharedStreamStrategy;
use hdrcomp_core::{BenchError, BenchResult, Message, MessageKind};
use serde::{Deserialize, Serialize};

/// A compression scheme with its private per-direction state
///
/// `measure` is called once per message, in session order, and returns the
/// bytes that message adds to the stream. Accumulation is the caller's job.
/// Instances are never shared between directions or runs.
pub trait CompressionStrategy: Send {
    /// Scheme this instance implements
    fn scheme(&self) -> SchemeTag;

    /// Whether messages of `kind` are measured by this strategy
    fn applies_to(&self, kind: MessageKind) -> bool {
        let _ = kind;
        true
    }

    /// Incremental cost of `message`, updating internal state
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` for a malformed message and `Compressor` if
    /// the codec fails.
    fn measure(&mut self, message: &Message) -> BenchResult<u64>;
}

/// Codec settings shared by every strategy in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// gzip level for per-message and delta compression (0-9)
    pub level: u32,
    /// zlib level for the shared header stream (0-9)
    pub stream_level: u32,
}

impl CodecConfig {
    /// Set the per-message gzip level
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(GzipCompressor::MAX_LEVEL);
        self
    }

    /// Set the header stream level
    #[must_use]
    pub fn with_stream_level(mut self, level: u32) -> Self {
        self.stream_level = level.min(GzipCompressor::MAX_LEVEL);
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            level: 6,
            stream_level: 9,
        }
    }
}

/// Create a fresh, empty-state instance of `tag`
///
/// # Errors
///
/// Returns `Compressor` if the header stream cannot be initialised.
pub fn build_strategy(
    tag: SchemeTag,
    config: &CodecConfig,
) -> BenchResult<Box<dyn CompressionStrategy>> {
    let gzip = Box::new(GzipCompressor::new(config.level));
    Ok(match tag {
        SchemeTag::Http1Gzip => Box::new(IndependentStrategy::new(gzip)),
        SchemeTag::Spdy3 => Box::new(SharedStreamStrategy::new(config.stream_level, gzip)?),
        SchemeTag::Delta => Box::new(DeltaStrategy::new(gzip)),
    })
}

/// The strategies bound to one direction, in declared column order
pub struct StrategySet {
    kind: MessageKind,
    strategies: Vec<Box<dyn CompressionStrategy>>,
}

impl StrategySet {
    /// Create an empty set for `kind`
    #[must_use]
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            strategies: Vec::new(),
        }
    }

    /// Build one fresh instance per scheme, in the order given
    ///
    /// # Errors
    ///
    /// Propagates [`build_strategy`] failures.
    pub fn build(kind: MessageKind, schemes: &[SchemeTag], config: &CodecConfig) -> BenchResult<Self> {
        let mut set = Self::new(kind);
        for &tag in schemes {
            set.push(build_strategy(tag, config)?);
        }
        Ok(set)
    }

    /// Append a strategy as the next column
    pub fn push(&mut self, strategy: Box<dyn CompressionStrategy>) {
        self.strategies.push(strategy);
    }

    /// Direction this set measures
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Scheme tags in column order
    #[must_use]
    pub fn schemes(&self) -> Vec<SchemeTag> {
        self.strategies.iter().map(|s| s.scheme()).collect()
    }

    /// Number of strategies
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Measure `message` under every strategy, returning costs in column order
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if `message` travels the other direction, and
    /// the first error any strategy raises.
    pub fn measure_all(&mut self, message: &Message) -> BenchResult<Vec<u64>> {
        if message.kind() != self.kind {
            return Err(BenchError::decode(format!(
                "{} message fed to the {} strategies",
                message.kind(),
                self.kind
            )));
        }

        let mut costs = Vec::with_capacity(self.strategies.len());
        for strategy in &mut self.strategies {
            let cost = if strategy.applies_to(self.kind) {
                strategy.measure(message)?
            } else {
                0
            };
            costs.push(cost);
        }
        Ok(costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrcomp_core::HeaderField;

    fn request() -> Message {
        Message::request(
            vec![
                HeaderField::new(":method", "GET"),
                HeaderField::new(":path", "/"),
                HeaderField::new(":version", "HTTP/1.1"),
            ],
            Vec::new(),
        )
    }

    struct RequestsOnly;

    impl CompressionStrategy for RequestsOnly {
        fn scheme(&self) -> SchemeTag {
            SchemeTag::Delta
        }

        fn applies_to(&self, kind: MessageKind) -> bool {
            kind == MessageKind::Request
        }

        fn measure(&mut self, _message: &Message) -> BenchResult<u64> {
            Ok(7)
        }
    }

    #[test]
    fn test_build_keeps_declared_order() {
        let schemes = [SchemeTag::Delta, SchemeTag::Http1Gzip, SchemeTag::Spdy3];
        let set = StrategySet::build(MessageKind::Request, &schemes, &CodecConfig::default()).unwrap();
        assert_eq!(set.schemes(), schemes.to_vec());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_measure_all_returns_one_cost_per_strategy() {
        let schemes = [SchemeTag::Http1Gzip, SchemeTag::Delta];
        let mut set =
            StrategySet::build(MessageKind::Request, &schemes, &CodecConfig::default()).unwrap();
        let costs = set.measure_all(&request()).unwrap();
        assert_eq!(costs.len(), 2);
        assert!(costs.iter().all(|&c| c > 0));
    }

    #[test]
    fn test_measure_all_rejects_wrong_direction() {
        let mut set = StrategySet::build(
            MessageKind::Response,
            &[SchemeTag::Http1Gzip],
            &CodecConfig::default(),
        )
        .unwrap();
        let err = set.measure_all(&request()).unwrap_err();
        assert!(matches!(err, BenchError::DecodeFailure { .. }));
    }

    #[test]
    fn test_non_applicable_strategy_costs_nothing() {
        let mut set = StrategySet::new(MessageKind::Response);
        set.push(Box::new(RequestsOnly));
        let response = Message::response(vec![HeaderField::new(":status", "200")], Vec::new());
        assert_eq!(set.measure_all(&response).unwrap(), vec![0]);

        let mut set = StrategySet::new(MessageKind::Request);
        set.push(Box::new(RequestsOnly));
        assert_eq!(set.measure_all(&request()).unwrap(), vec![7]);
    }

    #[test]
    fn test_codec_config_clamps() {
        let config = CodecConfig::default().with_level(12).with_stream_level(3);
        assert_eq!(config.level, 9);
        assert_eq!(config.stream_level, 3);
    }
}
