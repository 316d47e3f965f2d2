//! Delta encoding against the previous message of the same direction.

use crate::compressor::Compressor;
use crate::diff;
use crate::scheme::SchemeTag;
use crate::strategy::CompressionStrategy;
use hdrcomp_core::{BenchResult, Message, http1};

/// Compresses the difference between a message and its predecessor
///
/// The first message has no predecessor and costs the same as a full
/// per-message compression. Every call replaces the stored predecessor,
/// including calls whose message is identical to it.
pub struct DeltaStrategy {
    compressor: Box<dyn Compressor>,
    previous: Option<Vec<u8>>,
}

impl DeltaStrategy {
    /// Create the strategy with no predecessor
    #[must_use]
    pub fn new(compressor: Box<dyn Compressor>) -> Self {
        Self {
            compressor,
            previous: None,
        }
    }

    /// Wire bytes of the last message measured
    #[must_use]
    pub fn previous(&self) -> Option<&[u8]> {
        self.previous.as_deref()
    }
}

impl CompressionStrategy for DeltaStrategy {
    fn scheme(&self) -> SchemeTag {
        SchemeTag::Delta
    }

    fn measure(&mut self, message: &Message) -> BenchResult<u64> {
        message.validate()?;
        let framed = http1::frame(message)?;

        let cost = match &self.previous {
            None => self.compressor.compress(&framed)?,
            Some(previous) => {
                let delta = diff::encode(previous, &framed);
                tracing::trace!(
                    framed = framed.len(),
                    delta = delta.len(),
                    "delta encoded against previous message"
                );
                self.compressor.compress(&delta)?
            }
        };

        self.previous = Some(framed);
        Ok(cost)
    }
}
