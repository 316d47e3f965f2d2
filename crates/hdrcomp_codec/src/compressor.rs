//! General-purpose compressors, reduced to the size they produce.

use flate2::Compression;
use flate2::write::GzEncoder;
use hdrcomp_core::{BenchError, BenchResult};
use std::io::Write;

/// Stateless compressor capability
///
/// Implementations must be deterministic: the same input always yields the
/// same size.
pub trait Compressor: Send + Sync {
    /// Size in bytes of `bytes` after compression
    ///
    /// # Errors
    ///
    /// Returns `Compressor` if the underlying codec fails.
    fn compress(&self, bytes: &[u8]) -> BenchResult<u64>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// gzip (RFC 1952) at a fixed level, as an HTTP/1.1 server would send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    /// Highest level flate2 accepts
    pub const MAX_LEVEL: u32 = 9;

    /// Create a gzip compressor; levels above 9 are clamped
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(Self::MAX_LEVEL),
        }
    }

    /// Configured level
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, bytes: &[u8]) -> BenchResult<u64> {
        let mut encoder = GzEncoder::new(
            Vec::with_capacity(bytes.len() / 2 + 32),
            Compression::new(self.level),
        );
        encoder
            .write_all(bytes)
            .map_err(|e| BenchError::compressor(e.to_string()))?;
        let out = encoder
            .finish()
            .map_err(|e| BenchError::compressor(e.to_string()))?;
        Ok(out.len() as u64)
    }

    fn name(&self) -> &'static str {
        "gzip"
    }
}

/// Reports the input length unchanged
///
/// Lets strategy tests pin exact byte counts without depending on a codec's
/// output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityCompressor;

impl Compressor for IdentityCompressor {
    fn compress(&self, bytes: &[u8]) -> BenchResult<u64> {
        Ok(bytes.len() as u64)
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_deterministic() {
        let gz = GzipCompressor::default();
        let input = b"GET / HTTP/1.1\r\nhost: example.com\r\n\r\n";
        assert_eq!(gz.compress(input).unwrap(), gz.compress(input).unwrap());
    }

    #[test]
    fn test_gzip_shrinks_repetitive_input() {
        let gz = GzipCompressor::default();
        let input = b"accept-encoding: gzip, deflate\r\n".repeat(64);
        let size = gz.compress(&input).unwrap();
        assert!(size < input.len() as u64 / 4);
    }

    #[test]
    fn test_gzip_empty_input_has_framing_cost() {
        // 10 byte header, empty final block, 8 byte trailer
        let size = GzipCompressor::default().compress(&[]).unwrap();
        assert!(size >= 18);
    }

    #[test]
    fn test_gzip_level_clamped() {
        assert_eq!(GzipCompressor::new(42).level(), 9);
    }

    #[test]
    fn test_identity() {
        assert_eq!(IdentityCompressor.compress(b"12345").unwrap(), 5);
        assert_eq!(IdentityCompressor.name(), "identity");
    }
}
