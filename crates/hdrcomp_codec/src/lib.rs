//! hdrcomp Compression Schemes
//!
//! Each scheme models one way of carrying HTTP messages over a connection
//! and reports how many bytes a message costs under it. Only sizes are
//! measured; nothing produced here needs to be decompressible.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compressor;
pub mod delta;
pub mod diff;
pub mod independent;
pub mod scheme;
pub mod strategy;
pub mod streaming;

pub use compressor::{Compressor, GzipCompressor, IdentityCompressor};
pub use delta::DeltaStrategy;
pub use independent::IndependentStrategy;
pub use scheme::{SchemeTag, parse_schemes};
pub use strategy::{CodecConfig, CompressionStrategy, StrategySet, build_strategy};
pub use streaming::{HeaderStream, SharedStreamStrategy, spdy3_dictionary};
