//! Error taxonomy for a replay run.
//!
//! Every variant is terminal for the run that raised it. Nothing is retried.

use std::io;
use std::path::{Path, PathBuf};

/// Result type used across the hdrcomp crates
pub type BenchResult<T> = Result<T, BenchError>;

/// Error raised while configuring, loading, replaying or writing a run
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// A `-c` value did not name a known scheme
    #[error("Unknown scheme: {name}")]
    UnknownScheme {
        /// The rejected scheme text
        name: String,
    },

    /// A message violated the structure a strategy requires
    #[error("Decode failure: {reason}")]
    DecodeFailure {
        /// What was wrong with the message
        reason: String,
    },

    /// Reading a capture or writing a table failed
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The capture file is not a usable HAR document
    #[error("Invalid capture {}: {reason}", path.display())]
    Har {
        /// Offending path
        path: PathBuf,
        /// Parse failure detail
        reason: String,
    },

    /// A `-m` connection pattern could not be compiled
    #[error("Invalid host pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Compile error detail
        reason: String,
    },

    /// The underlying compressor refused its input
    #[error("Compressor failure: {reason}")]
    Compressor {
        /// Compressor error detail
        reason: String,
    },
}

impl BenchError {
    /// Build an `UnknownScheme` error
    #[must_use]
    pub fn unknown_scheme(name: impl Into<String>) -> Self {
        Self::UnknownScheme { name: name.into() }
    }

    /// Build a `DecodeFailure` error
    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            reason: reason.into(),
        }
    }

    /// Build an `Io` error for `path`
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a `Compressor` error
    #[must_use]
    pub fn compressor(reason: impl Into<String>) -> Self {
        Self::Compressor {
            reason: reason.into(),
        }
    }

    /// Build an `InvalidPattern` error
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownScheme { .. } => "unknown_scheme",
            Self::DecodeFailure { .. } => "decode_failure",
            Self::Io { .. } | Self::Har { .. } => "io_failure",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::Compressor { .. } => "compressor_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::unknown_scheme("not_a_real_scheme");
        assert_eq!(format!("{}", err), "Unknown scheme: not_a_real_scheme");

        let err = BenchError::decode("missing :method");
        assert_eq!(err.to_string(), "Decode failure: missing :method");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = BenchError::io(
            "/tmp/missing.har",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let s = err.to_string();
        assert!(s.contains("/tmp/missing.har"));
        assert!(s.contains("gone"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(BenchError::unknown_scheme("x").kind(), "unknown_scheme");
        assert_eq!(BenchError::decode("x").kind(), "decode_failure");
        let har = BenchError::Har {
            path: PathBuf::from("a.har"),
            reason: "bad".to_string(),
        };
        assert_eq!(har.kind(), "io_failure");
        let pattern = BenchError::invalid_pattern("a\\.(", "unclosed group");
        assert_eq!(pattern.kind(), "invalid_pattern");
        assert!(pattern.to_string().contains("a\\.("));
    }
}
