//! Scheme tags as they appear on the command line and in table headers.

use hdrcomp_core::{BenchError, BenchResult};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One compression scheme under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemeTag {
    /// Each message gzipped on its own (`http1_gzip`)
    #[serde(rename = "http1_gzip")]
    Http1Gzip,
    /// Headers through one persistent zlib context per direction (`spdy3`)
    #[serde(rename = "spdy3")]
    Spdy3,
    /// Difference against the previous message of the same kind (`delta`)
    #[serde(rename = "delta")]
    Delta,
}

impl SchemeTag {
    /// Every recognised scheme
    pub const ALL: [SchemeTag; 3] = [SchemeTag::Http1Gzip, SchemeTag::Spdy3, SchemeTag::Delta];

    /// Tag text, also the column header and chart legend label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http1Gzip => "http1_gzip",
            Self::Spdy3 => "spdy3",
            Self::Delta => "delta",
        }
    }
}

impl fmt::Display for SchemeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeTag {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| BenchError::unknown_scheme(s))
    }
}

/// Parse `-c` values in the order given
///
/// Repeated values keep their first position.
///
/// # Errors
///
/// Returns `UnknownScheme` for the first unrecognised value, and also when
/// no scheme is given at all.
pub fn parse_schemes<S: AsRef<str>>(values: &[S]) -> BenchResult<Vec<SchemeTag>> {
    let mut seen = IndexSet::with_capacity(values.len());
    for value in values {
        let tag: SchemeTag = value.as_ref().trim().parse()?;
        if !seen.insert(tag) {
            tracing::warn!(scheme = %tag, "scheme given more than once, keeping first position");
        }
    }
    if seen.is_empty() {
        return Err(BenchError::unknown_scheme("<none>"));
    }
    Ok(seen.into_iter().collect())
}
