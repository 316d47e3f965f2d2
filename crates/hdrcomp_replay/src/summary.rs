//! Per-direction comparison against a baseline scheme.

use crate::table::MeasurementTable;
use hdrcomp_codec::SchemeTag;
use hdrcomp_core::{BenchError, BenchResult, MessageKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How one scheme did relative to the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeSummary {
    /// Scheme
    pub scheme: SchemeTag,
    /// Total compressed bytes
    pub total: u64,
    /// `total / baseline total` (0 when the baseline total is 0)
    pub ratio: f64,
    /// Smallest per-message ratio
    pub min_ratio: f64,
    /// Largest per-message ratio
    pub max_ratio: f64,
    /// Standard deviation of per-message ratios
    pub std_dev: f64,
}

/// Summary of one measurement table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionSummary {
    /// Direction
    pub kind: MessageKind,
    /// Number of messages measured
    pub messages: usize,
    /// Baseline scheme
    pub baseline: SchemeTag,
    /// One entry per column, in column order
    pub schemes: Vec<SchemeSummary>,
}

impl DirectionSummary {
    /// Summarise `table` against `baseline`
    ///
    /// Messages whose baseline cost is 0 are left out of the per-message
    /// ratio statistics.
    ///
    /// # Errors
    ///
    /// Returns `UnknownScheme` if `baseline` is not a column of `table`.
    pub fn from_table(table: &MeasurementTable, baseline: SchemeTag) -> BenchResult<Self> {
        let base_costs = table
            .increments(baseline)
            .ok_or_else(|| BenchError::unknown_scheme(baseline.as_str()))?;
        let base_total: u64 = base_costs.iter().sum();

        let mut schemes = Vec::with_capacity(table.schemes().len());
        for &scheme in table.schemes() {
            let costs = table.increments(scheme).unwrap_or_default();
            let total: u64 = costs.iter().sum();
            let ratios: Vec<f64> = costs
                .iter()
                .zip(&base_costs)
                .filter(|(_, base)| **base > 0)
                .map(|(cost, base)| *cost as f64 / *base as f64)
                .collect();

            schemes.push(SchemeSummary {
                scheme,
                total,
                ratio: ratio(total, base_total),
                min_ratio: ratios.iter().copied().reduce(f64::min).unwrap_or(0.0),
                max_ratio: ratios.iter().copied().reduce(f64::max).unwrap_or(0.0),
                std_dev: std_dev(&ratios),
            });
        }

        Ok(Self {
            kind: table.kind(),
            messages: table.len(),
            baseline,
            schemes,
        })
    }

    /// Entry for `scheme`
    #[must_use]
    pub fn scheme(&self, scheme: SchemeTag) -> Option<&SchemeSummary> {
        self.schemes.iter().find(|s| s.scheme == scheme)
    }
}

impl fmt::Display for DirectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .schemes
            .iter()
            .map(|s| s.scheme.as_str().len())
            .max()
            .unwrap_or(0);

        writeln!(f, "{} {} messages processed", self.messages, self.kind)?;
        writeln!(
            f,
            "{:w$}    {:>13} | ratio min   max   std",
            "",
            "compressed",
            w = width
        )?;
        for s in &self.schemes {
            writeln!(
                f,
                "{} {:w$} {:>13} | {:2.2}  {:2.2}  {:2.2}  {:2.2}",
                self.kind,
                s.scheme.as_str(),
                s.total,
                s.ratio,
                s.min_ratio,
                s.max_ratio,
                s.std_dev,
                w = width
            )?;
        }
        Ok(())
    }
}

fn ratio(value: u64, base: u64) -> f64 {
    if base == 0 {
        0.0
    } else {
        value as f64 / base as f64
    }
}

/// Sample standard deviation; 0 for fewer than two values
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MeasurementTable {
        let mut t = MeasurementTable::new(
            MessageKind::Request,
            vec![SchemeTag::Http1Gzip, SchemeTag::Delta],
        );
        t.append(&[40, 40]).unwrap();
        t.append(&[40, 20]).unwrap();
        t.append(&[40, 10]).unwrap();
        t
    }

    #[test]
    fn test_summary_against_baseline() {
        let summary = DirectionSummary::from_table(&table(), SchemeTag::Http1Gzip).unwrap();
        assert_eq!(summary.messages, 3);

        let base = summary.scheme(SchemeTag::Http1Gzip).unwrap();
        assert_eq!(base.total, 120);
        assert!((base.ratio - 1.0).abs() < f64::EPSILON);
        assert!(base.std_dev.abs() < f64::EPSILON);

        let delta = summary.scheme(SchemeTag::Delta).unwrap();
        assert_eq!(delta.total, 70);
        assert!((delta.ratio - 70.0 / 120.0).abs() < 1e-9);
        assert!((delta.min_ratio - 0.25).abs() < 1e-9);
        assert!((delta.max_ratio - 1.0).abs() < 1e-9);
        assert!(delta.std_dev > 0.0);
    }

    #[test]
    fn test_summary_unknown_baseline() {
        let err = DirectionSummary::from_table(&table(), SchemeTag::Spdy3).unwrap_err();
        assert!(matches!(err, BenchError::UnknownScheme { .. }));
    }

    #[test]
    fn test_summary_empty_table() {
        let t = MeasurementTable::new(MessageKind::Response, vec![SchemeTag::Delta]);
        let summary = DirectionSummary::from_table(&t, SchemeTag::Delta).unwrap();
        assert_eq!(summary.messages, 0);
        assert_eq!(summary.schemes[0].ratio, 0.0);
    }

    #[test]
    fn test_display() {
        let summary = DirectionSummary::from_table(&table(), SchemeTag::Http1Gzip).unwrap();
        let text = summary.to_string();
        assert!(text.starts_with("3 req messages processed\n"));
        assert!(text.contains("req http1_gzip"));
        assert!(text.contains("| 1.00  1.00  1.00  0.00"));
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[1.0]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 2f64.sqrt()).abs() < 1e-9);
    }
}
