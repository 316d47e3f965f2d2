//! Append-only tables of cumulative compressed sizes.

use hdrcomp_codec::SchemeTag;
use hdrcomp_core::{BenchError, BenchResult, MessageKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Cumulative byte counts after one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// Zero-based position in the table
    pub index: usize,
    /// Running total per scheme, in column order
    pub totals: IndexMap<SchemeTag, u64>,
}

impl MeasurementRow {
    /// Running total for `scheme`
    #[must_use]
    pub fn total(&self, scheme: SchemeTag) -> Option<u64> {
        self.totals.get(&scheme).copied()
    }
}

/// One direction's measurements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementTable {
    kind: MessageKind,
    schemes: Vec<SchemeTag>,
    rows: Vec<MeasurementRow>,
    running: Vec<u64>,
}

impl MeasurementTable {
    /// Create an empty table with the given column order
    #[must_use]
    pub fn new(kind: MessageKind, schemes: Vec<SchemeTag>) -> Self {
        let running = vec![0; schemes.len()];
        Self {
            kind,
            schemes,
            rows: Vec::new(),
            running,
        }
    }

    /// Add one message's incremental costs and append the new totals
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if `costs` does not have one entry per
    /// column.
    pub fn append(&mut self, costs: &[u64]) -> BenchResult<&MeasurementRow> {
        if costs.len() != self.schemes.len() {
            return Err(BenchError::decode(format!(
                "{} costs for {} columns",
                costs.len(),
                self.schemes.len()
            )));
        }

        for (total, cost) in self.running.iter_mut().zip(costs) {
            *total = total.saturating_add(*cost);
        }
        let row = MeasurementRow {
            index: self.rows.len(),
            totals: self
                .schemes
                .iter()
                .copied()
                .zip(self.running.iter().copied())
                .collect(),
        };
        self.rows.push(row);
        Ok(&self.rows[self.rows.len() - 1])
    }

    /// Direction measured
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Column order
    #[must_use]
    pub fn schemes(&self) -> &[SchemeTag] {
        &self.schemes
    }

    /// Rows in index order
    #[must_use]
    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no message was measured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Final running total for `scheme`, 0 for an empty table
    #[must_use]
    pub fn total(&self, scheme: SchemeTag) -> Option<u64> {
        let column = self.schemes.iter().position(|&s| s == scheme)?;
        Some(self.running[column])
    }

    /// Cumulative column for `scheme`
    #[must_use]
    pub fn column(&self, scheme: SchemeTag) -> Option<Vec<u64>> {
        if !self.schemes.contains(&scheme) {
            return None;
        }
        self.rows.iter().map(|row| row.total(scheme)).collect()
    }

    /// Per-message costs for `scheme`, recovered from the running totals
    #[must_use]
    pub fn increments(&self, scheme: SchemeTag) -> Option<Vec<u64>> {
        let column = self.column(scheme)?;
        let mut previous = 0;
        Some(
            column
                .into_iter()
                .map(|total| {
                    let cost = total - previous;
                    previous = total;
                    cost
                })
                .collect(),
        )
    }
}
