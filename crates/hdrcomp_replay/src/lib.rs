//! hdrcomp Replay Driver
//!
//! Replays a session through every configured scheme, one direction at a
//! time, and accumulates per-scheme byte counts into measurement tables.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod engine;
pub mod summary;
pub mod table;
pub mod tsv;

pub use connection::{ConnectionMap, ConnectionPolicy, ConnectionRule};
pub use engine::{ReplayConfig, ReplayEngine, ReplayOutput};
pub use summary::{DirectionSummary, SchemeSummary};
pub use table::{MeasurementRow, MeasurementTable};
pub use tsv::{table_path, write_table, write_tables_atomic};
