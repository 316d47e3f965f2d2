//! Replay driver.
//!
//! Each direction is one strictly sequential pass over the session. The two
//! passes share nothing but the read-only session and its connection map, so
//! they may run on separate threads. Every simulated connection owns its own
//! strategy set; rows still accumulate in capture order across connections.

use crate::connection::{ConnectionMap, ConnectionPolicy};
use crate::table::MeasurementTable;
use hdrcomp_codec::{CodecConfig, SchemeTag, StrategySet};
use hdrcomp_core::{BenchError, BenchResult, MessageKind, Session};
use serde::{Deserialize, Serialize};

/// Replay configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Run the request and response passes on separate threads
    pub parallel_directions: bool,
    /// Maximum exchanges to replay (0 = unlimited)
    pub max_exchanges: usize,
    /// Codec settings for every strategy
    pub codec: CodecConfig,
    /// How exchanges are grouped into simulated connections
    #[serde(default)]
    pub connections: ConnectionPolicy,
}

impl ReplayConfig {
    /// Run both directions on the calling thread
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel_directions = false;
        self
    }

    /// Stop after `max` exchanges (0 = unlimited)
    #[must_use]
    pub fn with_max_exchanges(mut self, max: usize) -> Self {
        self.max_exchanges = max;
        self
    }

    /// Set codec settings
    #[must_use]
    pub fn with_codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// Set the connection policy
    #[must_use]
    pub fn with_connections(mut self, connections: ConnectionPolicy) -> Self {
        self.connections = connections;
        self
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            parallel_directions: true,
            max_exchanges: 0,
            codec: CodecConfig::default(),
            connections: ConnectionPolicy::default(),
        }
    }
}

/// Both tables produced by one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOutput {
    /// Request table
    pub requests: MeasurementTable,
    /// Response table (compacted: only exchanges that had a response)
    pub responses: MeasurementTable,
    /// Simulated connections, in the order they were opened
    pub connections: Vec<String>,
}

impl ReplayOutput {
    /// Table for `kind`
    #[must_use]
    pub fn table(&self, kind: MessageKind) -> &MeasurementTable {
        match kind {
            MessageKind::Request => &self.requests,
            MessageKind::Response => &self.responses,
        }
    }
}

/// Replay engine driving strategies over a session
pub struct ReplayEngine {
    config: ReplayConfig,
}

impl ReplayEngine {
    /// Create a new replay engine
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ReplayConfig::default(),
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Replay `session` through fresh instances of `schemes`, one set per
    /// direction and connection
    ///
    /// # Errors
    ///
    /// Returns the first error raised while grouping connections, building
    /// strategies or measuring any message; no table is returned in that
    /// case.
    pub fn run_schemes(&self, session: &Session, schemes: &[SchemeTag]) -> BenchResult<ReplayOutput> {
        let connections = ConnectionMap::build(session, &self.config.connections)?;
        let build = |kind| {
            (0..connections.len())
                .map(|_| StrategySet::build(kind, schemes, &self.config.codec))
                .collect::<BenchResult<Vec<_>>>()
        };
        let requests = build(MessageKind::Request)?;
        let responses = build(MessageKind::Response)?;
        self.replay(session, &connections, requests, responses)
    }

    /// Replay `session` over one shared connection through the given
    /// per-direction strategy sets
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any strategy; no table is returned
    /// in that case.
    pub fn run(
        &self,
        session: &Session,
        requests: StrategySet,
        responses: StrategySet,
    ) -> BenchResult<ReplayOutput> {
        let connections = ConnectionMap::single(session.len());
        self.replay(session, &connections, vec![requests], vec![responses])
    }

    /// Both direction passes; `requests` and `responses` hold one set per
    /// connection of `connections`
    fn replay(
        &self,
        session: &Session,
        connections: &ConnectionMap,
        requests: Vec<StrategySet>,
        responses: Vec<StrategySet>,
    ) -> BenchResult<ReplayOutput> {
        tracing::info!(
            exchanges = session.len(),
            connections = connections.len(),
            parallel = self.config.parallel_directions,
            "starting replay"
        );

        let (requests, responses) = if self.config.parallel_directions {
            std::thread::scope(|scope| {
                let response_pass = scope.spawn(|| {
                    self.replay_direction(session, connections, MessageKind::Response, responses)
                });
                let requests =
                    self.replay_direction(session, connections, MessageKind::Request, requests);
                let responses = match response_pass.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                };
                (requests, responses)
            })
        } else {
            (
                self.replay_direction(session, connections, MessageKind::Request, requests),
                self.replay_direction(session, connections, MessageKind::Response, responses),
            )
        };

        let output = ReplayOutput {
            requests: requests?,
            responses: responses?,
            connections: connections.names().to_vec(),
        };
        tracing::info!(
            requests = output.requests.len(),
            responses = output.responses.len(),
            "replay complete"
        );
        Ok(output)
    }

    /// One sequential pass over the `kind` messages of `session`
    fn replay_direction(
        &self,
        session: &Session,
        connections: &ConnectionMap,
        kind: MessageKind,
        mut sets: Vec<StrategySet>,
    ) -> BenchResult<MeasurementTable> {
        let schemes = sets.first().map(StrategySet::schemes).unwrap_or_default();
        let mut table = MeasurementTable::new(kind, schemes);
        let limit = match self.config.max_exchanges {
            0 => session.len(),
            max => max.min(session.len()),
        };

        for (exchange_index, exchange) in session.exchanges()[..limit].iter().enumerate() {
            let Some(message) = exchange.message(kind) else {
                continue;
            };
            let set = connections
                .connection(exchange_index)
                .and_then(|connection| sets.get_mut(connection))
                .ok_or_else(|| {
                    BenchError::decode(format!(
                        "exchange {} has no {} strategies",
                        exchange_index, kind
                    ))
                })?;
            let costs = set.measure_all(message).inspect_err(|err| {
                tracing::error!(%kind, exchange = exchange_index, error = %err, "replay aborted");
            })?;
            let row = table.append(&costs)?;
            tracing::debug!(%kind, exchange = exchange_index, row = row.index, ?costs, "measured");
        }

        Ok(table)
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}
