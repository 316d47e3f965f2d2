//! Simulated connections.
//!
//! By default every exchange travels one shared connection, so each scheme
//! keeps a single context per direction for the whole session. With
//! per-host connections every host gets its own strategy state, and hosts
//! can be multiplexed onto a shared connection by pattern. Assignment is
//! decided once per exchange, so both directions see the same grouping.

use hdrcomp_core::{BenchError, BenchResult, Session};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Name of the connection used when nothing is split by host
pub const SHARED_CONNECTION: &str = "*";

/// How exchanges are assigned to simulated connections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    /// One connection for the whole session
    #[default]
    Shared,
    /// One connection per host
    PerHost {
        /// Connections opened before the first exchange, one per pattern
        multiplex: Vec<String>,
        /// Let hosts under the same registrable domain share a connection
        share_domains: bool,
    },
}

impl ConnectionPolicy {
    /// Per-host connections with domain sharing and no multiplex patterns
    #[must_use]
    pub fn per_host() -> Self {
        Self::PerHost {
            multiplex: Vec::new(),
            share_domains: true,
        }
    }

    /// Whether exchanges are split by host
    #[must_use]
    pub fn is_per_host(&self) -> bool {
        matches!(self, Self::PerHost { .. })
    }
}

/// The set of hosts one simulated connection accepts
#[derive(Debug, Clone)]
pub struct ConnectionRule {
    name: String,
    hosts: Vec<String>,
    patterns: Vec<Regex>,
    domains: Vec<String>,
}

impl ConnectionRule {
    /// Compile a connection name into host rules
    ///
    /// `name` is split on `/`. A part starting with `*` is a glob
    /// (`*.example.com`), a part containing `\.` is a regular expression
    /// (`img\d+\.example\.net`), and any other part is a host name. Globs,
    /// regular expressions and, with `share_domains`, host names also accept
    /// every host under their registrable domain, so a connection opened for
    /// `www1.example.org` carries `www2.example.org` too.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if a regular expression does not compile.
    pub fn new(name: &str, share_domains: bool) -> BenchResult<Self> {
        let mut rule = Self {
            name: name.to_string(),
            hosts: Vec::new(),
            patterns: Vec::new(),
            domains: Vec::new(),
        };

        for part in name.split('/').filter(|p| !p.is_empty()) {
            let (source, domain) = if part.starts_with('*') {
                (glob_to_regex(part), registrable_domain(part.trim_start_matches('*')))
            } else if part.contains("\\.") {
                (
                    format!("(?i)^(?:{})", part),
                    registrable_domain(&part.replace("\\.", ".")),
                )
            } else {
                rule.hosts.push(part.to_ascii_lowercase());
                if !share_domains {
                    continue;
                }
                (glob_to_regex(&format!("*{}", part)), registrable_domain(part))
            };

            let pattern =
                Regex::new(&source).map_err(|e| BenchError::invalid_pattern(part, e.to_string()))?;
            rule.patterns.push(pattern);
            rule.domains.extend(domain);
        }

        Ok(rule)
    }

    /// Name the connection was opened under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registrable domains this connection also accepts
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Whether `host` travels this connection
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
            || self.patterns.iter().any(|p| p.is_match(host))
            || self.domains.iter().any(|d| within_domain(host, d))
    }
}

/// Which simulated connection every exchange of a session uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMap {
    names: Vec<String>,
    assignment: Vec<usize>,
}

impl ConnectionMap {
    /// Put `exchanges` exchanges on one shared connection
    #[must_use]
    pub fn single(exchanges: usize) -> Self {
        Self {
            names: vec![SHARED_CONNECTION.to_string()],
            assignment: vec![0; exchanges],
        }
    }

    /// Assign every exchange of `session` according to `policy`
    ///
    /// A host is looked up by exact name first, then against every open
    /// connection in the order they were opened. A host nothing matches
    /// opens a new connection named after it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if a multiplex pattern does not compile.
    pub fn build(session: &Session, policy: &ConnectionPolicy) -> BenchResult<Self> {
        let (multiplex, share_domains) = match policy {
            ConnectionPolicy::Shared => return Ok(Self::single(session.len())),
            ConnectionPolicy::PerHost {
                multiplex,
                share_domains,
            } => (multiplex, *share_domains),
        };

        let mut rules = multiplex
            .iter()
            .map(|pattern| ConnectionRule::new(pattern, share_domains))
            .collect::<BenchResult<Vec<_>>>()?;
        let mut known: FxHashMap<String, usize> = FxHashMap::default();
        let mut assignment = Vec::with_capacity(session.len());

        for exchange in session.exchanges() {
            let host = exchange
                .request()
                .header(":host")
                .unwrap_or_default()
                .to_ascii_lowercase();
            if let Some(&index) = known.get(&host) {
                assignment.push(index);
                continue;
            }

            let index = match rules.iter().position(|rule| rule.matches(&host)) {
                Some(index) => index,
                None => {
                    let rule = ConnectionRule::new(&host, share_domains)?;
                    tracing::debug!(host = %host, domains = ?rule.domains(), "new connection");
                    rules.push(rule);
                    rules.len() - 1
                }
            };
            known.insert(host, index);
            assignment.push(index);
        }

        if rules.is_empty() {
            return Ok(Self::single(session.len()));
        }
        Ok(Self {
            names: rules.into_iter().map(|rule| rule.name).collect(),
            assignment,
        })
    }

    /// Connection names, in the order they were opened
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of connections
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no connections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Connection used by exchange `index`
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<usize> {
        self.assignment.get(index).copied()
    }
}

/// Anchored, case-insensitive regex for a shell-style glob
fn glob_to_regex(glob: &str) -> String {
    let mut source = String::from("(?i)^");
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    source
}

/// Last two labels of a host name; `None` for single labels and IP literals
fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.');
    if host.contains(':') {
        return None;
    }
    let mut labels = host.rsplit('.');
    let top = labels.next().filter(|l| !l.is_empty())?;
    let second = labels.next().filter(|l| !l.is_empty())?;
    if top.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}.{}", second, top).to_ascii_lowercase())
}

fn within_domain(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.');
    match host.len().checked_sub(domain.len()) {
        Some(0) => host.eq_ignore_ascii_case(domain),
        Some(split) => {
            host.is_char_boundary(split)
                && host[split..].eq_ignore_ascii_case(domain)
                && host[..split].ends_with('.')
        }
        None => false,
    }
}
