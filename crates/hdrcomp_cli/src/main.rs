//! hdrcomp CLI
//!
//! Replays HAR captures through the selected compression schemes and writes
//! `<prefix>req.tsv` / `<prefix>res.tsv` with cumulative compressed sizes.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use hdrcomp_codec::{CodecConfig, SchemeTag, parse_schemes};
use hdrcomp_core::{BenchError, MessageKind, Session, load_session};
use hdrcomp_replay::{
    ConnectionPolicy, DirectionSummary, ReplayConfig, ReplayEngine, write_tables_atomic,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hdrcomp")]
#[command(about = "Compare HTTP compression schemes over recorded sessions", long_about = None)]
struct Args {
    /// HAR capture files, replayed in the order given
    #[arg(required = true)]
    captures: Vec<PathBuf>,

    /// Scheme to compare (http1_gzip, spdy3, delta); repeat for more columns
    #[arg(short = 'c', long = "codec", required = true)]
    codecs: Vec<String>,

    /// Accepted for compatibility; tables are always written
    #[arg(short = 't', long = "tsv")]
    tsv: bool,

    /// Prefix for the output tables
    #[arg(long, default_value = "")]
    prefix: String,

    /// Scheme the summary ratios are relative to (default: first -c)
    #[arg(short, long)]
    baseline: Option<String>,

    /// Verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Replay requests and responses on one thread
    #[arg(long)]
    sequential: bool,

    /// Give every host its own connection and strategy state
    #[arg(long)]
    per_host: bool,

    /// Multiplex matching hosts onto one connection (implies --per-host);
    /// `*` for a single connection, `/` joins patterns, `\.` marks a regex
    #[arg(short = 'm', long = "multiplex", value_name = "PATTERN[/PATTERN]")]
    multiplex: Vec<String>,

    /// Do not reuse a connection for other hosts in the same domain
    #[arg(short = 'n', long = "noglob")]
    noglob: bool,

    /// Stop after this many exchanges (0 = all)
    #[arg(long, default_value_t = 0)]
    max_exchanges: usize,

    /// gzip level for per-message and delta compression
    #[arg(long, default_value_t = 6)]
    level: u32,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose);

    // Scheme names are checked before any capture is read
    let schemes = parse_schemes(&args.codecs)?;
    let baseline = match &args.baseline {
        Some(name) => {
            let tag: SchemeTag = name.parse()?;
            if !schemes.contains(&tag) {
                return Err(BenchError::unknown_scheme(name.as_str()))
                    .wrap_err("baseline must be one of the -c schemes");
            }
            tag
        }
        None => schemes[0],
    };
    if args.tsv {
        tracing::debug!("-t given; tables are always written");
    }

    let mut session = Session::new();
    for capture in &args.captures {
        let loaded = load_session(capture)
            .wrap_err_with(|| format!("loading {}", capture.display()))?;
        session.append(loaded);
    }

    let connections = if args.per_host || !args.multiplex.is_empty() {
        ConnectionPolicy::PerHost {
            multiplex: args.multiplex.clone(),
            share_domains: !args.noglob,
        }
    } else {
        if args.noglob {
            tracing::warn!("-n has no effect without --per-host or -m");
        }
        ConnectionPolicy::Shared
    };
    let per_host = connections.is_per_host();

    let mut config = ReplayConfig::default()
        .with_max_exchanges(args.max_exchanges)
        .with_codec(CodecConfig::default().with_level(args.level))
        .with_connections(connections);
    if args.sequential {
        config = config.sequential();
    }

    let output = ReplayEngine::new()
        .with_config(config)
        .run_schemes(&session, &schemes)
        .wrap_err("replay failed, no tables written")?;

    write_tables_atomic(&args.prefix, &[&output.requests, &output.responses])?;

    if per_host {
        println!(
            "{} connections simulated to different hosts\n",
            output.connections.len()
        );
    }
    for kind in MessageKind::ALL {
        let summary = DirectionSummary::from_table(output.table(kind), baseline)?;
        println!("{}", summary);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
