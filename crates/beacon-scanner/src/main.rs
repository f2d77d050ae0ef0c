//! Beacon scanner entry point.
//!
//! # Usage
//!
//! ```text
//! beacon-scan [--config <PATH>] [--verbose] <COMMAND>
//!
//! Commands:
//!   once      Search once and print the decoded reply
//!   monitor   Track the responder and print found / lost events
//!
//! Options shared by both commands:
//!   --strategy <blocking|cooperative>     [default: from config]
//!   --kind <server-game|proxy-robots>     [default: from config]
//!   --port <PORT>                         [default: from config, 9080]
//! ```
//!
//! `once` exits non-zero when nothing answers.  `monitor` runs until Ctrl-C
//! or until `--max-ticks` ticks have been performed.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use beacon_core::{DiscoveryEvent, Kind};
use beacon_scanner::application::{
    monitor::{DiscoveryMonitor, MonitorSettings},
    scan::ScanStrategy,
};
use beacon_scanner::infrastructure::{
    candidates::candidate_source,
    network::build_strategy,
    storage::config::{load_config, ScannerConfig, StrategyKind},
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Finds Beacon responders on the local network.
#[derive(Debug, Parser)]
#[command(
    name = "beacon-scan",
    about = "Broadcast discovery scanner for Beacon responders",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true, env = "BEACON_SCANNER_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search once and print the decoded reply.
    Once(ScanArgs),
    /// Keep searching and print an event whenever contact is made or lost.
    Monitor {
        #[command(flatten)]
        scan: ScanArgs,
        /// Stop after this many ticks.
        #[arg(long)]
        max_ticks: Option<u64>,
    },
}

/// Overrides shared by every command.
#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Discovery port responders listen on.
    #[arg(long, env = "BEACON_DISCOVERY_PORT")]
    port: Option<u16>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Blocking,
    Cooperative,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    ServerGame,
    ProxyRobots,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Blocking => StrategyKind::Blocking,
            StrategyArg::Cooperative => StrategyKind::Cooperative,
        }
    }
}

impl From<KindArg> for Kind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::ServerGame => Kind::ServerGame,
            KindArg::ProxyRobots => Kind::ProxyRobots,
        }
    }
}

impl ScanArgs {
    /// Applies the overrides and returns the strategy to use.
    fn apply(&self, config: &mut ScannerConfig) -> StrategyKind {
        if let Some(kind) = self.kind {
            config.discovery.kind = kind.into();
        }
        if let Some(port) = self.port {
            config.discovery.port = port;
        }
        self.strategy
            .map(StrategyKind::from)
            .unwrap_or(config.monitor.strategy)
    }
}

fn describe(event: &DiscoveryEvent) -> String {
    match event {
        DiscoveryEvent::ServerGame {
            push,
            subscribe,
            reply,
        } => format!("found: push = {push} ; sub = {subscribe} ; rep = {reply}"),
        DiscoveryEvent::ProxyRobots { port } => format!("found: port = {port}"),
        DiscoveryEvent::Lost => "lost".to_string(),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load config")?;

    let fallback_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level)),
        )
        .init();

    match cli.command {
        Command::Once(args) => {
            let strategy_kind = args.apply(&mut config);
            run_once(&config, strategy_kind).await
        }
        Command::Monitor { scan, max_ticks } => {
            let strategy_kind = scan.apply(&mut config);
            run_monitor(&config, strategy_kind, max_ticks).await
        }
    }
}

async fn run_once(config: &ScannerConfig, strategy_kind: StrategyKind) -> anyhow::Result<()> {
    let candidates = candidate_source(&config.candidates.broadcast_addresses);
    let mut strategy = build_strategy(config, strategy_kind, candidates);

    info!(kind = %config.discovery.kind, ?strategy_kind, "searching");
    match strategy.scan_all_groups(None).await? {
        Some(discovery) => {
            info!(group = %discovery.group, sender = %discovery.sender, "found responder");
            println!("{}", discovery.endpoints);
            Ok(())
        }
        None => anyhow::bail!("no {} answered", config.discovery.kind),
    }
}

async fn run_monitor(
    config: &ScannerConfig,
    strategy_kind: StrategyKind,
    max_ticks: Option<u64>,
) -> anyhow::Result<()> {
    let candidates = candidate_source(&config.candidates.broadcast_addresses);
    let strategy = build_strategy(config, strategy_kind, candidates);
    let settings = MonitorSettings {
        kind: config.discovery.kind,
        tick_interval: config.tick_interval(),
    };

    let (monitor, mut events) = DiscoveryMonitor::new(strategy, settings);
    let handle = monitor.spawn(max_ticks);
    info!("Beacon monitor running.  Press Ctrl-C to exit.");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => println!("{}", describe(&event)),
                // The monitor finished its ticks.
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl-C signal: {e}");
                }
                info!("shutdown signal received");
                handle.abort();
                break;
            }
        }
    }

    info!("Beacon monitor stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
