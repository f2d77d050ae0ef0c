//! Beacon responder entry point.
//!
//! Loads the TOML config, applies command-line overrides, and runs the
//! responder on its own thread until Ctrl-C or until `--max-loops` receive
//! cycles have run.
//!
//! # Usage
//!
//! ```text
//! beacon-responder [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Config file [default: platform config dir]
//!   --port <PORT>          UDP port to listen on [default: 9080]
//!   --admin-port <PORT>    Port returned to admin queries [default: 9082]
//!   --ports <LIST>         Comma-separated robot port pool, e.g. 9012,9013
//!   --max-loops <N>        Run N receive cycles, then exit (0 = forever)
//!   --verbose              Log at debug level
//! ```
//!
//! With `--max-loops N` and no `--ports`, the pool is filled with ports
//! `0..N-1`, so if all N cycles receive a request the last answer is
//! `"Goodbye"`.  This makes a quick manual test of the exhaustion path easy.
//! `--max-loops 0` means no limit, the same as leaving it out.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use beacon_responder::infrastructure::{
    network::responder::start_responder,
    storage::config::{load_config, ResponderConfig},
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Answers Beacon discovery broadcasts.
#[derive(Debug, Parser)]
#[command(
    name = "beacon-responder",
    about = "Answers UDP discovery broadcasts and vends ports from a finite pool",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "BEACON_RESPONDER_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port to listen on.
    #[arg(long, env = "BEACON_RESPONDER_PORT")]
    port: Option<u16>,

    /// Port returned to `admin` queries.
    #[arg(long, env = "BEACON_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Robot port pool, handed out in order.
    #[arg(long, value_delimiter = ',')]
    ports: Vec<u16>,

    /// Number of receive cycles to run before exiting (0 = no limit).
    #[arg(long)]
    max_loops: Option<u64>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    /// The responder's loop budget; zero means unbounded.
    fn loop_budget(&self) -> Option<u64> {
        self.max_loops.filter(|&n| n > 0)
    }

    /// Applies command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut ResponderConfig) {
        if let Some(port) = self.port {
            config.bind_port = port;
        }
        if let Some(admin_port) = self.admin_port {
            config.admin_port = admin_port;
        }
        if !self.ports.is_empty() {
            config.ports = self.ports.clone();
        } else if let Some(max_loops) = self.loop_budget() {
            let count = u16::try_from(max_loops.saturating_sub(1)).unwrap_or(u16::MAX);
            config.ports = (0..count).collect();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load config")?;
    cli.apply(&mut config);

    let fallback_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level)),
        )
        .init();

    info!("Beacon responder starting");

    // Shutdown flag shared with the responder thread.
    let running = Arc::new(AtomicBool::new(true));

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl-C signal: {e}"),
        }
    });

    // ── Responder thread ──────────────────────────────────────────────────────
    let (addr, handle) = start_responder(&config, Arc::clone(&running), cli.loop_budget())
        .context("failed to start responder")?;
    info!("Beacon responder ready on UDP {addr}.  Press Ctrl-C to exit.");

    // Joining blocks, so wait for the thread from the blocking pool.
    tokio::task::spawn_blocking(move || handle.join())
        .await
        .context("join task failed")?
        .map_err(|_| anyhow::anyhow!("responder thread panicked"))?;

    info!("Beacon responder stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
