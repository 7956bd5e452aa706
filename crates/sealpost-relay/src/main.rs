//! Sealpost relay binary.
//!
//! # Usage
//!
//! ```bash
//! # Relay messages arriving as JSON lines on stdin
//! sealpost-relay run --key public_key.pem --out events.jsonl
//!
//! # Re-send everything received between two instants (ms since epoch)
//! sealpost-relay replay --key public_key.pem --inbox inbox.jsonl \
//!     --out events.jsonl --from 1700000000000 --to 1700086400000
//!
//! # Check a key before installing it
//! sealpost-relay validate-key candidate.pem
//! ```

use std::{
    io::BufReader,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use sealpost_relay::{
    DispatcherConfig, JsonlInbox, Relay, RelayRuntimeConfig, ReplayWindow, RunExit, SystemEnv,
    spawn_jsonl_feed,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Encrypt-then-forward relay for inbound SMS and MMS notifications
#[derive(Parser, Debug)]
#[command(name = "sealpost-relay")]
#[command(about = "Encrypt inbound messages and forward them as events")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Maximum messages processed at once
    #[arg(long, default_value = "64", global = true)]
    max_in_flight: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Relay live messages read as JSON lines from stdin
    Run {
        /// Public key file (PEM)
        #[arg(short, long)]
        key: PathBuf,

        /// Output file for emitted events (JSON lines, appended)
        #[arg(short, long)]
        out: PathBuf,

        /// Live channel capacity
        #[arg(long, default_value = "256")]
        buffer: usize,
    },

    /// Replay a window of an inbox export
    Replay {
        /// Public key file (PEM)
        #[arg(short, long)]
        key: PathBuf,

        /// Inbox export (JSON lines)
        #[arg(short, long)]
        inbox: PathBuf,

        /// Output file for emitted events (JSON lines, appended)
        #[arg(short, long)]
        out: PathBuf,

        /// Window start, ms since epoch (inclusive)
        #[arg(long)]
        from: u64,

        /// Window end, ms since epoch (inclusive)
        #[arg(long)]
        to: u64,
    },

    /// Check that a PEM file holds a usable public key
    ValidateKey {
        /// Candidate key file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let dispatcher = DispatcherConfig { max_in_flight: args.max_in_flight };

    match args.command {
        Command::Run { key, out, buffer } => {
            let config = RelayRuntimeConfig { key_path: key, out_path: out, dispatcher };
            run(&config, buffer).await?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Replay { key, inbox, out, from, to } => {
            let config = RelayRuntimeConfig { key_path: key, out_path: out, dispatcher };
            replay(&config, inbox, ReplayWindow::new(from, to)?).await?;
            Ok(ExitCode::SUCCESS)
        },
        Command::ValidateKey { path } => Ok(validate_key(&path)),
    }
}

async fn run(config: &RelayRuntimeConfig, buffer: usize) -> Result<(), Box<dyn std::error::Error>> {
    let relay = Relay::open(config).await?;
    tracing::info!(out = %config.out_path.display(), "Sealpost relay starting");

    // Read on a plain thread: a pending stdin read must not hold up exit.
    let (live, feed) = spawn_jsonl_feed(BufReader::new(std::io::stdin()), buffer)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match relay.run(live, shutdown).await {
        RunExit::FeedClosed => {
            let lines = feed.join().await?;
            tracing::info!(accepted = lines.accepted, skipped = lines.skipped, "input closed");
        },
        RunExit::Shutdown { cancelled, unsubmitted } => {
            // The reader may be blocked on stdin; leave it to process exit.
            drop(feed);
            tracing::warn!(cancelled, unsubmitted, "stopped before all input was relayed");
        },
    }

    log_stats(&relay);
    Ok(())
}

async fn replay(
    config: &RelayRuntimeConfig,
    inbox: PathBuf,
    window: ReplayWindow,
) -> Result<(), Box<dyn std::error::Error>> {
    let relay = Relay::open(config).await?;

    let summary = relay.replay(JsonlInbox::new(inbox), window).await?;
    relay.dispatcher().drain().await;

    tracing::info!(submitted = summary.submitted, "replay complete");
    log_stats(&relay);
    Ok(())
}

fn validate_key(path: &Path) -> ExitCode {
    let candidate = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "cannot read key file");
            return ExitCode::FAILURE;
        },
    };

    if sealpost_crypto::is_usable_public_key(&candidate) {
        tracing::info!(path = %path.display(), "key is usable");
        ExitCode::SUCCESS
    } else {
        tracing::error!(path = %path.display(), "key is not a usable RSA public key");
        ExitCode::FAILURE
    }
}

fn log_stats(relay: &Relay<SystemEnv>) {
    let stats = relay.dispatcher().stats();
    tracing::info!(
        submitted = stats.submitted,
        emitted = stats.emitted,
        not_configured = stats.not_configured,
        key_parse = stats.key_parse,
        encryption_failed = stats.encryption_failed,
        emission_failed = stats.emission_failed,
        cancelled = stats.cancelled,
        "dispatch totals"
    );
}
