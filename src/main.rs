//! `fluid-tracker` reads newline-delimited JSON on stdin and writes one
//! queue message per line on stdout.
//!
//! ```text
//! fluid-tracker winners    < logs.ndjson
//! fluid-tracker transfers  < blocks.ndjson
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use fluid_tracker::worker::{self, WorkerStats};
use fluid_tracker::{BufferedBlock, EnvConfig, Error, JsonLinesPublisher, RawLog, logging};

#[derive(Parser)]
#[command(
    name = "fluid-tracker",
    about = "Decode reward winners and swap transfers into queue messages",
    long_about = "
Reads one JSON unit per line on stdin and publishes one JSON queue message
per line on stdout. Logs go to stderr.

ENVIRONMENT VARIABLES:
  FLU_ETHEREUM_CONTRACT_ADDR              winners: contract to watch
  FLU_ETHEREUM_UNDERLYING_TOKEN_NAME      winners: token short name
  FLU_ETHEREUM_UNDERLYING_TOKEN_DECIMALS  winners: token decimals
  FLU_SOLANA_TOKEN_LOOKUPS                transfers: fluid:base,...
  FLU_WORKER_CHANNEL_CAPACITY             inbound buffer (default 16)
",
    version
)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode Reward logs into winners
    Winners,
    /// Decorate buffered Solana blocks into transfer batches
    Transfers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.json_logs);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli.command));
    // a pending stdin read holds a blocking thread that cannot be cancelled
    runtime.shutdown_background();

    match result {
        Ok(stats) => {
            tracing::info!(
                received = stats.received,
                published = stats.published,
                skipped = stats.skipped,
                "input exhausted"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "fatal fault, exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<WorkerStats> {
    let env = EnvConfig::load().context("reading FLU_ environment")?;
    let capacity = env.channel_capacity()?;
    let publisher = JsonLinesPublisher::new(tokio::io::stdout());

    match command {
        Commands::Winners => {
            let tracker = env.winners().context("winners configuration")?.tracker();
            tracing::info!(
                target_address = tracker.target_address(),
                signature_hash = %tracker.signature_hash(),
                "tracking winners"
            );
            let (inbound, feeder) = spawn_feeder::<RawLog>(capacity);
            let result = worker::run_winners(inbound, &tracker, &publisher).await;
            finish(feeder, result).await
        }
        Commands::Transfers => {
            let transfers = env.transfers().context("transfers configuration")?;
            if transfers.saber_rpc_url.is_none() && transfers.pool_mints.is_empty() {
                tracing::warn!(
                    "no saber pool mints configured, pool side mints must come from token balances"
                );
            }
            let router = transfers.router();
            let ctx = transfers.decorate_context();
            let (inbound, feeder) = spawn_feeder::<BufferedBlock>(capacity);
            let result = worker::run_transfers(inbound, &router, &ctx, &publisher).await;
            finish(feeder, result).await
        }
    }
}

fn spawn_feeder<T>(capacity: usize) -> (mpsc::Receiver<T>, JoinHandle<Result<u64, Error>>)
where
    T: DeserializeOwned + Send + 'static,
{
    let (outbound, inbound) = mpsc::channel(capacity);
    let reader = BufReader::new(tokio::io::stdin());
    let feeder = tokio::spawn(worker::feed_json_lines(reader, outbound));
    (inbound, feeder)
}

/// A worker fault wins over whatever the feeder was doing.
async fn finish(
    feeder: JoinHandle<Result<u64, Error>>,
    result: Result<WorkerStats, Error>,
) -> Result<WorkerStats> {
    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            feeder.abort();
            return Err(e).context("worker stopped");
        }
    };

    let sent = feeder.await.context("input reader panicked")??;
    tracing::debug!(sent, "input reader finished");
    Ok(stats)
}
