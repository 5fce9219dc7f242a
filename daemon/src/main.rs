//! govsync daemon: serves cached Governor proposal states over HTTP.

mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use govsync_ledger::{BatchedLedgerReader, JsonRpcLedger};
use govsync_rpc::{RpcServer, RpcState};
use govsync_store::{ProposalCacheStore, ProposalDirectory};
use govsync_store_lmdb::LmdbEnvironment;
use govsync_sync::{ProposalSync, SyncConfig, SyncMetrics};
use govsync_types::{Address, ProposalId, SystemClock, Timestamp};
use govsync_utils::{format_duration, init_logging, LogFormat};

use crate::shutdown::ShutdownController;

#[derive(Parser)]
#[command(name = "govsync-daemon", about = "Governor proposal state cache")]
struct Cli {
    /// JSON-RPC endpoint of the chain hosting the Governor.
    #[arg(long, env = "GOVSYNC_RPC_URL")]
    rpc_url: Option<String>,

    /// Governor contract address (0x…).
    #[arg(long, env = "GOVSYNC_GOVERNOR")]
    governor: Option<Address>,

    /// Block tag ledger reads are made at ("latest", "safe", "finalized").
    #[arg(long, env = "GOVSYNC_BLOCK_TAG")]
    block_tag: Option<String>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "GOVSYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seconds a cached state is served before it is re-read.
    #[arg(long, env = "GOVSYNC_CACHE_TTL_SECS")]
    cache_ttl_secs: Option<u64>,

    /// Upper bound on one batched ledger read, in seconds.
    #[arg(long, env = "GOVSYNC_LEDGER_TIMEOUT_SECS")]
    ledger_timeout_secs: Option<u64>,

    /// HTTP port for the query surface.
    #[arg(long, env = "GOVSYNC_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable Prometheus metrics endpoint.
    #[arg(long, env = "GOVSYNC_ENABLE_METRICS")]
    metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "GOVSYNC_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GOVSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "GOVSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve proposal states until SIGINT/SIGTERM.
    Run,
    /// Manage the proposal directory.
    Proposals {
        #[command(subcommand)]
        action: ProposalsAction,
    },
}

#[derive(clap::Subcommand)]
enum ProposalsAction {
    /// Register proposal ids (decimal) in the directory.
    Add {
        #[arg(required = true)]
        ids: Vec<ProposalId>,
    },
    /// Print every known proposal with its cached state.
    List,
}

/// File config (or defaults) with CLI flags and env vars layered on top.
fn resolve_config(cli: &Cli) -> anyhow::Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };

    if let Some(rpc_url) = &cli.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(governor) = cli.governor {
        config.governor_address = Some(governor);
    }
    if let Some(block_tag) = &cli.block_tag {
        config.block_tag = block_tag.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(ttl) = cli.cache_ttl_secs {
        config.cache_ttl_secs = ttl;
    }
    if let Some(timeout) = cli.ledger_timeout_secs {
        config.ledger_timeout_secs = timeout;
    }
    if let Some(port) = cli.rpc_port {
        config.rpc_port = port;
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.enable_metrics |= cli.metrics;

    Ok(config)
}

fn open_store(config: &SyncConfig) -> anyhow::Result<LmdbEnvironment> {
    LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size())
        .with_context(|| format!("opening LMDB at {}", config.data_dir.display()))
}

async fn run(config: SyncConfig) -> anyhow::Result<()> {
    config.validate()?;
    let governor = config.governor()?;

    let env = open_store(&config)?;
    let ledger = Arc::new(
        JsonRpcLedger::with_timeout(config.rpc_url.clone(), config.ledger_timeout())
            .at_block(config.block_tag.clone()),
    );
    let reader = BatchedLedgerReader::new(ledger, governor, config.ledger_timeout());
    let mut sync = ProposalSync::new(
        Arc::new(env.directory_store()),
        Arc::new(env.cache_store()),
        reader,
        Arc::new(SystemClock),
        config.cache_ttl(),
    );

    let metrics = config.enable_metrics.then(|| Arc::new(SyncMetrics::new()));
    if let Some(metrics) = &metrics {
        sync = sync.with_metrics(metrics.clone());
    }
    let mut state = RpcState::new(Arc::new(sync));
    if let Some(metrics) = metrics {
        state = state.with_metrics(metrics);
    }

    tracing::info!(
        governor = %governor,
        rpc_url = %config.rpc_url,
        block_tag = %config.block_tag,
        ttl_secs = config.cache_ttl_secs,
        port = config.rpc_port,
        metrics = config.enable_metrics,
        "starting govsync daemon"
    );

    let shutdown = Arc::new(ShutdownController::new());
    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let server = RpcServer::new(config.rpc_port, Arc::new(state));
    let served = server.start(shutdown.signalled()).await;
    signals.abort();
    served?;

    tracing::info!("govsync daemon exited cleanly");
    Ok(())
}

/// Register `ids`, returning how many were new.
fn add_proposals(env: &LmdbEnvironment, ids: &[ProposalId]) -> anyhow::Result<usize> {
    let directory = env.directory_store();
    let now = Timestamp::now();
    let mut added = 0;
    for id in ids {
        if directory.register_proposal(id, now)? {
            added += 1;
        } else {
            tracing::debug!(proposal = %id, "already registered");
        }
    }
    Ok(added)
}

/// One line per known proposal: id, cached state, age of the cached read.
fn directory_report(env: &LmdbEnvironment, now: Timestamp) -> anyhow::Result<Vec<String>> {
    let ids = env.directory_store().list_known_proposal_ids()?;
    let entries = env.cache_store().load_entries()?;
    Ok(ids
        .iter()
        .map(|id| match entries.get(id) {
            Some(entry) => format!(
                "{id}\t{}\tchecked {} ago",
                entry.state,
                format_duration(entry.last_checked.elapsed_since(now))
            ),
            None => format!("{id}\t-\tnever checked"),
        })
        .collect())
}

fn init_logging_from(config: &SyncConfig) -> anyhow::Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging_from(&config)?;

    match cli.command {
        Command::Run => run(config).await?,
        Command::Proposals { action } => {
            let env = open_store(&config)?;
            match action {
                ProposalsAction::Add { ids } => {
                    let added = add_proposals(&env, &ids)?;
                    println!("registered {added} new of {} proposal(s)", ids.len());
                }
                ProposalsAction::List => {
                    for line in directory_report(&env, Timestamp::now())? {
                        println!("{line}");
                    }
                }
            }
        }
    }

    Ok(())
}
