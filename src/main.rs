use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use prepsync::config::StageConfig;
use prepsync::model::NodeId;
use prepsync::preparation::HttpPreparationService;
use prepsync::stage::{InterruptSignal, StageCoordinator};
use prepsync::storage::StorageFactory;

/// Stage 3 worker: prune, replicate recipes, correct semantic domains
#[derive(Parser)]
#[command(name = "prepsync")]
#[command(about = "Recipe replication stage of the node data preparation pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single firing of the stage
    Run {
        /// Path to configuration file
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Node to process (overrides the configured node id)
        #[arg(short = 'n', long)]
        node: Option<NodeId>,
    },
    /// Fire the stage repeatedly until interrupted with Ctrl-C
    Watch {
        /// Path to configuration file
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Pause between firings (e.g. "30s", "5m")
        #[arg(short = 'i', long, default_value = "5m", value_parser = parse_interval)]
        interval: Duration,

        /// Node to process (overrides the configured node id)
        #[arg(short = 'n', long)]
        node: Option<NodeId>,
    },
    /// Show the node status vector and the stored list sizes
    Status {
        /// Path to configuration file
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Node to inspect (overrides the configured node id)
        #[arg(short = 'n', long)]
        node: Option<NodeId>,
    },
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,reqwest=debug", // -vvv shows everything including dependencies
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("prepsync started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run { config, node } => run_once(&config, node).await,
        Commands::Watch {
            config,
            interval,
            node,
        } => run_watch(&config, interval, node).await,
        Commands::Status { config, node } => run_status(&config, node).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn load_config(path: &Path, node: Option<NodeId>) -> anyhow::Result<StageConfig> {
    let mut config = StageConfig::load(path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if let Some(node) = node {
        config.node_id = node;
    }
    Ok(config)
}

async fn build_coordinator(config: StageConfig) -> anyhow::Result<StageCoordinator> {
    let store = StorageFactory::from_config(&config.store)
        .await
        .context("Failed to open coordination store")?;
    let service = HttpPreparationService::new(&config.preparation)
        .context("Failed to create preparation client")?;
    let coordinator = StageCoordinator::new(store, Arc::new(service), config)
        .context("Invalid stage configuration")?;
    Ok(coordinator)
}

/// Exit status used when a second Ctrl-C aborts the process
const ABORT_EXIT_CODE: i32 = 130;

/// Trigger `interrupt` on the first Ctrl-C, exit on the second
fn install_interrupt_handler(interrupt: InterruptSignal) {
    tokio::spawn(async move {
        let mut received = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            received += 1;
            if handle_interrupt(&interrupt, received) {
                std::process::exit(ABORT_EXIT_CODE);
            }
        }
    });
}

/// React to the `received`-th Ctrl-C. Returns true when the process should
/// abort instead of waiting for the current firing.
fn handle_interrupt(interrupt: &InterruptSignal, received: usize) -> bool {
    if received == 1 {
        warn!("Interrupt received, finishing the current firing (Ctrl-C again to abort)");
        interrupt.trigger();
        return false;
    }
    error!("Second interrupt received, aborting");
    true
}

async fn run_once(config_path: &Path, node: Option<NodeId>) -> anyhow::Result<()> {
    let config = load_config(config_path, node).await?;
    let node_id = config.node_id;
    let coordinator = build_coordinator(config).await?;
    install_interrupt_handler(coordinator.interrupt().clone());

    let report = coordinator
        .run(node_id)
        .await
        .with_context(|| format!("Stage 3 failed for node {}", node_id))?;
    println!("{}", report.summary());
    Ok(())
}

async fn run_watch(
    config_path: &Path,
    interval: Duration,
    node: Option<NodeId>,
) -> anyhow::Result<()> {
    let config = load_config(config_path, node).await?;
    let node_id = config.node_id;
    if let Some(trigger) = &config.trigger {
        debug!("Configured trigger '{}' is ignored in watch mode", trigger);
    }

    let coordinator = build_coordinator(config).await?;
    let interrupt = coordinator.interrupt().clone();
    install_interrupt_handler(interrupt.clone());

    info!("Watching node {} every {:?}", node_id, interval);
    loop {
        match coordinator.run(node_id).await {
            Ok(report) => println!("{}", report.summary()),
            // The next firing starts again from the stored state
            Err(e) => error!("Firing failed for node {}: {}", node_id, e),
        }

        if interrupt.is_triggered() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = interrupt.wait() => break,
        }
    }

    info!("Stopped watching node {}", node_id);
    Ok(())
}

async fn run_status(config_path: &Path, node: Option<NodeId>) -> anyhow::Result<()> {
    let config = load_config(config_path, node).await?;
    let node_id = config.node_id;
    let coordinator = build_coordinator(config).await?;
    let store = coordinator.node_store(node_id);

    let state = store.read_node_state().await?;
    let assignments = store.load_assignments().await?;
    let pruned = store.load_pruned().await?;
    let export = store.load_export().await?;

    println!("Node {}", node_id);
    match state {
        Some(state) => println!("  status:      {}", serde_json::to_string(&state)?),
        None => println!("  status:      not set"),
    }
    for (name, list) in [
        ("assignments", assignments),
        ("pruned", pruned),
        ("export", export),
    ] {
        match list {
            Some(records) => println!("  {:<12} {} records", format!("{}:", name), records.len()),
            None => println!("  {:<12} not set", format!("{}:", name)),
        }
    }
    Ok(())
}
