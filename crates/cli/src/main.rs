use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedshelf_core::supersede::proper_clean_tree;
use seedshelf_core::{
    load_config, validate_config, FsOps, GarbageCollector, InstanceLock, Reconciler,
    SqliteLedger, TorrentClient, TransmissionClient,
};

/// Reconciles a torrent client's download set with a curated media library.
#[derive(Debug, Parser)]
#[command(name = "seedshelf", version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "seedshelf.toml")]
    config: PathBuf,

    /// Log every action without performing any mutation.
    #[arg(long)]
    dry_run: bool,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,

    /// Only apply proper/repack cleanup across the library tree, then exit.
    #[arg(long)]
    proper_clean: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Loading configuration from {:?}", args.config);
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!(
        "Configuration: {}",
        serde_json::to_string(&config.sanitized()).unwrap_or_default()
    );

    // One run at a time; a live holder means a slow previous run is still
    // going, which is not an error.
    let _lock = match InstanceLock::acquire(&config.lock.path)? {
        Some(lock) => lock,
        None => {
            info!("Another instance is already running, exiting");
            return Ok(());
        }
    };

    if args.dry_run {
        info!("Dry run: no mutation will be performed");
    }
    let ops = FsOps::new(args.dry_run);

    if args.proper_clean {
        info!(
            "Running proper/repack cleanup over {}",
            config.directories.destination.display()
        );
        let report = proper_clean_tree(&config.directories.destination, &ops).await;
        info!(
            "Proper/repack cleanup done: {} deleted, {} failed",
            report.deleted.len(),
            report.failed
        );
        return Ok(());
    }

    // The torrent client must be reachable before any filesystem work: a
    // missing snapshot would misclassify every seeding file as abandoned.
    let client = TransmissionClient::connect(config.transmission.clone())
        .await
        .context("Failed to connect to transmission")?;
    let snapshot = client
        .list_managed_files()
        .await
        .context("Failed to query seeding state")?;
    info!(
        "Transmission reports {} seeded files in {} torrents",
        snapshot.file_count(),
        snapshot.dir_count()
    );

    let ledger =
        SqliteLedger::new(&config.ledger.path).context("Failed to open copied-file ledger")?;

    let stats = Reconciler::new(&config, &snapshot, &ledger, &ops).run().await;
    info!(
        "Reconciled {} files: {} copied, {} moved, {} deleted, {} already copied, \
         {} conflicts, {} failed",
        stats.discovered,
        stats.copied,
        stats.moved,
        stats.deleted,
        stats.already_copied,
        stats.conflicts,
        stats.failed
    );

    let gc_stats = GarbageCollector::new(
        &config.directories.seeding,
        &snapshot,
        &ledger,
        &client,
        &ops,
    )
    .run()
    .await;
    info!(
        "Collected: {} extracted dirs, {} torrents, {} data trees, {} ledger entries, \
         {} failed",
        gc_stats.removed_dirs,
        gc_stats.removed_torrents,
        gc_stats.deleted_data,
        gc_stats.pruned_entries,
        gc_stats.failed
    );

    Ok(())
}
