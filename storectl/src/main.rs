//! Admin CLI for operators of an embedding deployment: runs catalog
//! migrations, sweeps unreferenced blobs once, and forces a full
//! search reindex. Talks to the same in-process `Store` an embedding
//! application would construct — wiring it to a real blob/search
//! backend is the embedding application's job, not this binary's.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use charmstore_core::blob::{BlobStore, MemoryBlobStore};
use charmstore_core::catalog::migrations;
use charmstore_core::config::{ServerParams, Settings};
use charmstore_core::search::{InProcessSearch, SearchBackend};
use charmstore_core::Store;

#[derive(Parser)]
#[command(name = "storectl", about = "Operator commands for a charm store deployment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs every pending catalog migration.
    Migrate,
    /// Sweeps unreferenced blobs older than the configured GC cutoff.
    Gc,
    /// Forces a full search index rebuild.
    Reindex,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let params = Settings::global();
    let store = build_store(params);

    match cli.command {
        Command::Migrate => {
            info!("running pending migrations");
            migrations::run(store.catalog.clone()).await?;
        }
        Command::Gc => {
            info!("sweeping unreferenced blobs");
            let cutoff = chrono::Utc::now() - chrono::Duration::from_std(params.gc_cutoff())?;
            let live = store.catalog.referenced_blob_hashes().await;
            let removed = store.blobs.delete_unreferenced(cutoff, &|hash| live.contains(hash)).await;
            info!(removed, "blob sweep complete");
        }
        Command::Reindex => {
            info!("forcing a full search reindex");
            store.search.ensure_indexes(true).await?;
        }
    }

    store.shutdown().await;
    Ok(())
}

fn build_store(params: &ServerParams) -> Store {
    Store::new(Arc::new(MemoryBlobStore::new()), Arc::new(InProcessSearch::new()), params)
}
