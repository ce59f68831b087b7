//! # Match Ledger Node
//!
//! Runs a single ledger peer until Ctrl+C.
//!
//! Configuration comes from `ML_*` environment variables (see
//! `NodeConfig::apply_env`). Log verbosity follows `RUST_LOG`.

use anyhow::{Context, Result};
use node_runtime::{LedgerNode, LedgerSink, LoopbackNetwork, NodeConfig};
use shared_types::PeerId;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::from_env().context("invalid ML_* environment")?;
    config.validate()?;

    match config.storage.data_dir.clone() {
        #[cfg(feature = "rocksdb")]
        Some(dir) => {
            use node_runtime::adapters::storage::RocksDbStore;
            use node_runtime::KvLedgerSink;

            info!(path = %dir.display(), "Opening RocksDB ledger sink");
            let store = RocksDbStore::open_default(&dir)?;
            run(config, Arc::new(KvLedgerSink::new(store))).await
        }
        #[cfg(not(feature = "rocksdb"))]
        Some(dir) => {
            anyhow::bail!(
                "ML_DATA_DIR={} needs a build with the `rocksdb` feature",
                dir.display()
            )
        }
        None => {
            info!("No data directory configured, using in-memory sink");
            run(config, Arc::new(node_runtime::InMemoryLedgerSink::in_memory())).await
        }
    }
}

async fn run<S: LedgerSink>(config: NodeConfig, sink: Arc<S>) -> Result<()> {
    let keypair = config.identity.keypair()?;
    let peer = PeerId(*keypair.public_key().as_bytes());

    // Single-peer swarm until a network transport is plugged in.
    let network = LoopbackNetwork::new();
    let transport = Arc::new(network.join(peer));

    let node = LedgerNode::start(config, keypair, sink, transport).await?;
    info!(peer = %peer, "Node is running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    node.shutdown().await;
    Ok(())
}
