//! Ingestion runtime
//!
//! One run: discover batch files under the batch root, merge every batch not
//! yet in the ledger, upsert the season aggregates, exit.
//!
//! Usage:
//!   cargo run --release --bin pitchflow_ingest
//!
//! Environment variables (see `IngestConfig::from_env` for the full list):
//!   PITCHFLOW_BATCH_ROOT - root of the batch file hierarchy (required)
//!   PITCHFLOW_DB_PATH - SQLite aggregate store (default: pitchflow.db)
//!   PITCHFLOW_LEDGER_PATH - processed-batch ledger (default: processed_files.json)
//!   PITCHFLOW_WORKERS - worker pool size (default: 6)
//!   TEST_MODE - process a single new batch (default: false)
//!   RUST_LOG - log filter (default: info)

use dotenv::dotenv;
use log::{error, info, warn};
use pitchflow::pipeline::{AggregateStore, EngineOptions, PipelineEngine, SqliteAggregateStore};
use pitchflow::source::{BatchSource, LocalBatchSource};
use pitchflow::{IngestConfig, Ledger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("⚾ pitchflow ingest");

    let config = IngestConfig::from_env().map_err(|e| {
        error!("❌ Invalid configuration: {}", e);
        e
    })?;

    info!("   ├─ Batch root: {}", config.batch_root.display());
    info!("   ├─ Database: {}", config.db_path.display());
    info!("   ├─ Ledger: {}", config.ledger_path.display());
    info!("   ├─ Workers: {}", config.workers);
    info!("   ├─ Upsert chunk: {} rows", config.upsert_chunk);
    info!("   └─ Fetch timeout: {}s", config.fetch_timeout.as_secs());
    if let Some(limit) = config.max_batches {
        warn!("🧪 Test mode: at most {} new batches this run", limit);
    }

    let source: Arc<dyn BatchSource> = Arc::new(LocalBatchSource::new(
        config.batch_root.clone(),
        config.batch_filter(),
        config.default_season,
    ));
    let store: Arc<dyn AggregateStore> =
        Arc::new(SqliteAggregateStore::open(&config.db_path, config.upsert_chunk)?);
    let ledger = Arc::new(Ledger::open(config.ledger_path.clone()));
    info!("📒 Ledger holds {} processed batches", ledger.count());

    let options: EngineOptions = config.engine_options();
    let engine = PipelineEngine::new(source, store, ledger, options);

    let report = engine.run().await.map_err(|e| {
        error!("❌ Run aborted: {}", e);
        e
    })?;

    for (domain, records) in &report.records {
        info!("   ├─ {}: {} records merged", domain, records);
    }
    info!(
        "   └─ {} discovered, {} skipped, {} processed, {} failed",
        report.discovered,
        report.skipped,
        report.processed(),
        report.failed
    );

    if report.failed_chunks() > 0 {
        error!(
            "❌ {} upsert chunks failed; see errors above",
            report.failed_chunks()
        );
    }
    if report.failed > 0 {
        warn!("⚠️  {} batches failed and will be retried next run", report.failed);
    }

    Ok(())
}
