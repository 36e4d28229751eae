//! Pipeline engine: drives one ingestion run
//!
//! ## Architecture
//!
//! ```text
//! BatchSource::discover()
//!     ↓ sort by path, assign sequence, drop batches already in the ledger
//! shared work queue
//!     ↓
//! N workers (each owns one lazily opened BatchConnection)
//!     connect + fetch (each with timeout) → parse_batch() → extract_all()
//!     ↓ mpsc::channel<Completion>
//! merging loop (single task)
//!     AggregateSet::absorb() → Ledger::mark_processed() (blocking pool)
//!     ↓ all workers joined, connections closed
//! AggregateStore upserts → season counts → RunReport
//! ```
//!
//! Per-batch states: Discovered → Skipped | Dispatched → {Extracted, Empty,
//! Failed}. Extracted and Empty batches are merged and marked in the ledger;
//! Failed batches are left out of the ledger so the next run retries them.
//!
//! Only the merging loop touches the accumulator, so no locks guard it. Merge
//! is commutative and associative, so the worker count and completion order
//! do not affect the result.

use super::accumulator::AggregateSet;
use super::db::{AggregateStore, StoreError, UpsertReport};
use super::extract::{extract_all, BatchContext};
use super::progress::{ProgressTracker, DEFAULT_PROGRESS_EVERY};
use super::types::{Domain, DomainSummary};
use crate::batch::{parse_batch, BatchDescriptor, ParseError};
use crate::ledger::Ledger;
use crate::source::{BatchConnection, BatchSource, SourceError};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

pub const DEFAULT_WORKERS: usize = 6;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Tuning knobs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Worker pool size (at least 1)
    pub workers: usize,
    /// Log progress every N completed batches
    pub progress_every: usize,
    /// Bound on opening a connection and on each fetch; expiry fails the batch
    pub fetch_timeout: Duration,
    /// Process at most this many new batches (test mode)
    pub max_batches: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            progress_every: DEFAULT_PROGRESS_EVERY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_batches: None,
        }
    }
}

/// Why a dispatched batch failed
#[derive(Debug, Error)]
pub enum BatchFailure {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("batch i/o timed out after {0:?}")]
    Timeout(Duration),
}

/// Result of dispatching one batch to a worker
#[derive(Debug)]
pub enum BatchOutcome {
    /// At least one domain produced records
    Extracted(AggregateSet),
    /// Fetched and parsed, but no domain applied
    Empty,
    Failed(BatchFailure),
}

/// Fatal run errors; everything per-batch is absorbed into the report
#[derive(Debug, Error)]
pub enum RunError {
    #[error("batch discovery failed: {0}")]
    Discovery(#[source] SourceError),
    #[error("failed to persist aggregates: {0}")]
    Persist(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub discovered: usize,
    /// Already in the ledger
    pub skipped: usize,
    pub dispatched: usize,
    pub extracted: usize,
    pub empty: usize,
    pub failed: usize,
    /// Accumulated records per domain for this run
    pub records: DomainSummary,
    pub upserts: Vec<UpsertReport>,
    /// Rows stored per season and domain after persisting
    pub season_counts: BTreeMap<i32, BTreeMap<Domain, u64>>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Batches that reached the ledger this run
    pub fn processed(&self) -> usize {
        self.extracted + self.empty
    }

    pub fn failed_chunks(&self) -> usize {
        self.upserts.iter().map(|u| u.failed_chunks).sum()
    }
}

struct Completion {
    descriptor: BatchDescriptor,
    outcome: BatchOutcome,
}

#[derive(Debug, Default)]
struct OutcomeTally {
    extracted: usize,
    empty: usize,
    failed: usize,
}

type WorkQueue = Arc<Mutex<VecDeque<BatchDescriptor>>>;

pub struct PipelineEngine {
    source: Arc<dyn BatchSource>,
    store: Arc<dyn AggregateStore>,
    ledger: Arc<Ledger>,
    options: EngineOptions,
}

impl PipelineEngine {
    pub fn new(
        source: Arc<dyn BatchSource>,
        store: Arc<dyn AggregateStore>,
        ledger: Arc<Ledger>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            store,
            ledger,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Discover, process every new batch, persist, report
    ///
    /// Returns `Err` only when discovery or the store fails outright.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let started = Instant::now();

        let mut discovered = self.source.discover().await.map_err(RunError::Discovery)?;
        discovered.sort_by(|a, b| a.path.cmp(&b.path));
        for (sequence, descriptor) in discovered.iter_mut().enumerate() {
            descriptor.sequence = sequence as u64;
        }
        let discovered_count = discovered.len();

        let mut pending: Vec<BatchDescriptor> = discovered
            .into_iter()
            .filter(|d| !self.ledger.is_processed(d))
            .collect();
        let skipped = discovered_count - pending.len();

        if let Some(limit) = self.options.max_batches {
            if pending.len() > limit {
                log::info!("🧪 Limiting run to {} of {} new batches", limit, pending.len());
                pending.truncate(limit);
            }
        }

        log::info!(
            "📋 {} batches discovered, {} already processed, {} to process",
            discovered_count,
            skipped,
            pending.len()
        );

        let dispatched = pending.len();
        let (aggregates, tally) = self.process_batches(pending).await;

        let upserts = self.persist(&aggregates).await?;
        let season_counts = self.season_counts(&aggregates).await?;

        let report = RunReport {
            discovered: discovered_count,
            skipped,
            dispatched,
            extracted: tally.extracted,
            empty: tally.empty,
            failed: tally.failed,
            records: aggregates.summary(),
            upserts,
            season_counts,
            elapsed: started.elapsed(),
        };

        log::info!(
            "🏁 Run complete in {:.1}s: {} processed ({} empty), {} failed, ledger holds {} batches",
            report.elapsed.as_secs_f64(),
            report.processed(),
            report.empty,
            report.failed,
            self.ledger.count()
        );
        Ok(report)
    }

    /// Worker pool plus the merging loop
    async fn process_batches(&self, batches: Vec<BatchDescriptor>) -> (AggregateSet, OutcomeTally) {
        let total = batches.len();
        let mut accumulator = AggregateSet::new();
        let mut tally = OutcomeTally::default();
        if total == 0 {
            log::info!("✅ Nothing new to process");
            return (accumulator, tally);
        }

        let workers = self.options.workers.max(1).min(total);
        log::info!("🚀 Starting {} workers for {} batches", workers, total);

        let queue: WorkQueue = Arc::new(Mutex::new(VecDeque::from(batches)));
        let (tx, mut rx) = mpsc::channel::<Completion>(workers * 2);

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(run_worker(
                worker_id,
                Arc::clone(&self.source),
                Arc::clone(&queue),
                tx.clone(),
                self.options.fetch_timeout,
            ));
        }
        // Channel closes once every worker has dropped its sender
        drop(tx);

        let mut progress = ProgressTracker::new(total, self.options.progress_every);
        while let Some(Completion { descriptor, outcome }) = rx.recv().await {
            let failed = matches!(outcome, BatchOutcome::Failed(_));
            match outcome {
                BatchOutcome::Extracted(partial) => {
                    let summary = partial.summary();
                    accumulator.absorb(partial);
                    tally.extracted += 1;
                    self.mark_processed(&descriptor, summary).await;
                }
                BatchOutcome::Empty => {
                    log::info!("Batch {} produced no records", descriptor.path);
                    tally.empty += 1;
                    self.mark_processed(&descriptor, AggregateSet::new().summary()).await;
                }
                BatchOutcome::Failed(e) => {
                    log::warn!("⚠️  Batch {} failed, will retry next run: {}", descriptor.path, e);
                    tally.failed += 1;
                }
            }
            progress.record(failed);
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                log::error!("❌ Worker task aborted: {}", e);
            }
        }

        // Batches held by a panicked worker, or queued after every worker died
        let lost = total.saturating_sub(tally.extracted + tally.empty + tally.failed);
        if lost > 0 {
            log::error!("❌ {} batches never completed, will retry next run", lost);
            tally.failed += lost;
        }

        (accumulator, tally)
    }

    /// Ledger writes rewrite the whole file, so they run on the blocking pool
    async fn mark_processed(&self, descriptor: &BatchDescriptor, summary: DomainSummary) {
        let ledger = Arc::clone(&self.ledger);
        let entry = descriptor.clone();
        let written = tokio::task::spawn_blocking(move || ledger.mark_processed(&entry, summary)).await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!(
                "⚠️  Could not persist ledger entry for {} (reprocessed next run): {}",
                descriptor.path,
                e
            ),
            Err(e) => log::error!("❌ Ledger write for {} aborted: {}", descriptor.path, e),
        }
    }

    async fn persist(&self, aggregates: &AggregateSet) -> Result<Vec<UpsertReport>, StoreError> {
        Ok(vec![
            self.store.upsert_batters(aggregates.batter_rows()).await?,
            self.store.upsert_pitchers(aggregates.pitcher_rows()).await?,
            self.store.upsert_pitch_mix(aggregates.pitch_mix_rows()).await?,
            self.store.upsert_players(aggregates.player_rows()).await?,
        ])
    }

    async fn season_counts(
        &self,
        aggregates: &AggregateSet,
    ) -> Result<BTreeMap<i32, BTreeMap<Domain, u64>>, StoreError> {
        let mut counts = BTreeMap::new();
        for season in aggregates.seasons() {
            let mut per_domain = BTreeMap::new();
            for domain in Domain::ALL {
                let stored = self.store.season_count(domain, season).await?;
                log::info!("📊 {} {}: {} rows stored", season, domain, stored);
                per_domain.insert(domain, stored);
            }
            counts.insert(season, per_domain);
        }
        Ok(counts)
    }
}

/// Pull batches off the shared queue until it is empty
///
/// The connection is opened on first use, reopened after a transport failure,
/// and closed when the worker exits.
async fn run_worker(
    worker_id: usize,
    source: Arc<dyn BatchSource>,
    queue: WorkQueue,
    tx: mpsc::Sender<Completion>,
    fetch_timeout: Duration,
) {
    let mut connection: Option<Box<dyn BatchConnection>> = None;
    let mut handled = 0usize;

    loop {
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let Some(descriptor) = next else {
            break;
        };

        let outcome = match fetch_batch(source.as_ref(), &mut connection, &descriptor, fetch_timeout).await {
            Ok(bytes) => extract_batch(&descriptor, &bytes),
            Err(e) => {
                if let Some(conn) = connection.take() {
                    conn.close().await;
                }
                BatchOutcome::Failed(e)
            }
        };
        handled += 1;

        if tx.send(Completion { descriptor, outcome }).await.is_err() {
            log::error!("❌ Worker {} lost the merging loop, stopping", worker_id);
            break;
        }
    }

    if let Some(conn) = connection {
        conn.close().await;
    }
    log::debug!("Worker {} finished after {} batches", worker_id, handled);
}

async fn fetch_batch(
    source: &dyn BatchSource,
    slot: &mut Option<Box<dyn BatchConnection>>,
    descriptor: &BatchDescriptor,
    fetch_timeout: Duration,
) -> Result<Vec<u8>, BatchFailure> {
    if slot.is_none() {
        let connected = tokio::time::timeout(fetch_timeout, source.connect())
            .await
            .map_err(|_| BatchFailure::Timeout(fetch_timeout))??;
        *slot = Some(connected);
    }
    let conn = slot
        .as_mut()
        .ok_or_else(|| SourceError::Connect("connection unavailable".to_string()))?;

    match tokio::time::timeout(fetch_timeout, conn.fetch(descriptor)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(BatchFailure::Timeout(fetch_timeout)),
    }
}

fn extract_batch(descriptor: &BatchDescriptor, bytes: &[u8]) -> BatchOutcome {
    let parsed = match parse_batch(bytes) {
        Ok(parsed) => parsed,
        Err(e) => return BatchOutcome::Failed(e.into()),
    };

    let partial = extract_all(&parsed, &BatchContext::for_descriptor(descriptor));
    if partial.is_empty() {
        BatchOutcome::Empty
    } else {
        log::debug!(
            "Extracted {} rows from {}: {:?}",
            parsed.len(),
            descriptor.path,
            partial.summary()
        );
        BatchOutcome::Extracted(partial)
    }
}
