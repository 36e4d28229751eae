//! # Aggregation pipeline
//!
//! Turns parsed batches into per-(name, team, season) aggregates and drives a
//! whole ingestion run.
//!
//! ## Module Organization
//!
//! - `types` - aggregation key, domains, keyed-record aliases
//! - `merge` - the `Merge` trait and ratio helpers
//! - `records` - one aggregate record type per domain, plus export rows
//! - `extract` - pure per-domain extractors over a `ParsedBatch`
//! - `accumulator` - `AggregateSet`, the four keyed maps merged together
//! - `progress` - completion cadence, throughput, ETA
//! - `db` - `AggregateStore` trait and the SQLite implementation
//! - `engine` - worker pool, merging loop, ledger and store wiring

pub mod accumulator;
pub mod db;
pub mod engine;
pub mod extract;
pub mod merge;
pub mod progress;
pub mod records;
pub mod types;

pub use accumulator::AggregateSet;
pub use db::{AggregateStore, SqliteAggregateStore, StoreError, UpsertReport};
pub use engine::{BatchFailure, BatchOutcome, EngineOptions, PipelineEngine, RunError, RunReport};
pub use extract::{extract_all, BatchContext};
pub use merge::Merge;
pub use types::{AggregationKey, Domain, DomainSummary};
