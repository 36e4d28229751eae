//! # pitchflow
//!
//! Incremental ingestion of pitch-by-pitch game exports into per-player,
//! per-team, per-season aggregates.
//!
//! ## Flow
//!
//! ```text
//! BatchSource::discover()
//!     ↓
//! Ledger::is_processed()   (skip batches already merged)
//!     ↓
//! worker pool: fetch → parse_batch() → extract_all()
//!     ↓
//! single merging task: AggregateSet::absorb() → Ledger::mark_processed()
//!     ↓
//! AggregateStore upserts (batters, pitchers, pitch mix, players)
//! ```
//!
//! Durable state across runs lives in the ledger file and the aggregate
//! store; in-memory aggregates only cover the batches merged by one run.

pub mod batch;
pub mod config;
pub mod ledger;
pub mod pipeline;
pub mod source;

pub use batch::{parse_batch, BatchDescriptor, BatchFingerprint, Column, ParsedBatch, PitchRow};
pub use config::IngestConfig;
pub use ledger::{Ledger, LedgerEntry};
pub use pipeline::{AggregateSet, AggregateStore, PipelineEngine, RunReport};
pub use source::{BatchConnection, BatchSource, SourceError};
