//! Ingestion configuration from environment variables
//!
//! The binary loads `.env` (dotenv) first, so values there are honoured.

use crate::pipeline::db::DEFAULT_UPSERT_CHUNK;
use crate::pipeline::engine::{EngineOptions, DEFAULT_FETCH_TIMEOUT, DEFAULT_WORKERS};
use crate::pipeline::progress::DEFAULT_PROGRESS_EVERY;
use crate::source::{BatchFilter, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_EXTENSION, DEFAULT_SEASON};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Configuration for one ingestion run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Root of the batch hierarchy
    pub batch_root: PathBuf,

    /// SQLite aggregate store
    pub db_path: PathBuf,

    /// JSON ledger of processed batches
    pub ledger_path: PathBuf,

    pub workers: usize,

    /// Completions between progress lines
    pub progress_every: usize,

    /// Rows per upsert transaction
    pub upsert_chunk: usize,

    pub fetch_timeout: Duration,

    /// Season for files without a leading date
    pub default_season: i32,

    pub extension: String,

    pub exclude: Vec<String>,

    /// At most this many new batches per run (`TEST_MODE` implies 1)
    pub max_batches: Option<usize>,
}

impl IngestConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PITCHFLOW_BATCH_ROOT` (required)
    /// - `PITCHFLOW_DB_PATH` (default: pitchflow.db)
    /// - `PITCHFLOW_LEDGER_PATH` (default: processed_files.json)
    /// - `PITCHFLOW_WORKERS` (default: 6)
    /// - `PITCHFLOW_PROGRESS_EVERY` (default: 10)
    /// - `PITCHFLOW_UPSERT_CHUNK` (default: 100)
    /// - `PITCHFLOW_FETCH_TIMEOUT_SECS` (default: 60)
    /// - `PITCHFLOW_DEFAULT_SEASON` (default: 2025)
    /// - `PITCHFLOW_EXTENSION` (default: csv)
    /// - `PITCHFLOW_EXCLUDE` (default: playerpositioning,fhc,unverified)
    /// - `TEST_MODE` (default: false; true limits the run to one batch)
    /// - `PITCHFLOW_MAX_BATCHES` (default: unlimited)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let batch_root = get("PITCHFLOW_BATCH_ROOT")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("PITCHFLOW_BATCH_ROOT"))?;

        let test_mode = get("TEST_MODE").is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");
        let max_batches: Option<usize> = parse_var(&get, "PITCHFLOW_MAX_BATCHES")?;
        let max_batches = if test_mode {
            Some(max_batches.map_or(1, |n| n.min(1)))
        } else {
            max_batches
        };

        let workers: usize = parse_var(&get, "PITCHFLOW_WORKERS")?.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(ConfigError::Invalid {
                name: "PITCHFLOW_WORKERS",
                value: "0".to_string(),
            });
        }

        let exclude = match get("PITCHFLOW_EXCLUDE") {
            Some(list) => list.split(',').map(|p| p.trim().to_string()).collect(),
            None => DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        };

        Ok(Self {
            batch_root,
            db_path: get("PITCHFLOW_DB_PATH")
                .unwrap_or_else(|| "pitchflow.db".to_string())
                .into(),
            ledger_path: get("PITCHFLOW_LEDGER_PATH")
                .unwrap_or_else(|| "processed_files.json".to_string())
                .into(),
            workers,
            progress_every: parse_var(&get, "PITCHFLOW_PROGRESS_EVERY")?
                .unwrap_or(DEFAULT_PROGRESS_EVERY),
            upsert_chunk: parse_var(&get, "PITCHFLOW_UPSERT_CHUNK")?
                .unwrap_or(DEFAULT_UPSERT_CHUNK),
            fetch_timeout: parse_var(&get, "PITCHFLOW_FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
            default_season: parse_var(&get, "PITCHFLOW_DEFAULT_SEASON")?
                .unwrap_or(DEFAULT_SEASON),
            extension: get("PITCHFLOW_EXTENSION").unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            exclude,
            max_batches,
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            workers: self.workers,
            progress_every: self.progress_every,
            fetch_timeout: self.fetch_timeout,
            max_batches: self.max_batches,
        }
    }

    pub fn batch_filter(&self) -> BatchFilter {
        BatchFilter::new(&self.extension, self.exclude.clone())
    }
}

fn parse_var<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<IngestConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        // Test: only the required root is set
        let config = config_from(&[("PITCHFLOW_BATCH_ROOT", "/data/v3")]).unwrap();

        assert_eq!(config.batch_root, PathBuf::from("/data/v3"));
        assert_eq!(config.db_path, PathBuf::from("pitchflow.db"));
        assert_eq!(config.ledger_path, PathBuf::from("processed_files.json"));
        assert_eq!(config.workers, 6);
        assert_eq!(config.progress_every, 10);
        assert_eq!(config.upsert_chunk, 100);
        assert_eq!(config.fetch_timeout, Duration::from_secs(60));
        assert_eq!(config.default_season, 2025);
        assert_eq!(config.extension, "csv");
        assert_eq!(config.exclude, vec!["playerpositioning", "fhc", "unverified"]);
        assert_eq!(config.max_batches, None);
    }

    #[test]
    fn test_custom_config() {
        // Test: every variable overridden
        let config = config_from(&[
            ("PITCHFLOW_BATCH_ROOT", "/mirror"),
            ("PITCHFLOW_DB_PATH", "/tmp/test.db"),
            ("PITCHFLOW_WORKERS", "2"),
            ("PITCHFLOW_UPSERT_CHUNK", "25"),
            ("PITCHFLOW_FETCH_TIMEOUT_SECS", "5"),
            ("PITCHFLOW_DEFAULT_SEASON", "2024"),
            ("PITCHFLOW_EXCLUDE", "scrimmage, bullpen"),
            ("PITCHFLOW_MAX_BATCHES", "40"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.workers, 2);
        assert_eq!(config.upsert_chunk, 25);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.default_season, 2024);
        assert_eq!(config.exclude, vec!["scrimmage", "bullpen"]);
        assert_eq!(config.max_batches, Some(40));
        assert_eq!(config.engine_options().workers, 2);
        assert!(!config.batch_filter().accepts("20240301-Bullpen.csv"));
    }

    #[test]
    fn test_test_mode_limits_to_one_batch() {
        let config = config_from(&[
            ("PITCHFLOW_BATCH_ROOT", "/mirror"),
            ("TEST_MODE", "true"),
            ("PITCHFLOW_MAX_BATCHES", "40"),
        ])
        .unwrap();
        assert_eq!(config.max_batches, Some(1));
    }

    #[test]
    fn test_missing_root_and_bad_numbers() {
        assert_eq!(config_from(&[]), Err(ConfigError::Missing("PITCHFLOW_BATCH_ROOT")));

        let err = config_from(&[("PITCHFLOW_BATCH_ROOT", "/x"), ("PITCHFLOW_WORKERS", "six")])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PITCHFLOW_WORKERS",
                value: "six".to_string()
            }
        );

        let err = config_from(&[("PITCHFLOW_BATCH_ROOT", "/x"), ("PITCHFLOW_WORKERS", "0")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PITCHFLOW_WORKERS", .. }));
    }
}
