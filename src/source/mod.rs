//! Batch source collaborators
//!
//! `BatchSource` enumerates batches and hands out connections;
//! `BatchConnection` fetches one batch's bytes. The engine gives every worker
//! its own connection and closes them all when the pool shuts down.
//!
//! Naming convention shared by every source:
//! - eligible files end in the configured extension (case-insensitive)
//! - names containing an exclude pattern are skipped (case-insensitive)
//! - a leading `YYYYMMDD` date in the file name selects the season

pub mod local;

pub use local::{LocalBatchSource, LocalConnection};

use crate::batch::BatchDescriptor;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_EXTENSION: &str = "csv";
pub const DEFAULT_EXCLUDE_PATTERNS: [&str; 3] = ["playerpositioning", "fhc", "unverified"];
pub const DEFAULT_SEASON: i32 = 2025;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("batch discovery failed: {0}")]
    Discovery(String),
    #[error("failed to connect to batch source: {0}")]
    Connect(String),
    #[error("batch not found: {0}")]
    NotFound(String),
}

/// Enumerates batches and opens connections for fetching them
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// List every eligible batch currently in the source
    ///
    /// `sequence` on the returned descriptors is not meaningful; the engine
    /// assigns it.
    async fn discover(&self) -> Result<Vec<BatchDescriptor>, SourceError>;

    /// Open a connection owned by one worker
    async fn connect(&self) -> Result<Box<dyn BatchConnection>, SourceError>;
}

/// One worker's connection to the source
#[async_trait]
pub trait BatchConnection: Send {
    async fn fetch(&mut self, descriptor: &BatchDescriptor) -> Result<Vec<u8>, SourceError>;

    async fn close(self: Box<Self>);
}

/// File-name filter for batch discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFilter {
    /// Extension without the leading dot, lowercase
    pub extension: String,
    /// Lowercase substrings that disqualify a file
    pub exclude: Vec<String>,
}

impl Default for BatchFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXTENSION,
            DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        )
    }
}

impl BatchFilter {
    pub fn new(extension: &str, exclude: Vec<String>) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
            exclude: exclude
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        let has_extension = lower
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && ext == self.extension);

        has_extension && !self.exclude.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// Season of a batch from its leading `YYYYMMDD` date, else `default`
///
/// The prefix must be a real calendar date (`20251399-...` falls back).
pub fn season_from_file_name(file_name: &str, default: i32) -> i32 {
    file_name
        .get(..8)
        .filter(|prefix| prefix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y%m%d").ok())
        .map(|date| date.year())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_extension_and_excludes() {
        let filter = BatchFilter::default();

        assert!(filter.accepts("20250426-Field-1.csv"));
        assert!(filter.accepts("20250426-Field-1.CSV"));
        assert!(!filter.accepts("20250426-Field-1.csv.bak"));
        assert!(!filter.accepts("20250426-Field-1_playerpositioning.csv"));
        assert!(!filter.accepts("20250426-Field-1-FHC.csv"));
        assert!(!filter.accepts("20250426-Field-1-Unverified.csv"));
        assert!(!filter.accepts("notes.txt"));
        assert!(!filter.accepts(".csv"));
    }

    #[test]
    fn test_filter_custom_extension() {
        let filter = BatchFilter::new(".TXT", vec!["skip".to_string(), "  ".to_string()]);
        assert_eq!(filter.extension, "txt");
        assert_eq!(filter.exclude, vec!["skip".to_string()]);
        assert!(filter.accepts("game.txt"));
        assert!(!filter.accepts("game-SKIP.txt"));
    }

    #[test]
    fn test_season_from_file_name() {
        assert_eq!(season_from_file_name("20240315-Field-1.csv", 2025), 2024);
        assert_eq!(season_from_file_name("20251399-Field-1.csv", 2025), 2025);
        assert_eq!(season_from_file_name("Field-20240315.csv", 2025), 2025);
        assert_eq!(season_from_file_name("2024.csv", 2023), 2023);
        assert_eq!(season_from_file_name("", 2025), 2025);
    }
}
