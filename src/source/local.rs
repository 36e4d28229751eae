//! Local-filesystem batch source
//!
//! Walks a directory tree (e.g. a mirror of the remote `YYYY/MM/DD/csv/`
//! hierarchy) in sorted order. Paths are reported relative to the root with
//! `/` separators so fingerprints do not depend on where the mirror lives.

use super::{season_from_file_name, BatchConnection, BatchFilter, BatchSource, SourceError};
use crate::batch::BatchDescriptor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct LocalBatchSource {
    root: PathBuf,
    filter: BatchFilter,
    default_season: i32,
}

impl LocalBatchSource {
    pub fn new(root: impl Into<PathBuf>, filter: BatchFilter, default_season: i32) -> Self {
        Self {
            root: root.into(),
            filter,
            default_season,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Blocking directory walk; runs on the blocking pool
fn walk(
    root: &Path,
    filter: &BatchFilter,
    default_season: i32,
) -> Result<Vec<BatchDescriptor>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::Discovery(format!(
            "batch root {} is not a directory",
            root.display()
        )));
    }

    let discovered_at = Utc::now().timestamp();
    let mut descriptors = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("⚠️  Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !filter.accepts(&file_name) {
            log::debug!("Filtered out {}", entry.path().display());
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("⚠️  No metadata for {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let last_modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_default();

        let Some(path) = relative_path(root, entry.path()) else {
            continue;
        };

        descriptors.push(BatchDescriptor {
            path,
            season: season_from_file_name(&file_name, default_season),
            file_name,
            size: metadata.len(),
            last_modified,
            discovered_at,
            sequence: 0,
        });
    }

    Ok(descriptors)
}

#[async_trait]
impl BatchSource for LocalBatchSource {
    async fn discover(&self) -> Result<Vec<BatchDescriptor>, SourceError> {
        let root = self.root.clone();
        let filter = self.filter.clone();
        let default_season = self.default_season;

        let descriptors = tokio::task::spawn_blocking(move || walk(&root, &filter, default_season))
            .await
            .map_err(|e| SourceError::Discovery(format!("discovery task failed: {}", e)))??;

        log::info!(
            "🔍 Discovered {} batch files under {}",
            descriptors.len(),
            self.root.display()
        );
        Ok(descriptors)
    }

    async fn connect(&self) -> Result<Box<dyn BatchConnection>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Connect(format!(
                "batch root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(Box::new(LocalConnection {
            root: self.root.clone(),
            fetched: 0,
        }))
    }
}

/// Per-worker handle onto the local root
pub struct LocalConnection {
    root: PathBuf,
    fetched: usize,
}

#[async_trait]
impl BatchConnection for LocalConnection {
    async fn fetch(&mut self, descriptor: &BatchDescriptor) -> Result<Vec<u8>, SourceError> {
        let path = self.root.join(&descriptor.path);
        let bytes = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(descriptor.path.clone())
            } else {
                SourceError::Io { path, source }
            }
        })?;
        self.fetched += 1;
        Ok(bytes)
    }

    async fn close(self: Box<Self>) {
        log::debug!("Closed local connection after {} fetches", self.fetched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempdir().unwrap();
        write(dir.path(), "2025/04/27/csv/20250427-Field-2.csv", "a,b\n");
        write(dir.path(), "2025/04/26/csv/20250426-Field-1.csv", "a,b\n1,2\n");
        write(dir.path(), "2025/04/26/csv/20250426-Field-1_unverified.csv", "x\n");
        write(dir.path(), "2024/10/01/csv/20241001-Field-9.csv", "x\n");
        write(dir.path(), "2025/04/26/csv/readme.txt", "x\n");

        let source = LocalBatchSource::new(dir.path(), BatchFilter::default(), 2025);
        let found = source.discover().await.unwrap();
        let paths: Vec<&str> = found.iter().map(|d| d.path.as_str()).collect();

        assert_eq!(
            paths,
            vec![
                "2024/10/01/csv/20241001-Field-9.csv",
                "2025/04/26/csv/20250426-Field-1.csv",
                "2025/04/27/csv/20250427-Field-2.csv",
            ]
        );
        assert_eq!(found[0].season, 2024);
        assert_eq!(found[1].size, 8);
        assert_eq!(found[1].file_name, "20250426-Field-1.csv");
        assert!(!found[1].last_modified.is_empty());
    }

    #[tokio::test]
    async fn test_discover_missing_root_fails() {
        let dir = tempdir().unwrap();
        let source = LocalBatchSource::new(dir.path().join("nope"), BatchFilter::default(), 2025);
        assert!(matches!(source.discover().await, Err(SourceError::Discovery(_))));
    }

    #[tokio::test]
    async fn test_fetch_reads_bytes() {
        let dir = tempdir().unwrap();
        write(dir.path(), "2025/a.csv", "Batter\nDoe\n");
        let source = LocalBatchSource::new(dir.path(), BatchFilter::default(), 2025);

        let found = source.discover().await.unwrap();
        let mut conn = source.connect().await.unwrap();
        let bytes = conn.fetch(&found[0]).await.unwrap();
        assert_eq!(bytes, b"Batter\nDoe\n");

        let mut gone = found[0].clone();
        gone.path = "2025/missing.csv".to_string();
        assert!(matches!(conn.fetch(&gone).await, Err(SourceError::NotFound(_))));

        conn.close().await;
    }
}
