//! Append-only record of processed identities.
//!
//! Each confirmed transaction appends `"{name}, "`. No dedup, no rewrite.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    path: PathBuf,
}

impl ProcessedRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `name` to the record. Failures are logged, never raised.
    pub async fn append(&self, name: &str) {
        if let Err(e) = self.try_append(name).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to update processed record");
        }
    }

    async fn try_append(&self, name: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}, ", name).as_bytes()).await?;
        file.flush().await
    }

    /// Names recorded so far. A missing file reads as empty.
    pub async fn load(&self) -> BTreeSet<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_grows_comma_list() {
        let dir = tempfile::tempdir().unwrap();
        let record = ProcessedRecord::new(dir.path().join("resources/processed.txt"));

        record.append("7").await;
        record.append("12").await;
        record.append("7").await;

        let content = tokio::fs::read_to_string(record.path()).await.unwrap();
        assert_eq!(content, "7, 12, 7, ");

        let names = record.load().await;
        assert_eq!(names.len(), 2);
        assert!(names.contains("12"));
    }

    #[tokio::test]
    async fn test_missing_record_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let record = ProcessedRecord::new(dir.path().join("none.txt"));
        assert!(record.load().await.is_empty());
    }
}
