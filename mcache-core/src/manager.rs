//! Index discovery and lifecycle
//!
//! The [`IndexManager`] owns the registry of open indexes, one per ID.
//! Index files live in a single configured directory under the
//! `mcache-index-<id>.db` naming convention; [`IndexManager::scan`] opens
//! every file matching it at startup, creating the directory (owner-only
//! permissions) when absent.

use crate::config::CacheConfig;
use crate::durable::DuraMap;
use crate::error::{Error, Result};
use crate::index::Index;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// File-name prefix for index snapshots; load-bearing for [`IndexManager::scan`]
pub const INDEX_FILE_PREFIX: &str = "mcache-index-";
/// File-name suffix for index snapshots
pub const INDEX_FILE_SUFFIX: &str = ".db";

/// Snapshot path for an index ID within a data directory
pub fn index_file_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{INDEX_FILE_PREFIX}{id}{INDEX_FILE_SUFFIX}"))
}

fn index_id_from_filename(name: &str) -> Option<&str> {
    name.strip_prefix(INDEX_FILE_PREFIX)?
        .strip_suffix(INDEX_FILE_SUFFIX)
}

/// Registry of open indexes over one data directory
#[derive(Debug)]
pub struct IndexManager {
    dir: PathBuf,
    lru_cache_size: usize,
    max_index_count: usize,
    indexes: RwLock<HashMap<String, Arc<Index>>>,
}

impl IndexManager {
    /// Create a manager over the configured data directory
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: config.data_dir.clone(),
            lru_cache_size: config.lru_cache_size,
            max_index_count: config.max_index_count,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Open the index with the given ID, creating its file if needed.
    ///
    /// Idempotent and safe to call concurrently: there is at most one open
    /// [`Index`] per ID, and re-opening returns the existing instance.
    pub async fn open(&self, id: &str) -> Result<Arc<Index>> {
        if let Some(existing) = self.get_index(id).await {
            debug!(index = %id, "index already open");
            return Ok(existing);
        }

        let docs = DuraMap::open(index_file_path(&self.dir, id)).await?;
        let index = Arc::new(Index::new(id, docs, self.lru_cache_size));

        let mut indexes = self.indexes.write().await;
        if let Some(existing) = indexes.get(id) {
            // Lost an open race; the spare handle is dropped unused.
            return Ok(existing.clone());
        }
        indexes.insert(id.to_string(), index.clone());
        if indexes.len() > self.max_index_count {
            warn!(
                count = indexes.len(),
                max = self.max_index_count,
                "open index count exceeds advisory cap"
            );
        }
        Ok(index)
    }

    /// The open index with the given ID, if any; never opens
    pub async fn get_index(&self, id: &str) -> Option<Arc<Index>> {
        self.indexes.read().await.get(id).cloned()
    }

    /// IDs of all open indexes
    pub async fn index_ids(&self) -> Vec<String> {
        self.indexes.read().await.keys().cloned().collect()
    }

    /// Open every index file found in the data directory.
    ///
    /// Creates the directory with mode `0700` when absent. Files not
    /// matching the naming convention are skipped with a log; any open
    /// failure aborts the scan.
    pub async fn scan(&self) -> Result<()> {
        if tokio::fs::metadata(&self.dir).await.is_err() {
            info!(dir = %self.dir.display(), "creating data directory");
            create_data_dir(&self.dir)?;
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::store(format!("scan {}: {}", self.dir.display(), e)))?;
        let mut found = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::store(format!("scan {}: {}", self.dir.display(), e)))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(id) = index_id_from_filename(&name) else {
                debug!(file = %name, "skipping non-index file");
                continue;
            };
            self.open(id).await?;
            found += 1;
        }
        info!(dir = %self.dir.display(), indexes = found, "scan complete");
        Ok(())
    }
}

fn create_data_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| Error::store(format!("create {}: {}", dir.display(), e)))
}
