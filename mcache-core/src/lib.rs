//! mcache core: a process-embedded document cache
//!
//! Clients store small opaque documents under string IDs, grouped into
//! logically independent indexes. Manifests — ordinary documents whose body
//! encodes a set of document IDs — scope what a consumer sees: queries
//! return the manifest's documents changed after a timestamp, and
//! subscriptions deliver incremental update batches filtered the same way.
//!
//! Each index pairs a durable keyed document map ([`DuraMap`]) with a 2Q
//! LRU ([`TwoQueueCache`]) over the hot manifest-resolution path. Writes
//! merge last-writer-wins by `updatedAt` and broadcast the set of documents
//! actually written to any registered [`DocStream`].
//!
//! # Example
//!
//! ```ignore
//! use mcache_core::{CacheConfig, MCache};
//!
//! let cache = MCache::open(CacheConfig::default()).await?;
//! let index = cache.create_index("dev").await?;
//! index.update(docs).await?;
//! let results = cache.query("dev", "manifest-id", 0).await?;
//! ```

pub mod cache;
pub mod config;
pub mod durable;
pub mod error;
pub mod index;
pub mod manager;
pub mod stream;
pub mod types;

pub use cache::{CacheStats, TwoQueueCache};
pub use config::CacheConfig;
pub use durable::DuraMap;
pub use error::{Error, Result};
pub use index::Index;
pub use manager::{index_file_path, IndexManager, INDEX_FILE_PREFIX, INDEX_FILE_SUFFIX};
pub use stream::{Connection, ConnectionKey, DocStream};
pub use types::{
    decode_manifest, doc_set, encode_manifest, id_set, now_unix, DocSet, Document, IDSet,
    Manifest, Timestamp,
};

use std::sync::Arc;

/// The cache facade: routes `(index_id, …)` operations to the right index
///
/// Construction scans the data directory and opens every existing index;
/// initialization errors (unreadable directory, corrupt snapshot) surface
/// here. All routing methods return [`Error::NoSuchIndex`] for an
/// unregistered index ID.
#[derive(Debug)]
pub struct MCache {
    config: CacheConfig,
    manager: IndexManager,
}

impl MCache {
    /// Open a cache over the configured data directory
    pub async fn open(config: CacheConfig) -> Result<Self> {
        let manager = IndexManager::new(&config);
        manager.scan().await?;
        Ok(Self { config, manager })
    }

    /// The configuration this cache was opened with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Create (and register) a new index.
    ///
    /// Errors with [`Error::IndexExists`] when the ID is already registered.
    pub async fn create_index(&self, id: &str) -> Result<Arc<Index>> {
        if self.manager.get_index(id).await.is_some() {
            return Err(Error::IndexExists(id.to_string()));
        }
        self.manager.open(id).await
    }

    /// The registered index with the given ID
    pub async fn index(&self, id: &str) -> Result<Arc<Index>> {
        self.manager
            .get_index(id)
            .await
            .ok_or_else(|| Error::NoSuchIndex(id.to_string()))
    }

    /// IDs of all registered indexes
    pub async fn index_ids(&self) -> Vec<String> {
        self.manager.index_ids().await
    }

    /// All keys in an index
    pub async fn keys(&self, index_id: &str) -> Result<IDSet> {
        Ok(self.index(index_id).await?.keys().await)
    }

    /// Get one document from an index
    pub async fn get(&self, index_id: &str, doc_id: &str) -> Result<Document> {
        self.index(index_id).await?.get(doc_id).await
    }

    /// Get every document in an index
    pub async fn get_all(&self, index_id: &str) -> Result<DocSet> {
        Ok(self.index(index_id).await?.get_all().await)
    }

    /// Documents named by a manifest that changed strictly after `updated_after`
    pub async fn query(
        &self,
        index_id: &str,
        manifest_id: &str,
        updated_after: Timestamp,
    ) -> Result<DocSet> {
        self.index(index_id)
            .await?
            .query(manifest_id, updated_after)
            .await
    }

    /// Merge documents into an index; returns the set actually written
    pub async fn update(&self, index_id: &str, docs: DocSet) -> Result<DocSet> {
        self.index(index_id).await?.update(docs).await
    }

    /// Overwrite the given IDs with tombstones; returns the tombstones written
    pub async fn soft_delete(&self, index_id: &str, ids: IDSet) -> Result<DocSet> {
        self.index(index_id).await?.soft_delete(ids).await
    }

    /// Subscribe to an index's updates filtered by a manifest
    pub async fn connect(&self, index_id: &str, manifest_id: &str) -> Result<Connection> {
        Ok(self.index(index_id).await?.connect(manifest_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_index_rejects_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = MCache::open(CacheConfig {
            data_dir: tmp.path().to_path_buf(),
            ..Default::default()
        })
        .await
        .unwrap();

        cache.create_index("dev").await.unwrap();
        assert!(matches!(
            cache.create_index("dev").await,
            Err(Error::IndexExists(_))
        ));
    }

    #[tokio::test]
    async fn routing_to_unknown_index_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = MCache::open(CacheConfig {
            data_dir: tmp.path().to_path_buf(),
            ..Default::default()
        })
        .await
        .unwrap();

        assert!(matches!(
            cache.keys("nope").await,
            Err(Error::NoSuchIndex(_))
        ));
        assert!(matches!(
            cache.update("nope", DocSet::new()).await,
            Err(Error::NoSuchIndex(_))
        ));
        assert!(matches!(
            cache.connect("nope", "m").await,
            Err(Error::NoSuchIndex(_))
        ));
    }

    #[tokio::test]
    async fn open_rediscovers_indexes_across_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            data_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };

        {
            let cache = MCache::open(config.clone()).await.unwrap();
            cache.create_index("persisted").await.unwrap();
            cache
                .update(
                    "persisted",
                    doc_set([Document::new("a", 9, b"a".to_vec())]),
                )
                .await
                .unwrap();
        }

        let cache = MCache::open(config).await.unwrap();
        let doc = cache.get("persisted", "a").await.unwrap();
        assert_eq!(doc.updated_at, 9);
    }
}
