//! Durable, cached document index
//!
//! An [`Index`] pairs a [`DuraMap`] with a 2Q LRU over the hot manifest
//! resolution path, and carries the update streams registered against it.
//! Writes merge last-writer-wins by `updatedAt` inside one durable
//! transaction; the set of documents actually written is broadcast to every
//! stream after the commit, with no index locks held.
//!
//! The LRU only ever holds copies of committed documents: it is refreshed
//! for every written key immediately after a commit, and populated on the
//! read path from a durable snapshot.

use crate::cache::TwoQueueCache;
use crate::durable::DuraMap;
use crate::error::{Error, Result};
use crate::stream::{Connection, DocStream};
use crate::types::{decode_manifest, id_set, now_unix, DocSet, Document, IDSet, Manifest, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A named collection of documents with its own durable file and LRU
#[derive(Debug)]
pub struct Index {
    id: String,
    docs: DuraMap,
    cache: TwoQueueCache<String, Document>,
    streams: RwLock<HashMap<String, Arc<DocStream>>>,
}

impl Index {
    pub(crate) fn new(id: impl Into<String>, docs: DuraMap, cache_size: usize) -> Self {
        Self {
            id: id.into(),
            docs,
            cache: TwoQueueCache::new(cache_size),
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Index ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The index's LRU cache (exposed for eviction-transparency tests and
    /// operational inspection)
    pub fn cache(&self) -> &TwoQueueCache<String, Document> {
        &self.cache
    }

    /// Merge the given documents into the index, last writer wins.
    ///
    /// A document whose `updated_at` is zero is stamped with the current
    /// Unix second; otherwise the caller's timestamp is authoritative. A
    /// document loses the merge when the stored version is at least as new.
    /// Returns the set actually written, which is also broadcast to every
    /// stream on this index.
    pub async fn update(&self, docs: DocSet) -> Result<DocSet> {
        let now = now_unix();
        let written = self
            .docs
            .transact(|m| {
                let mut written = DocSet::new();
                for (_, mut doc) in docs {
                    if doc.updated_at == 0 {
                        doc.updated_at = now;
                    }
                    if let Some(stored) = m.get(&doc.id) {
                        if stored.updated_at >= doc.updated_at {
                            continue;
                        }
                    }
                    m.insert(doc.id.clone(), doc.clone());
                    written.insert(doc.id.clone(), doc);
                }
                written
            })
            .await?;
        self.finish_write(&written).await;
        Ok(written)
    }

    /// Overwrite the given IDs with fresh tombstones.
    ///
    /// Soft deletes go through the same write path as [`Index::update`] but
    /// always supersede the stored version. Deleting an unknown ID is not an
    /// error; it installs a tombstone like any other.
    pub async fn soft_delete(&self, ids: IDSet) -> Result<DocSet> {
        let written = self
            .docs
            .transact(|m| {
                let mut written = DocSet::new();
                for id in ids {
                    let tombstone = Document::tombstone(id);
                    m.insert(tombstone.id.clone(), tombstone.clone());
                    written.insert(tombstone.id.clone(), tombstone);
                }
                written
            })
            .await?;
        self.finish_write(&written).await;
        Ok(written)
    }

    /// Fetch one document from the durable store.
    ///
    /// Point lookups bypass the LRU; the cache is reserved for the manifest
    /// resolution path.
    pub async fn get(&self, id: &str) -> Result<Document> {
        self.docs
            .read(|m| m.get(id).cloned())
            .await
            .ok_or_else(|| Error::not_found(format!("document {} in index {}", id, self.id)))
    }

    /// Full scan of the durable store
    pub async fn get_all(&self) -> DocSet {
        self.docs.read(|m| m.clone()).await
    }

    /// Resolve a manifest stored as a document
    pub async fn get_manifest(&self, manifest_id: &str) -> Result<Manifest> {
        let docs = self.load_documents(&id_set([manifest_id]), 0).await?;
        let doc = docs
            .get(manifest_id)
            .ok_or_else(|| Error::not_found(format!("manifest {} in index {}", manifest_id, self.id)))?;
        decode_manifest(doc)
    }

    /// Documents named by a manifest that changed strictly after `updated_after`.
    ///
    /// The candidate set is the manifest's document IDs plus the manifest
    /// itself, so pollers observe manifest edits too.
    pub async fn query(&self, manifest_id: &str, updated_after: Timestamp) -> Result<DocSet> {
        let manifest = self.get_manifest(manifest_id).await?;
        let mut candidates = manifest.document_ids;
        candidates.insert(manifest_id.to_string());
        self.load_documents(&candidates, updated_after).await
    }

    /// Load the given IDs, preferring the LRU and falling back to one
    /// durable snapshot for the remainder.
    ///
    /// Fetched documents are installed into the LRU. A document makes the
    /// result only when `updated_at > updated_after` (exclusive bound); IDs
    /// with no stored document are skipped.
    pub async fn load_documents(&self, ids: &IDSet, updated_after: Timestamp) -> Result<DocSet> {
        let mut results = DocSet::new();
        let mut uncached = IDSet::new();

        for id in ids {
            match self.cache.get(id) {
                Some(doc) => {
                    if doc.updated_at > updated_after {
                        results.insert(id.clone(), doc);
                    }
                }
                None => {
                    uncached.insert(id.clone());
                }
            }
        }

        if !uncached.is_empty() {
            let fetched: Vec<Document> = self
                .docs
                .read(|m| uncached.iter().filter_map(|id| m.get(id).cloned()).collect())
                .await;
            for doc in fetched {
                self.cache.add(doc.id.clone(), doc.clone());
                if doc.updated_at > updated_after {
                    results.insert(doc.id.clone(), doc);
                }
            }
        }

        Ok(results)
    }

    /// All keys in the durable store
    pub async fn keys(&self) -> IDSet {
        self.docs.read(|m| m.keys().cloned().collect()).await
    }

    /// All keys currently live in the LRU
    pub fn lru_keys(&self) -> IDSet {
        self.cache.keys().into_iter().collect()
    }

    /// Subscribe to updates filtered by the given manifest.
    ///
    /// The stream is created on first use. Creation and registration happen
    /// under the stream-registry write lock so a concurrent idle-stream
    /// sweep cannot orphan the new subscriber.
    pub async fn connect(&self, manifest_id: &str) -> Connection {
        let mut streams = self.streams.write().await;
        let stream = streams
            .entry(manifest_id.to_string())
            .or_insert_with(|| Arc::new(DocStream::new(manifest_id)))
            .clone();
        stream.connect().await
    }

    /// Number of live streams (test and inspection hook)
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Refresh the LRU for written keys and broadcast the batch.
    ///
    /// Runs strictly after the durable commit, with no store locks held, so
    /// a slow subscriber can stall fan-out but never a writer's commit.
    async fn finish_write(&self, written: &DocSet) {
        for doc in written.values() {
            self.cache.add(doc.id.clone(), doc.clone());
        }
        if written.is_empty() {
            return;
        }

        let streams: Vec<Arc<DocStream>> =
            self.streams.read().await.values().cloned().collect();
        for stream in streams {
            stream.update(self, written).await;
        }

        self.sweep_idle_streams().await;
    }

    /// Retire streams whose last subscriber has disconnected
    async fn sweep_idle_streams(&self) {
        let mut streams = self.streams.write().await;
        let mut idle = Vec::new();
        for (manifest_id, stream) in streams.iter() {
            if stream.subscriber_count().await == 0 {
                idle.push(manifest_id.clone());
            }
        }
        for manifest_id in idle {
            streams.remove(&manifest_id);
            debug!(index = %self.id, manifest = %manifest_id, "retired idle stream");
        }
    }
}
