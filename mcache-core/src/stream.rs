//! Per-manifest update broker
//!
//! A [`DocStream`] fans update batches out to every subscriber of one
//! `(index, manifest)` pair. Each subscriber holds the receiving half of a
//! bounded channel; the stream owns the sending halves and is the only
//! party that closes them (by dropping the sender at disconnect). Fan-out
//! runs under the registry read lock, so broadcasts proceed in parallel
//! with each other but are mutually exclusive with connect/disconnect.
//!
//! Delivery applies backpressure: a full subscriber channel blocks the
//! broadcast until the consumer drains it.

use crate::error::{Error, Result};
use crate::index::Index;
use crate::types::DocSet;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Bound on each subscriber's update channel
pub const CHANNEL_CAPACITY: usize = 1024;

/// Registry key for one subscriber, unique within its stream
pub type ConnectionKey = u64;

/// Broker for one manifest's subscribers
#[derive(Debug)]
pub struct DocStream {
    manifest_id: String,
    next_key: AtomicU64,
    subscribers: RwLock<HashMap<ConnectionKey, mpsc::Sender<DocSet>>>,
}

impl DocStream {
    pub(crate) fn new(manifest_id: impl Into<String>) -> Self {
        Self {
            manifest_id: manifest_id.into(),
            next_key: AtomicU64::new(0),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Manifest this stream filters by
    pub fn manifest_id(&self) -> &str {
        &self.manifest_id
    }

    /// Register a new subscriber and hand back its connection
    pub(crate) async fn connect(self: &Arc<Self>) -> Connection {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().await.insert(key, tx);
        debug!(manifest = %self.manifest_id, key, "subscriber connected");
        Connection {
            key,
            feed: rx,
            stream: Arc::clone(self),
            disconnected: false,
        }
    }

    /// Remove a subscriber, closing its channel.
    ///
    /// Errors with [`Error::NotFound`] when the key is not registered;
    /// other subscribers are unaffected either way.
    pub async fn disconnect(&self, key: ConnectionKey) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.remove(&key) {
            Some(_) => {
                debug!(manifest = %self.manifest_id, key, "subscriber disconnected");
                Ok(())
            }
            None => Err(Error::not_found(format!(
                "connection {} on stream {}",
                key, self.manifest_id
            ))),
        }
    }

    /// Current number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Broadcast a changed-document batch to every subscriber.
    ///
    /// The manifest is re-resolved per subscriber (it may have changed since
    /// they connected); a resolution failure skips that subscriber for this
    /// batch only. Each subscriber receives the intersection of the batch
    /// with the manifest's document IDs, and only when it is non-empty.
    pub(crate) async fn update(&self, index: &Index, docs: &DocSet) {
        let subscribers = self.subscribers.read().await;
        for (key, tx) in subscribers.iter() {
            let manifest = match index.get_manifest(&self.manifest_id).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(
                        manifest = %self.manifest_id,
                        key,
                        error = %e,
                        "skipping subscriber: manifest unavailable"
                    );
                    continue;
                }
            };
            let filtered: DocSet = docs
                .iter()
                .filter(|(id, _)| manifest.document_ids.contains(*id))
                .map(|(id, doc)| (id.clone(), doc.clone()))
                .collect();
            if filtered.is_empty() {
                continue;
            }
            if tx.send(filtered).await.is_err() {
                // Receiver already dropped; its late disconnect will clean up.
                debug!(manifest = %self.manifest_id, key, "subscriber gone, update discarded");
            }
        }
    }
}

/// One subscriber's end of a [`DocStream`]
///
/// Owns the receiving half of the update channel. Dropping a connection
/// without calling [`Connection::disconnect`] schedules a best-effort
/// disconnect so transport-level peer drops still unregister the
/// subscriber.
#[derive(Debug)]
pub struct Connection {
    key: ConnectionKey,
    feed: mpsc::Receiver<DocSet>,
    stream: Arc<DocStream>,
    disconnected: bool,
}

impl Connection {
    /// Key identifying this subscriber within its stream
    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    /// Manifest the subscription filters by
    pub fn manifest_id(&self) -> &str {
        self.stream.manifest_id()
    }

    /// Receive the next filtered update batch.
    ///
    /// Returns `None` once the stream has closed the channel at disconnect.
    pub async fn recv(&mut self) -> Option<DocSet> {
        self.feed.recv().await
    }

    /// Unregister from the stream, closing the channel
    pub async fn disconnect(mut self) -> Result<()> {
        self.disconnected = true;
        let stream = Arc::clone(&self.stream);
        let key = self.key;
        stream.disconnect(key).await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.disconnected {
            return;
        }
        let stream = Arc::clone(&self.stream);
        let key = self.key;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = stream.disconnect(key).await {
                    debug!(key, error = %e, "late disconnect: {e}");
                }
            });
        }
    }
}
