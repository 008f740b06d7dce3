//! File-backed durable document map
//!
//! [`DuraMap`] is the durable half of an index: a keyed map of documents
//! persisted as a single JSON snapshot on disk. Writers run inside
//! [`DuraMap::transact`], which stages mutations on a copy, persists the
//! copy atomically (write-temp-then-rename), and only then advances the
//! in-memory map — so a failed commit changes nothing and observers always
//! see a fully-committed state. Readers take a consistent snapshot under
//! the read lock via [`DuraMap::read`].

use crate::error::{Error, Result};
use crate::types::Document;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::warn;

/// Durable keyed document map backed by one snapshot file
#[derive(Debug)]
pub struct DuraMap {
    path: PathBuf,
    state: RwLock<HashMap<String, Document>>,
}

impl DuraMap {
    /// Open the snapshot at `path`, creating an empty one if absent.
    ///
    /// Entries that fail to decode as documents are logged and skipped;
    /// a snapshot that is not a JSON object at all is a [`Error::Store`].
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_snapshot(&path, &bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let empty = HashMap::new();
                write_snapshot(&path, &empty).await?;
                empty
            }
            Err(e) => {
                return Err(Error::store(format!("open {}: {}", path.display(), e)));
            }
        };
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Path of the backing snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a read snapshot of the map
    pub async fn read<R>(&self, f: impl FnOnce(&HashMap<String, Document>) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Atomically read-modify-write the map.
    ///
    /// `f` mutates a staged copy; the copy is persisted before the in-memory
    /// map advances. On any persistence failure the whole batch is discarded
    /// and [`Error::Store`] is returned.
    pub async fn transact<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Document>) -> R,
    ) -> Result<R> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let out = f(&mut staged);
        write_snapshot(&self.path, &staged).await?;
        *state = staged;
        Ok(out)
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }
}

fn decode_snapshot(path: &Path, bytes: &[u8]) -> Result<HashMap<String, Document>> {
    let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(bytes)
        .map_err(|e| Error::store(format!("snapshot {} is not a document map: {}", path.display(), e)))?;
    let mut docs = HashMap::with_capacity(raw.len());
    for (id, value) in raw {
        match serde_json::from_value::<Document>(value) {
            Ok(doc) => {
                docs.insert(id, doc);
            }
            Err(e) => {
                warn!(id = %id, path = %path.display(), error = %e, "skipping undecodable document");
            }
        }
    }
    Ok(docs)
}

async fn write_snapshot(path: &Path, docs: &HashMap<String, Document>) -> Result<()> {
    let bytes = serde_json::to_vec(docs)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| Error::store(format!("write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::store(format!("commit {}: {}", path.display(), e)))?;
    Ok(())
}
