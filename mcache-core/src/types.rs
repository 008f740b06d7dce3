//! Core value types and codecs
//!
//! Documents are the unit of storage: an opaque byte body under a string ID,
//! versioned by an `updatedAt` Unix-seconds timestamp. Manifests are ordinary
//! documents whose body encodes the set of document IDs a consumer is
//! authorized to see; [`encode_manifest`] / [`decode_manifest`] convert
//! between the two representations.
//!
//! ## Wire format
//!
//! Documents serialize as `{"id", "updatedAt", "body": base64, "deleted"}`.
//! A manifest body is a JSON object whose keys are document IDs and whose
//! values are empty objects (set membership).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix-seconds offset
pub type Timestamp = i64;

/// Unordered set of document IDs
pub type IDSet = HashSet<String>;

/// Unordered mapping from document ID to document
pub type DocSet = HashMap<String, Document>;

/// Current wall-clock time as a Unix-seconds timestamp
pub fn now_unix() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs() as Timestamp
}

/// Build an [`IDSet`] from anything yielding string-likes
pub fn id_set<I, S>(ids: I) -> IDSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter().map(Into::into).collect()
}

/// Build a [`DocSet`] keyed by each document's ID
pub fn doc_set<I>(docs: I) -> DocSet
where
    I: IntoIterator<Item = Document>,
{
    docs.into_iter().map(|d| (d.id.clone(), d)).collect()
}

/// A document stored in an index
///
/// `id` is opaque and arbitrary (it may contain `:` and `&`). `body` is
/// treated as bytes; its interpretation is by convention only. A document
/// with `deleted = true` and an empty body is a tombstone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID
    pub id: String,
    /// Last-update time in Unix seconds; zero means "unset, let the server stamp it"
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Timestamp,
    /// Opaque payload, base64 on the wire
    #[serde(with = "base64_bytes", default)]
    pub body: Vec<u8>,
    /// Tombstone marker
    #[serde(default)]
    pub deleted: bool,
}

impl Document {
    /// Create a live document
    pub fn new(id: impl Into<String>, updated_at: Timestamp, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            updated_at,
            body: body.into(),
            deleted: false,
        }
    }

    /// Create a tombstone for the given ID, stamped with the current time
    pub fn tombstone(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            updated_at: now_unix(),
            body: Vec::new(),
            deleted: true,
        }
    }
}

/// A named set of accessible document IDs
///
/// Persisted as an ordinary [`Document`] via [`encode_manifest`]; consumers
/// query and subscribe by manifest ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Manifest (document) ID
    pub id: String,
    /// Last-update time carried on the backing document
    pub updated_at: Timestamp,
    /// IDs this manifest exposes
    pub document_ids: IDSet,
}

impl Manifest {
    /// Create a manifest over the given IDs
    pub fn new(id: impl Into<String>, updated_at: Timestamp, document_ids: IDSet) -> Self {
        Self {
            id: id.into(),
            updated_at,
            document_ids,
        }
    }

    /// Add a document ID to the manifest
    pub fn add(&mut self, id: impl Into<String>) {
        self.document_ids.insert(id.into());
    }
}

/// Encode a manifest as the document that stores it
///
/// The body is a JSON object keyed by document ID with empty-object values.
pub fn encode_manifest(m: &Manifest) -> Result<Document> {
    let mut body = serde_json::Map::with_capacity(m.document_ids.len());
    for id in &m.document_ids {
        body.insert(id.clone(), serde_json::Value::Object(Default::default()));
    }
    Ok(Document {
        id: m.id.clone(),
        updated_at: m.updated_at,
        body: serde_json::to_vec(&serde_json::Value::Object(body))?,
        deleted: false,
    })
}

/// Decode the manifest stored in a document
///
/// Fails with [`Error::Decode`] when the body is not a JSON object.
pub fn decode_manifest(doc: &Document) -> Result<Manifest> {
    let ids: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&doc.body)
        .map_err(|e| Error::decode(format!("manifest {} body: {}", doc.id, e)))?;
    Ok(Manifest {
        id: doc.id.clone(),
        updated_at: doc.updated_at,
        document_ids: ids.into_iter().map(|(id, _)| id).collect(),
    })
}

/// Base64 (standard alphabet) serde adapter for document bodies
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
