//! Document store boundary
//!
//! Narrow interface over the remote document database: get/set/delete
//! by id plus a full-collection scan. Queries filter client-side on
//! the scan result, matching how the rest of the system reads data.
//! Every mutation is a single-document write; there are no
//! transactions and no optimistic concurrency control, so concurrent
//! read-modify-write cycles on the same document can lose updates.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

/// Collection names used by the platform
pub mod collections {
    pub const USERS: &str = "users";
    pub const PAYMENTS: &str = "payments";
    pub const EVENTS: &str = "events";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Firestore-style document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id, `None` when absent
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Create or fully replace a document
    async fn set(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()>;

    /// Delete a document; deleting an absent document is not an error
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Scan a whole collection, returning `(id, document)` pairs
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>>;
}

/// Typed read helper over the untyped document interface
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> StoreResult<Option<T>> {
    match store.get(collection, id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Typed write helper over the untyped document interface
pub async fn set_typed<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    doc: &T,
) -> StoreResult<()> {
    store.set(collection, id, serde_json::to_value(doc)?).await
}

/// In-memory document store
///
/// Used by tests and by local development when no remote database is
/// configured. Documents are plain JSON values keyed by collection and
/// id; collections are ordered so scans are deterministic.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let data = self.data.read().await;
        Ok(data
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if let Some(docs) = data.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        let data = self.data.read().await;
        Ok(data
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
