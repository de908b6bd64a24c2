//! In-memory implementation of [`DocumentStore`].
//!
//! Primarily intended for testing and development. All data is lost when
//! the instance is dropped.

use crate::{DocumentStore, StoreError, StoreResult, ID_FIELD};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of [`DocumentStore`].
///
/// Views are emulated the way the production views behave: both lookup
/// views emit `(doc._id, doc)`, so a view query is an id lookup.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryDocumentStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Ids of every stored document.
    pub async fn document_ids(&self) -> Vec<String> {
        self.documents.read().await.keys().cloned().collect()
    }

    fn id_of(doc: &Value) -> Option<String> {
        doc.get(ID_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, mut doc: Value) -> StoreResult<String> {
        if !doc.is_object() {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "document must be a JSON object"
            )));
        }

        let id = match Self::id_of(&doc) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                doc[ID_FIELD] = Value::String(id.clone());
                id
            }
        };

        let mut documents = self.documents.write().await;
        if documents.contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }
        documents.insert(id.clone(), doc);
        Ok(id)
    }

    async fn fetch(&self, id: &str) -> StoreResult<Option<Value>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn save(&self, doc: Value) -> StoreResult<String> {
        let id = Self::id_of(&doc).ok_or_else(|| {
            StoreError::Backend(anyhow::anyhow!("document to save carries no {ID_FIELD}"))
        })?;
        self.documents.write().await.insert(id.clone(), doc);
        Ok(id)
    }

    async fn query(&self, _view: &str, key: &str) -> StoreResult<Vec<Value>> {
        Ok(self
            .documents
            .read()
            .await
            .get(key)
            .cloned()
            .into_iter()
            .collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.documents.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_generates_ids_and_detects_conflicts() {
        let store = MemoryDocumentStore::new();

        let generated = store.insert(json!({"data": 1})).await.unwrap();
        assert!(!generated.is_empty());

        let explicit = store
            .insert(json!({"_id": "0x1", "data": {"flows": []}}))
            .await
            .unwrap();
        assert_eq!(explicit, "0x1");

        match store.insert(json!({"_id": "0x1", "data": 2})).await {
            Err(StoreError::Conflict(id)) => assert_eq!(id, "0x1"),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_only_the_conflict_key() {
        let store = MemoryDocumentStore::new();
        store
            .insert(json!({"_id": "0x1", "data": {"flows": ["f1"]}, "label": "keep"}))
            .await
            .unwrap();

        let id = store
            .upsert(
                json!({"_id": "0x1", "data": {"flows": ["f1", "f2"]}, "label": "discard"}),
                "data",
            )
            .await
            .unwrap();
        assert_eq!(id, "0x1");

        let doc = store.fetch("0x1").await.unwrap().unwrap();
        assert_eq!(doc["data"]["flows"], json!(["f1", "f2"]));
        // fields outside the conflict key survive the retry
        assert_eq!(doc["label"], "keep");
    }

    #[tokio::test]
    async fn repeated_upsert_keeps_one_document() {
        let store = MemoryDocumentStore::new();
        let doc = json!({"_id": "0x1", "data": {"flows": []}});

        store.upsert(doc.clone(), "data").await.unwrap();
        store.upsert(doc, "data").await.unwrap();

        assert_eq!(store.document_count().await, 1);
    }

    #[tokio::test]
    async fn delete_of_absent_document_is_satisfied() {
        let store = MemoryDocumentStore::new();
        store.delete("missing").await.unwrap();
    }

    #[tokio::test]
    async fn query_resolves_by_id() {
        let store = MemoryDocumentStore::new();
        store
            .insert(json!({"_id": "0x2a", "data": {"flows": []}}))
            .await
            .unwrap();

        let rows = store
            .query("_design/switches/_view/switch", "0x2a")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["_id"], "0x2a");

        let rows = store
            .query("_design/switches/_view/switch", "0x99")
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
