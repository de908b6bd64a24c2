//! Sluice Journal
//!
//! A generic document-store adapter plus the flow-state journal the
//! controller keeps as a durable audit record of which flow modifications
//! are installed on which switch. The journal is best-effort: store
//! failures are logged by callers and never block delivery to the
//! dataplane.
//!
//! The [`DocumentStore`] trait makes write conflicts a first-class
//! `Result` branch instead of a caught backend fault, so the
//! create-or-update retry in [`DocumentStore::upsert`] needs no
//! store-specific error classification.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

mod couch;
mod journal;
mod memory;

pub use couch::CouchDocumentStore;
pub use journal::{
    FlowRecord, FlowRecorded, FlowStateJournal, JournalError, SwitchData, SwitchRecord,
    SWITCH_VIEW,
};
pub use memory::MemoryDocumentStore;

/// Field holding a document's identifier.
pub const ID_FIELD: &str = "_id";

/// Errors that can occur during document-store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific failure
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),

    /// A document with this id already exists
    #[error("document conflict on id {0}")]
    Conflict(String),

    /// Referenced document does not exist
    #[error("document not found: {0}")]
    NotFound(String),

    /// Document (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection string could not be understood
    #[error("invalid connection string: {0}")]
    ConnectionString(String),

    /// The connection string names a driver this build does not support
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// A write conflict persisted beyond the single upsert retry
    #[error("document conflict on id {0} persisted after retry")]
    RetryExhausted(String),
}

/// Result type for document-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Contract for a document-oriented backing store.
///
/// Documents are JSON objects; a document's identity lives in its `_id`
/// field. Lookups beyond ids go through named views
/// (`_design/<design>/_view/<view>`), matching the production store's
/// layout.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Create a document. When the document carries an `_id` that already
    /// exists the conflict is returned as [`StoreError::Conflict`];
    /// documents without an `_id` get a generated one. Returns the id.
    async fn insert(&self, doc: Value) -> StoreResult<String>;

    /// Fetch a document by id; `Ok(None)` when it does not exist.
    async fn fetch(&self, id: &str) -> StoreResult<Option<Value>>;

    /// Overwrite an existing document. The document must carry `_id`.
    async fn save(&self, doc: Value) -> StoreResult<String>;

    /// Run a lookup view with an exact key match.
    async fn query(&self, view: &str, key: &str) -> StoreResult<Vec<Value>>;

    /// Delete a document by id. Deleting an absent document is treated as
    /// already satisfied.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Create-or-update with a designated conflict field.
    ///
    /// Inserts the document; on a conflict, fetches the existing one,
    /// overwrites only `conflict_key`'s value, and saves once. A second
    /// conflict surfaces as [`StoreError::RetryExhausted`].
    async fn upsert(&self, doc: Value, conflict_key: &str) -> StoreResult<String> {
        match self.insert(doc.clone()).await {
            Err(StoreError::Conflict(id)) => {
                let mut existing = self
                    .fetch(&id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                if let (Some(fields), Some(value)) =
                    (existing.as_object_mut(), doc.get(conflict_key))
                {
                    fields.insert(conflict_key.to_string(), value.clone());
                }
                match self.save(existing).await {
                    Err(StoreError::Conflict(id)) => Err(StoreError::RetryExhausted(id)),
                    other => other,
                }
            }
            other => other,
        }
    }
}

/// Driver-keyed connection string, e.g.
/// `driver=couchdb;server=localhost;uid=root;pwd=admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Store driver name (`couchdb`, `memory`)
    pub driver: String,

    /// Server host, or a full base URL for HTTP drivers
    pub server: String,

    /// Username, when the store is authenticated
    pub uid: Option<String>,

    /// Password, when the store is authenticated
    pub pwd: Option<String>,
}

impl FromStr for ConnectionString {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = HashMap::new();
        for part in s.split(';').filter(|part| !part.trim().is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                StoreError::ConnectionString(format!("expected key=value, got {part:?}"))
            })?;
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }

        let driver = fields
            .remove("driver")
            .ok_or_else(|| StoreError::ConnectionString("missing driver".to_string()))?;
        let server = fields
            .remove("server")
            .unwrap_or_else(|| "localhost".to_string());

        Ok(Self {
            driver,
            server,
            uid: fields.remove("uid"),
            pwd: fields.remove("pwd"),
        })
    }
}

/// Open a document store for one database, keyed on the connection
/// string's driver.
pub async fn connect(conn_str: &str, database: &str) -> StoreResult<Arc<dyn DocumentStore>> {
    let conn: ConnectionString = conn_str.parse()?;
    match conn.driver.as_str() {
        "couchdb" => Ok(Arc::new(CouchDocumentStore::connect(&conn, database).await?)),
        "memory" => Ok(Arc::new(MemoryDocumentStore::new())),
        other => Err(StoreError::UnsupportedDriver(other.to_string())),
    }
}
