//! CouchDB implementation of [`DocumentStore`] over its HTTP document API.

use crate::{ConnectionString, DocumentStore, StoreError, StoreResult, ID_FIELD};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const REV_FIELD: &str = "_rev";

/// CouchDB implementation of [`DocumentStore`].
///
/// One instance is bound to one database; `connect` creates the database
/// when it does not exist yet.
#[derive(Debug, Clone)]
pub struct CouchDocumentStore {
    client: Client,
    base_url: String,
    database: String,
    uid: Option<String>,
    pwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    rows: Vec<ViewRow>,
}

#[derive(Debug, Deserialize)]
struct ViewRow {
    value: Value,
}

impl CouchDocumentStore {
    /// Open (creating when needed) `database` on the server named by `conn`.
    ///
    /// `conn.server` may be a bare host (port 5984 assumed) or a full
    /// `http(s)://` base URL.
    pub async fn connect(conn: &ConnectionString, database: &str) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| StoreError::Backend(err.into()))?;

        let base_url = if conn.server.starts_with("http://") || conn.server.starts_with("https://")
        {
            conn.server.trim_end_matches('/').to_string()
        } else {
            format!("http://{}:5984", conn.server)
        };

        let store = Self {
            client,
            base_url,
            database: database.to_string(),
            uid: conn.uid.clone(),
            pwd: conn.pwd.clone(),
        };
        store.ensure_database().await?;
        Ok(store)
    }

    fn db_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}", self.db_url(), id)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.uid {
            Some(uid) => request.basic_auth(uid, self.pwd.as_deref()),
            None => request,
        }
    }

    async fn ensure_database(&self) -> StoreResult<()> {
        let response = self
            .authed(self.client.put(self.db_url()))
            .send()
            .await
            .map_err(|err| StoreError::Backend(err.into()))?;

        match response.status() {
            StatusCode::CREATED => {
                debug!(database = %self.database, "database created");
                Ok(())
            }
            // already exists
            StatusCode::PRECONDITION_FAILED => Ok(()),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                error!(database = %self.database, %status, "failed to create database: {}", error_text);
                Err(StoreError::Backend(anyhow::anyhow!(
                    "failed to create database {}: status {}, error: {}",
                    self.database,
                    status,
                    error_text
                )))
            }
        }
    }

    async fn current_rev(&self, id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .fetch(id)
            .await?
            .and_then(|doc| doc.get(REV_FIELD).and_then(Value::as_str).map(str::to_string)))
    }

    async fn backend_failure(&self, action: &str, response: reqwest::Response) -> StoreError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!(database = %self.database, %status, "{} failed: {}", action, error_text);
        StoreError::Backend(anyhow::anyhow!(
            "{} against {} failed: status {}, error: {}",
            action,
            self.database,
            status,
            error_text
        ))
    }
}

#[async_trait]
impl DocumentStore for CouchDocumentStore {
    async fn insert(&self, mut doc: Value) -> StoreResult<String> {
        // a create must never carry a revision, or the PUT turns into an update
        if let Some(fields) = doc.as_object_mut() {
            fields.remove(REV_FIELD);
        }

        match doc.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => {
                let id = id.to_string();
                let response = self
                    .authed(self.client.put(self.doc_url(&id)).json(&doc))
                    .send()
                    .await
                    .map_err(|err| StoreError::Backend(err.into()))?;

                match response.status() {
                    StatusCode::CREATED | StatusCode::OK | StatusCode::ACCEPTED => Ok(id),
                    StatusCode::CONFLICT => Err(StoreError::Conflict(id)),
                    _ => Err(self.backend_failure("insert", response).await),
                }
            }
            None => {
                // server-assigned id
                let response = self
                    .authed(self.client.post(self.db_url()).json(&doc))
                    .send()
                    .await
                    .map_err(|err| StoreError::Backend(err.into()))?;

                match response.status() {
                    StatusCode::CREATED | StatusCode::OK | StatusCode::ACCEPTED => {
                        let written: WriteResponse = response
                            .json()
                            .await
                            .map_err(|err| StoreError::Backend(err.into()))?;
                        Ok(written.id)
                    }
                    _ => Err(self.backend_failure("insert", response).await),
                }
            }
        }
    }

    async fn fetch(&self, id: &str) -> StoreResult<Option<Value>> {
        let response = self
            .authed(self.client.get(self.doc_url(id)))
            .send()
            .await
            .map_err(|err| StoreError::Backend(err.into()))?;

        match response.status() {
            StatusCode::OK => {
                let doc = response
                    .json()
                    .await
                    .map_err(|err| StoreError::Backend(err.into()))?;
                Ok(Some(doc))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(self.backend_failure("fetch", response).await),
        }
    }

    async fn save(&self, mut doc: Value) -> StoreResult<String> {
        let id = doc
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::Backend(anyhow::anyhow!("document to save carries no {ID_FIELD}"))
            })?;

        if doc.get(REV_FIELD).is_none() {
            if let Some(rev) = self.current_rev(&id).await? {
                doc[REV_FIELD] = Value::String(rev);
            }
        }

        let response = self
            .authed(self.client.put(self.doc_url(&id)).json(&doc))
            .send()
            .await
            .map_err(|err| StoreError::Backend(err.into()))?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK | StatusCode::ACCEPTED => Ok(id),
            StatusCode::CONFLICT => Err(StoreError::Conflict(id)),
            _ => Err(self.backend_failure("save", response).await),
        }
    }

    async fn query(&self, view: &str, key: &str) -> StoreResult<Vec<Value>> {
        let url = format!("{}/{}", self.db_url(), view);
        // view keys are JSON-encoded on the wire
        let encoded_key = serde_json::to_string(key)?;
        let response = self
            .authed(self.client.get(url).query(&[("key", encoded_key)]))
            .send()
            .await
            .map_err(|err| StoreError::Backend(err.into()))?;

        match response.status() {
            StatusCode::OK => {
                let view_response: ViewResponse = response
                    .json()
                    .await
                    .map_err(|err| StoreError::Backend(err.into()))?;
                Ok(view_response.rows.into_iter().map(|row| row.value).collect())
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(view.to_string())),
            _ => Err(self.backend_failure("query", response).await),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let Some(rev) = self.current_rev(id).await? else {
            // already gone
            return Ok(());
        };

        let response = self
            .authed(self.client.delete(self.doc_url(id)).query(&[("rev", rev)]))
            .send()
            .await
            .map_err(|err| StoreError::Backend(err.into()))?;

        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NOT_FOUND => Ok(()),
            StatusCode::CONFLICT => Err(StoreError::Conflict(id.to_string())),
            _ => Err(self.backend_failure("delete", response).await),
        }
    }
}
