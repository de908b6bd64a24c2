//! Switch and flow documents layered over the document store.

use crate::{DocumentStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use sluice_core::DatapathId;

/// View resolving a switch document from its canonical hex id.
pub const SWITCH_VIEW: &str = "_design/switches/_view/switch";

/// Journal document describing one connected switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// Canonical hex datapath id
    #[serde(rename = "_id")]
    pub id: String,

    /// Store revision, present once the document has been read back
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    /// Mutable payload; the upsert conflict key
    pub data: SwitchData,
}

/// Payload of a [`SwitchRecord`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwitchData {
    /// Ids of the flow records this switch owns, in delivery order
    pub flows: Vec<String>,
}

impl SwitchRecord {
    fn empty(datapath: DatapathId) -> Self {
        Self {
            id: datapath.as_hex(),
            rev: None,
            data: SwitchData::default(),
        }
    }
}

/// Journal document describing one delivered flow modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Store-assigned id
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Store revision
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    /// Serialized message content
    pub data: Value,

    /// Free-form classification tags; always empty at creation
    pub tags: Vec<String>,

    /// When the message was journaled
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of [`FlowStateJournal::record_flow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecorded {
    /// Id of the new flow record
    pub flow_id: String,

    /// Whether the id was appended to an owning switch record. `false`
    /// means the switch's connect was never journaled and the flow record
    /// stands alone.
    pub appended: bool,
}

/// Errors from journal operations.
#[derive(Error, Debug)]
pub enum JournalError {
    /// The backing store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored document did not match the journal schema
    #[error("malformed journal document for {datapath}: {reason}")]
    Malformed {
        /// Switch the document belongs to
        datapath: DatapathId,
        /// What was wrong with it
        reason: String,
    },
}

/// Durable audit record of which flow modifications are installed on which
/// switch.
///
/// The journal is best-effort: callers log failures and keep delivering to
/// the dataplane. It is never a prerequisite for correct forwarding.
#[derive(Debug, Clone)]
pub struct FlowStateJournal {
    switches: Arc<dyn DocumentStore>,
    flows: Arc<dyn DocumentStore>,
}

impl FlowStateJournal {
    /// Build a journal over the switch and flow databases.
    pub fn new(switches: Arc<dyn DocumentStore>, flows: Arc<dyn DocumentStore>) -> Self {
        Self { switches, flows }
    }

    /// Start tracking a switch.
    ///
    /// Idempotent: reconnecting an already-tracked switch keeps its
    /// existing flow list. Only a disconnect clears journal state.
    pub async fn record_switch_connect(&self, datapath: DatapathId) -> Result<(), JournalError> {
        let record = SwitchRecord::empty(datapath);
        match self.switches.insert(serde_json::to_value(&record).map_err(StoreError::from)?).await {
            Ok(_) => {
                debug!(%datapath, "switch journal record created");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => {
                debug!(%datapath, "switch already tracked");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Journal one delivered message and append its id to the owner's flow
    /// list.
    ///
    /// When the switch's connect was never journaled the flow record is
    /// still written, standalone, and `appended` comes back `false`.
    pub async fn record_flow(
        &self,
        datapath: DatapathId,
        message: &Value,
    ) -> Result<FlowRecorded, JournalError> {
        let record = FlowRecord {
            id: None,
            rev: None,
            data: message.clone(),
            tags: Vec::new(),
            recorded_at: Utc::now(),
        };
        let flow_id = self
            .flows
            .insert(serde_json::to_value(&record).map_err(StoreError::from)?)
            .await?;

        let Some(mut switch) = self.switch_record(datapath).await? else {
            return Ok(FlowRecorded {
                flow_id,
                appended: false,
            });
        };

        switch.data.flows.push(flow_id.clone());
        self.switches
            .upsert(
                serde_json::to_value(&switch).map_err(StoreError::from)?,
                "data",
            )
            .await?;

        Ok(FlowRecorded {
            flow_id,
            appended: true,
        })
    }

    /// Delete every flow record a switch owns, then the switch record
    /// itself. Already-missing documents are treated as satisfied.
    pub async fn cascade_disconnect(&self, datapath: DatapathId) -> Result<(), JournalError> {
        let Some(switch) = self.switch_record(datapath).await? else {
            debug!(%datapath, "no journal record for disconnecting switch");
            return Ok(());
        };

        for flow_id in &switch.data.flows {
            self.flows.delete(flow_id).await?;
        }
        self.switches.delete(&switch.id).await?;

        debug!(%datapath, flows = switch.data.flows.len(), "switch journal state removed");
        Ok(())
    }

    /// Look up the journal record for a switch.
    pub async fn switch_record(
        &self,
        datapath: DatapathId,
    ) -> Result<Option<SwitchRecord>, JournalError> {
        let rows = self.switches.query(SWITCH_VIEW, &datapath.as_hex()).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let record = serde_json::from_value(row).map_err(|err| JournalError::Malformed {
            datapath,
            reason: err.to_string(),
        })?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDocumentStore;
    use serde_json::json;

    fn journal() -> (FlowStateJournal, MemoryDocumentStore, MemoryDocumentStore) {
        let switches = MemoryDocumentStore::new();
        let flows = MemoryDocumentStore::new();
        let journal = FlowStateJournal::new(Arc::new(switches.clone()), Arc::new(flows.clone()));
        (journal, switches, flows)
    }

    #[tokio::test]
    async fn connect_creates_one_record_per_switch() {
        let (journal, switches, _) = journal();
        let dp = DatapathId(1);

        journal.record_switch_connect(dp).await.unwrap();
        journal.record_switch_connect(dp).await.unwrap();

        assert_eq!(switches.document_count().await, 1);
        let record = journal.switch_record(dp).await.unwrap().unwrap();
        assert_eq!(record.id, "0x1");
        assert!(record.data.flows.is_empty());
    }

    #[tokio::test]
    async fn reconnect_preserves_the_flow_list() {
        let (journal, _, _) = journal();
        let dp = DatapathId(1);

        journal.record_switch_connect(dp).await.unwrap();
        let recorded = journal.record_flow(dp, &json!({"priority": 1})).await.unwrap();
        assert!(recorded.appended);

        // a reconnect races in before any disconnect
        journal.record_switch_connect(dp).await.unwrap();

        let record = journal.switch_record(dp).await.unwrap().unwrap();
        assert_eq!(record.data.flows, vec![recorded.flow_id]);
    }

    #[tokio::test]
    async fn record_flow_appends_in_delivery_order() {
        let (journal, _, flows) = journal();
        let dp = DatapathId(0x2a);
        journal.record_switch_connect(dp).await.unwrap();

        let mut expected = Vec::new();
        for priority in [10, 20, 30] {
            let recorded = journal
                .record_flow(dp, &json!({"priority": priority}))
                .await
                .unwrap();
            assert!(recorded.appended);
            expected.push(recorded.flow_id);
        }

        let record = journal.switch_record(dp).await.unwrap().unwrap();
        assert_eq!(record.data.flows, expected);
        assert_eq!(flows.document_count().await, 3);

        // the stored records resolve back to the delivered messages, in order
        for (flow_id, priority) in record.data.flows.iter().zip([10, 20, 30]) {
            let doc = flows
                .fetch(flow_id)
                .await
                .unwrap()
                .expect("flow record exists");
            assert_eq!(doc["data"]["priority"], priority);
            assert_eq!(doc["tags"], json!([]));
        }
    }

    #[tokio::test]
    async fn flow_before_connect_stays_standalone() {
        let (journal, switches, flows) = journal();
        let dp = DatapathId(7);

        let recorded = journal.record_flow(dp, &json!({"priority": 5})).await.unwrap();
        assert!(!recorded.appended);

        assert_eq!(switches.document_count().await, 0);
        assert_eq!(flows.document_count().await, 1);
    }

    #[tokio::test]
    async fn cascade_disconnect_removes_switch_and_flows() {
        let (journal, switches, flows) = journal();
        let dp = DatapathId(1);

        journal.record_switch_connect(dp).await.unwrap();
        journal.record_flow(dp, &json!({"priority": 1})).await.unwrap();
        journal.record_flow(dp, &json!({"priority": 2})).await.unwrap();

        journal.cascade_disconnect(dp).await.unwrap();

        assert_eq!(switches.document_count().await, 0);
        assert_eq!(flows.document_count().await, 0);
        assert!(journal.switch_record(dp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cascade_disconnect_of_untracked_switch_is_satisfied() {
        let (journal, _, _) = journal();
        journal.cascade_disconnect(DatapathId(9)).await.unwrap();
    }
}
