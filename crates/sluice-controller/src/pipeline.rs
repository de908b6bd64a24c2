//! Delivery of policy-engine output to the transport and the journal.

use sluice_core::{DatapathId, FlowMod, Transport};
use sluice_journal::{FlowRecorded, FlowStateJournal};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Tracing target of the flow-mod transcript. Everything that crosses the
/// controller/switch channel is mirrored here for diagnosis.
pub const OFCHANNEL_TARGET: &str = "sluice::ofchannel";

/// What a delivery actually accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Messages handed to the transport
    pub sent: usize,

    /// Messages journaled (standalone or appended)
    pub journaled: usize,
}

/// Routes batches of flow modifications from the policy engine to the
/// transport and the flow-state journal.
///
/// This is the only place policy output crosses into transport input and
/// journal input; within a batch, send order equals the order the policy
/// engine returned.
#[derive(Debug, Clone)]
pub struct FlowModPipeline {
    transport: Arc<dyn Transport>,
    journal: FlowStateJournal,
}

impl FlowModPipeline {
    /// Build a pipeline over the given transport and journal.
    pub fn new(transport: Arc<dyn Transport>, journal: FlowStateJournal) -> Self {
        Self { transport, journal }
    }

    /// Deliver an ordered batch to one switch.
    ///
    /// Transport failures are logged and never retried here; the
    /// subsequent disconnect event is the recovery path. Journal failures
    /// are logged; the journal is an audit trail, not a prerequisite for
    /// delivery.
    pub async fn deliver(&self, datapath: DatapathId, messages: Vec<FlowMod>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if messages.is_empty() {
            return report;
        }

        let mut batch = Vec::with_capacity(messages.len());
        for message in messages {
            match serde_json::to_value(&message) {
                Ok(serialized) => {
                    debug!(target: OFCHANNEL_TARGET, %datapath, message = %serialized, "flow mod");
                    batch.push((message, serialized));
                }
                Err(err) => {
                    error!(%datapath, error = %err, "flow mod serialization failed; skipping")
                }
            }
        }

        for (message, serialized) in batch {
            match self.transport.send(datapath, &message).await {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    warn!(%datapath, error = %err, "transport send failed; awaiting disconnect")
                }
            }

            match self.journal.record_flow(datapath, &serialized).await {
                Ok(FlowRecorded {
                    appended: false,
                    flow_id,
                }) => {
                    report.journaled += 1;
                    warn!(%datapath, %flow_id, "switch not journaled yet; flow recorded standalone");
                }
                Ok(_) => report.journaled += 1,
                Err(err) => warn!(%datapath, error = %err, "journal write failed"),
            }
        }

        report
    }
}
