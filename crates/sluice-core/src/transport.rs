use crate::datapath::DatapathId;
use crate::flow::FlowMod;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the wire-side boundary.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No live session exists for the switch
    #[error("no session for datapath {0}")]
    SessionGone(DatapathId),

    /// The session exists but the send failed
    #[error("send to {datapath} failed: {reason}")]
    SendFailed {
        /// Switch the send was addressed to
        datapath: DatapathId,
        /// Backend-specific failure description
        reason: String,
    },
}

/// Wire-side boundary: delivers flow modifications to a switch session.
///
/// Within a batch the pipeline calls `send` in policy-engine output order;
/// implementations must preserve that order on the wire. A send failure is
/// logged by the caller and never retried locally; the subsequent
/// disconnect event, if any, is the recovery path.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one flow modification to the switch.
    async fn send(&self, datapath: DatapathId, message: &FlowMod) -> Result<(), TransportError>;
}
