use crate::datapath::DatapathId;
use crate::flow::{FlowMod, SwitchFeatures};
use crate::snapshot::PolicySnapshot;
use std::sync::Arc;
use thiserror::Error;

/// Fault raised by the policy engine while computing flow-table changes.
///
/// A `PolicyError` escaping a protected event handler terminates the
/// process; see the dispatcher's fail-fast policy.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The event names a switch the engine does not govern
    #[error("datapath {0} is not governed by the active configuration")]
    UnknownDatapath(DatapathId),

    /// The engine has no configuration to work from yet
    #[error("no active configuration")]
    NoActiveConfig,

    /// Any other engine fault
    #[error("policy engine fault: {0}")]
    Fault(String),
}

/// Computes the flow-table changes that controller events require.
///
/// Implementations are not required to be thread-safe: every method takes
/// `&mut self`, and the event dispatcher guarantees single-threaded access
/// by processing one event fully before taking the next.
pub trait PolicyEngine: Send {
    /// Apply a new configuration snapshot, returning the differential flow
    /// modifications for the transition from the previous one.
    fn reload(&mut self, snapshot: Arc<PolicySnapshot>) -> Result<Vec<FlowMod>, PolicyError>;

    /// A switch connected with the given ports up.
    fn datapath_connect(
        &mut self,
        datapath: DatapathId,
        discovered_ports: &[u32],
    ) -> Result<Vec<FlowMod>, PolicyError>;

    /// A switch session came back after a drop.
    fn datapath_reconnect(&mut self, datapath: DatapathId) -> Result<Vec<FlowMod>, PolicyError>;

    /// A switch went away; forget its learned state.
    fn datapath_disconnect(&mut self, datapath: DatapathId) -> Result<(), PolicyError>;

    /// A tagged packet was punted to the controller.
    fn packet_in(
        &mut self,
        datapath: DatapathId,
        in_port: u32,
        vlan: u16,
        frame: &[u8],
    ) -> Result<Vec<FlowMod>, PolicyError>;

    /// A port appeared or its link came up.
    fn port_add(&mut self, datapath: DatapathId, port: u32) -> Result<Vec<FlowMod>, PolicyError>;

    /// A port disappeared or its link went down.
    fn port_delete(&mut self, datapath: DatapathId, port: u32) -> Result<Vec<FlowMod>, PolicyError>;

    /// A switch answered the feature request.
    fn switch_features(
        &mut self,
        datapath: DatapathId,
        features: &SwitchFeatures,
    ) -> Result<Vec<FlowMod>, PolicyError>;

    /// Periodic gateway resolution; `None` when there is nothing to resolve.
    fn resolve_gateways(&mut self) -> Result<Option<Vec<FlowMod>>, PolicyError>;

    /// Periodic learned-host aging; produces no flow modifications.
    fn host_expire(&mut self) -> Result<(), PolicyError>;
}
