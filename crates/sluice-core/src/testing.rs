//! Recording test doubles for the boundary traits.
//!
//! These doubles record every call in order, which is what the controller
//! tests assert against. Enabled with the `testing` feature.

use crate::datapath::DatapathId;
use crate::engine::{PolicyEngine, PolicyError};
use crate::flow::{FlowMod, SwitchFeatures};
use crate::snapshot::PolicySnapshot;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Transport double that records every send in submission order.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(DatapathId, FlowMod)>>>,
    fail_sends: Arc<AtomicBool>,
}

impl RecordingTransport {
    /// Create a transport that accepts every send.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(DatapathId, FlowMod)> {
        self.sent.lock().expect("transport log poisoned").clone()
    }

    /// Make subsequent sends fail with a gone session.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, datapath: DatapathId, message: &FlowMod) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SessionGone(datapath));
        }
        self.sent
            .lock()
            .expect("transport log poisoned")
            .push((datapath, message.clone()));
        Ok(())
    }
}

/// What the policy engine was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `reload` with the named datapath's snapshot
    Reload(DatapathId),
    /// `datapath_connect`
    DatapathConnect(DatapathId),
    /// `datapath_reconnect`
    DatapathReconnect(DatapathId),
    /// `datapath_disconnect`
    DatapathDisconnect(DatapathId),
    /// `packet_in`
    PacketIn(DatapathId, u32, u16),
    /// `port_add`
    PortAdd(DatapathId, u32),
    /// `port_delete`
    PortDelete(DatapathId, u32),
    /// `switch_features`
    SwitchFeatures(DatapathId),
    /// `resolve_gateways`
    ResolveGateways,
    /// `host_expire`
    HostExpire,
}

/// Cloneable view of a [`ScriptedPolicyEngine`]'s call log, usable after
/// the engine itself has moved into the controller.
#[derive(Debug, Clone)]
pub struct EngineCallLog {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl EngineCallLog {
    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("engine call log poisoned").clone()
    }
}

/// Policy engine double returning a canned batch from every mod-producing
/// call. A one-shot fault can be armed to exercise the fail-fast path.
#[derive(Debug)]
pub struct ScriptedPolicyEngine {
    batch: Vec<FlowMod>,
    reload_batch: Vec<FlowMod>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
    fail_next: Arc<AtomicBool>,
}

impl ScriptedPolicyEngine {
    /// Engine that produces no flow modifications.
    pub fn new() -> Self {
        Self::with_batch(Vec::new())
    }

    /// Engine that returns `batch` from every mod-producing call.
    pub fn with_batch(batch: Vec<FlowMod>) -> Self {
        Self {
            batch,
            reload_batch: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a distinct batch for configuration transitions.
    pub fn with_reload_batch(mut self, batch: Vec<FlowMod>) -> Self {
        self.reload_batch = batch;
        self
    }

    /// Handle to the call log; stays usable after the engine moves away.
    pub fn call_log(&self) -> EngineCallLog {
        EngineCallLog {
            calls: Arc::clone(&self.calls),
        }
    }

    /// Handle that arms a one-shot fault on the next call.
    pub fn fault_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_next)
    }

    fn record(&self, call: EngineCall) -> Result<(), PolicyError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PolicyError::Fault("scripted fault".to_string()));
        }
        self.calls
            .lock()
            .expect("engine call log poisoned")
            .push(call);
        Ok(())
    }
}

impl Default for ScriptedPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine for ScriptedPolicyEngine {
    fn reload(&mut self, snapshot: Arc<PolicySnapshot>) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::Reload(snapshot.datapath_id))?;
        Ok(self.reload_batch.clone())
    }

    fn datapath_connect(
        &mut self,
        datapath: DatapathId,
        _discovered_ports: &[u32],
    ) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::DatapathConnect(datapath))?;
        Ok(self.batch.clone())
    }

    fn datapath_reconnect(&mut self, datapath: DatapathId) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::DatapathReconnect(datapath))?;
        Ok(self.batch.clone())
    }

    fn datapath_disconnect(&mut self, datapath: DatapathId) -> Result<(), PolicyError> {
        self.record(EngineCall::DatapathDisconnect(datapath))
    }

    fn packet_in(
        &mut self,
        datapath: DatapathId,
        in_port: u32,
        vlan: u16,
        _frame: &[u8],
    ) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::PacketIn(datapath, in_port, vlan))?;
        Ok(self.batch.clone())
    }

    fn port_add(&mut self, datapath: DatapathId, port: u32) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::PortAdd(datapath, port))?;
        Ok(self.batch.clone())
    }

    fn port_delete(&mut self, datapath: DatapathId, port: u32) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::PortDelete(datapath, port))?;
        Ok(self.batch.clone())
    }

    fn switch_features(
        &mut self,
        datapath: DatapathId,
        _features: &SwitchFeatures,
    ) -> Result<Vec<FlowMod>, PolicyError> {
        self.record(EngineCall::SwitchFeatures(datapath))?;
        Ok(self.batch.clone())
    }

    fn resolve_gateways(&mut self) -> Result<Option<Vec<FlowMod>>, PolicyError> {
        self.record(EngineCall::ResolveGateways)?;
        if self.batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.batch.clone()))
        }
    }

    fn host_expire(&mut self) -> Result<(), PolicyError> {
        self.record(EngineCall::HostExpire)
    }
}
