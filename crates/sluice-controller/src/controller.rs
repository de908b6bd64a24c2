//! Event handlers: the consumer side of the dispatcher.

use crate::pipeline::{FlowModPipeline, OFCHANNEL_TARGET};
use crate::snapshot::PolicySnapshotManager;
use sluice_core::{DatapathId, Event, PolicyEngine, PolicyError, PortStatusReason};
use sluice_journal::FlowStateJournal;
use tracing::{debug, error, info, warn};

/// Event-handling half of the controller.
///
/// Owns the policy engine, the active snapshot, and the delivery pipeline.
/// Only the event dispatcher calls into it, one event at a time, which is
/// the discipline that keeps the non-thread-safe engine sound.
pub struct Controller {
    engine: Box<dyn PolicyEngine>,
    snapshots: PolicySnapshotManager,
    pipeline: FlowModPipeline,
    journal: FlowStateJournal,
}

impl Controller {
    /// Assemble a controller from its collaborators.
    pub fn new(
        engine: Box<dyn PolicyEngine>,
        snapshots: PolicySnapshotManager,
        pipeline: FlowModPipeline,
        journal: FlowStateJournal,
    ) -> Self {
        Self {
            engine,
            snapshots,
            pipeline,
            journal,
        }
    }

    /// Load the configured snapshot once at startup.
    pub fn load_initial_config(&mut self) {
        self.snapshots.load_initial(self.engine.as_mut());
    }

    /// Read access to the snapshot manager, mainly for tests and health
    /// surfaces.
    pub fn snapshots(&self) -> &PolicySnapshotManager {
        &self.snapshots
    }

    /// Handle one event to completion.
    ///
    /// Any flow modifications the policy engine produces are routed
    /// through the delivery pipeline before this returns.
    pub async fn handle_event(&mut self, event: Event) -> Result<(), PolicyError> {
        match event {
            Event::Reconfigure => {
                self.reconfigure().await;
                Ok(())
            }
            Event::ResolveGateways => {
                if let Some(mods) = self.engine.resolve_gateways()? {
                    if let Some(datapath) = self.snapshots.datapath_id() {
                        self.pipeline.deliver(datapath, mods).await;
                    }
                }
                Ok(())
            }
            Event::HostExpire => self.engine.host_expire(),
            Event::PacketIn {
                datapath,
                in_port,
                vlan,
                frame,
            } => {
                let mods = self.engine.packet_in(datapath, in_port, vlan, &frame)?;
                self.pipeline.deliver(datapath, mods).await;
                Ok(())
            }
            Event::PortStatus {
                datapath,
                port,
                reason,
            } => {
                let mods = match reason {
                    PortStatusReason::Add | PortStatusReason::ModifyUp => {
                        self.engine.port_add(datapath, port)?
                    }
                    PortStatusReason::Delete | PortStatusReason::ModifyDown => {
                        self.engine.port_delete(datapath, port)?
                    }
                };
                self.pipeline.deliver(datapath, mods).await;
                Ok(())
            }
            Event::SwitchFeatures { datapath, features } => {
                let mods = self.engine.switch_features(datapath, &features)?;
                self.pipeline.deliver(datapath, mods).await;
                Ok(())
            }
            Event::ErrorMsg { datapath, message } => {
                debug!(target: OFCHANNEL_TARGET, %datapath, %message, "error message");
                error!(%datapath, %message, "switch reported an error");
                Ok(())
            }
            Event::DatapathConnect {
                datapath,
                discovered_ports,
            } => {
                debug!(%datapath, ports = discovered_ports.len(), "datapath connected");
                self.journal_connect(datapath).await;
                let mods = self.engine.datapath_connect(datapath, &discovered_ports)?;
                self.pipeline.deliver(datapath, mods).await;
                Ok(())
            }
            Event::DatapathReconnect { datapath } => {
                debug!(%datapath, "datapath reconnected");
                self.journal_connect(datapath).await;
                let mods = self.engine.datapath_reconnect(datapath)?;
                self.pipeline.deliver(datapath, mods).await;
                Ok(())
            }
            Event::DatapathDisconnect { datapath } => {
                debug!(%datapath, "datapath disconnected");
                self.engine.datapath_disconnect(datapath)?;
                if let Err(err) = self.journal.cascade_disconnect(datapath).await {
                    warn!(%datapath, error = %err, "journal cascade delete failed");
                }
                Ok(())
            }
        }
    }

    async fn journal_connect(&self, datapath: DatapathId) {
        if let Err(err) = self.journal.record_switch_connect(datapath).await {
            warn!(%datapath, error = %err, "journal switch record failed");
        }
    }

    async fn reconfigure(&mut self) {
        match self.snapshots.reload(self.engine.as_mut()) {
            Ok(mods) => {
                info!("configuration reloaded");
                if let Some(datapath) = self.snapshots.datapath_id() {
                    self.pipeline.deliver(datapath, mods).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "configuration reload failed; keeping active snapshot")
            }
        }
    }
}
