//! Ownership of the active configuration snapshot.

use sluice_config::ConfigError;
use sluice_core::{DatapathId, FlowMod, PolicyEngine, PolicyError, PolicySnapshot};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Error from a configuration reload.
#[derive(Error, Debug)]
pub enum ReloadError {
    /// The source failed to parse or sanity-check
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The policy engine faulted while computing the transition
    #[error("policy engine rejected the new configuration: {0}")]
    Policy(#[from] PolicyError),
}

/// Owns the active validated configuration and its swap-on-success
/// contract.
///
/// Only the reconfigure handler (and the startup load) calls [`reload`],
/// so the manager is never concurrent with itself or with other handlers.
///
/// [`reload`]: PolicySnapshotManager::reload
#[derive(Debug)]
pub struct PolicySnapshotManager {
    source: PathBuf,
    active: Option<Arc<PolicySnapshot>>,
}

impl PolicySnapshotManager {
    /// Manage the configuration at `source`. Nothing is loaded yet.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            active: None,
        }
    }

    /// The active snapshot, if one has been loaded.
    pub fn active(&self) -> Option<Arc<PolicySnapshot>> {
        self.active.clone()
    }

    /// Datapath governed by the active snapshot.
    pub fn datapath_id(&self) -> Option<DatapathId> {
        self.active.as_ref().map(|snapshot| snapshot.datapath_id)
    }

    /// Re-read, parse and sanity-check the source; on success hand the new
    /// snapshot to the engine and swap it in, returning the transition
    /// flow modifications.
    ///
    /// Any failure (parse, sanity check, or engine fault) leaves the
    /// active snapshot untouched and produces no flow modifications.
    pub fn reload(&mut self, engine: &mut dyn PolicyEngine) -> Result<Vec<FlowMod>, ReloadError> {
        let snapshot = Arc::new(sluice_config::load_snapshot(&self.source)?);
        let mods = engine.reload(Arc::clone(&snapshot))?;
        self.active = Some(snapshot);
        Ok(mods)
    }

    /// Startup load.
    ///
    /// The transition mods are dropped: no switch session exists yet, and
    /// the first connect event replays the table anyway. A failed startup
    /// load leaves the controller running without a snapshot until a
    /// reload succeeds.
    pub fn load_initial(&mut self, engine: &mut dyn PolicyEngine) {
        match self.reload(engine) {
            Ok(mods) => debug!(count = mods.len(), "initial configuration loaded"),
            Err(err) => {
                warn!(error = %err, "initial configuration load failed; awaiting reload signal")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::testing::{EngineCall, ScriptedPolicyEngine};
    use sluice_core::{DatapathId, FlowMod};
    use std::io::{Seek, SeekFrom, Write};

    const VALID: &str = r#"
    datapath_id: "0x1"
    interfaces:
      1: {native_vlan: 100}
    vlans:
      100: {name: office}
    "#;

    const VALID_CHANGED: &str = r#"
    datapath_id: "0x1"
    interfaces:
      1: {native_vlan: 100}
      2: {native_vlan: 100}
    vlans:
      100: {name: office}
    "#;

    fn write_config(file: &mut tempfile::NamedTempFile, contents: &str) {
        let file = file.as_file_mut();
        file.set_len(0).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
    }

    fn transition_mods() -> Vec<FlowMod> {
        vec![FlowMod::add(
            10,
            serde_json::json!({"vlan_vid": 100}),
            serde_json::json!([{"output": "flood"}]),
        )]
    }

    #[test]
    fn reload_swaps_and_returns_engine_mods() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_config(&mut file, VALID);

        let mut engine = ScriptedPolicyEngine::new().with_reload_batch(transition_mods());
        let log = engine.call_log();
        let mut manager = PolicySnapshotManager::new(file.path());

        let mods = manager.reload(&mut engine).expect("valid source");
        assert_eq!(mods, transition_mods());
        assert_eq!(log.calls(), vec![EngineCall::Reload(DatapathId(1))]);

        let active = manager.active().expect("snapshot active");
        assert_eq!(active.interfaces.len(), 1);

        // a second reload against a changed source swaps the snapshot
        write_config(&mut file, VALID_CHANGED);
        manager.reload(&mut engine).expect("valid source");
        let active = manager.active().expect("snapshot active");
        assert_eq!(active.interfaces.len(), 2);
    }

    #[test]
    fn failed_reload_keeps_the_active_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_config(&mut file, VALID);

        let mut engine = ScriptedPolicyEngine::new();
        let mut manager = PolicySnapshotManager::new(file.path());
        manager.reload(&mut engine).expect("valid source");
        let before = manager.active().expect("snapshot active");

        write_config(&mut file, "interfaces: [not, a, mapping");
        let err = manager.reload(&mut engine).unwrap_err();
        assert!(matches!(err, ReloadError::Config(_)));

        // byte-for-byte the same snapshot: the Arc was not even replaced
        let after = manager.active().expect("snapshot still active");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn engine_fault_keeps_the_active_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_config(&mut file, VALID);

        let mut engine = ScriptedPolicyEngine::new();
        let fault = engine.fault_flag();
        let mut manager = PolicySnapshotManager::new(file.path());
        manager.reload(&mut engine).expect("valid source");
        let before = manager.active().expect("snapshot active");

        fault.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = manager.reload(&mut engine).unwrap_err();
        assert!(matches!(err, ReloadError::Policy(_)));
        assert!(Arc::ptr_eq(&before, &manager.active().unwrap()));
    }

    #[test]
    fn initial_load_failure_leaves_no_snapshot() {
        let mut engine = ScriptedPolicyEngine::new();
        let mut manager = PolicySnapshotManager::new("/nonexistent/sluice.yaml");

        manager.load_initial(&mut engine);
        assert!(manager.active().is_none());
        assert_eq!(manager.datapath_id(), None);
    }
}
