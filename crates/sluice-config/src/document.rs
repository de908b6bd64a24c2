use serde::Deserialize;
use sluice_core::snapshot::{AclConfig, InterfaceConfig, PolicySnapshot, RouteConfig, VlanConfig};
use sluice_core::DatapathId;
use std::collections::BTreeMap;

/// Config format version this crate understands.
pub const SUPPORTED_VERSION: u32 = 1;

/// On-disk configuration document, prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    /// Format version; documents that omit it get the current one
    #[serde(default = "default_version")]
    pub version: u32,

    /// Switch this configuration governs
    pub datapath_id: DatapathId,

    /// Optional deployment name
    #[serde(default)]
    pub name: Option<String>,

    /// Interface definitions keyed by port number
    pub interfaces: BTreeMap<u32, InterfaceConfig>,

    /// VLAN definitions keyed by VLAN id
    #[serde(default)]
    pub vlans: BTreeMap<u16, VlanConfig>,

    /// Named ACL definitions
    #[serde(default)]
    pub acls: BTreeMap<String, AclConfig>,

    /// Static routes
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

fn default_version() -> u32 {
    SUPPORTED_VERSION
}

impl ConfigDocument {
    /// Assemble the validated snapshot. Callers must have run validation
    /// first; this conversion itself cannot fail.
    pub fn into_snapshot(self) -> PolicySnapshot {
        PolicySnapshot {
            datapath_id: self.datapath_id,
            name: self.name,
            interfaces: self.interfaces,
            vlans: self.vlans,
            acls: self.acls,
            routes: self.routes,
        }
    }
}
