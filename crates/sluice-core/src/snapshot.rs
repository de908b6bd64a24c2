use crate::datapath::DatapathId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable validated configuration governing one controller instance.
///
/// Produced by the config parser after its sanity check passes; the
/// controller only ever replaces it as a whole, so readers always observe
/// a fully-formed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Switch this snapshot governs
    pub datapath_id: DatapathId,

    /// Optional human-readable name of the deployment
    #[serde(default)]
    pub name: Option<String>,

    /// Interface definitions keyed by port number
    pub interfaces: BTreeMap<u32, InterfaceConfig>,

    /// VLAN definitions keyed by VLAN id
    #[serde(default)]
    pub vlans: BTreeMap<u16, VlanConfig>,

    /// Named ACL definitions; rule contents are the policy engine's business
    #[serde(default)]
    pub acls: BTreeMap<String, AclConfig>,

    /// Static routes
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Configuration of one switch interface.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Interface name
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// VLAN for untagged traffic on this interface
    #[serde(default)]
    pub native_vlan: Option<u16>,

    /// VLANs carried tagged on this interface
    #[serde(default)]
    pub tagged_vlans: Vec<u16>,

    /// Ingress ACL applied to this interface
    #[serde(default)]
    pub acl_in: Option<String>,
}

/// Configuration of one VLAN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanConfig {
    /// VLAN name
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Whether unknown-destination unicast is flooded on this VLAN
    #[serde(default = "default_unicast_flood")]
    pub unicast_flood: bool,
}

impl Default for VlanConfig {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            unicast_flood: default_unicast_flood(),
        }
    }
}

fn default_unicast_flood() -> bool {
    true
}

/// A named access-control list. The rule bodies are opaque to the
/// front-end; only the name participates in validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AclConfig {
    /// Ordered rule list as the policy engine consumes it
    #[serde(default)]
    pub rules: Vec<serde_json::Value>,
}

/// A static route entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Destination prefix
    pub ip_dst: String,

    /// Gateway address
    pub ip_gw: String,
}
