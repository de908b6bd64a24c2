use serde::{Deserialize, Serialize};

/// Command carried by a flow modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowModCommand {
    /// Install a new forwarding rule
    Add,
    /// Change an existing rule
    Modify,
    /// Remove matching rules
    Delete,
}

/// A single flow-table modification bound for one switch.
///
/// Match fields and actions are opaque here: their synthesis is the policy
/// engine's business, the front-end only orders, sends and serializes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMod {
    /// What the modification does to the flow table
    pub command: FlowModCommand,

    /// Flow table the rule lives in
    #[serde(default)]
    pub table_id: u8,

    /// Rule priority
    pub priority: u16,

    /// Seconds of inactivity before the rule expires (0 = never)
    #[serde(default)]
    pub idle_timeout: u16,

    /// Seconds before the rule expires regardless of traffic (0 = never)
    #[serde(default)]
    pub hard_timeout: u16,

    /// Match fields, as the policy engine emitted them
    #[serde(default)]
    pub match_fields: serde_json::Value,

    /// Actions/instructions, as the policy engine emitted them
    #[serde(default)]
    pub actions: serde_json::Value,
}

impl FlowMod {
    /// Shorthand for an install with the given priority, match and actions.
    pub fn add(priority: u16, match_fields: serde_json::Value, actions: serde_json::Value) -> Self {
        Self {
            command: FlowModCommand::Add,
            table_id: 0,
            priority,
            idle_timeout: 0,
            hard_timeout: 0,
            match_fields,
            actions,
        }
    }

    /// Shorthand for a delete of the rules matching `match_fields`.
    pub fn delete(priority: u16, match_fields: serde_json::Value) -> Self {
        Self {
            command: FlowModCommand::Delete,
            table_id: 0,
            priority,
            idle_timeout: 0,
            hard_timeout: 0,
            match_fields,
            actions: serde_json::Value::Null,
        }
    }
}

/// Contents of a switch's feature reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchFeatures {
    /// Number of flow tables the switch supports
    pub n_tables: u8,

    /// Number of packet buffers
    pub n_buffers: u32,

    /// Capability bitmap as reported by the switch
    pub capabilities: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flow_mod_serializes_with_command_tag() {
        let flow_mod = FlowMod::add(100, json!({"in_port": 1, "vlan_vid": 100}), json!([{"output": 2}]));
        let value = serde_json::to_value(&flow_mod).unwrap();

        assert_eq!(value["command"], "add");
        assert_eq!(value["priority"], 100);
        assert_eq!(value["match_fields"]["in_port"], 1);

        let back: FlowMod = serde_json::from_value(value).unwrap();
        assert_eq!(back, flow_mod);
    }

    #[test]
    fn delete_carries_no_actions() {
        let flow_mod = FlowMod::delete(0, json!({"eth_dst": "0e:00:00:00:00:01"}));
        assert_eq!(flow_mod.command, FlowModCommand::Delete);
        assert!(flow_mod.actions.is_null());
    }
}
