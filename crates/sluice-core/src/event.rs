use crate::datapath::DatapathId;
use crate::flow::SwitchFeatures;
use std::fmt;

/// Reason attached to a port status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatusReason {
    /// A port was added to the switch
    Add,
    /// A port was removed
    Delete,
    /// An existing port's link came up
    ModifyUp,
    /// An existing port's link went down
    ModifyDown,
}

/// An event observed by the controller.
///
/// Events are immutable values; ownership moves into the dispatcher when
/// they are submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Configuration reload requested (the signal bridge emits this)
    Reconfigure,
    /// Periodic gateway/ARP resolution tick
    ResolveGateways,
    /// Periodic learned-host aging tick
    HostExpire,
    /// A packet punted to the controller by a switch
    PacketIn {
        /// Originating switch
        datapath: DatapathId,
        /// Port the packet arrived on
        in_port: u32,
        /// VLAN the packet was tagged with
        vlan: u16,
        /// Raw frame bytes
        frame: Vec<u8>,
    },
    /// A port on a switch changed state
    PortStatus {
        /// Switch reporting the change
        datapath: DatapathId,
        /// Port number concerned
        port: u32,
        /// What changed
        reason: PortStatusReason,
    },
    /// A switch answered the feature request
    SwitchFeatures {
        /// Switch that replied
        datapath: DatapathId,
        /// Reported features
        features: SwitchFeatures,
    },
    /// A switch reported a protocol error
    ErrorMsg {
        /// Switch that reported the error
        datapath: DatapathId,
        /// Human-readable error content
        message: String,
    },
    /// A switch session came up
    DatapathConnect {
        /// Newly connected switch
        datapath: DatapathId,
        /// Ports discovered up at connect time
        discovered_ports: Vec<u32>,
    },
    /// A switch session went away
    DatapathDisconnect {
        /// Disconnected switch
        datapath: DatapathId,
    },
    /// A switch session came back after a drop
    DatapathReconnect {
        /// Reconnected switch
        datapath: DatapathId,
    },
}

impl Event {
    /// Discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Reconfigure => EventKind::Reconfigure,
            Event::ResolveGateways => EventKind::ResolveGateways,
            Event::HostExpire => EventKind::HostExpire,
            Event::PacketIn { .. } => EventKind::PacketIn,
            Event::PortStatus { .. } => EventKind::PortStatus,
            Event::SwitchFeatures { .. } => EventKind::SwitchFeatures,
            Event::ErrorMsg { .. } => EventKind::ErrorMsg,
            Event::DatapathConnect { .. } => EventKind::DatapathConnect,
            Event::DatapathDisconnect { .. } => EventKind::DatapathDisconnect,
            Event::DatapathReconnect { .. } => EventKind::DatapathReconnect,
        }
    }

    /// Switch the event concerns, when there is one.
    pub fn datapath(&self) -> Option<DatapathId> {
        match self {
            Event::PacketIn { datapath, .. }
            | Event::PortStatus { datapath, .. }
            | Event::SwitchFeatures { datapath, .. }
            | Event::ErrorMsg { datapath, .. }
            | Event::DatapathConnect { datapath, .. }
            | Event::DatapathDisconnect { datapath }
            | Event::DatapathReconnect { datapath } => Some(*datapath),
            Event::Reconfigure | Event::ResolveGateways | Event::HostExpire => None,
        }
    }
}

/// Discriminant of an [`Event`], used for logging and the fail-fast policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`Event::Reconfigure`]
    Reconfigure,
    /// See [`Event::ResolveGateways`]
    ResolveGateways,
    /// See [`Event::HostExpire`]
    HostExpire,
    /// See [`Event::PacketIn`]
    PacketIn,
    /// See [`Event::PortStatus`]
    PortStatus,
    /// See [`Event::SwitchFeatures`]
    SwitchFeatures,
    /// See [`Event::ErrorMsg`]
    ErrorMsg,
    /// See [`Event::DatapathConnect`]
    DatapathConnect,
    /// See [`Event::DatapathDisconnect`]
    DatapathDisconnect,
    /// See [`Event::DatapathReconnect`]
    DatapathReconnect,
}

impl EventKind {
    /// Whether a fault in this event's handler is fatal to the process.
    ///
    /// Handlers driven by switch traffic fail fast: dispatching further
    /// events against possibly-corrupted policy state is judged worse than
    /// a controlled restart. The reconfigure, periodic and feature-reply
    /// handlers log and continue instead.
    pub fn fail_fast(&self) -> bool {
        matches!(
            self,
            EventKind::PacketIn
                | EventKind::PortStatus
                | EventKind::ErrorMsg
                | EventKind::DatapathConnect
                | EventKind::DatapathDisconnect
                | EventKind::DatapathReconnect
        )
    }

    /// Stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Reconfigure => "reconfigure",
            EventKind::ResolveGateways => "resolve_gateways",
            EventKind::HostExpire => "host_expire",
            EventKind::PacketIn => "packet_in",
            EventKind::PortStatus => "port_status",
            EventKind::SwitchFeatures => "switch_features",
            EventKind::ErrorMsg => "error_msg",
            EventKind::DatapathConnect => "datapath_connect",
            EventKind::DatapathDisconnect => "datapath_disconnect",
            EventKind::DatapathReconnect => "datapath_reconnect",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
