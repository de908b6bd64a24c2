//!
//! Sluice Core - domain model for the Sluice controller front-end
//!
//! This crate defines the domain types (datapath identities, events, flow
//! modifications, policy snapshots) and the boundary traits ([`PolicyEngine`],
//! [`Transport`]) that the controller runtime is built against. It is the
//! foundation for all other crates in the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Datapath identity
pub mod datapath;

/// Policy engine boundary
pub mod engine;

/// Controller events
pub mod event;

/// Flow modifications and feature replies
pub mod flow;

/// Validated configuration snapshot
pub mod snapshot;

/// Recording test doubles for the boundary traits
#[cfg(feature = "testing")]
pub mod testing;

/// Transport boundary
pub mod transport;

// Re-export key types
pub use datapath::{DatapathId, ParseDatapathIdError};
pub use engine::{PolicyEngine, PolicyError};
pub use event::{Event, EventKind, PortStatusReason};
pub use flow::{FlowMod, FlowModCommand, SwitchFeatures};
pub use snapshot::PolicySnapshot;
pub use transport::{Transport, TransportError};
