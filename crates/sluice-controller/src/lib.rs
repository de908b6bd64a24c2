//! # Sluice Controller
//!
//! The control-plane front-end of the Sluice SDN controller: it serializes
//! asynchronous switch events into a single consumer loop, drives the
//! policy engine to compute the flow-table changes those events require,
//! delivers the resulting flow modifications to the switch, and keeps a
//! best-effort audit journal of which flow entries are installed where.
//!
//! ## Concurrency model
//!
//! Multiple independent producers (the transport session layer, two
//! periodic timers, and the SIGHUP bridge) feed one bounded queue. The
//! [`EventDispatcher`] is the sole consumer: it processes one event fully,
//! including all I/O its handler performs, before taking the next. That
//! discipline is what makes the non-thread-safe policy engine sound
//! without locking.
//!
//! ## Wiring
//!
//! The policy engine and the transport are external collaborators,
//! injected as trait objects. The embedding binary creates the event
//! channel, hands the [`EventSender`] to its transport session layer, and
//! passes the dispatcher half to [`run`]:
//!
//! ```text
//! let config = ControllerConfig::load();
//! let (events, dispatcher) = event_channel(config.event_queue_capacity);
//! transport_sessions.feed(events.clone());
//! run(config, engine, transport, events, dispatcher).await?;
//! ```

use std::sync::Arc;
use tracing::info;

use sluice_core::{PolicyEngine, Transport};
use sluice_journal::FlowStateJournal;

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod snapshot;

#[cfg(unix)]
pub mod signal;

pub use config::ControllerConfig;
pub use controller::Controller;
pub use dispatcher::{event_channel, EventDispatcher, EventSender, SubmitError};
pub use error::ControllerError;
pub use pipeline::{DeliveryReport, FlowModPipeline, OFCHANNEL_TARGET};
pub use scheduler::PeriodicTasks;
pub use snapshot::{PolicySnapshotManager, ReloadError};

/// Assemble the controller and drive it until the event stream ends or a
/// protected handler faults.
///
/// `events` is the same sender handed to the transport session layer; this
/// function clones it for the periodic timers and the signal bridge, then
/// drops its own copy so the dispatcher exits once every producer is gone.
pub async fn run(
    config: ControllerConfig,
    engine: Box<dyn PolicyEngine>,
    transport: Arc<dyn Transport>,
    events: EventSender,
    dispatcher: EventDispatcher,
) -> Result<(), ControllerError> {
    let switches = sluice_journal::connect(&config.store_conn, "switches").await?;
    let flows = sluice_journal::connect(&config.store_conn, "flows").await?;
    let journal = FlowStateJournal::new(switches, flows);

    let snapshots = PolicySnapshotManager::new(&config.config_path);
    let pipeline = FlowModPipeline::new(transport, journal.clone());
    let mut controller = Controller::new(engine, snapshots, pipeline, journal);
    controller.load_initial_config();

    let timers = PeriodicTasks::spawn(
        events.clone(),
        config.gateway_resolve_interval,
        config.host_expire_interval,
    );
    #[cfg(unix)]
    let signals = signal::SignalBridge::spawn(events.clone())?;
    drop(events);

    info!(config = %config.config_path.display(), "controller running");
    let outcome = dispatcher.run(&mut controller).await;

    timers.shutdown().await;
    #[cfg(unix)]
    signals.shutdown().await;

    outcome
}
