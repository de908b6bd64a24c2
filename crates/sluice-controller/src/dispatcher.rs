//! The event dispatcher: many producers, one consumer.

use crate::controller::Controller;
use crate::error::ControllerError;
use sluice_core::{Event, EventKind};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Create the event channel: a cloneable producer handle and the single
/// consumer that drains it.
pub fn event_channel(capacity: usize) -> (EventSender, EventDispatcher) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, EventDispatcher { rx })
}

/// Returned when the dispatcher is gone and an event could not be
/// enqueued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event dispatcher is gone; dropped {0} event")]
pub struct SubmitError(pub EventKind);

/// Producer-side handle to the event queue.
///
/// Cloneable; every producer (transport session layer, periodic timers,
/// signal bridge) holds one. Submission order is processing order.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    /// Enqueue an event, waiting for queue space when the dispatcher lags.
    pub async fn submit(&self, event: Event) -> Result<(), SubmitError> {
        self.tx
            .send(event)
            .await
            .map_err(|mpsc::error::SendError(event)| SubmitError(event.kind()))
    }
}

/// Single consumer draining the event queue.
pub struct EventDispatcher {
    rx: mpsc::Receiver<Event>,
}

impl EventDispatcher {
    /// Receive the next raw event, bypassing the handlers.
    #[cfg(test)]
    pub(crate) async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Drain the queue until every sender is dropped.
    ///
    /// Exactly one handler runs per event, and it completes fully,
    /// including all I/O it performs, before the next event is taken.
    /// The policy engine is only ever touched from here, which is what
    /// makes its `&mut` methods safe without locking.
    ///
    /// A fault escaping a protected handler aborts dispatch and is
    /// returned as [`ControllerError::HandlerFault`]; faults in the
    /// remaining handlers are logged and dispatch continues.
    pub async fn run(mut self, controller: &mut Controller) -> Result<(), ControllerError> {
        while let Some(event) = self.rx.recv().await {
            let kind = event.kind();
            debug!(%kind, "dispatching event");

            if let Err(fault) = controller.handle_event(event).await {
                if kind.fail_fast() {
                    return Err(ControllerError::HandlerFault {
                        kind,
                        source: fault,
                    });
                }
                warn!(%kind, error = %fault, "handler failed; continuing");
            }
        }

        debug!("event channel closed; dispatcher exiting");
        Ok(())
    }
}
