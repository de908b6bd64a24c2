//! SIGHUP-to-channel bridge.
//!
//! The original design ran reconfiguration from inside the signal handler;
//! here the signal only ever forwards an event, so the reconfigure logic
//! always executes on the dispatcher, never in signal context.

use crate::dispatcher::EventSender;
use sluice_core::Event;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Bridge from the OS reconfiguration signal (SIGHUP) to the event queue.
#[derive(Debug)]
pub struct SignalBridge {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SignalBridge {
    /// Install the SIGHUP listener and start forwarding.
    pub fn spawn(events: EventSender) -> std::io::Result<Self> {
        let mut hangup = signal(SignalKind::hangup())?;
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = hangup.recv() => {
                        if received.is_none() {
                            break;
                        }
                        debug!("reconfiguration signal received");
                        if events.submit(Event::Reconfigure).await.is_err() {
                            debug!("event channel closed; signal bridge exiting");
                            break;
                        }
                    }
                    _ = stopped.changed() => {
                        debug!("signal bridge stopped");
                        break;
                    }
                }
            }
        });

        Ok(Self { stop, handle })
    }

    /// Stop the bridge and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}
