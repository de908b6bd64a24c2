//! Periodic event producers.

use crate::dispatcher::EventSender;
use sluice_core::Event;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// Handle to the two periodic event producers.
///
/// The timers run for the life of the process unless [`shutdown`] is
/// called; they also exit on their own when the event channel closes.
///
/// [`shutdown`]: PeriodicTasks::shutdown
#[derive(Debug)]
pub struct PeriodicTasks {
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl PeriodicTasks {
    /// Spawn the gateway-resolution and host-expiry timers.
    ///
    /// Each timer only ever submits its synthetic event; the policy logic
    /// behind it runs in the dispatcher.
    pub fn spawn(
        events: EventSender,
        gateway_resolve_interval: Duration,
        host_expire_interval: Duration,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        let handles = vec![
            spawn_timer(
                events.clone(),
                gateway_resolve_interval,
                Event::ResolveGateways,
                stop.subscribe(),
                "resolve_gateways",
            ),
            spawn_timer(
                events,
                host_expire_interval,
                Event::HostExpire,
                stop.subscribe(),
                "host_expire",
            ),
        ];
        Self { stop, handles }
    }

    /// Stop both timers and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

fn spawn_timer(
    events: EventSender,
    period: Duration,
    event: Event,
    mut stop: watch::Receiver<bool>,
    name: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if events.submit(event.clone()).await.is_err() {
                        debug!(task = name, "event channel closed; timer exiting");
                        break;
                    }
                }
                _ = stop.changed() => {
                    debug!(task = name, "timer stopped");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::event_channel;
    use sluice_core::EventKind;
    use std::collections::HashSet;

    #[tokio::test(start_paused = true)]
    async fn emits_both_event_kinds_on_their_cadences() {
        let (events, mut dispatcher) = event_channel(16);
        let tasks = PeriodicTasks::spawn(
            events,
            Duration::from_secs(2),
            Duration::from_secs(5),
        );

        // the first tick of each timer fires immediately
        let mut first = HashSet::new();
        for _ in 0..2 {
            first.insert(dispatcher.recv().await.unwrap().kind());
        }
        assert_eq!(
            first,
            HashSet::from([EventKind::ResolveGateways, EventKind::HostExpire])
        );

        // t=2s, t=4s are gateway ticks, t=5s the next host expiry
        let mut next = Vec::new();
        for _ in 0..3 {
            next.push(dispatcher.recv().await.unwrap().kind());
        }
        assert_eq!(
            next,
            vec![
                EventKind::ResolveGateways,
                EventKind::ResolveGateways,
                EventKind::HostExpire
            ]
        );

        tokio::time::timeout(Duration::from_secs(1), tasks.shutdown())
            .await
            .expect("shutdown is deterministic");
    }

    #[tokio::test(start_paused = true)]
    async fn timers_exit_when_the_channel_closes() {
        let (events, dispatcher) = event_channel(16);
        let tasks = PeriodicTasks::spawn(
            events,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        drop(dispatcher);

        // both tasks notice the closed channel on their next tick
        tokio::time::timeout(Duration::from_secs(1), async {
            for handle in tasks.handles {
                handle.await.unwrap();
            }
        })
        .await
        .expect("timers exit on their own");
    }
}
