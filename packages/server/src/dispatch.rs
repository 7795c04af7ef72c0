use std::sync::Arc;

use async_trait::async_trait;
use common::{EventPublisher, LifecycleEvent};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, warn};

/// Detached, bounded delivery of lifecycle events.
///
/// `dispatch` never waits: events go into a bounded queue drained by a
/// background task that publishes with at most `max_in_flight` concurrent
/// calls. Publishing runs outside any request scope, so a dropped request
/// does not cancel its events. A full queue drops the event with a warning;
/// publisher failures are logged and never retried.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl EventDispatcher {
    pub fn spawn(publisher: Arc<dyn EventPublisher>, capacity: usize, max_in_flight: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
        tokio::spawn(run_dispatcher(rx, publisher, semaphore));
        Self { tx }
    }

    pub fn dispatch(&self, event: LifecycleEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    contest_id = event.contest_id,
                    "Event queue full, dropping lifecycle event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "Event dispatcher stopped, dropping lifecycle event"
                );
            }
        }
    }
}

async fn run_dispatcher(
    mut rx: mpsc::Receiver<LifecycleEvent>,
    publisher: Arc<dyn EventPublisher>,
    semaphore: Arc<Semaphore>,
) {
    while let Some(event) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let publisher = publisher.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = publisher.publish(&event).await {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    contest_id = event.contest_id,
                    user_id = event.user_id,
                    error = %e,
                    "Failed to publish lifecycle event"
                );
            }
        });
    }
    debug!("Event dispatcher stopped");
}

/// Publisher used when the message queue is disabled.
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            contest_id = event.contest_id,
            user_id = event.user_id,
            "Lifecycle event"
        );
        Ok(())
    }
}
