use std::sync::Arc;

use async_trait::async_trait;
use common::event::{Event, EventPublisher, LifecycleEvent};
use tracing::debug;

use crate::error::MqError;
use crate::models::MqQueue;

/// Publishes lifecycle events to the broker as topic-tagged generic events.
pub struct MqEventPublisher {
    mq: Arc<MqQueue>,
    queue_name: String,
}

impl MqEventPublisher {
    pub fn new(mq: Arc<MqQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for MqEventPublisher {
    async fn publish(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        let generic = event.to_generic_event();
        self.mq
            .publish(&self.queue_name, None, &generic, None)
            .await
            .map_err(|e| MqError::Publish {
                queue: self.queue_name.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            event_id = %event.event_id,
            topic = %generic.topic,
            queue = %self.queue_name,
            "Lifecycle event published"
        );
        Ok(())
    }
}
