// Message Bus - pushes change events to every session subscribed to a topic

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::core::TopicId;
use crate::error::AppResult;
use crate::models::ChangeEvent;

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Push an event to all current subscribers of the topic.
    /// Returns how many subscribers it reached; zero subscribers is not an error.
    async fn deliver(&self, topic_id: TopicId, event: &ChangeEvent) -> AppResult<usize>;
}

/// In-process bus with one broadcast channel per topic that has subscribers
pub struct TopicMessageBus {
    channels: RwLock<HashMap<TopicId, broadcast::Sender<Arc<ChangeEvent>>>>,
    capacity: usize,
}

impl TopicMessageBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self, topic_id: TopicId) -> broadcast::Receiver<Arc<ChangeEvent>> {
        let mut channels = self.channels.write().await;
        // Topics whose subscribers all left without ever receiving an event
        channels.retain(|_, sender| sender.receiver_count() > 0);
        channels
            .entry(topic_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub async fn subscriber_count(&self, topic_id: TopicId) -> usize {
        self.channels
            .read()
            .await
            .get(&topic_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for TopicMessageBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl DeliveryChannel for TopicMessageBus {
    async fn deliver(&self, topic_id: TopicId, event: &ChangeEvent) -> AppResult<usize> {
        let sender = self.channels.read().await.get(&topic_id).cloned();
        let Some(sender) = sender else {
            debug!("No subscribers for topic {}, dropping {}", topic_id, event.kind.name());
            return Ok(0);
        };

        match sender.send(Arc::new(event.clone())) {
            Ok(reached) => Ok(reached),
            Err(_) => {
                // Every subscriber went away; forget the channel unless someone re-subscribed
                let mut channels = self.channels.write().await;
                if channels
                    .get(&topic_id)
                    .map(|s| s.receiver_count() == 0)
                    .unwrap_or(false)
                {
                    channels.remove(&topic_id);
                }
                Ok(0)
            }
        }
    }
}
