// Change Broadcaster - fans committed mutations out to topic viewers off the request path
//
// publish() only enqueues. Events are routed to a worker by post id, and each worker drains
// its queue in order, so events for one post are delivered in the order they were published.
// Delivery failures are retried a bounded number of times, then logged and dropped.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BroadcastConfig;
use crate::infrastructure::message_bus::DeliveryChannel;
use crate::models::ChangeEvent;

#[derive(Debug, Default)]
struct BroadcastCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub published: u64,
    pub delivered: u64,
    pub retried: u64,
    pub dropped: u64,
}

pub struct ChangeBroadcaster {
    queues: StdRwLock<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<BroadcastCounters>,
}

impl ChangeBroadcaster {
    /// Spawn the worker pool. Must be called from within a tokio runtime.
    pub fn new(channel: Arc<dyn DeliveryChannel>, config: BroadcastConfig) -> Self {
        let worker_count = config.workers.max(1);
        let counters = Arc::new(BroadcastCounters::default());
        let mut queues = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let (tx, rx) = mpsc::unbounded_channel();
            queues.push(tx);
            workers.push(tokio::spawn(run_worker(
                worker_id,
                rx,
                Arc::clone(&channel),
                Arc::clone(&counters),
                config.clone(),
            )));
        }

        info!("Change broadcaster started with {} workers", worker_count);

        Self {
            queues: StdRwLock::new(queues),
            workers: Mutex::new(workers),
            counters,
        }
    }

    /// Enqueue an event. Never blocks and never fails the caller.
    pub fn publish(&self, event: ChangeEvent) {
        let queues = self.queues.read().unwrap_or_else(|e| e.into_inner());
        if queues.is_empty() {
            warn!("Broadcaster is shut down, discarding {} for post {}", event.kind.name(), event.post_id);
            return;
        }

        let worker = event.post_id.value().rem_euclid(queues.len() as i64) as usize;
        let kind = event.kind.name();
        let post_id = event.post_id;

        match queues[worker].send(event) {
            Ok(()) => {
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                debug!("Queued {} for post {} on worker {}", kind, post_id, worker);
            }
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                error!("Broadcast worker {} is gone, dropped {} for post {}", worker, kind, post_id);
            }
        }
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            published: self.counters.published.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            retried: self.counters.retried.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting events and wait until the workers have drained their queues
    pub async fn shutdown(&self) {
        self.queues
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        let handles: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Broadcast worker panicked: {}", e);
            }
        }
        info!("Change broadcaster stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    mut queue: mpsc::UnboundedReceiver<ChangeEvent>,
    channel: Arc<dyn DeliveryChannel>,
    counters: Arc<BroadcastCounters>,
    config: BroadcastConfig,
) {
    let max_attempts = config.max_delivery_attempts.max(1);
    let retry_delay = Duration::from_millis(config.retry_delay_ms);

    while let Some(event) = queue.recv().await {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match channel.deliver(event.topic_id, &event).await {
                Ok(reached) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Worker {} delivered {} for post {} to {} subscribers",
                        worker_id,
                        event.kind.name(),
                        event.post_id,
                        reached
                    );
                    break;
                }
                Err(e) if attempt < max_attempts => {
                    counters.retried.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Delivery of {} for post {} failed (attempt {}/{}): {}",
                        event.kind.name(),
                        event.post_id,
                        attempt,
                        max_attempts,
                        e
                    );
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    error!(
                        "Giving up on {} for post {} after {} attempts: {}",
                        event.kind.name(),
                        event.post_id,
                        attempt,
                        e
                    );
                    break;
                }
            }
        }
    }

    debug!("Broadcast worker {} stopped", worker_id);
}
