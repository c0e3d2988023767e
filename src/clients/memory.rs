use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::{
    clients::broker::{Acknowledger, Delivery, DeliveryStream, MessageBroker},
    error::{PipelineError, Result},
};

struct MemoryQueue {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryQueue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

/// Process-local broker backed by tokio channels.
///
/// Competing consumers on one queue share a single receiver. Rejected
/// deliveries with `requeue` go to the back of their queue.
pub struct InMemoryBroker {
    queues: DashMap<String, Arc<MemoryQueue>>,
    available: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        info!("In-memory broker initialized");

        Self {
            queues: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates a broker outage: publish, consume and health checks fail while unavailable.
    pub fn set_available(&self, available: bool) {
        info!(available, "In-memory broker availability changed");
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PipelineError::connectivity("in-memory broker is unavailable"))
        }
    }

    fn queue(&self, name: &str) -> Arc<MemoryQueue> {
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryQueue::new()))
            .value()
            .clone()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        self.ensure_available()?;

        self.queue(queue)
            .sender
            .send(payload.to_vec())
            .map_err(|_| PipelineError::connectivity(format!("queue {} is closed", queue)))?;

        debug!(queue, bytes = payload.len(), "Message published");

        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream> {
        self.ensure_available()?;

        let memory_queue = self.queue(queue);
        let deliveries = stream::unfold(memory_queue, |memory_queue| async move {
            let data = memory_queue.receiver.lock().await.recv().await?;
            let acker = MemoryAcker {
                sender: memory_queue.sender.clone(),
                data: data.clone(),
            };
            Some((Ok(Delivery::new(data, Box::new(acker))), memory_queue))
        });

        debug!(queue, "Consumer created for queue");

        Ok(Box::pin(deliveries))
    }

    async fn health_check(&self) -> Result<()> {
        self.ensure_available()
    }
}

struct MemoryAcker {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    data: Vec<u8>,
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self) -> Result<()> {
        Ok(())
    }

    async fn reject(&self, requeue: bool) -> Result<()> {
        if requeue {
            self.sender
                .send(self.data.clone())
                .map_err(|_| PipelineError::connectivity("Failed to requeue message"))?;
        }
        Ok(())
    }
}
