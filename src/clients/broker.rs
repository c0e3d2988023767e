use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;

pub type DeliveryStream = BoxStream<'static, Result<Delivery>>;

/// Point-to-point queues addressed by name.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Deliveries from `queue` in broker order. Ends or yields an error when
    /// the underlying connection is lost; callers consume again to reconnect.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream>;

    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<()>;

    async fn reject(&self, requeue: bool) -> Result<()>;
}

/// One consumed message plus the handle that settles it with the broker.
pub struct Delivery {
    pub data: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(data: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self { data, acker }
    }

    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }

    pub async fn reject(self, requeue: bool) -> Result<()> {
        self.acker.reject(requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}
