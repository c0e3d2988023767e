use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        BasicRejectOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::broker::{Acknowledger, Delivery, DeliveryStream, MessageBroker},
    config::Config,
    error::{PipelineError, Result},
    models::retry::RetryConfig,
    utils::retry_with_backoff,
};

struct Session {
    // Dropping the connection closes the channel with it.
    _connection: Connection,
    channel: Channel,
}

/// RabbitMQ broker sharing one connection and channel per process.
///
/// The session is opened lazily and discarded after any broker error so
/// the next call reconnects.
pub struct RabbitMqClient {
    url: String,
    queues: Vec<String>,
    prefetch_count: u16,
    retry_config: RetryConfig,
    session: Mutex<Option<Session>>,
}

impl RabbitMqClient {
    pub fn new(config: &Config) -> Self {
        Self {
            url: config.rabbitmq_url.clone(),
            queues: config.queue_names().all(),
            prefetch_count: config.prefetch_count,
            retry_config: config.retry_config(),
            session: Mutex::new(None),
        }
    }

    /// Connects eagerly so that an unreachable broker fails startup.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Self::new(config);
        client.channel().await?;
        Ok(client)
    }

    async fn open_session(&self) -> Result<Session> {
        info!("Connecting to RabbitMQ...");

        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| PipelineError::connectivity(format!("Failed to connect to RabbitMQ: {}", e)))?;

        let channel = connection.create_channel().await.map_err(|e| {
            PipelineError::connectivity(format!("RabbitMQ channel creation failed: {}", e))
        })?;

        channel
            .basic_qos(self.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| PipelineError::connectivity(format!("Failed to set up QoS: {}", e)))?;

        for queue in &self.queues {
            channel
                .queue_declare(
                    queue.as_str(),
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    PipelineError::connectivity(format!("Failed to declare queue {}: {}", queue, e))
                })?;

            debug!(queue = %queue, "Queue declared");
        }

        info!(
            prefetch_count = self.prefetch_count,
            queues = self.queues.len(),
            "RabbitMQ connection established"
        );

        Ok(Session {
            _connection: connection,
            channel,
        })
    }

    async fn channel(&self) -> Result<Channel> {
        let mut session = self.session.lock().await;

        if let Some(existing) = session.as_ref() {
            return Ok(existing.channel.clone());
        }

        let opened = retry_with_backoff(&self.retry_config, || self.open_session()).await?;
        let channel = opened.channel.clone();
        *session = Some(opened);

        Ok(channel)
    }

    async fn invalidate(&self) {
        if self.session.lock().await.take().is_some() {
            warn!("RabbitMQ session discarded, reconnecting on next use");
        }
    }
}

#[async_trait]
impl MessageBroker for RabbitMqClient {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let channel = self.channel().await?;

        let published = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await;

        if let Err(e) = published {
            self.invalidate().await;
            return Err(PipelineError::connectivity(format!(
                "Failed to publish message to {}: {}",
                queue, e
            )));
        }

        debug!(queue, bytes = payload.len(), "Message published");

        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream> {
        let channel = self.channel().await?;
        let consumer_tag = format!("{}.{}", queue, Uuid::new_v4());

        let consumer = match channel
            .basic_consume(
                queue,
                consumer_tag.as_str(),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => {
                self.invalidate().await;
                return Err(PipelineError::connectivity(format!(
                    "Failed to create consumer for {}: {}",
                    queue, e
                )));
            }
        };

        info!(queue, consumer_tag = %consumer_tag, "Consumer created for queue");

        let deliveries = consumer.map(move |delivery| match delivery {
            Ok(delivery) => {
                let acker = RabbitMqAcker {
                    channel: channel.clone(),
                    delivery_tag: delivery.delivery_tag,
                };
                Ok(Delivery::new(delivery.data, Box::new(acker)))
            }
            Err(e) => Err(PipelineError::connectivity(format!(
                "Consumer stream failed: {}",
                e
            ))),
        });

        Ok(Box::pin(deliveries))
    }

    async fn health_check(&self) -> Result<()> {
        self.channel().await.map(|_| ())
    }
}

struct RabbitMqAcker {
    channel: Channel,
    delivery_tag: u64,
}

#[async_trait]
impl Acknowledger for RabbitMqAcker {
    async fn ack(&self) -> Result<()> {
        self.channel
            .basic_ack(self.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| PipelineError::connectivity(format!("Failed to acknowledge message: {}", e)))?;

        Ok(())
    }

    async fn reject(&self, requeue: bool) -> Result<()> {
        self.channel
            .basic_reject(self.delivery_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|e| PipelineError::connectivity(format!("Failed to reject message: {}", e)))?;

        Ok(())
    }
}
