use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    clients::{broker::MessageBroker, store::StatusStore},
    error::{PipelineError, Result},
    models::{
        message::MessageEnvelope,
        request::{NotificationRequest, SubmitReceipt},
        stage::QueueNames,
        status::{StatusCode, StatusRecord, StatusUpdate},
        validation::validate_notification_request,
    },
};

/// Entry point used by the ingress: injects new traces and answers status queries.
#[derive(Clone)]
pub struct NotificationService {
    broker: Arc<dyn MessageBroker>,
    store: Arc<StatusStore>,
    queues: QueueNames,
}

impl NotificationService {
    pub fn new(broker: Arc<dyn MessageBroker>, store: Arc<StatusStore>, queues: QueueNames) -> Self {
        Self {
            broker,
            store,
            queues,
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn broker(&self) -> &Arc<dyn MessageBroker> {
        &self.broker
    }

    /// Records the trace as `RECEIVED` and publishes its envelope to the intake queue.
    pub async fn submit(&self, request: NotificationRequest) -> Result<SubmitReceipt> {
        validate_notification_request(&request)?;

        let trace_id = Uuid::new_v4().to_string();
        let message_id = request
            .message_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let envelope = MessageEnvelope {
            trace_id: trace_id.clone(),
            message_id: message_id.clone(),
            content: request.content,
            channel_type: request.channel_type,
        };
        let payload = envelope.encode()?;

        self.store.set(
            &trace_id,
            StatusUpdate::status(StatusCode::Received)
                .with_message_id(envelope.message_id.clone())
                .with_content(envelope.content.clone())
                .with_channel_type(envelope.channel_type),
        );

        if let Err(e) = self.broker.publish(&self.queues.intake, &payload).await {
            error!(trace_id = %trace_id, error = %e, "Failed to publish notification to intake");
            return Err(e);
        }

        info!(
            trace_id = %trace_id,
            message_id = %message_id,
            channel_type = %envelope.channel_type,
            "Notification received and published"
        );

        Ok(SubmitReceipt {
            trace_id,
            message_id,
        })
    }

    pub fn query_status(&self, trace_id: &str) -> Result<StatusRecord> {
        self.store.get(trace_id).ok_or_else(|| {
            warn!(trace_id, "Notification not found");
            PipelineError::NotFound(trace_id.to_string())
        })
    }
}
