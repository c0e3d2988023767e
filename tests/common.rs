use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use futures_util::StreamExt;
use notification_pipeline::{
    clients::{
        broker::{Delivery, MessageBroker},
        failure::{FailureInjector, FixedFailureInjector},
        memory::InMemoryBroker,
        store::StatusStore,
    },
    models::{
        message::{ChannelType, MessageEnvelope},
        retry::RetryConfig,
        stage::{PipelineSettings, QueueNames},
        status::StatusRecord,
    },
    pipeline::{
        coordinator::{PipelineCoordinator, PipelineHandle},
        service::NotificationService,
        stage::Stage,
    },
};
use tokio::time::{sleep, timeout};

pub struct TestPipeline {
    pub broker: Arc<InMemoryBroker>,
    pub store: Arc<StatusStore>,
    pub service: NotificationService,
    pub handle: PipelineHandle,
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 10,
        max_delay_ms: 50,
        backoff_multiplier: 2,
    }
}

/// Builds an in-memory coordinator without starting it.
pub fn coordinator(
    broker: Arc<InMemoryBroker>,
    store: Arc<StatusStore>,
    queues: QueueNames,
    injector: Arc<dyn FailureInjector>,
) -> PipelineCoordinator {
    PipelineCoordinator::new(broker, store, queues, PipelineSettings::immediate(), injector)
        .with_retry_config(fast_retry())
}

/// Starts all four stages; `failing` stages always fail, the rest never do.
pub fn start_pipeline(failing: &[Stage]) -> TestPipeline {
    let overrides = failing
        .iter()
        .map(|stage| (*stage, Arc::new(FixedFailureInjector::always()) as Arc<dyn FailureInjector>))
        .collect();

    start_pipeline_with(Arc::new(FixedFailureInjector::never()), overrides)
}

pub fn start_pipeline_with(
    injector: Arc<dyn FailureInjector>,
    overrides: Vec<(Stage, Arc<dyn FailureInjector>)>,
) -> TestPipeline {
    let broker = Arc::new(InMemoryBroker::new());
    let store = Arc::new(StatusStore::new());
    let queues = QueueNames::default();

    let mut coordinator = coordinator(broker.clone(), store.clone(), queues.clone(), injector);
    for (stage, stage_injector) in overrides {
        coordinator = coordinator.with_stage_injector(stage, stage_injector);
    }

    let handle = coordinator.start();
    let service = NotificationService::new(broker.clone(), store.clone(), queues);

    TestPipeline {
        broker,
        store,
        service,
        handle,
    }
}

pub async fn wait_for_terminal(service: &NotificationService, trace_id: &str) -> Result<StatusRecord> {
    timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(record) = service.query_status(trace_id) {
                if record.is_terminal() {
                    return record;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("Trace {} did not reach a terminal status", trace_id))
}

pub async fn next_delivery(broker: &dyn MessageBroker, queue: &str) -> Result<Delivery> {
    let mut deliveries = broker.consume(queue).await?;

    timeout(Duration::from_secs(2), deliveries.next())
        .await
        .map_err(|_| anyhow!("No message on {}", queue))?
        .ok_or_else(|| anyhow!("Consumer for {} closed", queue))?
        .map_err(Into::into)
}

pub fn test_envelope(trace_id: &str) -> MessageEnvelope {
    MessageEnvelope {
        trace_id: trace_id.to_string(),
        message_id: format!("msg_{}", trace_id),
        content: "Hello".to_string(),
        channel_type: ChannelType::Email,
    }
}
