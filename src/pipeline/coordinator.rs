use std::{collections::HashMap, sync::Arc};

use futures_util::StreamExt;
use tokio::{task::JoinSet, time::sleep};
use tracing::{error, info, warn};

use crate::{
    clients::{broker::MessageBroker, failure::FailureInjector, store::StatusStore},
    models::{
        retry::RetryConfig,
        stage::{PipelineSettings, QueueNames},
    },
    pipeline::{processor::StageProcessor, stage::Stage},
    utils::jittered,
};

/// Composition root for the four stage consumers.
pub struct PipelineCoordinator {
    broker: Arc<dyn MessageBroker>,
    store: Arc<StatusStore>,
    queues: QueueNames,
    settings: PipelineSettings,
    retry_config: RetryConfig,
    injector: Arc<dyn FailureInjector>,
    stage_injectors: HashMap<Stage, Arc<dyn FailureInjector>>,
}

impl PipelineCoordinator {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        store: Arc<StatusStore>,
        queues: QueueNames,
        settings: PipelineSettings,
        injector: Arc<dyn FailureInjector>,
    ) -> Self {
        Self {
            broker,
            store,
            queues,
            settings,
            retry_config: RetryConfig::default(),
            injector,
            stage_injectors: HashMap::new(),
        }
    }

    /// Replaces the default injector for one stage.
    pub fn with_stage_injector(mut self, stage: Stage, injector: Arc<dyn FailureInjector>) -> Self {
        self.stage_injectors.insert(stage, injector);
        self
    }

    /// Backoff between reconnect attempts of a consumer loop.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn processor(&self, stage: Stage) -> StageProcessor {
        let injector = self
            .stage_injectors
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.injector));

        StageProcessor::new(
            stage,
            stage.settings(&self.settings),
            Arc::clone(&self.broker),
            Arc::clone(&self.store),
            self.queues.clone(),
            injector,
        )
    }

    /// Spawns one long-running consumer task per stage.
    pub fn start(&self) -> PipelineHandle {
        let mut tasks = JoinSet::new();

        for stage in Stage::ALL {
            let processor = self.processor(stage);
            let broker = Arc::clone(&self.broker);
            let retry_config = self.retry_config.clone();

            tasks.spawn(run_consumer(processor, broker, retry_config));
        }

        info!(stages = Stage::ALL.len(), "Pipeline started");

        PipelineHandle { tasks }
    }
}

/// Consumes the processor's queue forever. Connectivity failures tear down
/// the current consumer and reconnect with backoff; nothing here returns.
pub async fn run_consumer(
    processor: StageProcessor,
    broker: Arc<dyn MessageBroker>,
    retry_config: RetryConfig,
) {
    let stage = processor.stage();
    let queue = processor.input_queue().to_string();
    let mut failures = 0;

    loop {
        match broker.consume(&queue).await {
            Ok(mut deliveries) => {
                info!(stage = %stage, queue = %queue, "Consumer started, waiting for messages");
                failures = 0;

                while let Some(next) = deliveries.next().await {
                    let delivery = match next {
                        Ok(delivery) => delivery,
                        Err(e) => {
                            error!(stage = %stage, error = %e, "Consumer stream failed");
                            break;
                        }
                    };

                    match processor.handle_delivery(delivery).await {
                        Ok(_) => failures = 0,
                        Err(e) if e.is_retryable() => {
                            error!(stage = %stage, error = %e, "Connectivity lost while processing");
                            break;
                        }
                        Err(e) => {
                            error!(stage = %stage, error = %e, "Message processing failed");
                        }
                    }
                }

                warn!(stage = %stage, queue = %queue, "Consumer stopped, reconnecting");
            }
            Err(e) => {
                error!(stage = %stage, queue = %queue, error = %e, "Failed to start consumer");
            }
        }

        failures += 1;
        sleep(jittered(retry_config.delay_for_attempt(failures))).await;
    }
}

/// Running consumer tasks. Dropping the handle stops them as well.
pub struct PipelineHandle {
    tasks: JoinSet<()>,
}

impl PipelineHandle {
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    pub async fn shutdown(mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        info!("Pipeline stopped");
    }
}
