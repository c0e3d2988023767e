use std::sync::Arc;

use anyhow::{Error, Result};
use notification_pipeline::{
    api::{AppState, run_api_server},
    clients::{
        broker::MessageBroker,
        failure::{FailureInjector, RandomFailureInjector},
        memory::InMemoryBroker,
        rbmq::RabbitMqClient,
        store::StatusStore,
    },
    config::{BrokerKind, Config},
    pipeline::{coordinator::PipelineCoordinator, service::NotificationService},
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;
    init_tracing(&config);

    let broker: Arc<dyn MessageBroker> = match config.broker {
        BrokerKind::Rabbitmq => Arc::new(RabbitMqClient::connect(&config).await?),
        BrokerKind::Memory => Arc::new(InMemoryBroker::new()),
    };

    let injector: Arc<dyn FailureInjector> = match config.failure_seed {
        Some(seed) => Arc::new(RandomFailureInjector::seeded(seed)),
        None => Arc::new(RandomFailureInjector::new()),
    };

    let store = Arc::new(StatusStore::new());
    let queues = config.queue_names();

    let pipeline = PipelineCoordinator::new(
        Arc::clone(&broker),
        Arc::clone(&store),
        queues.clone(),
        config.pipeline_settings(),
        injector,
    )
    .with_retry_config(config.retry_config())
    .start();

    let service = NotificationService::new(broker, store, queues);
    let state = Arc::new(AppState::new(service));
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.server_port)).await?;

    tokio::select! {
        result = run_api_server(listener, state) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    pipeline.shutdown().await;

    Ok(())
}
