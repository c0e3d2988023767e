use std::{collections::HashMap, sync::Arc, time::Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{broker::MessageBroker, store::StatusStore},
    models::health::{ComponentHealth, HealthCheckResponse, HealthStatus},
};

pub struct HealthChecker {
    broker: Arc<dyn MessageBroker>,
    store: Arc<StatusStore>,
}

impl HealthChecker {
    pub fn new(broker: Arc<dyn MessageBroker>, store: Arc<StatusStore>) -> Self {
        Self { broker, store }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        checks.insert("message_broker".to_string(), self.check_broker().await);
        checks.insert("status_store".to_string(), self.check_store());

        HealthCheckResponse {
            status: determine_overall_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_broker(&self) -> ComponentHealth {
        let start = Instant::now();

        match self.broker.health_check().await {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Broker health check passed");
                ComponentHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Broker health check failed");
                ComponentHealth::unhealthy(e.to_string())
            }
        }
    }

    fn check_store(&self) -> ComponentHealth {
        ComponentHealth::healthy(0).with_tracked_traces(self.store.len())
    }
}

fn determine_overall_status(checks: &HashMap<String, ComponentHealth>) -> HealthStatus {
    let broker_unhealthy = checks
        .get("message_broker")
        .is_some_and(|health| health.status == HealthStatus::Unhealthy);

    let has_unhealthy = checks
        .values()
        .any(|health| health.status == HealthStatus::Unhealthy);

    if broker_unhealthy {
        HealthStatus::Unhealthy
    } else if has_unhealthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
