use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    clients::{
        broker::{Delivery, MessageBroker},
        failure::FailureInjector,
        store::StatusStore,
    },
    error::{PipelineError, Result},
    models::{
        message::MessageEnvelope,
        stage::{DelayRange, QueueNames, StageSettings},
    },
    pipeline::stage::{DelayPoint, Stage, Transition},
    utils::simulate_processing,
};

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The stage's transition was applied and any successor publish succeeded.
    Processed(Transition),
    /// The trace was already terminal; acknowledged without forwarding.
    Skipped,
    /// The body did not decode; rejected without requeue.
    Dropped,
}

/// One node of the pipeline: consumes its queue, updates the store and
/// forwards the envelope to at most one successor queue.
pub struct StageProcessor {
    stage: Stage,
    settings: Option<StageSettings>,
    broker: Arc<dyn MessageBroker>,
    store: Arc<StatusStore>,
    queues: QueueNames,
    injector: Arc<dyn FailureInjector>,
}

impl StageProcessor {
    pub fn new(
        stage: Stage,
        settings: Option<StageSettings>,
        broker: Arc<dyn MessageBroker>,
        store: Arc<StatusStore>,
        queues: QueueNames,
        injector: Arc<dyn FailureInjector>,
    ) -> Self {
        Self {
            stage,
            settings,
            broker,
            store,
            queues,
            injector,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn input_queue(&self) -> &str {
        self.stage.queue(&self.queues)
    }

    /// Settles `delivery` only once the status update and any publish succeeded.
    /// Failures are returned to the caller; retryable ones requeue the delivery.
    pub async fn handle_delivery(&self, delivery: Delivery) -> Result<Outcome> {
        debug!(
            stage = %self.stage,
            payload = %String::from_utf8_lossy(&delivery.data),
            "Raw payload"
        );

        let envelope = match MessageEnvelope::decode(&delivery.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(stage = %self.stage, error = %e, "Dropping undecodable message");
                return self.drop_poison(delivery).await;
            }
        };

        match self.process(&envelope).await {
            Ok(outcome) => {
                delivery.ack().await?;
                Ok(outcome)
            }
            Err(e) => {
                let requeue = e.is_retryable();
                error!(
                    stage = %self.stage,
                    trace_id = %envelope.trace_id,
                    error = %e,
                    requeue,
                    "Message processing failed"
                );
                if let Err(reject_err) = delivery.reject(requeue).await {
                    warn!(error = %reject_err, "Failed to requeue message");
                }
                Err(e)
            }
        }
    }

    /// Runs this stage's policy for one envelope: optional delay, failure
    /// check, status update, then publish to the successor queue.
    ///
    /// A trace whose record already holds a status this stage writes before
    /// forwarding is a redelivery: the recorded branch is re-published without
    /// a new failure check or status write.
    pub async fn process(&self, envelope: &MessageEnvelope) -> Result<Outcome> {
        let trace_id = envelope.trace_id.as_str();

        info!(
            stage = %self.stage,
            trace_id,
            message_id = %envelope.message_id,
            channel_type = %envelope.channel_type,
            "Message received"
        );

        let current = self.store.get(trace_id).and_then(|record| record.status);
        let recorded = current.and_then(|status| self.stage.recorded_branch(status));

        if recorded.is_none()
            && !self.stage.overwrites_terminal()
            && current.is_some_and(|status| status.is_terminal())
        {
            warn!(stage = %self.stage, trace_id, current = ?current, "Trace already terminal, skipping");
            return Ok(Outcome::Skipped);
        }

        let failed = match recorded {
            Some(failed) => {
                info!(stage = %self.stage, trace_id, failed, "Redelivery, replaying recorded branch");
                failed
            }
            None => self.decide(trace_id).await,
        };

        let transition = self.stage.transition(failed);

        if let Some(status) = transition.status.filter(|_| recorded.is_none()) {
            let applied = if self.stage.overwrites_terminal() {
                Ok(self.store.update_status(trace_id, status))
            } else {
                self.store.advance(trace_id, status)
            };

            if let Err(PipelineError::TerminalStatus { status: current, .. }) = &applied {
                warn!(
                    stage = %self.stage,
                    trace_id,
                    current = %current,
                    "Trace already terminal, skipping"
                );
                return Ok(Outcome::Skipped);
            }
            applied?;
        }

        if let Some(next) = transition.next {
            let queue = next.queue(&self.queues);
            self.broker.publish(queue, &envelope.encode()?).await?;
            info!(stage = %self.stage, trace_id, queue, next = %next, "Message forwarded");
        } else {
            info!(stage = %self.stage, trace_id, status = ?transition.status, "Trace completed");
        }

        Ok(Outcome::Processed(transition))
    }

    /// Sleeps at the stage's delay point and asks the injector for the branch.
    async fn decide(&self, trace_id: &str) -> bool {
        let delay = self.settings.map(|s| s.delay).unwrap_or_else(DelayRange::none);

        if self.stage.delay_point() == DelayPoint::BeforeCheck {
            simulate_processing(delay).await;
        }

        let failed = self
            .settings
            .is_some_and(|s| self.injector.should_fail(s.failure_probability));

        if failed {
            warn!(stage = %self.stage, trace_id, "Simulated failure");
        } else if self.stage.delay_point() == DelayPoint::OnSuccess {
            simulate_processing(delay).await;
        }

        failed
    }

    async fn drop_poison(&self, delivery: Delivery) -> Result<Outcome> {
        if let Some(poison) = &self.queues.poison {
            if let Err(e) = self.broker.publish(poison, &delivery.data).await {
                if let Err(reject_err) = delivery.reject(true).await {
                    warn!(error = %reject_err, "Failed to requeue message");
                }
                return Err(e);
            }
            info!(stage = %self.stage, queue = %poison, "Undecodable message moved to poison queue");
        }

        delivery.reject(false).await?;
        Ok(Outcome::Dropped)
    }
}
