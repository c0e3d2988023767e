//! Stage state machine.
//!
//! | stage      | failure                      | success                          |
//! |------------|------------------------------|----------------------------------|
//! | intake     | → retry, status unchanged    | `INTERMEDIATE_PROCESSED` → validation |
//! | retry      | `FINAL_RETRY_FAILURE` → dlq  | `RETRY_SUCCESS` → validation     |
//! | validation | `SEND_FAILURE` → dlq         | `SEND_SUCCESS`, terminal         |
//! | dead letter| no failure check             | `DLQ_PROCESSED`, terminal        |

use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

use crate::models::{
    stage::{PipelineSettings, QueueNames, StageSettings},
    status::StatusCode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Retry,
    Validation,
    DeadLetter,
}

/// Where a stage sleeps relative to its failure check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPoint {
    BeforeCheck,
    OnSuccess,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: Option<StatusCode>,
    pub next: Option<Stage>,
}

impl Transition {
    const fn new(status: Option<StatusCode>, next: Option<Stage>) -> Self {
        Self { status, next }
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Intake,
        Stage::Retry,
        Stage::Validation,
        Stage::DeadLetter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Retry => "retry",
            Stage::Validation => "validation",
            Stage::DeadLetter => "dead_letter",
        }
    }

    pub fn queue<'a>(&self, queues: &'a QueueNames) -> &'a str {
        match self {
            Stage::Intake => &queues.intake,
            Stage::Retry => &queues.retry,
            Stage::Validation => &queues.validation,
            Stage::DeadLetter => &queues.dead_letter,
        }
    }

    /// `None` for the dead-letter stage, which never fails.
    pub fn settings(&self, settings: &PipelineSettings) -> Option<StageSettings> {
        match self {
            Stage::Intake => Some(settings.intake),
            Stage::Retry => Some(settings.retry),
            Stage::Validation => Some(settings.validation),
            Stage::DeadLetter => None,
        }
    }

    pub fn delay_point(&self) -> DelayPoint {
        match self {
            Stage::Intake => DelayPoint::OnSuccess,
            Stage::Retry | Stage::Validation => DelayPoint::BeforeCheck,
            Stage::DeadLetter => DelayPoint::Never,
        }
    }

    /// Only the dead-letter stage may replace a terminal status.
    pub fn overwrites_terminal(&self) -> bool {
        matches!(self, Stage::DeadLetter)
    }

    pub fn transition(&self, failed: bool) -> Transition {
        use StatusCode::*;

        match (self, failed) {
            (Stage::Intake, true) => Transition::new(None, Some(Stage::Retry)),
            (Stage::Intake, false) => {
                Transition::new(Some(IntermediateProcessed), Some(Stage::Validation))
            }
            (Stage::Retry, true) => {
                Transition::new(Some(FinalRetryFailure), Some(Stage::DeadLetter))
            }
            (Stage::Retry, false) => Transition::new(Some(RetrySuccess), Some(Stage::Validation)),
            (Stage::Validation, true) => {
                Transition::new(Some(SendFailure), Some(Stage::DeadLetter))
            }
            (Stage::Validation, false) => Transition::new(Some(SendSuccess), None),
            (Stage::DeadLetter, _) => Transition::new(Some(DlqProcessed), None),
        }
    }

    /// The branch this stage already took if `status` is one it writes before
    /// forwarding. A redelivery carrying such a status must follow the same branch.
    pub fn recorded_branch(&self, status: StatusCode) -> Option<bool> {
        [true, false].into_iter().find(|failed| {
            let transition = self.transition(*failed);
            transition.status == Some(status) && transition.next.is_some()
        })
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}
