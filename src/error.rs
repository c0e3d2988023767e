use thiserror::Error;

use crate::models::status::StatusCode;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed message body. Local to one delivery: logged and dropped.
    #[error("Malformed message envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode message envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// Broker or store unreachable. The inbound delivery is left for redelivery.
    #[error("Broker unavailable: {0}")]
    Connectivity(String),

    #[error("No such trace: {0}")]
    NotFound(String),

    #[error("Trace {trace_id} already reached terminal status {status}")]
    TerminalStatus { trace_id: String, status: StatusCode },

    #[error("Invalid notification request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}
