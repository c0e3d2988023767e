use std::fmt::{Display, Formatter, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::ChannelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Received,
    IntermediateProcessed,
    RetrySuccess,
    SendSuccess,
    FinalRetryFailure,
    SendFailure,
    DlqProcessed,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Received => "RECEIVED",
            StatusCode::IntermediateProcessed => "INTERMEDIATE_PROCESSED",
            StatusCode::RetrySuccess => "RETRY_SUCCESS",
            StatusCode::SendSuccess => "SEND_SUCCESS",
            StatusCode::FinalRetryFailure => "FINAL_RETRY_FAILURE",
            StatusCode::SendFailure => "SEND_FAILURE",
            StatusCode::DlqProcessed => "DLQ_PROCESSED",
        }
    }

    /// `SEND_SUCCESS` and `DLQ_PROCESSED` end a trace.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusCode::SendSuccess | StatusCode::DlqProcessed)
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: StatusCode,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub trace_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<ChannelType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCode>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl StatusRecord {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            message_id: None,
            content: None,
            channel_type: None,
            status: None,
            updated_at: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Overwrites the fields present in `update` and keeps the rest.
    pub fn merge(&mut self, update: StatusUpdate) {
        if let Some(message_id) = update.message_id {
            self.message_id = Some(message_id);
        }
        if let Some(content) = update.content {
            self.content = Some(content);
        }
        if let Some(channel_type) = update.channel_type {
            self.channel_type = Some(channel_type);
        }
        if let Some(status) = update.status {
            self.set_status(status);
        }
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: StatusCode) {
        let now = Utc::now();
        if self.status != Some(status) {
            self.history.push(StatusChange { status, at: now });
        }
        self.status = Some(status);
        self.updated_at = now;
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|status| status.is_terminal())
    }

    /// Statuses in the order they were reached.
    pub fn path(&self) -> Vec<StatusCode> {
        self.history.iter().map(|change| change.status).collect()
    }
}

/// Partial write for [`StatusRecord`]; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub message_id: Option<String>,
    pub content: Option<String>,
    pub channel_type: Option<ChannelType>,
    pub status: Option<StatusCode>,
}

impl StatusUpdate {
    pub fn status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_channel_type(mut self, channel_type: ChannelType) -> Self {
        self.channel_type = Some(channel_type);
        self
    }
}
