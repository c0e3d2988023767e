use serde::{Deserialize, Serialize};

use crate::models::message::ChannelType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(default)]
    pub message_id: Option<String>,
    pub content: String,
    pub channel_type: ChannelType,
}

impl NotificationRequest {
    pub fn new(content: impl Into<String>, channel_type: ChannelType) -> Self {
        Self {
            message_id: None,
            content: content.into(),
            channel_type,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub trace_id: String,
    pub message_id: String,
}
