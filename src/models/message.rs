use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Email,
    Sms,
    Push,
}

impl Display for ChannelType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Email => write!(f, "EMAIL"),
            ChannelType::Sms => write!(f, "SMS"),
            ChannelType::Push => write!(f, "PUSH"),
        }
    }
}

/// Payload carried between stage queues. Every stage forwards it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageEnvelope {
    pub trace_id: String,
    pub message_id: String,
    pub content: String,
    pub channel_type: ChannelType,
}

impl MessageEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(PipelineError::Encode)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(PipelineError::Decode)
    }
}
