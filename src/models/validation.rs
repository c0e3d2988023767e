use crate::{
    error::{PipelineError, Result},
    models::request::NotificationRequest,
};

pub const MAX_CONTENT_LENGTH: usize = 4096;
pub const MAX_MESSAGE_ID_LENGTH: usize = 128;

pub fn validate_notification_request(request: &NotificationRequest) -> Result<()> {
    if request.content.trim().is_empty() {
        return Err(PipelineError::invalid_request("Content cannot be empty"));
    }

    if request.content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(PipelineError::invalid_request(format!(
            "Content too long (maximum {} characters)",
            MAX_CONTENT_LENGTH
        )));
    }

    if let Some(message_id) = &request.message_id {
        if message_id.trim().is_empty() {
            return Err(PipelineError::invalid_request("Message id cannot be blank"));
        }

        if message_id.chars().count() > MAX_MESSAGE_ID_LENGTH {
            return Err(PipelineError::invalid_request(format!(
                "Message id too long (maximum {} characters)",
                MAX_MESSAGE_ID_LENGTH
            )));
        }
    }

    Ok(())
}
