//! Inbound frame and chat content validation.

use consulthub_core::error::AppError;

/// Validates the raw size and emptiness of an inbound text frame.
pub fn validate_frame(raw: &str, max_size: usize) -> Result<(), AppError> {
    if raw.len() > max_size {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates chat message content.
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Message content cannot be empty"));
    }

    if content.chars().count() > max_chars {
        return Err(AppError::validation(format!(
            "Message content exceeds {max_chars} characters"
        )));
    }

    Ok(())
}
