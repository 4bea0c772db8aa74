//! Input checks applied before anything reaches storage.

use agora_persist::MAX_CONTENT_CHARS;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

const MAX_TITLE_CHARS: usize = 200;

pub fn parse_id(field: &str, raw: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::validation(format!("{} is not a valid identifier", field)))
}

/// Trimmed title, 1..=200 characters.
pub fn validate_title(title: &str) -> ServiceResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title is required"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ServiceError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

pub fn validate_event_id(event_id: &str) -> ServiceResult<String> {
    let event_id = event_id.trim();
    if event_id.is_empty() {
        return Err(ServiceError::validation("event_id is required"));
    }
    Ok(event_id.to_string())
}

/// Trimmed message content, 1..=1000 characters.
pub fn validate_content(content: &str) -> ServiceResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::validation("content is required"));
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(ServiceError::validation(format!(
            "content must be at most {} characters",
            MAX_CONTENT_CHARS
        ))
        .with_details(serde_json::json!({ "length": chars })));
    }
    Ok(content.to_string())
}

/// Blank descriptions are stored as absent.
pub fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
