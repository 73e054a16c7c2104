//! API utility functions
//!
//! Pure, stateless helpers for request parsing, kept out of `services.rs`
//! so they can be unit tested.

use crate::api::error::ApiError;

/// Query/form flags: present with an empty value, `1`, `true`, `yes` or `on`
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "" | "1" | "true" | "yes" | "on"
        ),
        None => false,
    }
}

/// Trimmed, non-empty value
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `application/x-www-form-urlencoded` with optional parameters
pub fn parse_form_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidParameter(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.essence_str() != mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        return Err(ApiError::InvalidParameter(format!(
            "Content-Type must be application/x-www-form-urlencoded, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Validates that body size does not exceed the maximum allowed size
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(data.len()));
    }
    Ok(())
}
