//! Webhook endpoint URL validation

use crate::error::{AppError, Result};

/// Validate a webhook endpoint before it is registered.
///
/// The URL must be absolute, use http or https, and name a host.
pub fn validate_endpoint(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url.trim())
        .map_err(|e| AppError::Validation(format!("Invalid webhook URL format: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::Validation(format!(
                "Unsupported webhook URL scheme: {}",
                scheme
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(AppError::Validation("Webhook URL must have a host".to_string()));
    }

    Ok(parsed)
}
