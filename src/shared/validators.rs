use regex::Regex;
use std::sync::OnceLock;

use crate::plant_insights::PriorityLevel;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Validation error for field '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

/// Opaque identifiers: 1-64 chars of `[A-Za-z0-9._-]`, starting alphanumeric
fn identifier_regex() -> Option<&'static Regex> {
    static IDENTIFIER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    IDENTIFIER_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").ok())
        .as_ref()
}

fn validate_identifier(field: &str, value: &str) -> Result<(), ValidationError> {
    match identifier_regex() {
        Some(regex) if regex.is_match(value) => Ok(()),
        _ => Err(ValidationError::new(
            field,
            "Must be 1-64 characters of letters, digits, '.', '_' or '-', starting with a letter or digit",
        )),
    }
}

/// Validate the `priority_filter` query parameter of the alerts socket (1..5)
pub fn validate_priority_filter(raw: &str) -> Result<PriorityLevel, ValidationError> {
    let level: u8 = raw.trim().parse().map_err(|_| {
        ValidationError::new("priority_filter", "Priority filter must be an integer from 1 to 5")
    })?;

    PriorityLevel::new(level)
        .map_err(|e| ValidationError::new("priority_filter", e.to_string()))
}

/// Validate an alert id taken from the request path
pub fn validate_alert_id(alert_id: &str) -> Result<(), ValidationError> {
    validate_identifier("alert_id", alert_id)
}

/// Validate the optional `client_id` a dashboard sends when subscribing
pub fn validate_client_id(client_id: &str) -> Result<(), ValidationError> {
    validate_identifier("client_id", client_id)
}

/// Validate the `limit` query parameter of a recent-readings read (1..=max)
pub fn validate_limit(raw: &str, max: usize) -> Result<usize, ValidationError> {
    let message = || format!("Limit must be an integer from 1 to {}", max);
    let limit: usize = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new("limit", message()))?;

    if (1..=max).contains(&limit) {
        Ok(limit)
    } else {
        Err(ValidationError::new("limit", message()))
    }
}
