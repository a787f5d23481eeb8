use serde::{Deserialize, Serialize};

/// JSON body of every failed HTTP request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// One of [`error_codes`]; clients branch on this, never on `message`
    pub error: String,
    pub message: String,
    /// Correlates the response with the service logs
    pub request_id: String,
}

impl ErrorResponse {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            error: code.into(),
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    /// HTTP status that goes with this payload's code
    pub fn http_status(&self) -> u16 {
        error_codes::http_status(&self.error)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Stable error codes of the plant API
pub mod error_codes {
    // Rejected query or path parameters
    pub const INVALID_PRIORITY_FILTER: &str = "INVALID_PRIORITY_FILTER";
    pub const INVALID_ALERT_ID: &str = "INVALID_ALERT_ID";
    pub const INVALID_CLIENT_ID: &str = "INVALID_CLIENT_ID";
    pub const INVALID_LIMIT: &str = "INVALID_LIMIT";

    pub const ALERT_NOT_FOUND: &str = "ALERT_NOT_FOUND";

    // Server side
    pub const STORE_ERROR: &str = "STORE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

    /// Status code per error code; unknown codes are server errors
    pub fn http_status(code: &str) -> u16 {
        match code {
            INVALID_PRIORITY_FILTER | INVALID_ALERT_ID | INVALID_CLIENT_ID | INVALID_LIMIT => {
                400
            }
            ALERT_NOT_FOUND => 404,
            _ => 500,
        }
    }
}
