use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use cement_plant::shared::error::{error_codes, ErrorResponse};
use cement_plant::shared::store::StoreError;
use cement_plant::shared::validators::ValidationError;

/// Main error type for the plant HTTP surface
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No unacknowledged alert with id {0}")]
    AlertNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}

impl ApiError {
    /// Stable code and client-facing message for this error
    fn code_and_message(&self) -> (&'static str, String) {
        match self {
            ApiError::Validation(err) => {
                let code = match err.field.as_str() {
                    "priority_filter" => error_codes::INVALID_PRIORITY_FILTER,
                    "alert_id" => error_codes::INVALID_ALERT_ID,
                    "limit" => error_codes::INVALID_LIMIT,
                    _ => error_codes::INVALID_CLIENT_ID,
                };
                (code, err.message.clone())
            }
            ApiError::AlertNotFound(id) => (
                error_codes::ALERT_NOT_FOUND,
                format!("No unacknowledged alert with id {}", id),
            ),
            ApiError::Store(_) => (
                error_codes::STORE_ERROR,
                "Internal store error occurred".to_string(),
            ),
            ApiError::Internal(_) => (
                error_codes::INTERNAL_ERROR,
                "Internal server error occurred".to_string(),
            ),
        }
    }

    /// Attach the request id so the payload can be rendered
    pub fn with_request_id(self, request_id: &str) -> ApiFailure {
        let (code, message) = self.code_and_message();
        let body = ErrorResponse::new(code, message, request_id);
        let status = StatusCode::from_u16(body.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, error = %self, "Request failed");
        } else {
            tracing::warn!(request_id = %request_id, error = %self, "Request rejected");
        }
        ApiFailure { status, body }
    }
}

/// A rendered [`ApiError`]: status plus the shared error payload
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_field_to_code() {
        let err = ApiError::from(ValidationError::new("priority_filter", "out of range"));
        let failure = err.with_request_id("req-1");

        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.body.error, error_codes::INVALID_PRIORITY_FILTER);
        assert_eq!(failure.body.message, "out of range");
        assert_eq!(failure.body.request_id, "req-1");

        let err = ApiError::from(ValidationError::new("alert_id", "bad"));
        assert_eq!(err.with_request_id("r").body.error, error_codes::INVALID_ALERT_ID);

        let failure = ApiError::from(ValidationError::new("limit", "too many")).with_request_id("r");
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.body.error, error_codes::INVALID_LIMIT);
    }

    #[test]
    fn test_not_found() {
        let failure = ApiError::AlertNotFound("a-1".to_string()).with_request_id("req-2");

        assert_eq!(failure.status, StatusCode::NOT_FOUND);
        assert_eq!(failure.body.error, error_codes::ALERT_NOT_FOUND);
        assert!(failure.body.message.contains("a-1"));
    }

    #[test]
    fn test_server_errors_hide_details() {
        let failure = ApiError::from(StoreError::Backend("table gone".to_string())).with_request_id("req-3");
        assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.body.error, error_codes::STORE_ERROR);
        assert!(!failure.body.message.contains("table gone"));

        let failure = ApiError::from(anyhow::anyhow!("boom")).with_request_id("req-4");
        assert_eq!(failure.body.error, error_codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::AlertNotFound("x".to_string())
            .with_request_id("req-5")
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
