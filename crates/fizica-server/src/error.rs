use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use fizica_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
///
/// `action` names the flow that failed ("rezolvare", "analiză") and is
/// used to build the user-facing message.
pub struct ApiError {
    pub error: AppError,
    pub action: Option<&'static str>,
}

impl ApiError {
    /// Adapter for `map_err` that tags an error with the failing flow.
    pub fn during(action: &'static str) -> impl FnOnce(AppError) -> ApiError {
        move |error| ApiError {
            error,
            action: Some(action),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            action: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.error {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::RateLimitExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AppError::LlmError { .. } | AppError::NetworkError(_) | AppError::HttpError(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_error")
            }
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Generic(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = match (&self.error, self.action) {
            // Validation messages are already addressed to the user.
            (AppError::ValidationError(msg), _) => msg.clone(),
            (err, Some(action)) => format!("A apărut o eroare la {action}: {err}"),
            (err, None) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.error, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}
