//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{AuthError, OrderError};
use payments::{PaymentError, SignatureError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Credential absent, malformed, expired or wrongly signed.
    Unauthenticated(String),
    /// Valid credential without a usable role.
    Forbidden(String),
    /// Missing or invalid request fields.
    Validation(String),
    /// No order matched.
    NotFound(String),
    /// A payment provider call failed.
    Provider(String),
    /// Webhook integrity failure.
    SignatureInvalid(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Validation(msg) | ApiError::SignatureInvalid(msg) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Provider(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(msg) => ApiError::Unauthenticated(msg),
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(err) => err.into(),
            PaymentError::Provider(err) => ApiError::Provider(err.to_string()),
            PaymentError::NotFound(msg) => ApiError::NotFound(msg),
            PaymentError::Store(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        ApiError::SignatureInvalid(format!("webhook signature verification failed: {err}"))
    }
}
