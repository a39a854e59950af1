//! Payment error types.

use domain::{OrderError, Provider};
use order_store::OrderStoreError;
use thiserror::Error;

/// A remote provider call that did not succeed.
///
/// Carries the provider's raw diagnostic where there is one.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The call exceeded the configured timeout.
    #[error("{provider} {operation} timed out")]
    Timeout {
        provider: Provider,
        operation: &'static str,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} {operation} rejected with status {status}: {body}")]
    Rejected {
        provider: Provider,
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("{provider} {operation} transport error: {message}")]
    Transport {
        provider: Provider,
        operation: &'static str,
        message: String,
    },

    /// The provider answered with a body this client cannot use.
    #[error("{provider} {operation} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: Provider,
        operation: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Classifies a `reqwest` failure.
    pub fn from_reqwest(provider: Provider, operation: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider,
                operation,
            }
        } else if err.is_decode() {
            ProviderError::InvalidResponse {
                provider,
                operation,
                message: err.to_string(),
            }
        } else {
            ProviderError::Transport {
                provider,
                operation,
                message: err.to_string(),
            }
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ProviderError::Timeout { provider, .. }
            | ProviderError::Rejected { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::InvalidResponse { provider, .. } => *provider,
        }
    }
}

/// Errors that can occur while driving an order through its lifecycle.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request was rejected before any provider call.
    #[error("Validation error: {0}")]
    Validation(#[from] OrderError),

    /// A provider call failed; no local state was changed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// No order matched the request.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// Order store error.
    #[error("Order store error: {0}")]
    Store(#[from] OrderStoreError),
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;
