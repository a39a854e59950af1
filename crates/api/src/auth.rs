//! Bearer credential extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::Principal;
use order_store::OrderStore;

use crate::error::ApiError;
use crate::state::AppState;

/// The principal resolved from the request's `Authorization` header.
///
/// Rejects with 401 or 403 before the handler body runs.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for Authenticated
where
    S: OrderStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let principal = state.auth.resolve(header)?;
        Ok(Authenticated(principal))
    }
}
