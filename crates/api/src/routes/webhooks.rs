//! Provider webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use order_store::OrderStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /api/stripe-payment-success-webhook
///
/// Takes the body as raw bytes: the signature covers them exactly.
pub async fn stripe_payment_webhook<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.webhooks.ingest(&body, signature).await?;
    tracing::debug!(?outcome, "webhook acknowledged");

    Ok(Json(WebhookAck { received: true }))
}
