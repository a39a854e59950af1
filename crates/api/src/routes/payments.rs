//! Order creation and capture endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use domain::{CreateOrder, Provider};
use order_store::OrderStore;
use payments::{Handoff, Link};
use serde::{Deserialize, Serialize};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

/// Body of both create endpoints.
///
/// Fields stay loosely typed so that missing or malformed values surface as
/// validation errors. A body that does not parse at all is rejected with the
/// same error shape.
#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub total: Option<serde_json::Value>,
    #[serde(default)]
    pub products: Option<Vec<serde_json::Value>>,
}

impl CreatePaymentRequest {
    fn into_command(self) -> Result<CreateOrder, ApiError> {
        Ok(CreateOrder::from_request(
            self.total.as_ref(),
            self.products,
        )?)
    }
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripePaymentResponse {
    pub client_secret: String,
    pub order_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalPaymentResponse {
    /// Remote order ID the payer approves.
    pub id: String,
    pub links: Vec<Link>,
    pub order_id: String,
    pub approval_url: String,
}

#[derive(Serialize)]
pub struct CaptureResponse {
    #[serde(rename = "captureID")]
    pub capture_id: String,
}

// -- Handlers --

/// POST /api/create-stripe-payment
#[tracing::instrument(skip(state, payload))]
pub async fn create_stripe_payment<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<StripePaymentResponse>, ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command()?;
    let created = state
        .lifecycle
        .create_order(&principal, Provider::Stripe, cmd)
        .await?;

    let Handoff::ClientSecret(client_secret) = created.handoff else {
        return Err(ApiError::Internal(
            "push provider returned an approval handoff".to_string(),
        ));
    };

    Ok(Json(StripePaymentResponse {
        client_secret,
        order_id: created.order_id.to_string(),
    }))
}

/// POST /api/create-paypal-payment
#[tracing::instrument(skip(state, payload))]
pub async fn create_paypal_payment<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<PayPalPaymentResponse>, ApiError> {
    let Json(req) = payload?;
    let cmd = req.into_command()?;
    let created = state
        .lifecycle
        .create_order(&principal, Provider::PayPal, cmd)
        .await?;

    let Handoff::Approval {
        approval_url,
        links,
    } = created.handoff
    else {
        return Err(ApiError::Internal(
            "pull provider returned a client secret".to_string(),
        ));
    };

    Ok(Json(PayPalPaymentResponse {
        id: created.remote_reference,
        links,
        order_id: created.order_id.to_string(),
        approval_url,
    }))
}

/// POST /api/capture-paypal-payment/{paypalOrderID}
#[tracing::instrument(skip(state))]
pub async fn capture_paypal_payment<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(remote_order_id): Path<String>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let captured = state
        .lifecycle
        .capture_order(&principal, &remote_order_id)
        .await?;

    Ok(Json(CaptureResponse {
        capture_id: captured.capture_id,
    }))
}
