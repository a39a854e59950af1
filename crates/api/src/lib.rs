//! HTTP API for payment orders.
//!
//! Binds order creation, capture, listing and provider webhooks to axum
//! routes, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, Lifecycle};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/create-stripe-payment",
            post(routes::payments::create_stripe_payment::<S>),
        )
        .route(
            "/stripe-payment-success-webhook",
            post(routes::webhooks::stripe_payment_webhook::<S>),
        )
        .route(
            "/create-paypal-payment",
            post(routes::payments::create_paypal_payment::<S>),
        )
        .route(
            "/capture-paypal-payment/{paypal_order_id}",
            post(routes::payments::capture_paypal_payment::<S>),
        )
        .route("/orders", get(routes::orders::list::<S>));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
