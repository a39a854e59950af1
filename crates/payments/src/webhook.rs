//! Signed provider event ingestion.
//!
//! The signature is checked over the exact request bytes before anything
//! is parsed. Once it verifies, every outcome is acknowledged so that the
//! provider only redelivers on integrity failures.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{Principal, Role};
use hmac::{Hmac, Mac};
use order_store::UpdateOutcome;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::lifecycle::ConfirmationSource;

type HmacSha256 = Hmac<Sha256>;

/// Event type that confirms a push payment.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Why a webhook delivery was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,

    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    #[error("signature timestamp {timestamp} outside tolerance")]
    TimestampOutsideTolerance { timestamp: i64 },

    #[error("no signature matches the payload")]
    Mismatch,
}

/// Verifies `t=<unix>,v1=<hex>` signature headers.
///
/// The MAC is HMAC-SHA256 keyed with the endpoint secret over
/// `"<t>." + payload`.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>, tolerance: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            tolerance,
        }
    }

    fn mac(&self, payload: &[u8], timestamp: i64) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| SignatureError::MalformedHeader(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    /// Produces a header value for `payload` signed at `timestamp`.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let tag = self.mac(payload, timestamp)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(tag)))
    }

    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verifies against an explicit clock reading.
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        SignatureError::MalformedHeader(format!("bad timestamp {value:?}"))
                    })?);
                }
                Some(("v1", value)) => candidates.push(value),
                // Other schemes (v0 test signatures) are ignored.
                Some(_) => {}
                None => {
                    return Err(SignatureError::MalformedHeader(format!(
                        "unexpected element {part:?}"
                    )));
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".to_string()))?;
        if candidates.is_empty() {
            return Err(SignatureError::MalformedHeader(
                "missing v1 signature".to_string(),
            ));
        }
        if now.abs_diff(timestamp) > self.tolerance.as_secs() {
            return Err(SignatureError::TimestampOutsideTolerance { timestamp });
        }

        let mac = self.mac(payload, timestamp)?;
        let matched = candidates.into_iter().any(|candidate| {
            hex::decode(candidate).is_ok_and(|tag| mac.clone().verify_slice(&tag).is_ok())
        });
        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Applies a verified payment confirmation to the local order.
#[async_trait]
pub trait PaymentConfirmer: Send + Sync {
    async fn confirm_payment(
        &self,
        owner: &Principal,
        order_id: OrderId,
        source: ConfirmationSource,
    ) -> crate::error::Result<UpdateOutcome>;
}

#[async_trait]
impl<T: PaymentConfirmer + ?Sized> PaymentConfirmer for std::sync::Arc<T> {
    async fn confirm_payment(
        &self,
        owner: &Principal,
        order_id: OrderId,
        source: ConfirmationSource,
    ) -> crate::error::Result<UpdateOutcome> {
        (**self).confirm_payment(owner, order_id, source).await
    }
}

/// What happened to a verified delivery. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The confirmation reached the store; `update` says whether it matched.
    Applied {
        owner: Principal,
        order_id: OrderId,
        update: UpdateOutcome,
    },
    /// The store failed while applying the confirmation.
    StoreFailed { order_id: OrderId },
    /// A success event without usable correlation metadata.
    MissingCorrelation { event_type: String },
    /// An event type this service does not act on.
    Ignored { event_type: String },
    /// The verified body is not an event this service can parse.
    Unreadable,
}

impl WebhookOutcome {
    fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied {
                update: UpdateOutcome::NotMatched,
                ..
            } => "not_matched",
            WebhookOutcome::Applied { .. } => "applied",
            WebhookOutcome::StoreFailed { .. } => "store_failed",
            WebhookOutcome::MissingCorrelation { .. } => "missing_correlation",
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::Unreadable => "unreadable",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<EventData>,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
struct EventObject {
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Reads the owner and order back out of the payment's metadata.
///
/// Intents created before `subjectId` existed carry `userId` or
/// `vendorId` instead; a missing role means a user.
fn correlation(metadata: &HashMap<String, String>) -> Option<(Principal, OrderId)> {
    let role = match metadata.get("role") {
        Some(role) => Role::parse(role)?,
        None => Role::User,
    };
    let legacy_key = match role {
        Role::User => "userId",
        Role::Vendor => "vendorId",
    };
    let subject = metadata
        .get("subjectId")
        .or_else(|| metadata.get(legacy_key))
        .filter(|s| !s.is_empty())?;
    let order_id = OrderId::parse(metadata.get("orderId")?).ok()?;

    Some((Principal::new(role, subject.as_str()), order_id))
}

/// Verifies provider deliveries and forwards payment confirmations.
pub struct WebhookIngestor<C: PaymentConfirmer> {
    verifier: SignatureVerifier,
    confirmer: C,
}

impl<C: PaymentConfirmer> WebhookIngestor<C> {
    pub fn new(verifier: SignatureVerifier, confirmer: C) -> Self {
        Self {
            verifier,
            confirmer,
        }
    }

    /// Ingests one delivery.
    ///
    /// Returns an error only when the signature does not verify; nothing is
    /// parsed or applied in that case.
    #[tracing::instrument(skip_all, fields(payload_len = payload.len()))]
    pub async fn ingest(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, SignatureError> {
        if let Err(err) = self.verifier.verify(payload, signature) {
            tracing::warn!(error = %err, "webhook signature rejected");
            metrics::counter!("webhook_events_total", "outcome" => "signature_invalid")
                .increment(1);
            return Err(err);
        }

        let outcome = self.dispatch(payload).await;
        metrics::counter!("webhook_events_total", "outcome" => outcome.label()).increment(1);
        Ok(outcome)
    }

    async fn dispatch(&self, payload: &[u8]) -> WebhookOutcome {
        let event: Event = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "verified webhook body is not a readable event");
                return WebhookOutcome::Unreadable;
            }
        };

        if event.event_type != PAYMENT_SUCCEEDED {
            tracing::debug!(event_type = %event.event_type, "webhook event ignored");
            return WebhookOutcome::Ignored {
                event_type: event.event_type,
            };
        }

        let metadata = event.data.map(|d| d.object.metadata).unwrap_or_default();
        let Some((owner, order_id)) = correlation(&metadata) else {
            tracing::warn!(event_type = %event.event_type, "payment event without correlation metadata");
            return WebhookOutcome::MissingCorrelation {
                event_type: event.event_type,
            };
        };

        match self
            .confirmer
            .confirm_payment(&owner, order_id, ConfirmationSource::Webhook)
            .await
        {
            Ok(update) => WebhookOutcome::Applied {
                owner,
                order_id,
                update,
            },
            Err(err) => {
                tracing::error!(%owner, %order_id, error = %err, "failed to apply webhook confirmation");
                WebhookOutcome::StoreFailed { order_id }
            }
        }
    }
}
