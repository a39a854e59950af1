//! Push-confirmation provider client (Stripe payment intents).

use std::time::Duration;

use async_trait::async_trait;
use domain::Provider;
use serde::Deserialize;

use super::{CreatedPayment, Handoff, PaymentGateway, PaymentRequest, rejected};
use crate::error::ProviderError;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Connection settings for the Stripe API.
#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub api_key: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl StripeSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    client_secret: Option<String>,
}

/// Creates payment intents; success is reported later by webhook.
#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    settings: StripeSettings,
}

impl StripeGateway {
    /// Builds the HTTP client once, bounded by `settings.timeout`.
    pub fn new(settings: StripeSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(Provider::Stripe, "client setup", e))?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.correlation.order_id))]
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, ProviderError> {
        const OPERATION: &str = "create payment intent";
        let correlation = &request.correlation;

        let form = [
            ("amount", request.amount.cents().to_string()),
            ("currency", request.currency.code().to_lowercase()),
            ("metadata[role]", correlation.role.as_str().to_string()),
            ("metadata[subjectId]", correlation.subject_id.to_string()),
            ("metadata[orderId]", correlation.order_id.to_string()),
        ];

        let response = self
            .http
            .post(self.endpoint("/v1/payment_intents"))
            .bearer_auth(&self.settings.api_key)
            // A retried request for the same order must not create a second intent.
            .header("Idempotency-Key", correlation.order_id.to_string())
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::Stripe, OPERATION, e))?;

        if !response.status().is_success() {
            return Err(rejected(Provider::Stripe, OPERATION, response).await);
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::Stripe, OPERATION, e))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: Provider::Stripe,
                operation: OPERATION,
                message: format!("payment intent {} has no client_secret", intent.id),
            })?;

        Ok(CreatedPayment {
            remote_reference: intent.id,
            handoff: Handoff::ClientSecret(client_secret),
        })
    }
}
