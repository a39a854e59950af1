//! Pull-confirmation provider client (PayPal Orders v2).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::OrderId;
use domain::Provider;
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{
    CaptureGateway, CapturedPayment, CreatedPayment, Handoff, Link, PaymentGateway,
    PaymentRequest, rejected,
};
use crate::error::ProviderError;

const SANDBOX_API_BASE: &str = "https://api-m.sandbox.paypal.com";

/// Tokens are refreshed this long before the provider says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for the PayPal API.
#[derive(Debug, Clone)]
pub struct PayPalSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl PayPalSettings {
    /// Settings pointing at the sandbox environment.
    pub fn sandbox(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base: SANDBOX_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct RemoteOrder {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    #[serde(default)]
    purchase_units: Vec<CapturedUnit>,
}

#[derive(Debug, Deserialize)]
struct CapturedUnit {
    reference_id: Option<String>,
    payments: Option<UnitPayments>,
}

#[derive(Debug, Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
}

/// Creates remote orders for payer approval and captures them afterwards.
pub struct PayPalGateway {
    http: reqwest::Client,
    settings: PayPalSettings,
    base_url: Url,
    token: RwLock<Option<CachedToken>>,
}

impl PayPalGateway {
    /// Builds the HTTP client once, bounded by `settings.timeout`.
    pub fn new(settings: PayPalSettings) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(&settings.api_base).map_err(|e| ProviderError::InvalidResponse {
                provider: Provider::PayPal,
                operation: "client setup",
                message: format!("invalid api base {}: {e}", settings.api_base),
            })?;
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, "client setup", e))?;

        Ok(Self {
            http,
            settings,
            base_url,
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, operation: &'static str, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidResponse {
                provider: Provider::PayPal,
                operation,
                message: format!("api base {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Returns a valid access token, fetching a new one when needed.
    ///
    /// The cache lock is never held across the token request.
    async fn access_token(&self) -> Result<String, ProviderError> {
        const OPERATION: &str = "fetch access token";

        if let Some(token) = self.token.read().await.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        let response = self
            .http
            .post(self.endpoint(OPERATION, &["v1", "oauth2", "token"])?)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, OPERATION, e))?;

        if !response.status().is_success() {
            return Err(rejected(Provider::PayPal, OPERATION, response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, OPERATION, e))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.write().await = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    fn provider(&self) -> Provider {
        Provider::PayPal
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.correlation.order_id))]
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, ProviderError> {
        const OPERATION: &str = "create order";
        let token = self.access_token().await?;
        let order_id = request.correlation.order_id.to_string();

        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": order_id,
                "custom_id": request.correlation.subject_id.as_str(),
                "amount": {
                    "currency_code": request.currency.code(),
                    "value": request.amount.to_decimal_string(),
                },
            }],
        });

        let response = self
            .http
            .post(self.endpoint(OPERATION, &["v2", "checkout", "orders"])?)
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .header("PayPal-Request-Id", &order_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, OPERATION, e))?;

        if !response.status().is_success() {
            return Err(rejected(Provider::PayPal, OPERATION, response).await);
        }

        let remote: RemoteOrder = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, OPERATION, e))?;

        let approval_url = remote
            .links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: Provider::PayPal,
                operation: OPERATION,
                message: format!("order {} has no approve link", remote.id),
            })?;

        Ok(CreatedPayment {
            remote_reference: remote.id,
            handoff: Handoff::Approval {
                approval_url,
                links: remote.links,
            },
        })
    }
}

#[async_trait]
impl CaptureGateway for PayPalGateway {
    #[tracing::instrument(skip(self))]
    async fn capture_payment(
        &self,
        remote_order_id: &str,
    ) -> Result<CapturedPayment, ProviderError> {
        const OPERATION: &str = "capture order";
        let token = self.access_token().await?;

        let response = self
            .http
            .post(self.endpoint(
                OPERATION,
                &["v2", "checkout", "orders", remote_order_id, "capture"],
            )?)
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, OPERATION, e))?;

        if !response.status().is_success() {
            return Err(rejected(Provider::PayPal, OPERATION, response).await);
        }

        let captured: CaptureResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(Provider::PayPal, OPERATION, e))?;

        let unit = captured.purchase_units.into_iter().next();
        let order_id = unit
            .as_ref()
            .and_then(|u| u.reference_id.as_deref())
            .and_then(|r| OrderId::parse(r).ok());
        let capture_id = unit
            .and_then(|u| u.payments)
            .and_then(|p| p.captures.into_iter().next())
            .map(|c| c.id)
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: Provider::PayPal,
                operation: OPERATION,
                message: format!("capture of {remote_order_id} returned no capture id"),
            })?;

        Ok(CapturedPayment {
            capture_id,
            order_id,
        })
    }
}
