//! REST client for the payment gateway's payment lookup endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use sleuth_core::payment::{GatewayError, PaymentGateway, PaymentRecord};

pub const DEFAULT_API_URL: &str = "https://api.portone.io";

/// HTTP client for the gateway API, authenticated with an API secret.
pub struct PortOneApi {
    client: reqwest::Client,
    api_url: String,
    secret: String,
}

/// Errors from the gateway REST layer.
#[derive(Debug, thiserror::Error)]
pub enum PaymentApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway returned a non-2xx status code.
    #[error("Payment API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid payment API URL: {0}")]
    InvalidUrl(String),
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentResponse {
    id: String,
    status: String,
    channel: Option<ChannelResponse>,
    custom_data: Option<String>,
    order_name: Option<String>,
    amount: Option<AmountResponse>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AmountResponse {
    total: Option<i64>,
}

impl From<PaymentResponse> for PaymentRecord {
    fn from(p: PaymentResponse) -> Self {
        PaymentRecord {
            id: p.id,
            status: p.status,
            channel_type: p.channel.and_then(|c| c.kind),
            custom_data: p.custom_data,
            order_name: p.order_name,
            amount_total: p.amount.and_then(|a| a.total),
            currency: p.currency,
        }
    }
}

impl PortOneApi {
    /// * `api_url` - Base URL, e.g. [`DEFAULT_API_URL`].
    pub fn new(api_url: String, secret: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, secret)
    }

    pub fn with_client(client: reqwest::Client, api_url: String, secret: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret,
        }
    }

    /// Fetch one payment by id with `GET /payments/{payment_id}`.
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentRecord, PaymentApiError> {
        let url = self.payment_url(payment_id)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("PortOne {}", self.secret))
            .send()
            .await?;

        let payment: PaymentResponse = Self::parse_response(response).await?;
        Ok(payment.into())
    }

    fn payment_url(&self, payment_id: &str) -> Result<reqwest::Url, PaymentApiError> {
        let mut url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| PaymentApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PaymentApiError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(["payments", payment_id]);
        Ok(url)
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PaymentApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PaymentApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for PortOneApi {
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        self.get_payment(payment_id).await.map_err(|e| {
            tracing::warn!(payment_id, error = %e, "Payment lookup failed");
            GatewayError::Lookup(e.to_string())
        })
    }
}
