//! Server-side completion of a coin purchase.
//!
//! The client reports a payment id after the gateway's checkout flow; the
//! payment is fetched from the gateway, verified against the product
//! catalogue and only then credited. Replayed payment ids are rejected
//! before any lookup or mutation.

use std::sync::Arc;

use serde::Serialize;
use sleuth_core::payment::{verify_payment, GatewayError, PaymentGateway, PaymentRejection};
use uuid::Uuid;

use crate::ledger::CoinLedger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    /// Coins credited by this payment.
    pub coins: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("payment service is not configured")]
    NotConfigured,

    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("user id is required")]
    MissingUser,

    #[error("payment has already been processed")]
    AlreadyProcessed,

    #[error("failed to look up payment: {0}")]
    LookupFailed(String),

    #[error(transparent)]
    Rejected(#[from] PaymentRejection),

    #[error("failed to credit coins: {0}")]
    ChargeFailed(String),
}

impl CheckoutError {
    /// HTTP status the completion endpoint answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotConfigured | Self::ChargeFailed(_) => 500,
            Self::MissingUser => 401,
            Self::InvalidRequest(_)
            | Self::AlreadyProcessed
            | Self::LookupFailed(_)
            | Self::Rejected(_) => 400,
        }
    }
}

pub struct Checkout {
    ledger: Arc<CoinLedger>,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl Checkout {
    /// `gateway` is `None` when no gateway secret is configured; every
    /// completion then fails with [`CheckoutError::NotConfigured`].
    pub fn new(ledger: Arc<CoinLedger>, gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
        Self { ledger, gateway }
    }

    pub async fn complete(
        &self,
        payment_id: &str,
        user_id: &str,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let Some(gateway) = &self.gateway else {
            tracing::error!("Payment completion requested but PAYMENT_API_SECRET is not set");
            return Err(CheckoutError::NotConfigured);
        };

        let payment_id = payment_id.trim();
        if payment_id.is_empty() {
            return Err(CheckoutError::InvalidRequest("paymentId is required"));
        }
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(CheckoutError::MissingUser);
        }
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| CheckoutError::InvalidRequest("userId is not a valid id"))?;

        if self.ledger.is_payment_already_processed(user_id, payment_id).await {
            tracing::warn!(%user_id, payment_id, "Rejected replayed payment");
            return Err(CheckoutError::AlreadyProcessed);
        }

        let record = gateway.fetch_payment(payment_id).await.map_err(|e| match e {
            GatewayError::NotConfigured => CheckoutError::NotConfigured,
            GatewayError::Lookup(msg) => {
                tracing::warn!(payment_id, error = %msg, "Payment lookup failed");
                CheckoutError::LookupFailed(msg)
            }
        })?;

        let product = verify_payment(&record).map_err(|rejection| {
            tracing::warn!(%user_id, payment_id, %rejection, "Payment verification failed");
            CheckoutError::Rejected(rejection)
        })?;

        self.ledger
            .charge(user_id, product.total_coins, payment_id)
            .await
            .map_err(|e| {
                tracing::error!(%user_id, payment_id, error = %e, "Verified payment could not be credited");
                CheckoutError::ChargeFailed(e.message())
            })?;

        tracing::info!(%user_id, payment_id, product = product.id, coins = product.total_coins, "Payment completed");
        Ok(CheckoutReceipt {
            coins: product.total_coins,
            message: format!("{} coins added", product.total_coins),
        })
    }
}
