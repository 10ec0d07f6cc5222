//! Server-side payment verification.
//!
//! A client-reported success is never trusted: the payment is fetched from
//! the gateway by id and checked against the product catalogue before any
//! coins are credited.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::products::{CoinProduct, ProductReference, PRODUCT_CURRENCY};

/// Gateway status of a settled payment.
pub const STATUS_PAID: &str = "PAID";

/// Channel types that may credit coins.
pub const ACCEPTED_CHANNELS: [&str; 2] = ["LIVE", "TEST"];

/// The fields of a gateway payment the verifier needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub status: String,
    pub channel_type: Option<String>,
    pub custom_data: Option<String>,
    pub order_name: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

impl PaymentRecord {
    pub fn is_paid(&self) -> bool {
        self.status == STATUS_PAID
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentRejection {
    #[error("payment has not been completed (status {0})")]
    NotPaid(String),

    #[error("unsupported payment channel")]
    UnsupportedChannel,

    #[error("payment carries no product reference")]
    MissingReference,

    #[error("product reference does not match a known product")]
    UnknownProduct,

    #[error("payment does not match product {0}")]
    Mismatch(&'static str),
}

/// Verify a fetched payment against the catalogue and return the product it
/// paid for.
pub fn verify_payment(record: &PaymentRecord) -> Result<&'static CoinProduct, PaymentRejection> {
    if !record.is_paid() {
        return Err(PaymentRejection::NotPaid(record.status.clone()));
    }

    let channel_ok = record
        .channel_type
        .as_deref()
        .is_some_and(|t| ACCEPTED_CHANNELS.contains(&t));
    if !channel_ok {
        return Err(PaymentRejection::UnsupportedChannel);
    }

    let raw = record
        .custom_data
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(PaymentRejection::MissingReference)?;
    let product = ProductReference::resolve(raw).ok_or(PaymentRejection::UnknownProduct)?;

    let matches = record.order_name.as_deref() == Some(product.name)
        && record.amount_total == Some(product.price)
        && record.currency.as_deref() == Some(PRODUCT_CURRENCY);
    if !matches {
        return Err(PaymentRejection::Mismatch(product.id));
    }

    Ok(product)
}

// ---------------------------------------------------------------------------
// Gateway seam
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("payment lookup failed: {0}")]
    Lookup(String),
}

/// Fetches payments by id from the external payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError>;
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn paid(product_id: &str, order_name: &str, total: i64) -> PaymentRecord {
        PaymentRecord {
            id: "pay_1".into(),
            status: "PAID".into(),
            channel_type: Some("LIVE".into()),
            custom_data: Some(ProductReference::encode(product_id)),
            order_name: Some(order_name.into()),
            amount_total: Some(total),
            currency: Some("KRW".into()),
        }
    }

    #[test]
    fn valid_payment_resolves_product() {
        let record = paid("COIN_PACK_A", "코인 패키지 A", 1000);
        assert_eq!(verify_payment(&record).map(|p| p.total_coins), Ok(11));
    }

    #[test]
    fn test_channel_is_accepted() {
        let mut record = paid("COIN_PACK_C", "코인 패키지 C", 3000);
        record.channel_type = Some("TEST".into());
        assert!(verify_payment(&record).is_ok());
    }

    #[test]
    fn unpaid_status_is_rejected() {
        let mut record = paid("COIN_PACK_A", "코인 패키지 A", 1000);
        record.status = "READY".into();
        assert_matches!(verify_payment(&record), Err(PaymentRejection::NotPaid(s)) if s == "READY");
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let mut record = paid("COIN_PACK_A", "코인 패키지 A", 1000);
        record.channel_type = Some("SANDBOX".into());
        assert_matches!(verify_payment(&record), Err(PaymentRejection::UnsupportedChannel));
        record.channel_type = None;
        assert_matches!(verify_payment(&record), Err(PaymentRejection::UnsupportedChannel));
    }

    #[test]
    fn reference_problems_are_rejected() {
        let mut record = paid("COIN_PACK_A", "코인 패키지 A", 1000);
        record.custom_data = None;
        assert_matches!(verify_payment(&record), Err(PaymentRejection::MissingReference));
        record.custom_data = Some("{broken".into());
        assert_matches!(verify_payment(&record), Err(PaymentRejection::UnknownProduct));
    }

    #[test]
    fn price_name_and_currency_must_match() {
        let cheap = paid("COIN_PACK_F", "코인 패키지 F", 1000);
        assert_matches!(verify_payment(&cheap), Err(PaymentRejection::Mismatch("COIN_PACK_F")));

        let renamed = paid("COIN_PACK_A", "코인 패키지 F", 1000);
        assert!(verify_payment(&renamed).is_err());

        let mut usd = paid("COIN_PACK_A", "코인 패키지 A", 1000);
        usd.currency = Some("USD".into());
        assert!(verify_payment(&usd).is_err());
    }
}
