//! Coin policy: prices, transaction vocabulary and ledger outcomes.
//!
//! The transaction log is the only record of what a user has bought; there
//! is no separate "purchased" flag anywhere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{CaseId, DbId, QuestionNumber, Timestamp, UserId};

/// Price of revealing one answer.
pub const ANSWER_REVEAL_PRICE: i64 = 3;

/// Price of unlocking a case outright.
pub const CASE_UNLOCK_PRICE: i64 = 5;

// ---------------------------------------------------------------------------
// Transaction vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Charge,
    Spend,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Spend => "spend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPurpose {
    CoinPurchase,
    AnswerReveal,
    CaseUnlock,
}

impl TransactionPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoinPurchase => "coin_purchase",
            Self::AnswerReveal => "answer_reveal",
            Self::CaseUnlock => "case_unlock",
        }
    }
}

/// Error returned when a stored type/purpose string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charge" => Ok(Self::Charge),
            "spend" => Ok(Self::Spend),
            other => Err(UnknownVariant {
                kind: "transaction type",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for TransactionPurpose {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coin_purchase" => Ok(Self::CoinPurchase),
            "answer_reveal" => Ok(Self::AnswerReveal),
            "case_unlock" => Ok(Self::CaseUnlock),
            other => Err(UnknownVariant {
                kind: "transaction purpose",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TransactionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payment reference hash
// ---------------------------------------------------------------------------

/// Fold an external payment id into a non-negative integer for `related_id`.
///
/// 32-bit rolling `h * 31 + unit` over UTF-16 code units with signed
/// wrap-around, then the absolute value. Stable across platforms; not a
/// cryptographic hash.
pub fn payment_reference_hash(payment_id: &str) -> i64 {
    let hash = payment_id.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    i64::from(hash).abs()
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A row of the append-only transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransaction {
    pub id: DbId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    pub purpose: TransactionPurpose,
    pub related_id: Option<i64>,
    pub created_at: Timestamp,
}

/// Input for appending to the transaction log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoinTransaction {
    pub user_id: UserId,
    pub kind: TransactionType,
    pub amount: i64,
    pub purpose: TransactionPurpose,
    pub related_id: Option<i64>,
}

/// Filter for "has this already been bought" lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionLookup {
    pub user_id: UserId,
    pub kind: Option<TransactionType>,
    pub purpose: TransactionPurpose,
    pub related_id: i64,
}

/// Transaction history entry, enriched for answer reveals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: CoinTransaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<CaseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<QuestionNumber>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Business-rule and storage failures reported by ledger mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerFailure {
    #[error("already purchased")]
    AlreadyPurchased,

    #[error("insufficient coins")]
    InsufficientCoins,

    #[error("case already unlocked")]
    CaseAlreadyUnlocked,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("case not found")]
    CaseNotFound,

    #[error("question not found")]
    QuestionNotFound,

    #[error("{0}")]
    Store(String),
}

impl LedgerFailure {
    /// Human-readable message rendered to the player.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type LedgerOutcome = Result<(), LedgerFailure>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(payment_reference_hash(""), 0);
        assert_eq!(payment_reference_hash("a"), 97);
        // 97 * 31 + 98
        assert_eq!(payment_reference_hash("ab"), 3105);
        // "hello".hashCode() == 99162322
        assert_eq!(payment_reference_hash("hello"), 99_162_322);
    }

    #[test]
    fn hash_wraps_then_takes_absolute_value() {
        // "polygenelubricants".hashCode() == i32::MIN
        assert_eq!(payment_reference_hash("polygenelubricants"), 2_147_483_648);
        let h = payment_reference_hash("pay_abc123");
        assert!(h >= 0);
        assert_eq!(h, payment_reference_hash("pay_abc123"));
        assert_ne!(h, payment_reference_hash("pay_abc124"));
    }

    #[test]
    fn hash_uses_utf16_units() {
        // '코' is U+CF54, a single UTF-16 unit.
        assert_eq!(payment_reference_hash("코"), 0xCF54);
    }

    #[test]
    fn purposes_round_trip_through_strings() {
        for p in [
            TransactionPurpose::CoinPurchase,
            TransactionPurpose::AnswerReveal,
            TransactionPurpose::CaseUnlock,
        ] {
            assert_eq!(p.as_str().parse::<TransactionPurpose>(), Ok(p));
        }
        assert!("refund".parse::<TransactionPurpose>().is_err());
        assert_eq!("spend".parse::<TransactionType>(), Ok(TransactionType::Spend));
    }

    #[test]
    fn failure_messages() {
        assert_eq!(LedgerFailure::AlreadyPurchased.message(), "already purchased");
        assert_eq!(LedgerFailure::InsufficientCoins.message(), "insufficient coins");
        assert_eq!(LedgerFailure::Store("boom".into()).message(), "boom");
    }

    #[test]
    fn transaction_view_serializes_type_field() {
        let view = TransactionView {
            transaction: CoinTransaction {
                id: 1,
                user_id: UserId::nil(),
                kind: TransactionType::Spend,
                amount: 3,
                purpose: TransactionPurpose::AnswerReveal,
                related_id: Some(42),
                created_at: chrono::Utc::now(),
            },
            case_id: Some(1),
            case_title: Some("Case 1".into()),
            question_number: Some(2),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "spend");
        assert_eq!(json["purpose"], "answer_reveal");
        assert_eq!(json["relatedId"], 42);
        assert_eq!(json["questionNumber"], 2);
    }
}
