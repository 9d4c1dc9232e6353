//! Transaction domain entity.
//! Framework-agnostic representation of a QR payment request and its outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub const REFERENCE_PREFIX: &str = "A";
pub const REFERENCE_TOKEN_LEN: usize = 10;
pub const QR_CONTENT_PREFIX: &str = "00020101021226620015";

/// Payment status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxStatus {
    Created,
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub const ALL: [TxStatus; 4] = [
        TxStatus::Created,
        TxStatus::Pending,
        TxStatus::Success,
        TxStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Created => "CREATED",
            TxStatus::Pending => "PENDING",
            TxStatus::Success => "SUCCESS",
            TxStatus::Failed => "FAILED",
        }
    }

    /// Maps a callback's `transactionStatusDesc`. Unknown descriptions are pending.
    pub fn from_callback_desc(desc: &str) -> Self {
        match desc {
            "Success" => TxStatus::Success,
            "Failed" => TxStatus::Failed,
            _ => TxStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Failed)
    }

    /// Legal moves of the payment state machine.
    ///
    /// `CREATED -> {PENDING, SUCCESS, FAILED}`, `PENDING -> {SUCCESS, FAILED}`,
    /// `SUCCESS` and `FAILED` are terminal.
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        match self {
            TxStatus::Created => next != TxStatus::Created,
            TxStatus::Pending => next.is_terminal(),
            TxStatus::Success | TxStatus::Failed => false,
        }
    }

    /// Statuses from which `next` may legally be reached.
    pub fn predecessors_of(next: TxStatus) -> Vec<TxStatus> {
        TxStatus::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TxStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TxStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Domain entity representing a persisted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub reference_no: String,
    pub partner_reference_no: String,
    pub merchant_id: String,
    pub amount_value_minor: i64,
    pub currency: String,
    pub status: TxStatus,
    pub transaction_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
}

/// A transaction that has not been stored yet. The store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub reference_no: String,
    pub partner_reference_no: String,
    pub merchant_id: String,
    pub amount_value_minor: i64,
    pub currency: String,
    pub status: TxStatus,
    pub transaction_date: DateTime<Utc>,
}

impl NewTransaction {
    /// Builds a freshly created payment request with a generated reference number.
    pub fn created(
        merchant_id: String,
        partner_reference_no: String,
        amount_value_minor: i64,
        currency: String,
    ) -> Self {
        Self {
            reference_no: generate_reference_no(),
            partner_reference_no,
            merchant_id,
            amount_value_minor,
            currency,
            status: TxStatus::Created,
            transaction_date: Utc::now(),
        }
    }
}

/// Fixed prefix plus the first characters of a hyphenated random v4 UUID
/// (`A1b2c3d4e-f`). Uniqueness is probabilistic; the store's unique constraint
/// is the final word.
pub fn generate_reference_no() -> String {
    let token = Uuid::new_v4().hyphenated().to_string();
    format!("{}{}", REFERENCE_PREFIX, &token[..REFERENCE_TOKEN_LEN])
}

pub fn qr_content(reference_no: &str) -> String {
    format!("{}{}", QR_CONTENT_PREFIX, reference_no)
}
