//! JSON request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{format_minor_units, Transaction, TxStatus};
use crate::ports::{Page, TxFilter};
use crate::validation::{
    validate_amount, validate_identifier, ValidationError, ValidationResult, MERCHANT_ID_MAX_LEN,
    REFERENCE_NO_MAX_LEN, STATUS_DESC_MAX_LEN,
};

pub const GENERATE_QR_SUCCESS_CODE: &str = "2004700";
pub const PAYMENT_CALLBACK_SUCCESS_CODE: &str = "2005100";
pub const SUCCESS_MESSAGE: &str = "Successful";

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountPayload {
    /// Decimal string, e.g. `"1500.00"`.
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateQrRequest {
    pub partner_reference_no: String,
    pub amount: AmountPayload,
    pub merchant_id: String,
}

impl GenerateQrRequest {
    pub fn validate(&self) -> ValidationResult {
        validate_identifier(
            "partnerReferenceNo",
            &self.partner_reference_no,
            REFERENCE_NO_MAX_LEN,
        )?;
        validate_amount(&self.amount.value, &self.amount.currency)?;
        validate_identifier("merchantId", &self.merchant_id, MERCHANT_ID_MAX_LEN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    pub response_code: String,
    pub response_message: String,
    pub reference_no: String,
    pub partner_reference_no: String,
    pub qr_content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentCallbackRequest {
    pub original_reference_no: String,
    pub original_partner_reference_no: String,
    /// `"Success"`, `"Failed"` or `"Pending"`; anything else is treated as pending.
    pub transaction_status_desc: String,
    pub paid_time: Option<DateTime<Utc>>,
    pub amount: AmountPayload,
}

impl PaymentCallbackRequest {
    pub fn validate(&self) -> ValidationResult {
        validate_identifier(
            "originalReferenceNo",
            &self.original_reference_no,
            REFERENCE_NO_MAX_LEN,
        )?;
        validate_identifier(
            "originalPartnerReferenceNo",
            &self.original_partner_reference_no,
            REFERENCE_NO_MAX_LEN,
        )?;
        validate_identifier(
            "transactionStatusDesc",
            &self.transaction_status_desc,
            STATUS_DESC_MAX_LEN,
        )?;
        validate_amount(&self.amount.value, &self.amount.currency)
    }

    pub fn status(&self) -> TxStatus {
        TxStatus::from_callback_desc(&self.transaction_status_desc)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackResponse {
    pub response_code: String,
    pub response_message: String,
    pub transaction_status_desc: String,
}

/// External projection of a stored transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub reference_no: String,
    pub partner_reference_no: String,
    pub merchant_id: String,
    /// Two fractional digits, e.g. `"1500.00"`.
    pub amount: String,
    pub currency: String,
    pub status: TxStatus,
    pub transaction_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
}

impl From<&Transaction> for TransactionItem {
    fn from(tx: &Transaction) -> Self {
        Self {
            reference_no: tx.reference_no.clone(),
            partner_reference_no: tx.partner_reference_no.clone(),
            merchant_id: tx.merchant_id.clone(),
            amount: format_minor_units(tx.amount_value_minor),
            currency: tx.currency.clone(),
            status: tx.status,
            transaction_date: tx.transaction_date,
            paid_date: tx.paid_date,
        }
    }
}

/// Query string of the listing endpoint. Everything arrives as text so that a
/// malformed `limit` or `offset` falls back to its default instead of failing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTransactionsQuery {
    pub merchant_id: Option<String>,
    pub reference_no: Option<String>,
    pub partner_reference_no: Option<String>,
    /// One of `CREATED`, `PENDING`, `SUCCESS`, `FAILED`.
    pub status: Option<String>,
    /// 1 to 200, default 50.
    pub limit: Option<String>,
    /// Default 0.
    pub offset: Option<String>,
}

impl ListTransactionsQuery {
    pub fn filter(&self) -> Result<TxFilter, ValidationError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<TxStatus>()
                    .map_err(|e| ValidationError::new("status", e.to_string()))?,
            ),
            None => None,
        };

        Ok(TxFilter {
            merchant_id: self.merchant_id.clone(),
            reference_no: self.reference_no.clone(),
            partner_reference_no: self.partner_reference_no.clone(),
            status,
        })
    }

    pub fn page(&self) -> Page {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        Page::new(parse(&self.limit), parse(&self.offset))
    }
}
