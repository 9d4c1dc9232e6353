//! Generate QR use case.
//! Creates a transaction in `CREATED` state and returns its QR content.

use std::sync::Arc;

use crate::domain::transaction::qr_content;
use crate::domain::{NewTransaction, Transaction};
use crate::ports::TransactionRepository;
use crate::use_cases::{LifecycleError, LifecycleResult};

/// Input for the GenerateQr use case.
#[derive(Debug, Clone)]
pub struct GenerateQrInput {
    pub merchant_id: String,
    pub partner_reference_no: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Output of the GenerateQr use case.
#[derive(Debug, Clone)]
pub struct GenerateQrOutput {
    pub transaction: Transaction,
    pub qr_content: String,
}

pub struct GenerateQr {
    transaction_repository: Arc<dyn TransactionRepository>,
}

impl GenerateQr {
    pub fn new(transaction_repository: Arc<dyn TransactionRepository>) -> Self {
        Self {
            transaction_repository,
        }
    }

    /// A reference collision surfaces as `DuplicateReference`; it is not retried.
    pub async fn execute(&self, input: GenerateQrInput) -> LifecycleResult<GenerateQrOutput> {
        if input.amount_minor <= 0 {
            return Err(LifecycleError::InvalidAmount(input.amount_minor));
        }

        let new_tx = NewTransaction::created(
            input.merchant_id,
            input.partner_reference_no,
            input.amount_minor,
            input.currency,
        );
        let transaction = self.transaction_repository.insert(&new_tx).await?;
        let qr_content = qr_content(&transaction.reference_no);

        tracing::info!(
            reference_no = %transaction.reference_no,
            merchant_id = %transaction.merchant_id,
            amount_minor = transaction.amount_value_minor,
            currency = %transaction.currency,
            "QR transaction created"
        );

        Ok(GenerateQrOutput {
            transaction,
            qr_content,
        })
    }
}
