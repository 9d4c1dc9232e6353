//! Transaction lifecycle operations.

pub mod apply_payment_callback;
pub mod generate_qr;

pub use apply_payment_callback::{ApplyPaymentCallback, CallbackInput, TransitionPolicy};
pub use generate_qr::{GenerateQr, GenerateQrInput, GenerateQrOutput};

use crate::domain::TxStatus;
use crate::ports::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(i64),

    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: TxStatus, to: TxStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::adapters::SqliteTransactionRepository;
    use crate::db;
    use crate::ports::TransactionRepository;

    pub async fn repository() -> Arc<dyn TransactionRepository> {
        let pool = db::connect_in_memory().await.unwrap();
        Arc::new(SqliteTransactionRepository::new(pool))
    }
}
