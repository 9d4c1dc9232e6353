//! Apply payment callback use case.
//! Records the outcome reported by the payment network for an existing transaction.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::{Transaction, TxStatus};
use crate::ports::{RepositoryError, StatusUpdate, TransactionRepository};
use crate::use_cases::{LifecycleError, LifecycleResult};

/// How callbacks are checked against the transaction's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may follow any other, and callbacks may be replayed.
    #[default]
    Unrestricted,
    /// Only moves allowed by `TxStatus::can_transition_to` are applied.
    Enforced,
}

impl TransitionPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            TransitionPolicy::Enforced
        } else {
            TransitionPolicy::Unrestricted
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallbackInput {
    pub original_reference_no: String,
    pub status: TxStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

pub struct ApplyPaymentCallback {
    transaction_repository: Arc<dyn TransactionRepository>,
    policy: TransitionPolicy,
}

impl ApplyPaymentCallback {
    pub fn new(transaction_repository: Arc<dyn TransactionRepository>, policy: TransitionPolicy) -> Self {
        Self {
            transaction_repository,
            policy,
        }
    }

    /// Applies the status in one conditional update, so there is no window
    /// between finding the row and writing it.
    pub async fn execute(&self, input: CallbackInput) -> LifecycleResult<Transaction> {
        let allowed_from = match self.policy {
            TransitionPolicy::Unrestricted => None,
            TransitionPolicy::Enforced => Some(TxStatus::predecessors_of(input.status)),
        };
        let update = StatusUpdate {
            status: input.status,
            paid_at: input.paid_at,
            allowed_from,
        };

        match self
            .transaction_repository
            .update_status(&input.original_reference_no, &update)
            .await
        {
            Ok(tx) => {
                tracing::info!(
                    reference_no = %tx.reference_no,
                    status = %tx.status,
                    paid_date = ?tx.paid_date,
                    "payment callback applied"
                );
                Ok(tx)
            }
            Err(RepositoryError::NotFound(reference_no)) if update.allowed_from.is_some() => {
                // The guard may have filtered the row out; tell the two cases apart.
                let current = self
                    .transaction_repository
                    .get_by_reference_no(&reference_no)
                    .await?;
                tracing::warn!(
                    reference_no = %reference_no,
                    from = %current.status,
                    to = %input.status,
                    "rejected illegal status transition"
                );
                Err(LifecycleError::InvalidTransition {
                    from: current.status,
                    to: input.status,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support;
    use crate::use_cases::{GenerateQr, GenerateQrInput};
    use chrono::TimeZone;

    async fn created_transaction(repo: Arc<dyn TransactionRepository>) -> Transaction {
        GenerateQr::new(repo)
            .execute(GenerateQrInput {
                merchant_id: "M-001".to_string(),
                partner_reference_no: "PARTNER-1".to_string(),
                amount_minor: 150_000,
                currency: "IDR".to_string(),
            })
            .await
            .unwrap()
            .transaction
    }

    fn callback(reference_no: &str, status: TxStatus, paid_at: Option<DateTime<Utc>>) -> CallbackInput {
        CallbackInput {
            original_reference_no: reference_no.to_string(),
            status,
            paid_at,
        }
    }

    #[tokio::test]
    async fn test_success_callback_sets_status_and_paid_date() {
        let repo = test_support::repository().await;
        let tx = created_transaction(repo.clone()).await;
        let paid_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();

        let use_case = ApplyPaymentCallback::new(repo.clone(), TransitionPolicy::Unrestricted);
        let updated = use_case
            .execute(callback(&tx.reference_no, TxStatus::Success, Some(paid_at)))
            .await
            .unwrap();

        assert_eq!(updated.status, TxStatus::Success);
        assert_eq!(updated.paid_date, Some(paid_at));
        assert_eq!(updated.transaction_date, tx.transaction_date);
        assert_eq!(updated.id, tx.id);
    }

    #[tokio::test]
    async fn test_unrestricted_policy_overwrites_terminal_status() {
        let repo = test_support::repository().await;
        let tx = created_transaction(repo.clone()).await;
        let paid_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let use_case = ApplyPaymentCallback::new(repo.clone(), TransitionPolicy::Unrestricted);

        use_case
            .execute(callback(&tx.reference_no, TxStatus::Success, Some(paid_at)))
            .await
            .unwrap();
        let updated = use_case
            .execute(callback(&tx.reference_no, TxStatus::Failed, None))
            .await
            .unwrap();

        assert_eq!(updated.status, TxStatus::Failed);
        let stored = repo.get_by_reference_no(&tx.reference_no).await.unwrap();
        assert_eq!(stored.status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_not_found_and_writes_nothing() {
        let repo = test_support::repository().await;
        let tx = created_transaction(repo.clone()).await;
        let use_case = ApplyPaymentCallback::new(repo.clone(), TransitionPolicy::Unrestricted);

        let err = use_case
            .execute(callback("ADOESNOTEXIST", TxStatus::Success, Some(Utc::now())))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Repository(RepositoryError::NotFound(_))));

        let stored = repo.get_by_reference_no(&tx.reference_no).await.unwrap();
        assert_eq!(stored, tx);
    }

    #[tokio::test]
    async fn test_enforced_policy_rejects_leaving_terminal_status() {
        let repo = test_support::repository().await;
        let tx = created_transaction(repo.clone()).await;
        let use_case = ApplyPaymentCallback::new(repo.clone(), TransitionPolicy::Enforced);

        let pending = use_case
            .execute(callback(&tx.reference_no, TxStatus::Pending, None))
            .await
            .unwrap();
        assert_eq!(pending.status, TxStatus::Pending);

        let paid_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let success = use_case
            .execute(callback(&tx.reference_no, TxStatus::Success, Some(paid_at)))
            .await
            .unwrap();
        assert_eq!(success.status, TxStatus::Success);

        let err = use_case
            .execute(callback(&tx.reference_no, TxStatus::Failed, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: TxStatus::Success,
                to: TxStatus::Failed
            }
        ));

        let stored = repo.get_by_reference_no(&tx.reference_no).await.unwrap();
        assert_eq!(stored.status, TxStatus::Success);
        assert_eq!(stored.paid_date, Some(paid_at));
    }

    #[tokio::test]
    async fn test_enforced_policy_unknown_reference_is_not_found() {
        let repo = test_support::repository().await;
        let use_case = ApplyPaymentCallback::new(repo, TransitionPolicy::Enforced);

        let err = use_case
            .execute(callback("ADOESNOTEXIST", TxStatus::Success, None))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Repository(RepositoryError::NotFound(_))));
    }

    #[test]
    fn test_policy_from_strict_flag() {
        assert_eq!(TransitionPolicy::from_strict(true), TransitionPolicy::Enforced);
        assert_eq!(TransitionPolicy::from_strict(false), TransitionPolicy::Unrestricted);
    }
}
