//! SQLite implementation of TransactionRepository.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::domain::{NewTransaction, Transaction, TxStatus};
use crate::ports::{
    Page, RepositoryError, RepositoryResult, StatusUpdate, TransactionRepository, TxFilter,
};

const SELECT_COLUMNS: &str = "id, reference_no, partner_reference_no, merchant_id, \
     amount_value_minor, currency, status, transaction_date, paid_date";

/// SQLite-backed transaction repository.
#[derive(Clone)]
pub struct SqliteTransactionRepository {
    pool: SqlitePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for SqliteTransactionRepository {
    async fn insert(&self, tx: &NewTransaction) -> RepositoryResult<Transaction> {
        let sql = format!(
            r#"
            INSERT INTO transactions (
                reference_no, partner_reference_no, merchant_id, amount_value_minor,
                currency, status, transaction_date, paid_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(&tx.reference_no)
            .bind(&tx.partner_reference_no)
            .bind(&tx.merchant_id)
            .bind(tx.amount_value_minor)
            .bind(&tx.currency)
            .bind(tx.status.as_str())
            .bind(format_timestamp(&tx.transaction_date))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    RepositoryError::DuplicateReference(tx.reference_no.clone())
                }
                other => RepositoryError::from(other),
            })?;

        row.into_domain()
    }

    async fn get_by_reference_no(&self, reference_no: &str) -> RepositoryResult<Transaction> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE reference_no = ?",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(reference_no)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| RepositoryError::NotFound(reference_no.to_string()))?
            .into_domain()
    }

    async fn list(&self, filter: &TxFilter, page: Page) -> RepositoryResult<Vec<Transaction>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM transactions WHERE 1 = 1",
            SELECT_COLUMNS
        ));

        if let Some(merchant_id) = non_empty(&filter.merchant_id) {
            query.push(" AND merchant_id = ").push_bind(merchant_id.to_string());
        }
        if let Some(reference_no) = non_empty(&filter.reference_no) {
            query.push(" AND reference_no = ").push_bind(reference_no.to_string());
        }
        if let Some(partner_reference_no) = non_empty(&filter.partner_reference_no) {
            query
                .push(" AND partner_reference_no = ")
                .push_bind(partner_reference_no.to_string());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        query
            .push(" ORDER BY id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn update_status(
        &self,
        reference_no: &str,
        update: &StatusUpdate,
    ) -> RepositoryResult<Transaction> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE transactions SET status = ");
        query.push_bind(update.status.as_str());
        query
            .push(", paid_date = COALESCE(")
            .push_bind(update.paid_at.as_ref().map(format_timestamp))
            .push(", paid_date)");
        query.push(" WHERE reference_no = ").push_bind(reference_no.to_string());

        if let Some(allowed_from) = &update.allowed_from {
            if allowed_from.is_empty() {
                // Nothing may precede this status, so no row can match.
                query.push(" AND 1 = 0");
            } else {
                query.push(" AND status IN (");
                let mut statuses = query.separated(", ");
                for status in allowed_from {
                    statuses.push_bind(status.as_str());
                }
                statuses.push_unseparated(")");
            }
        }

        query.push(" RETURNING ").push(SELECT_COLUMNS);

        let row = query
            .build_query_as::<TransactionRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| RepositoryError::NotFound(reference_no.to_string()))?
            .into_domain()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// RFC 3339, UTC, fixed nanosecond precision. Round-trips exactly.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    reference_no: String,
    partner_reference_no: String,
    merchant_id: String,
    amount_value_minor: i64,
    currency: String,
    status: String,
    transaction_date: String,
    paid_date: Option<String>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let status = self
            .status
            .parse::<TxStatus>()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let transaction_date = parse_timestamp(&self.transaction_date)
            .map_err(|e| RepositoryError::Storage(format!("parse transaction_date: {}", e)))?;
        let paid_date = self
            .paid_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|e| RepositoryError::Storage(format!("parse paid_date: {}", e)))?;

        Ok(Transaction {
            id: self.id,
            reference_no: self.reference_no,
            partner_reference_no: self.partner_reference_no,
            merchant_id: self.merchant_id,
            amount_value_minor: self.amount_value_minor,
            currency: self.currency,
            status,
            transaction_date,
            paid_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, TimeZone};

    async fn setup_repo() -> SqliteTransactionRepository {
        let pool = db::connect_in_memory().await.unwrap();
        SqliteTransactionRepository::new(pool)
    }

    fn new_tx(reference_no: &str, merchant_id: &str, partner_reference_no: &str) -> NewTransaction {
        NewTransaction {
            reference_no: reference_no.to_string(),
            partner_reference_no: partner_reference_no.to_string(),
            merchant_id: merchant_id.to_string(),
            amount_value_minor: 150_000,
            currency: "IDR".to_string(),
            status: TxStatus::Created,
            transaction_date: Utc::now(),
        }
    }

    #[test]
    fn test_timestamp_round_trip_keeps_nanoseconds() {
        let ts = Utc.timestamp_opt(1_714_557_600, 123_456_789).unwrap();
        let raw = format_timestamp(&ts);
        assert_eq!(raw, "2024-05-01T10:00:00.123456789Z");
        assert_eq!(parse_timestamp(&raw).unwrap(), ts);
    }

    #[tokio::test]
    async fn test_insert_and_get_by_reference_no() {
        let repo = setup_repo().await;
        let tx = new_tx("AREF000001", "M-1", "P-1");

        let inserted = repo.insert(&tx).await.unwrap();
        assert!(inserted.id > 0);
        assert_eq!(inserted.reference_no, tx.reference_no);
        assert_eq!(inserted.transaction_date, tx.transaction_date);
        assert!(inserted.paid_date.is_none());

        let fetched = repo.get_by_reference_no("AREF000001").await.unwrap();
        assert_eq!(fetched, inserted);
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let repo = setup_repo().await;
        repo.insert(&new_tx("AREF000001", "M-1", "P-1")).await.unwrap();

        let err = repo
            .insert(&new_tx("AREF000001", "M-2", "P-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateReference(ref r) if r == "AREF000001"));
    }

    #[tokio::test]
    async fn test_get_missing_reference_is_not_found() {
        let repo = setup_repo().await;
        let err = repo.get_by_reference_no("ANOPE").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paged() {
        let repo = setup_repo().await;
        for i in 0..5 {
            repo.insert(&new_tx(&format!("AREF00000{}", i), "M-1", "P-1"))
                .await
                .unwrap();
        }

        let all = repo.list(&TxFilter::default(), Page::default()).await.unwrap();
        let refs: Vec<_> = all.iter().map(|t| t.reference_no.as_str()).collect();
        assert_eq!(
            refs,
            vec!["AREF000004", "AREF000003", "AREF000002", "AREF000001", "AREF000000"]
        );

        let page = repo
            .list(&TxFilter::default(), Page::new(Some(2), Some(1)))
            .await
            .unwrap();
        let refs: Vec<_> = page.iter().map(|t| t.reference_no.as_str()).collect();
        assert_eq!(refs, vec!["AREF000003", "AREF000002"]);
    }

    #[tokio::test]
    async fn test_list_filters_are_conjunctive() {
        let repo = setup_repo().await;
        repo.insert(&new_tx("AREF000001", "M-1", "P-1")).await.unwrap();
        repo.insert(&new_tx("AREF000002", "M-1", "P-2")).await.unwrap();
        repo.insert(&new_tx("AREF000003", "M-2", "P-1")).await.unwrap();

        let filter = TxFilter {
            merchant_id: Some("M-1".into()),
            partner_reference_no: Some("P-1".into()),
            ..Default::default()
        };
        let found = repo.list(&filter, Page::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference_no, "AREF000001");

        let filter = TxFilter {
            merchant_id: Some(String::new()),
            reference_no: Some("AREF000003".into()),
            ..Default::default()
        };
        let found = repo.list(&filter, Page::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].merchant_id, "M-2");

        let filter = TxFilter {
            status: Some(TxStatus::Success),
            ..Default::default()
        };
        assert!(repo.list(&filter, Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_sets_paid_date() {
        let repo = setup_repo().await;
        repo.insert(&new_tx("AREF000001", "M-1", "P-1")).await.unwrap();
        let paid_at = Utc.timestamp_opt(1_714_557_600, 42).unwrap();

        let updated = repo
            .update_status(
                "AREF000001",
                &StatusUpdate {
                    status: TxStatus::Success,
                    paid_at: Some(paid_at),
                    allowed_from: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TxStatus::Success);
        assert_eq!(updated.paid_date, Some(paid_at));

        // A later update without a paid time keeps the stored one.
        let updated = repo
            .update_status(
                "AREF000001",
                &StatusUpdate {
                    status: TxStatus::Pending,
                    paid_at: None,
                    allowed_from: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TxStatus::Pending);
        assert_eq!(updated.paid_date, Some(paid_at));
    }

    #[tokio::test]
    async fn test_update_status_missing_reference_is_not_found() {
        let repo = setup_repo().await;
        let err = repo
            .update_status(
                "ANOPE",
                &StatusUpdate {
                    status: TxStatus::Failed,
                    paid_at: None,
                    allowed_from: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_status_guard_blocks_disallowed_current_status() {
        let repo = setup_repo().await;
        let inserted = repo.insert(&new_tx("AREF000001", "M-1", "P-1")).await.unwrap();

        let err = repo
            .update_status(
                "AREF000001",
                &StatusUpdate {
                    status: TxStatus::Success,
                    paid_at: Some(Utc::now() + Duration::seconds(1)),
                    allowed_from: Some(vec![TxStatus::Pending]),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));

        let unchanged = repo.get_by_reference_no("AREF000001").await.unwrap();
        assert_eq!(unchanged, inserted);

        let err = repo
            .update_status(
                "AREF000001",
                &StatusUpdate {
                    status: TxStatus::Created,
                    paid_at: None,
                    allowed_from: Some(vec![]),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupt_status_is_storage_failure() {
        let pool = db::connect_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO transactions (reference_no, partner_reference_no, merchant_id, \
             amount_value_minor, currency, status, transaction_date) \
             VALUES ('ABAD', 'P', 'M', 1, 'IDR', 'REFUNDED', '2024-05-01T10:00:00.000000000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let repo = SqliteTransactionRepository::new(pool);
        let err = repo.get_by_reference_no("ABAD").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));
    }
}
