//! Storage port for transactions.
//! Use cases depend on this trait; adapters provide the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{NewTransaction, Transaction, TxStatus};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("duplicate reference number: {0}")]
    DuplicateReference(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::Storage(e.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Conjunctive listing filter. `None` and empty strings leave a field unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxFilter {
    pub merchant_id: Option<String>,
    pub reference_no: Option<String>,
    pub partner_reference_no: Option<String>,
    pub status: Option<TxStatus>,
}

/// A bounded page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Coerces caller input: a limit outside `1..=200` becomes 50, a negative offset becomes 0.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(n) if (1..=MAX_PAGE_LIMIT).contains(&n) => n,
            _ => DEFAULT_PAGE_LIMIT,
        };
        let offset = offset.filter(|n| *n >= 0).unwrap_or(0);
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

/// A status change applied in a single statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: TxStatus,
    /// Left untouched in storage when `None`.
    pub paid_at: Option<DateTime<Utc>>,
    /// When set, the row only matches if its current status is one of these.
    pub allowed_from: Option<Vec<TxStatus>>,
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &NewTransaction) -> RepositoryResult<Transaction>;

    async fn get_by_reference_no(&self, reference_no: &str) -> RepositoryResult<Transaction>;

    async fn list(&self, filter: &TxFilter, page: Page) -> RepositoryResult<Vec<Transaction>>;

    /// Returns the updated row, or `NotFound` when no row matched.
    async fn update_status(
        &self,
        reference_no: &str,
        update: &StatusUpdate,
    ) -> RepositoryResult<Transaction>;
}
