use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::AppError;
use crate::schemas::{ListTransactionsQuery, TransactionItem};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    params(ListTransactionsQuery),
    responses(
        (status = 200, description = "Newest first", body = [TransactionItem]),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorBody)
    ),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<TransactionItem>>, AppError> {
    let filter = query.filter()?;
    let transactions = state.repository.list(&filter, query.page()).await?;

    Ok(Json(transactions.iter().map(TransactionItem::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/transactions/{referenceNo}",
    params(("referenceNo" = String, Path, description = "System-generated reference number")),
    responses(
        (status = 200, description = "Transaction found", body = TransactionItem),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorBody)
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(reference_no): Path<String>,
) -> Result<Json<TransactionItem>, AppError> {
    let tx = state.repository.get_by_reference_no(&reference_no).await?;
    Ok(Json(TransactionItem::from(&tx)))
}
