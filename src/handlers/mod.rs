pub mod qr;
pub mod transactions;

use crate::domain::TxStatus;
use crate::error::{AppError, ErrorBody};
use crate::schemas::{
    AmountPayload, GenerateQrRequest, GenerateQrResponse, PaymentCallbackRequest,
    PaymentCallbackResponse, TransactionItem,
};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub db: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = HealthStatus)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "ok".to_string(),
                db: "connected".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "unavailable".to_string(),
                    db: "disconnected".to_string(),
                }),
            )
        }
    }
}

/// Decodes a JSON body, reporting syntax and type errors as `MalformedInput`.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedInput(e.to_string()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        qr::generate_qr,
        qr::payment_callback,
        transactions::list_transactions,
        transactions::get_transaction,
    ),
    components(schemas(
        HealthStatus,
        AmountPayload,
        GenerateQrRequest,
        GenerateQrResponse,
        PaymentCallbackRequest,
        PaymentCallbackResponse,
        TransactionItem,
        TxStatus,
        ErrorBody,
    )),
    tags(
        (name = "QR", description = "QR generation and payment callbacks"),
        (name = "Transactions", description = "Transaction queries"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_reports_malformed_input() {
        let err = parse_json::<GenerateQrRequest>(b"{not json").unwrap_err();
        assert_eq!(err.code(), "MALFORMED_INPUT");

        let err = parse_json::<GenerateQrRequest>(br#"{"amount": 5}"#).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_INPUT");
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/api/v1/healthz",
            "/api/v1/qr/generate",
            "/api/v1/qr/payment",
            "/api/v1/transactions",
            "/api/v1/transactions/{referenceNo}",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }
}
