pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod schemas;
pub mod startup;
pub mod telemetry;
pub mod use_cases;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::adapters::SqliteTransactionRepository;
use crate::config::Config;
use crate::handlers::ApiDoc;
use crate::middleware::request_logger::{request_logger_middleware, REQUEST_ID_HEADER};
use crate::middleware::signature::{
    signature_middleware, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use crate::ports::TransactionRepository;
use crate::use_cases::TransitionPolicy;

const CORS_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub repository: Arc<dyn TransactionRepository>,
    pub transition_policy: TransitionPolicy,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &Config) -> Self {
        let repository = Arc::new(SqliteTransactionRepository::new(db.clone()));
        Self {
            db,
            repository,
            transition_policy: TransitionPolicy::from_strict(config.strict_status_transitions),
        }
    }
}

pub fn create_app(state: AppState, verifier: SignatureVerifier, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/qr/generate", post(handlers::qr::generate_qr))
        .route("/qr/payment", post(handlers::qr::payment_callback))
        .route("/transactions", get(handlers::transactions::list_transactions))
        .route(
            "/transactions/:reference_no",
            get(handlers::transactions::get_transaction),
        )
        .route("/healthz", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(axum::middleware::from_fn_with_state(verifier, signature_middleware))
        .layer(axum::middleware::from_fn(request_logger_middleware))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(CORS_MAX_AGE)
}
