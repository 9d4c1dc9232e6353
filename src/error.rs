use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::AmountError;
use crate::middleware::signature::SignatureError;
use crate::ports::RepositoryError;
use crate::use_cases::LifecycleError;
use crate::validation::ValidationError;

/// Errors as they leave the HTTP boundary. The status mapping lives here and
/// nowhere else.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate reference number: {0}")]
    DuplicateReference(String),

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),
}

/// Machine-readable error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(value_type = String, example = "NOT_FOUND")]
    pub error: &'static str,
    pub message: String,
    pub status: u16,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedInput(_)
            | AppError::ValidationFailed(_)
            | AppError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            AppError::Signature(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateReference(_) | AppError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            AppError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MalformedInput(_) => "MALFORMED_INPUT",
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::InvalidAmount(_) => "INVALID_AMOUNT",
            AppError::Signature(SignatureError::MissingSignatureHeaders) => {
                "MISSING_SIGNATURE_HEADERS"
            }
            AppError::Signature(SignatureError::InvalidTimestamp) => "INVALID_TIMESTAMP",
            AppError::Signature(SignatureError::SignatureExpired) => "SIGNATURE_EXPIRED",
            AppError::Signature(SignatureError::InvalidSignature) => "INVALID_SIGNATURE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Engine details stay in the logs.
            AppError::StorageFailure(_) => "internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(reference_no) => {
                AppError::NotFound(format!("transaction {} not found", reference_no))
            }
            RepositoryError::DuplicateReference(reference_no) => {
                AppError::DuplicateReference(reference_no)
            }
            RepositoryError::Storage(msg) => AppError::StorageFailure(msg),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidAmount(amount) => {
                AppError::InvalidAmount(format!("amount must be greater than zero, got {}", amount))
            }
            LifecycleError::InvalidTransition { from, to } => {
                AppError::InvalidTransition(format!("{} -> {}", from, to))
            }
            LifecycleError::Repository(inner) => inner.into(),
        }
    }
}

impl From<AmountError> for AppError {
    fn from(e: AmountError) -> Self {
        AppError::InvalidAmount(e.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::ValidationFailed(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::StorageFailure(detail) = &self {
            tracing::error!(error = %detail, "storage failure");
        }

        let body = Json(ErrorBody {
            error: self.code(),
            message: self.public_message(),
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}
