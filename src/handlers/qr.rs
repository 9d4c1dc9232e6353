use axum::{body::Bytes, extract::State, Json};

use crate::domain::{to_minor_units, AmountError};
use crate::error::AppError;
use crate::handlers::parse_json;
use crate::schemas::{
    GenerateQrRequest, GenerateQrResponse, PaymentCallbackRequest, PaymentCallbackResponse,
    GENERATE_QR_SUCCESS_CODE, PAYMENT_CALLBACK_SUCCESS_CODE, SUCCESS_MESSAGE,
};
use crate::use_cases::{ApplyPaymentCallback, CallbackInput, GenerateQr, GenerateQrInput};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/qr/generate",
    request_body = GenerateQrRequest,
    params(
        ("X-Timestamp" = String, Header, description = "Unix seconds"),
        ("X-Signature" = String, Header, description = "hex HMAC-SHA256 of body.timestamp")
    ),
    responses(
        (status = 200, description = "Transaction created", body = GenerateQrResponse),
        (status = 400, description = "Malformed or invalid request", body = crate::error::ErrorBody),
        (status = 401, description = "Signature rejected", body = crate::error::ErrorBody),
        (status = 409, description = "Reference number collision", body = crate::error::ErrorBody)
    ),
    tag = "QR"
)]
pub async fn generate_qr(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateQrResponse>, AppError> {
    let req: GenerateQrRequest = parse_json(&body)?;
    req.validate()?;
    let amount_minor = to_minor_units(&req.amount.value)?;

    let output = GenerateQr::new(state.repository.clone())
        .execute(GenerateQrInput {
            merchant_id: req.merchant_id,
            partner_reference_no: req.partner_reference_no,
            amount_minor,
            currency: req.amount.currency,
        })
        .await?;

    Ok(Json(GenerateQrResponse {
        response_code: GENERATE_QR_SUCCESS_CODE.to_string(),
        response_message: SUCCESS_MESSAGE.to_string(),
        reference_no: output.transaction.reference_no,
        partner_reference_no: output.transaction.partner_reference_no,
        qr_content: output.qr_content,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/qr/payment",
    request_body = PaymentCallbackRequest,
    params(
        ("X-Timestamp" = String, Header, description = "Unix seconds"),
        ("X-Signature" = String, Header, description = "hex HMAC-SHA256 of body.timestamp")
    ),
    responses(
        (status = 200, description = "Callback applied", body = PaymentCallbackResponse),
        (status = 400, description = "Malformed or invalid request", body = crate::error::ErrorBody),
        (status = 401, description = "Signature rejected", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown reference number", body = crate::error::ErrorBody),
        (status = 409, description = "Status transition not allowed", body = crate::error::ErrorBody)
    ),
    tag = "QR"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PaymentCallbackResponse>, AppError> {
    let req: PaymentCallbackRequest = parse_json(&body)?;
    req.validate()?;
    // Must parse; the stored amount is authoritative, so range is not checked.
    if let Err(e @ AmountError::Invalid(_)) = to_minor_units(&req.amount.value) {
        return Err(e.into());
    }

    ApplyPaymentCallback::new(state.repository.clone(), state.transition_policy)
        .execute(CallbackInput {
            original_reference_no: req.original_reference_no.clone(),
            status: req.status(),
            paid_at: req.paid_time,
        })
        .await?;

    Ok(Json(PaymentCallbackResponse {
        response_code: PAYMENT_CALLBACK_SUCCESS_CODE.to_string(),
        response_message: SUCCESS_MESSAGE.to_string(),
        transaction_status_desc: req.transaction_status_desc,
    }))
}
