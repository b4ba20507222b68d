//! SMS code endpoints.
//!
//! Bodies are parsed by hand so an empty or malformed body is reported in
//! the API envelope like any other field error.

use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use serde::de::DeserializeOwned;

use tollgate_common::{
    ApiResponse, FieldErrors, IssuedCode, SmsCheckRequest, SmsCodeRequest, TollgateError,
};

use super::ApiError;
use crate::state::AppState;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, TollgateError> {
    let mut errors = FieldErrors::new();
    if body.is_empty() {
        errors.push("body", "Request body is empty");
        return Err(TollgateError::InvalidInput(errors));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Unparseable request body");
        errors.push("body", "Request body is not valid JSON");
        TollgateError::InvalidInput(errors)
    })
}

/// Sign-up: gate, then send a code by SMS
pub async fn registration_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<IssuedCode>>, ApiError> {
    let req: SmsCodeRequest = parse_body(&body)?;
    let issued = state.flows.issue_registration_code(&req).await?;
    Ok(Json(ApiResponse::ok("SMS code sent", issued)))
}

/// Password recovery: gate, then store a code without sending it
pub async fn recovery_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<IssuedCode>>, ApiError> {
    let req: SmsCodeRequest = parse_body(&body)?;
    let issued = state.flows.issue_recovery_code(&req).await?;
    Ok(Json(ApiResponse::ok("SMS code issued", issued)))
}

#[derive(Serialize)]
pub struct CheckedCode {
    mobile: String,
}

pub async fn check_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<CheckedCode>>, ApiError> {
    let req: SmsCheckRequest = parse_body(&body)?;
    let mobile = state.flows.check_code(&req).await?;
    Ok(Json(ApiResponse::ok("SMS code verified", CheckedCode { mobile })))
}
