//! Username and mobile existence endpoints.

use axum::{
    Json,
    extract::{Path, State},
};

use tollgate_common::{ApiResponse, CountResponse};

use super::ApiError;
use crate::state::AppState;

pub async fn check_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.lookup.count_username(&username).await?;
    Ok(Json(ApiResponse::ok("", count)))
}

pub async fn check_mobile(
    State(state): State<AppState>,
    Path(mobile): Path<String>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.lookup.count_mobile(&mobile).await?;
    Ok(Json(ApiResponse::ok("", count)))
}
