//! Image CAPTCHA endpoint.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use super::ApiError;
use crate::state::AppState;

/// Issue a CAPTCHA for the client-chosen id and return the image
pub async fn image_code(
    State(state): State<AppState>,
    Path(image_code_id): Path<String>,
) -> Result<Response, ApiError> {
    let image = state.challenges.issue(&image_code_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "no-store"),
        ],
        image.bytes,
    )
        .into_response())
}
