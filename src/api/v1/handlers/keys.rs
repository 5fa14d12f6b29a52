/*
 * Responsibility
 * - Endpoints addressed by an API key in the path
 * - The key has already been accepted by the path auth gate when these run
 */
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};

use crate::api::v1::dto::keys::WhoAmIResponse;
use crate::error::AppError;
use crate::state::AppState;

pub async fn whoami(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<WhoAmIResponse>, AppError> {
    // The gate only answers yes/no and leaves the request untouched, so the
    // client name is looked up again here.
    let client = state
        .api_keys
        .client_for(&key)
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(client, "whoami");

    Ok(Json(WhoAmIResponse {
        client: client.to_string(),
    }))
}

/// CORS preflight. The gate skips OPTIONS, so this answers without a valid key.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::ALLOW, HeaderValue::from_static("GET, OPTIONS"))],
    )
}
