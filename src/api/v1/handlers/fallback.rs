use crate::error::AppError;

/// Unmatched routes get the same JSON error body as everything else.
pub async fn not_found() -> AppError {
    AppError::not_found("route")
}
