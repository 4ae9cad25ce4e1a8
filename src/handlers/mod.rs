pub mod events;
pub mod health;
pub mod logs;
pub mod metrics_handler;

use axum::http::Uri;

use crate::error::AppError;

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
