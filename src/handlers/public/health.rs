// GET /api/health - store connectivity probe, no authentication.

use axum::http::StatusCode;
use serde_json::json;

use crate::api::ApiResponse;
use crate::error::ApiError;
use crate::handlers::now_iso;
use crate::router::App;
use crate::store::ScanFilter;

pub async fn status(app: &App) -> Result<ApiResponse, ApiError> {
    match app.store.scan(&ScanFilter::default(), Some(1)).await {
        Ok(_) => Ok(ApiResponse::ok(&json!({
            "status": "healthy",
            "timestamp": now_iso(),
            "version": env!("CARGO_PKG_VERSION"),
            "services": {
                "database": "healthy",
                "storage": "healthy",
            },
        }))),
        Err(err) => {
            tracing::warn!("health probe failed: {err}");
            Ok(ApiResponse::json(
                StatusCode::SERVICE_UNAVAILABLE,
                &json!({
                    "status": "unhealthy",
                    "timestamp": now_iso(),
                    "error": err.to_string(),
                }),
            ))
        }
    }
}
