// GET /api/dashboard - counts over the caller's properties.
//
// No aggregate queries: the handler lists the caller's properties (owner
// index, scan fallback) and counts statuses client-side.

use serde_json::json;

use crate::api::{ApiRequest, ApiResponse};
use crate::error::ApiError;
use crate::handlers::authenticate;
use crate::handlers::protected::properties::owned_properties;
use crate::router::App;
use crate::store::Attribute;

pub async fn stats(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let properties = owned_properties(app, &caller_id).await?;

    let with_status = |status: &str| {
        properties
            .iter()
            .filter(|item| {
                matches!(item.get("status"), Some(Attribute::S(current)) if current == status)
            })
            .count()
    };

    Ok(ApiResponse::ok(&json!({
        "total_properties": properties.len(),
        "active_properties": with_status("active"),
        "vacant_properties": with_status("vacant"),
        // Future aggregates; always zero until those features exist.
        "maintenance_requests": 0,
        "rent_collected_this_month": 0,
    })))
}
