// Two handler tiers: public (no auth) and protected (bearer auth required).
pub mod protected;
pub mod public;

use crate::api::ApiRequest;
use crate::auth::ownership::{authorize, Access, Action};
use crate::error::ApiError;
use crate::router::App;
use crate::store::{keys, Item};

/// Resolve the caller from the request's bearer credential. Every protected
/// handler calls this before touching the store.
pub async fn authenticate(app: &App, req: &ApiRequest) -> Result<String, ApiError> {
    let token = req
        .bearer_token()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    Ok(app.identity.authenticate(token).await?)
}

/// Load a property's metadata item, or 404. Existence is checked before
/// ownership so a missing record never reports as forbidden.
pub async fn load_property(app: &App, property_id: &str) -> Result<Item, ApiError> {
    app.store
        .get(&keys::property(property_id), keys::METADATA)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))
}

/// Ownership check against a loaded record.
pub fn require_owner(caller_id: &str, record: &Item, action: Action) -> Result<(), ApiError> {
    match authorize(caller_id, record, action) {
        Access::Allow => Ok(()),
        Access::Deny => Err(ApiError::forbidden("You do not have access to this property")),
    }
}

/// UTC ISO-8601 timestamp for `created_at`/`updated_at`.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
