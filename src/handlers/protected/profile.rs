// The caller's own profile: GET and PUT /api/profile.
//
// The partition key is derived from the authenticated subject, so no
// ownership guard is involved; a caller can only ever reach their own item.

use serde_json::json;

use crate::api::format::{self, Resource};
use crate::api::{ApiRequest, ApiResponse};
use crate::error::ApiError;
use crate::handlers::{authenticate, now_iso};
use crate::router::App;
use crate::store::{keys, Patch};

pub async fn get(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let item = app
        .store
        .get(&keys::user(&caller_id), keys::PROFILE)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    Ok(ApiResponse::ok(&json!({
        "success": true,
        "profile": format::to_wire(Resource::Profile, &item),
    })))
}

pub async fn update(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let pk = keys::user(&caller_id);
    if app.store.get(&pk, keys::PROFILE).await?.is_none() {
        return Err(ApiError::not_found("Profile not found"));
    }

    let body = req.json_object()?;
    let mut patch: Patch = format::to_storage(Resource::Profile, &body);
    patch.remove("email"); // the login identity owns the email address
    patch.insert("updated_at".into(), now_iso().into());

    let updated = app.store.update(&pk, keys::PROFILE, patch).await?;
    Ok(ApiResponse::ok(&json!({
        "success": true,
        "message": "Profile updated successfully",
        "profile": format::to_wire(Resource::Profile, &updated),
    })))
}
