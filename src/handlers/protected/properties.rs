// Property CRUD: list (owner-scoped), create, get, update, delete.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::{self, Resource};
use crate::api::{ApiRequest, ApiResponse};
use crate::auth::ownership::Action;
use crate::error::ApiError;
use crate::handlers::{authenticate, load_property, now_iso, require_owner};
use crate::router::App;
use crate::store::{keys, Attribute, Item, Patch, ScanFilter, GSI1, GSI1_PK, PK, SK};

/// Cap applied to the degraded-mode full-table scan.
const FALLBACK_SCAN_LIMIT: usize = 1000;

/// Every property belonging to a caller. The owner index is the primary
/// path; if it fails, degrade to a prefix scan filtered client-side by
/// owner. The fallback is not an error, only slower.
pub async fn owned_properties(app: &App, caller_id: &str) -> Result<Vec<Item>, ApiError> {
    match app.store.query_index(GSI1, &keys::owner(caller_id)).await {
        Ok(items) => Ok(items),
        Err(err) => {
            tracing::warn!("owner index unavailable, scanning instead: {err}");
            let filter = ScanFilter {
                pk_prefix: Some(keys::PROPERTY_PREFIX.to_string()),
            };
            let scanned = app.store.scan(&filter, Some(FALLBACK_SCAN_LIMIT)).await?;
            Ok(scanned
                .into_iter()
                .filter(|item| {
                    matches!(item.get("owner_id"), Some(Attribute::S(owner)) if owner == caller_id)
                })
                .collect())
        }
    }
}

pub async fn list(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let items = owned_properties(app, &caller_id).await?;
    let properties: Vec<Value> = items
        .iter()
        .map(|item| format::to_wire(Resource::Property, item))
        .collect();
    Ok(ApiResponse::ok(&json!({ "properties": properties })))
}

pub async fn create(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let body = req.json_object()?;

    // The only create-time constraints: a title, and a non-negative price.
    let title_ok = body
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|title| !title.trim().is_empty());
    if !title_ok {
        return Err(ApiError::bad_request("Property title is required"));
    }
    if body.get("price").and_then(Value::as_f64).is_some_and(|price| price < 0.0) {
        return Err(ApiError::bad_request("Property price cannot be negative"));
    }

    let property_id = Uuid::new_v4().to_string();
    let now = now_iso();

    let mut item = format::to_storage(Resource::Property, &body);
    item.entry("description".into()).or_insert("".into());
    item.entry("property_type".into()).or_insert("residential".into());
    item.entry("price".into())
        .or_insert(Attribute::N(rust_decimal::Decimal::ZERO));
    item.entry("status".into()).or_insert("active".into());
    item.insert(PK.into(), keys::property(&property_id).into());
    item.insert(SK.into(), keys::METADATA.into());
    item.insert(GSI1_PK.into(), keys::owner(&caller_id).into());
    item.insert("id".into(), property_id.into());
    item.insert("owner_id".into(), caller_id.into());
    item.insert("images".into(), Attribute::L(Vec::new()));
    item.insert("created_at".into(), now.clone().into());
    item.insert("updated_at".into(), now.into());

    app.store.put(item.clone()).await?;

    Ok(ApiResponse::created(&json!({
        "property": format::to_wire(Resource::Property, &item)
    })))
}

pub async fn get(app: &App, req: &ApiRequest, property_id: &str) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let item = load_property(app, property_id).await?;
    require_owner(&caller_id, &item, Action::Read)?;
    Ok(ApiResponse::ok(&json!({
        "property": format::to_wire(Resource::Property, &item)
    })))
}

pub async fn update(
    app: &App,
    req: &ApiRequest,
    property_id: &str,
) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let item = load_property(app, property_id).await?;
    require_owner(&caller_id, &item, Action::Update)?;

    let body = req.json_object()?;
    // Only fields in the property table can land in the patch, so `owner_id`
    // and the key attributes stay immutable no matter what the request sends.
    let mut patch: Patch = format::to_storage(Resource::Property, &body);
    patch.insert("updated_at".into(), now_iso().into());

    let updated = app
        .store
        .update(&keys::property(property_id), keys::METADATA, patch)
        .await?;
    Ok(ApiResponse::ok(&json!({
        "property": format::to_wire(Resource::Property, &updated)
    })))
}

pub async fn delete(
    app: &App,
    req: &ApiRequest,
    property_id: &str,
) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let item = load_property(app, property_id).await?;
    require_owner(&caller_id, &item, Action::Delete)?;

    app.store
        .delete(&keys::property(property_id), keys::METADATA)
        .await?;
    // Finance and loan children are not cascaded; they become unreachable
    // through the API once the parent existence check 404s.
    Ok(ApiResponse::ok(&json!({ "message": "Property deleted" })))
}
