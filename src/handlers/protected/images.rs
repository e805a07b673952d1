// POST /api/properties/{id}/images - upload a property image.
//
// The blob goes to the object store under properties/{id}/{uuid}.{ext}; the
// returned URL is appended to the property's images list.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::format::{self, Resource};
use crate::api::{ApiRequest, ApiResponse};
use crate::auth::ownership::Action;
use crate::error::ApiError;
use crate::handlers::{authenticate, load_property, now_iso, require_owner};
use crate::router::App;
use crate::store::{keys, Attribute, Patch};

pub async fn upload(
    app: &App,
    req: &ApiRequest,
    property_id: &str,
) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let item = load_property(app, property_id).await?;
    require_owner(&caller_id, &item, Action::Update)?;

    let body = req.json_object()?;
    let encoded = body
        .get("data")
        .and_then(Value::as_str)
        .filter(|data| !data.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Image data is required"))?;
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|_| ApiError::bad_request("Image data is not valid base64"))?;

    let filename = body.get("filename").and_then(Value::as_str).unwrap_or("");
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("jpg");
    let content_type = body
        .get("contentType")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("image/{extension}"));

    let key = format!("properties/{property_id}/{}.{extension}", Uuid::new_v4());
    let url = app.objects.put(&key, bytes, &content_type).await?;

    let mut images = match item.get("images") {
        Some(Attribute::L(values)) => values.clone(),
        _ => Vec::new(),
    };
    images.push(Attribute::S(url.clone()));

    let mut patch = Patch::new();
    patch.insert("images".into(), Attribute::L(images));
    patch.insert("updated_at".into(), now_iso().into());
    let updated = app
        .store
        .update(&keys::property(property_id), keys::METADATA, patch)
        .await?;

    Ok(ApiResponse::created(&json!({
        "url": url,
        "property": format::to_wire(Resource::Property, &updated),
    })))
}
