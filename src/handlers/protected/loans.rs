// Loan sub-records: POST /api/properties/{id}/loans plus PUT/DELETE on
// /api/properties/{id}/loans/{loanId}.
//
// Every operation re-derives ownership from the parent property first; a
// loan item's own attributes are never trusted for authorization.

use serde_json::json;
use uuid::Uuid;

use crate::api::format::{self, Resource};
use crate::api::{ApiRequest, ApiResponse};
use crate::auth::ownership::Action;
use crate::error::ApiError;
use crate::handlers::{authenticate, load_property, now_iso, require_owner};
use crate::router::App;
use crate::store::{keys, Attribute, Patch, PK, SK};

pub async fn create(
    app: &App,
    req: &ApiRequest,
    property_id: &str,
) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let parent = load_property(app, property_id).await?;
    require_owner(&caller_id, &parent, Action::Update)?;

    let body = req.json_object()?;
    let loan_id = Uuid::new_v4().to_string();
    let now = now_iso();

    let mut item = format::to_storage(Resource::Loan, &body);
    item.entry("is_active".into()).or_insert(Attribute::Bool(true));
    item.insert(PK.into(), keys::property(property_id).into());
    item.insert(SK.into(), keys::loan(&loan_id).into());
    item.insert("id".into(), loan_id.into());
    item.insert("property_id".into(), property_id.into());
    item.insert("created_at".into(), now.clone().into());
    item.insert("updated_at".into(), now.into());

    app.store.put(item.clone()).await?;

    Ok(ApiResponse::created(&json!({
        "loan": format::to_wire(Resource::Loan, &item)
    })))
}

pub async fn update(
    app: &App,
    req: &ApiRequest,
    property_id: &str,
    loan_id: &str,
) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let parent = load_property(app, property_id).await?;
    require_owner(&caller_id, &parent, Action::Update)?;

    let pk = keys::property(property_id);
    let sk = keys::loan(loan_id);
    if app.store.get(&pk, &sk).await?.is_none() {
        return Err(ApiError::not_found("Loan not found"));
    }

    let body = req.json_object()?;
    let mut patch: Patch = format::to_storage(Resource::Loan, &body);
    patch.insert("updated_at".into(), now_iso().into());

    let updated = app.store.update(&pk, &sk, patch).await?;
    Ok(ApiResponse::ok(&json!({
        "loan": format::to_wire(Resource::Loan, &updated)
    })))
}

pub async fn delete(
    app: &App,
    req: &ApiRequest,
    property_id: &str,
    loan_id: &str,
) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let parent = load_property(app, property_id).await?;
    require_owner(&caller_id, &parent, Action::Delete)?;

    let pk = keys::property(property_id);
    let sk = keys::loan(loan_id);
    if app.store.get(&pk, &sk).await?.is_none() {
        return Err(ApiError::not_found("Loan not found"));
    }

    app.store.delete(&pk, &sk).await?;
    Ok(ApiResponse::ok(&json!({ "message": "Loan deleted" })))
}
