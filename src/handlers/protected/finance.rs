// Finance sub-record: GET and PUT under /api/properties/{id}/finance.
//
// Ownership is always re-derived from the parent property; the sub-record
// itself is never trusted for it. The GET also returns the property's loan
// collection (a partition query with the LOAN# sort-key prefix).

use serde_json::{json, Value};

use crate::api::format::{self, Resource};
use crate::api::{ApiRequest, ApiResponse};
use crate::auth::ownership::Action;
use crate::error::ApiError;
use crate::handlers::{authenticate, load_property, now_iso, require_owner};
use crate::router::App;
use crate::store::{keys, Patch, PK, SK};

pub async fn get(app: &App, req: &ApiRequest, property_id: &str) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let parent = load_property(app, property_id).await?;
    require_owner(&caller_id, &parent, Action::Read)?;

    let pk = keys::property(property_id);
    let finance = app.store.get(&pk, keys::FINANCE).await?;
    let loans = app.store.query_partition(&pk, Some(keys::LOAN_PREFIX)).await?;

    let finance_value = finance
        .map(|item| format::to_wire(Resource::Finance, &item))
        .unwrap_or(Value::Null);
    let loan_values: Vec<Value> = loans
        .iter()
        .map(|item| format::to_wire(Resource::Loan, item))
        .collect();

    Ok(ApiResponse::ok(&json!({
        "finance": finance_value,
        "loans": loan_values,
    })))
}

pub async fn put(app: &App, req: &ApiRequest, property_id: &str) -> Result<ApiResponse, ApiError> {
    let caller_id = authenticate(app, req).await?;
    let parent = load_property(app, property_id).await?;
    require_owner(&caller_id, &parent, Action::Update)?;

    let body = req.json_object()?;
    let pk = keys::property(property_id);
    let now = now_iso();

    // Singleton sub-record: the first PUT creates it, later PUTs overwrite
    // the provided fields.
    let existing = app.store.get(&pk, keys::FINANCE).await?;
    let updated = match existing {
        Some(_) => {
            let mut patch: Patch = format::to_storage(Resource::Finance, &body);
            patch.insert("updated_at".into(), now.into());
            app.store.update(&pk, keys::FINANCE, patch).await?
        }
        None => {
            let mut item = format::to_storage(Resource::Finance, &body);
            item.insert(PK.into(), pk.clone().into());
            item.insert(SK.into(), keys::FINANCE.into());
            item.insert("id".into(), property_id.into());
            item.insert("property_id".into(), property_id.into());
            item.insert("created_at".into(), now.clone().into());
            item.insert("updated_at".into(), now.into());
            app.store.put(item.clone()).await?;
            item
        }
    };

    Ok(ApiResponse::ok(&json!({
        "finance": format::to_wire(Resource::Finance, &updated)
    })))
}
