// POST /api/auth/register and POST /api/auth/login
//
// Both endpoints are identity-provider backed. Registration also stores the
// extended profile as a `PROFILE` item so `GET /api/profile` works from the
// first login.

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use crate::api::format::{self, Resource};
use crate::api::{ApiRequest, ApiResponse};
use crate::auth::NewUser;
use crate::error::ApiError;
use crate::handlers::now_iso;
use crate::router::App;
use crate::store::{keys, Attribute, Item, PK, SK};

pub async fn register(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let body = req.json_object()?;
    let username = required_text(&body, "username");
    let password = required_text(&body, "password");
    let email = required_text(&body, "email");
    let (Some(username), Some(password), Some(email)) = (username, password, email) else {
        return Err(ApiError::bad_request(
            "Username, password, and email are required",
        ));
    };

    let registered = app
        .identity
        .register(NewUser {
            username,
            password,
            email,
        })
        .await?;

    // Extended profile fields ride along under a `profile` object.
    let profile = body
        .get("profile")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let item = profile_item(&registered.user_id, &registered.email, &profile);
    app.store.put(item.clone()).await?;

    Ok(ApiResponse::created(&json!({
        "success": true,
        "message": "User registered successfully",
        "user": {
            "user_id": registered.user_id,
            "username": registered.username,
            "email": registered.email,
            "firstName": profile.get("firstName").and_then(Value::as_str).unwrap_or(""),
            "lastName": profile.get("lastName").and_then(Value::as_str).unwrap_or(""),
            "accountType": item
                .get("account_type")
                .and_then(Attribute::as_str)
                .unwrap_or("tenant"),
        },
    })))
}

pub async fn login(app: &App, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let body = req.json_object()?;
    let username = required_text(&body, "username");
    let password = required_text(&body, "password");
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    let session = app.identity.login(&username, &password).await?;

    Ok(ApiResponse::json(
        StatusCode::OK,
        &json!({
            "success": true,
            "message": "Login successful",
            "user": {
                "user_id": session.user_id,
                "username": session.username,
                "email": session.email,
            },
            "tokens": {
                "access_token": session.access_token,
                "refresh_token": session.refresh_token,
                "expires_in": session.expires_in,
            },
        }),
    ))
}

fn required_text(body: &Map<String, Value>, field: &str) -> Option<String> {
    let text = body.get(field)?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn profile_item(user_id: &str, email: &str, profile: &Map<String, Value>) -> Item {
    let now = now_iso();
    let mut item = format::to_storage(Resource::Profile, profile);
    item.insert(PK.into(), keys::user(user_id).into());
    item.insert(SK.into(), keys::PROFILE.into());
    item.insert("id".into(), user_id.into());
    item.insert("user_id".into(), user_id.into());
    item.insert("email".into(), email.into());
    item.entry("account_type".into()).or_insert("tenant".into());
    item.insert("status".into(), "active".into());
    item.insert("created_at".into(), now.clone().into());
    item.insert("updated_at".into(), now.into());
    item
}
