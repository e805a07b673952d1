mod common;

use anyhow::Result;
use serde_json::json;

use common::{body_json, build_app, register_and_login, request};

#[tokio::test]
async fn register_returns_the_new_user() -> Result<()> {
    let app = build_app();

    let response = app
        .dispatch(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "casey",
                "password": "hunter2!",
                "email": "casey@example.com",
                "profile": {"firstName": "Casey", "lastName": "Kim", "accountType": "owner"},
            })),
        ))
        .await;

    assert_eq!(response.status.as_u16(), 201);
    let body = body_json(&response);
    assert_eq!(body["success"], json!(true));
    assert!(body["user"]["user_id"].as_str().is_some());
    assert_eq!(body["user"]["username"], "casey");
    assert_eq!(body["user"]["firstName"], "Casey");
    assert_eq!(body["user"]["accountType"], "owner");
    Ok(())
}

#[tokio::test]
async fn register_requires_username_password_and_email() -> Result<()> {
    let app = build_app();

    for payload in [
        json!({"password": "p", "email": "e@example.com"}),
        json!({"username": "u", "email": "e@example.com"}),
        json!({"username": "u", "password": "p"}),
        json!({"username": "  ", "password": "p", "email": "e@example.com"}),
    ] {
        let response = app
            .dispatch(request("POST", "/api/auth/register", None, Some(payload)))
            .await;
        assert_eq!(response.status.as_u16(), 400);
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let app = build_app();
    register_and_login(&app, "casey").await;

    let response = app
        .dispatch(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"username": "casey", "password": "other", "email": "second@example.com"})),
        ))
        .await;

    assert_eq!(response.status.as_u16(), 409);
    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_credentials() -> Result<()> {
    let app = build_app();
    register_and_login(&app, "casey").await;

    let response = app
        .dispatch(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "casey", "password": "wrong"})),
        ))
        .await;
    assert_eq!(response.status.as_u16(), 401);

    let response = app
        .dispatch(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "nobody", "password": "hunter2!"})),
        ))
        .await;
    assert_eq!(response.status.as_u16(), 401);
    Ok(())
}

#[tokio::test]
async fn profile_round_trip() -> Result<()> {
    let app = build_app();
    let token = register_and_login(&app, "casey").await;

    let response = app.dispatch(request("GET", "/api/profile", Some(&token), None)).await;
    assert_eq!(response.status.as_u16(), 200);
    let body = body_json(&response);
    assert_eq!(body["profile"]["email"], "casey@example.com");
    assert_eq!(body["profile"]["firstName"], "Test");

    let response = app
        .dispatch(request(
            "PUT",
            "/api/profile",
            Some(&token),
            Some(json!({
                "firstName": "Casey",
                "phone": "555-0100",
                "address": {"street": "1 Main St", "city": "Springfield", "state": "IL", "zip": "62701"},
            })),
        ))
        .await;
    assert_eq!(response.status.as_u16(), 200);
    let body = body_json(&response);
    assert_eq!(body["profile"]["firstName"], "Casey");
    assert_eq!(body["profile"]["phone"], "555-0100");
    // Address always comes back in its fixed shape.
    let address = body["profile"]["address"].as_object().unwrap();
    for field in ["street", "city", "county", "state", "zip", "country"] {
        assert!(address.contains_key(field), "missing {field}");
    }
    assert_eq!(address["city"], "Springfield");
    assert_eq!(address["country"], "");
    Ok(())
}

#[tokio::test]
async fn profile_requires_authentication() -> Result<()> {
    let app = build_app();

    let response = app.dispatch(request("GET", "/api/profile", None, None)).await;
    assert_eq!(response.status.as_u16(), 401);

    let response = app
        .dispatch(request("GET", "/api/profile", Some("not-a-token"), None))
        .await;
    assert_eq!(response.status.as_u16(), 401);
    Ok(())
}

#[tokio::test]
async fn profile_email_is_not_client_writable() -> Result<()> {
    let app = build_app();
    let token = register_and_login(&app, "casey").await;

    let response = app
        .dispatch(request(
            "PUT",
            "/api/profile",
            Some(&token),
            Some(json!({"email": "forged@example.com", "firstName": "Casey"})),
        ))
        .await;

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(body_json(&response)["profile"]["email"], "casey@example.com");
    Ok(())
}
