#![allow(dead_code)] // each test binary uses a subset of these helpers

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, Method};
use serde_json::{json, Value};

use guhae_api::api::{ApiRequest, ApiResponse};
use guhae_api::auth::JwtIdentityProvider;
use guhae_api::config::{AppConfig, AuthConfig};
use guhae_api::objects::MemoryObjectStore;
use guhae_api::router::App;
use guhae_api::store::{
    Item, MemoryStore, Patch, ScanFilter, Store, StoreError,
};

pub fn test_config() -> AppConfig {
    AppConfig {
        region: "us-east-1".into(),
        table_name: "guhae-test-data".into(),
        bucket_name: "guhae-test-storage".into(),
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".into(),
            issuer: "guhae-api".into(),
            audience: "guhae-web".into(),
            token_expiry_hours: 1,
        },
        port: 0,
    }
}

pub fn build_app() -> App {
    build_app_with_store(Arc::new(MemoryStore::new()))
}

pub fn build_app_with_store(store: Arc<dyn Store>) -> App {
    let config = test_config();
    let identity = Arc::new(JwtIdentityProvider::new(store.clone(), &config.auth));
    let objects = Arc::new(MemoryObjectStore::new());
    App::new(config, store, identity, objects)
}

pub fn request(method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> ApiRequest {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
    }
    ApiRequest {
        method: Method::from_bytes(method.as_bytes()).unwrap(),
        path: path.to_string(),
        headers,
        body: body.map(|value| value.to_string()),
    }
}

pub fn body_json(response: &ApiResponse) -> Value {
    serde_json::from_str(&response.body).expect("response body should be JSON")
}

/// Register a user and log in, returning their access token.
pub async fn register_and_login(app: &App, username: &str) -> String {
    let registered = app
        .dispatch(request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": username,
                "password": "hunter2!",
                "email": format!("{username}@example.com"),
                "profile": {"firstName": "Test", "lastName": "User"},
            })),
        ))
        .await;
    assert_eq!(registered.status.as_u16(), 201, "register failed: {}", registered.body);

    let login = app
        .dispatch(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": username, "password": "hunter2!"})),
        ))
        .await;
    assert_eq!(login.status.as_u16(), 200, "login failed: {}", login.body);
    body_json(&login)["tokens"]["access_token"]
        .as_str()
        .expect("login should return an access token")
        .to_string()
}

/// Create a property and return its id.
pub async fn create_property(app: &App, token: &str, body: Value) -> String {
    let response = app
        .dispatch(request("POST", "/api/properties", Some(token), Some(body)))
        .await;
    assert_eq!(response.status.as_u16(), 201, "create failed: {}", response.body);
    body_json(&response)["property"]["id"]
        .as_str()
        .expect("created property should have an id")
        .to_string()
}

/// A store whose secondary index is down; everything else delegates. Used to
/// drive the owner-list fallback path.
pub struct BrokenIndexStore {
    inner: MemoryStore,
}

impl BrokenIndexStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl Store for BrokenIndexStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError> {
        self.inner.get(pk, sk).await
    }

    async fn put(&self, item: Item) -> Result<(), StoreError> {
        self.inner.put(item).await
    }

    async fn update(&self, pk: &str, sk: &str, patch: Patch) -> Result<Item, StoreError> {
        self.inner.update(pk, sk, patch).await
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        self.inner.delete(pk, sk).await
    }

    async fn query_partition(
        &self,
        pk: &str,
        sk_prefix: Option<&str>,
    ) -> Result<Vec<Item>, StoreError> {
        self.inner.query_partition(pk, sk_prefix).await
    }

    async fn query_index(&self, _index: &str, _key: &str) -> Result<Vec<Item>, StoreError> {
        Err(StoreError::Unavailable("index offline".into()))
    }

    async fn scan(
        &self,
        filter: &ScanFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, StoreError> {
        self.inner.scan(filter, limit).await
    }
}

/// A store where every operation fails; drives the unhealthy/500 paths.
pub struct DownStore;

#[async_trait]
impl Store for DownStore {
    async fn get(&self, _pk: &str, _sk: &str) -> Result<Option<Item>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn put(&self, _item: Item) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn update(&self, _pk: &str, _sk: &str, _patch: Patch) -> Result<Item, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _pk: &str, _sk: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn query_partition(
        &self,
        _pk: &str,
        _sk_prefix: Option<&str>,
    ) -> Result<Vec<Item>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn query_index(&self, _index: &str, _key: &str) -> Result<Vec<Item>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn scan(
        &self,
        _filter: &ScanFilter,
        _limit: Option<usize>,
    ) -> Result<Vec<Item>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
