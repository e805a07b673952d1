//! Request router: maps (method, path) onto resource handlers over the
//! transport envelope.
//!
//! The CORS preflight short-circuits before any other work, and the
//! top-level catch guarantees every request - including a panicking handler -
//! produces a well-formed envelope.

use std::any::Any;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::Router;
use futures::FutureExt;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::api::{ApiRequest, ApiResponse};
use crate::auth::IdentityProvider;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::objects::ObjectStore;
use crate::store::Store;

/// Maximum accepted request body.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Process-wide dependencies: constructed once at startup, never mutated
/// afterwards, passed by reference into every handler.
pub struct App {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub objects: Arc<dyn ObjectStore>,
}

impl App {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            store,
            identity,
            objects,
        }
    }

    /// Handle one request end to end. Never fails: errors and panics both
    /// come back as enveloped responses.
    pub async fn dispatch(&self, req: ApiRequest) -> ApiResponse {
        tracing::debug!(method = %req.method, path = %req.path, "dispatch");

        // CORS preflight: answer before any routing or store work.
        if req.method == Method::OPTIONS {
            return ApiResponse::empty(StatusCode::OK);
        }

        match std::panic::AssertUnwindSafe(self.route(&req)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => err.to_response(),
            Err(panic) => {
                let message = panic_message(panic);
                tracing::error!("handler panicked: {message}");
                ApiResponse::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({ "error": message }),
                )
            }
        }
    }

    async fn route(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let path = req.path.trim_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match (req.method.as_str(), segments.as_slice()) {
            ("POST", ["api", "auth", "register"]) => public::auth::register(self, req).await,
            ("POST", ["api", "auth", "login"]) => public::auth::login(self, req).await,

            ("GET", ["api", "profile"]) => protected::profile::get(self, req).await,
            ("PUT", ["api", "profile"]) => protected::profile::update(self, req).await,

            // Sub-resource routes share the /api/properties prefix and must
            // be matched ahead of the single-property arms.
            ("GET", ["api", "properties", id, "finance"]) => {
                protected::finance::get(self, req, id).await
            }
            ("PUT", ["api", "properties", id, "finance"]) => {
                protected::finance::put(self, req, id).await
            }
            ("POST", ["api", "properties", id, "loans"]) => {
                protected::loans::create(self, req, id).await
            }
            ("PUT", ["api", "properties", id, "loans", loan_id]) => {
                protected::loans::update(self, req, id, loan_id).await
            }
            ("DELETE", ["api", "properties", id, "loans", loan_id]) => {
                protected::loans::delete(self, req, id, loan_id).await
            }
            ("POST", ["api", "properties", id, "images"]) => {
                protected::images::upload(self, req, id).await
            }

            ("GET", ["api", "properties"]) => protected::properties::list(self, req).await,
            ("POST", ["api", "properties"]) => protected::properties::create(self, req).await,
            ("GET", ["api", "properties", id]) => protected::properties::get(self, req, id).await,
            ("PUT", ["api", "properties", id]) => {
                protected::properties::update(self, req, id).await
            }
            ("DELETE", ["api", "properties", id]) => {
                protected::properties::delete(self, req, id).await
            }

            ("GET", ["api", "dashboard"]) => protected::dashboard::stats(self, req).await,
            ("GET", ["api", "health"]) => public::health::status(self).await,

            _ => Err(ApiError::not_found("Not found")),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "internal error".to_string()
    }
}

/// The axum host: every request, any method or path, is adapted into the
/// transport envelope and dispatched.
pub fn http_router(app: Arc<App>) -> Router {
    Router::new()
        .fallback(envelope_handler)
        .with_state(app)
        .layer(TraceLayer::new_for_http())
}

async fn envelope_handler(State(app): State<Arc<App>>, request: Request) -> ApiResponse {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return ApiError::bad_request("Unable to read request body").to_response(),
    };

    let api_request = ApiRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body: (!bytes.is_empty()).then(|| String::from_utf8_lossy(&bytes).into_owned()),
    };
    app.dispatch(api_request).await
}
