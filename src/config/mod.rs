use std::env;

use anyhow::{bail, Context};

/// Process configuration: read from the environment once at startup,
/// validated, then passed by reference into the router and handlers. Nothing
/// re-reads the environment per request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub region: String,
    pub table_name: String,
    pub bucket_name: String,
    pub auth: AuthConfig,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiry_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let table_name =
            env::var("DYNAMODB_TABLE_NAME").context("DYNAMODB_TABLE_NAME is required")?;
        let bucket_name = env::var("S3_BUCKET_NAME").context("S3_BUCKET_NAME is required")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is required")?;
        if table_name.trim().is_empty() {
            bail!("DYNAMODB_TABLE_NAME must not be empty");
        }
        if bucket_name.trim().is_empty() {
            bail!("S3_BUCKET_NAME must not be empty");
        }
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            table_name,
            bucket_name,
            auth: AuthConfig {
                jwt_secret,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "guhae-api".to_string()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "guhae-web".to_string()),
                token_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(24),
            },
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
        })
    }
}
