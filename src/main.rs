use std::sync::Arc;

use anyhow::Context;

use guhae_api::auth::{IdentityProvider, JwtIdentityProvider};
use guhae_api::config::AppConfig;
use guhae_api::objects::{ObjectStore, S3ObjectStore};
use guhae_api::router::{http_router, App};
use guhae_api::store::{DynamoStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DYNAMODB_TABLE_NAME etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Configuration is read and validated exactly once; a missing table,
    // bucket, or signing secret fails startup instead of the first request.
    let config = AppConfig::from_env()?;
    tracing::info!(
        "starting guhae-api against table {} in {}",
        config.table_name,
        config.region
    );

    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()))
        .load()
        .await;

    let store: Arc<dyn Store> = Arc::new(DynamoStore::new(
        aws_sdk_dynamodb::Client::new(&aws),
        config.table_name.clone(),
    ));
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(JwtIdentityProvider::new(store.clone(), &config.auth));
    let objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
        aws_sdk_s3::Client::new(&aws),
        config.bucket_name.clone(),
        config.region.clone(),
    ));

    let port = config.port;
    let app = Arc::new(App::new(config, store, identity, objects));

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("guhae-api listening on http://{bind_addr}");
    axum::serve(listener, http_router(app))
        .await
        .context("server")?;
    Ok(())
}
