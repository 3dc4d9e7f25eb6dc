mod common;
mod config;
mod routes;

mod database;
mod extraction;
mod operations;
mod workbook;

use crate::config::Config;
use crate::database::services::Database;
use crate::database::store::{DocumentStore, HttpDocumentStore, JsonFileStore};
use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up tracing/logging
    tracing_subscriber::fmt::init();

    // Load configuration and environment variables to pass to the application
    let config: Config = Config::from_env();

    let store: Arc<dyn DocumentStore> = match config.remote_persistence() {
        Some((load_url, save_url)) => {
            tracing::info!(%load_url, %save_url, "using remote document store");
            Arc::new(HttpDocumentStore::new(load_url, save_url))
        }
        None => {
            let store = JsonFileStore::new(&config.db_path);
            tracing::info!(path = %store.path().display(), "using JSON file document store");
            Arc::new(store)
        }
    };
    let database = Database::new(store);

    if database.ping().await {
        tracing::info!("document store reachable");
    } else {
        tracing::warn!("document store unreachable, requests will fail until it recovers");
    }

    tracing::info!(
        "Starting server {} ({} deployment) ...",
        config.app_name,
        config.deployment.to_uppercase()
    );

    let addr: std::net::SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid LISTEN_ADDR '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Listening on {addr}");

    let router = routes::build_router(database, &config);
    axum::serve(listener, router.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
