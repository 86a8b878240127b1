mod config;
mod error;
mod gateway;
mod images;
mod llm;
mod models;
mod prompts;
mod routes;
mod sanitize;
mod schema;
mod youtube;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::Config,
    gateway::Gateway,
    images::AiGuruLabClient,
    llm::OpenRouterClient,
    routes::{build_router, AppState},
    youtube::YoutubeClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("refusing to start")?;
    tracing::info!(?config, "Configuration loaded");
    if config.youtube_api_key.is_none() {
        tracing::warn!("YOUTUBE_API_KEY not set, course chapters will have no videos");
    }
    if config.image_api_key.is_none() {
        tracing::warn!("AI_GURU_LAB_API not set, /api/generate-image will answer with an error");
    }

    let gateway = Gateway::new(
        &config,
        Arc::new(OpenRouterClient::new(&config)),
        Arc::new(YoutubeClient::new(&config)),
        Arc::new(AiGuruLabClient::new(&config)),
    );
    let state = AppState { gateway: Arc::new(gateway), development: config.development };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, model = %config.primary_model(), "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}
