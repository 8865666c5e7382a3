use std::sync::Arc;
use std::time::Instant;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{anyhow, Context};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod config;
mod embedder;
mod error;
mod model;
mod routes;

use app::EmbeddingService;
use config::{Config, MAX_PAYLOAD_BYTES};
use embedder::RustBertEmbedder;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(model = %config.model_name, "loading embedding model");

    // rust-bert may download weights with a blocking client, keep it off the
    // async workers
    let started = Instant::now();
    let model_name = config.model_name.clone();
    let embedder = web::block(move || RustBertEmbedder::load(&model_name))
        .await
        .map_err(|_| anyhow!("model loader was cancelled"))?
        .with_context(|| format!("could not load model {}", config.model_name))?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "model loaded");

    let service = web::Data::new(EmbeddingService::new(
        config.model_name.clone(),
        Arc::new(embedder),
    ));

    info!(
        host = %config.host,
        port = config.port,
        model = service.model_id(),
        "embedding service ready"
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(|cfg| routes::configure(cfg, MAX_PAYLOAD_BYTES))
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("could not bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
