//! Quay Orchestrator
//!
//! Control-plane service for the deployment platform.
//!
//! Architecture:
//! - API: axum HTTP endpoints for projects, deployments, logs and login
//! - Repositories: sqlx data access per domain entity
//! - Services: business logic (validation, slug retries, dispatch)
//! - Dispatch: capability interface for launching isolated build tasks
//! - Ingest: long-lived consumer draining the log event channel into the
//!   queryable log store
//!
//! The ingestion pipeline runs as a background task inside this process,
//! bound to its own consumer group on the channel.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quay_channel::postgres::PgChannel;
use quay_core::wire;

pub mod api;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod ingest;
pub mod repository;
pub mod service;

use crate::config::Config;
use crate::dispatch::ProcessDispatcher;
use crate::ingest::{LogIngestor, PgIngestStore};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quay_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quay Orchestrator...");

    let config = Config::from_env();
    config.validate().expect("Invalid configuration");

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    PgChannel::migrate(&pool)
        .await
        .expect("Failed to run channel migrations");

    // Start the log ingestion pipeline on its own consumer group
    let channel = PgChannel::new(pool.clone());
    let consumer = channel
        .subscribe(ingest::CONSUMER_GROUP, &[wire::LOG_TOPIC, wire::STATUS_TOPIC])
        .await
        .expect("Failed to subscribe to log event channel");

    let ingestor = LogIngestor::new(
        Arc::new(consumer),
        Arc::new(PgIngestStore::new(pool.clone())),
        config.ingest_batch_size,
        config.ingest_poll_interval,
    );

    tokio::spawn(ingestor.run());

    tracing::info!("Log ingestion pipeline started");

    // Build tasks are spawned as detached worker processes; a container
    // scheduler can be swapped in behind the same trait.
    let dispatcher = ProcessDispatcher::new(&config.builder_command)
        .with_env("CHANNEL_DATABASE_URL", &config.database_url)
        .with_env("ARTIFACT_STORE_URL", &config.artifact_store_url);

    let state = api::AppState {
        pool,
        dispatcher: Arc::new(dispatcher),
        config: Arc::new(config),
    };

    let app = api::create_router(state.clone());

    let addr = state.config.bind_addr.clone();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
