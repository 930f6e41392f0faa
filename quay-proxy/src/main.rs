//! Quay Reverse Proxy
//!
//! Stateless edge service: resolves the subdomain of every inbound
//! request to a project and forwards the request to that project's
//! artifact root. Safe to replicate arbitrarily behind a load balancer;
//! the only shared state is the read-only project table.

mod config;
mod forward;
mod resolve;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Shared state injected into the request handler
#[derive(Clone)]
pub struct ProxyState {
    pub pool: PgPool,
    pub client: reqwest::Client,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quay_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quay Reverse Proxy...");

    let config = Config::from_env();
    config.validate().expect("Invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    let state = ProxyState {
        pool,
        client: reqwest::Client::new(),
        config: Arc::new(config),
    };

    let app = Router::new()
        .fallback(forward::handle)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    let addr = state.config.bind_addr.clone();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
