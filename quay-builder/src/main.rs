//! Quay Builder
//!
//! A build worker that runs once per dispatched deployment inside an
//! isolated environment:
//! - Fetches the source repository into a local workspace
//! - Runs the fixed install+build command, streaming every stdout and
//!   stderr line to the log event channel
//! - Uploads the build output to the object store under the project's
//!   artifact prefix
//! - Publishes the terminal sentinel log line and a status event, then
//!   exits
//!
//! On any failure the worker publishes an error log event plus a FAILED
//! status and exits non-zero. It never retries; retry policy belongs to
//! the scheduler that dispatched it.

mod config;
mod events;
mod execution;
mod source;
mod upload;

use std::sync::Arc;

use anyhow::{Context, Result};
use object_store::ObjectStore;
use object_store::path::Path as StorePath;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quay_channel::postgres::PgChannel;
use quay_core::domain::deployment::DeploymentStatus;

use crate::config::Config;
use crate::events::EventPublisher;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quay_builder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quay Builder");

    let config = Config::from_env()?;
    config.validate()?;

    info!(
        "Building deployment {} of project {} from {}",
        config.deployment_id, config.project_id, config.source_repo_url
    );

    let channel = PgChannel::connect(&config.channel_database_url)
        .await
        .context("failed to connect to log event channel")?;

    let publisher = EventPublisher::new(
        Arc::new(channel),
        config.project_id,
        config.deployment_id,
    );

    let store_url = url::Url::parse(&config.artifact_store_url)
        .context("ARTIFACT_STORE_URL is not a valid URL")?;
    let (store, store_base) =
        object_store::parse_url(&store_url).context("unsupported artifact store URL")?;

    match run(&config, &publisher, store.as_ref(), &store_base).await {
        Ok(uploaded) => {
            publisher.sentinel().await?;
            publisher.status(DeploymentStatus::Ready).await?;

            info!(
                "Deployment {} complete, {} file(s) uploaded",
                config.deployment_id, uploaded
            );
            Ok(())
        }
        Err(e) => {
            error!("Build failed: {:#}", e);

            // Failures are only observable through the channel; make sure
            // they land there before exiting non-zero.
            if let Err(publish_err) = publisher.log(format!("ERROR: {:#}", e)).await {
                error!("Failed to publish error event: {:#}", publish_err);
            }
            if let Err(publish_err) = publisher.status(DeploymentStatus::Failed).await {
                error!("Failed to publish failure status: {:#}", publish_err);
            }

            std::process::exit(1);
        }
    }
}

/// The build pipeline: fetch, build, upload
async fn run(
    config: &Config,
    publisher: &EventPublisher,
    store: &dyn ObjectStore,
    store_base: &StorePath,
) -> Result<usize> {
    publisher.status(DeploymentStatus::InProgress).await?;
    publisher.log("Build started").await?;

    publisher
        .log(format!("Cloning {}", config.source_repo_url))
        .await?;
    source::fetch_source(&config.source_repo_url, &config.workspace_dir).await?;
    publisher.log("Source checkout complete").await?;

    let status = execution::run_build(publisher, &config.workspace_dir).await?;
    if !status.success() {
        anyhow::bail!(
            "build process exited with code {}",
            status.code().unwrap_or(-1)
        );
    }
    publisher.log("Build completed").await?;

    let output_dir = config.workspace_dir.join(&config.output_subdir);
    publisher.log("Starting upload").await?;

    let uploaded = upload::upload_artifacts(
        publisher,
        store,
        store_base,
        &output_dir,
        config.project_id,
    )
    .await?;

    publisher
        .log(format!("Upload complete ({} file(s))", uploaded))
        .await?;

    Ok(uploaded)
}
