//! Install+build execution
//!
//! Runs the fixed install and build commands as one shell process and
//! drains stdout and stderr continuously on dedicated tasks, publishing
//! every line as a log event. Continuous draining keeps the OS pipes
//! empty, so the build process is never stalled by backpressure from a
//! full pipe buffer.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use crate::events::EventPublisher;

/// The fixed install+build command every deployment runs
pub const BUILD_COMMAND: &str = "npm install && npm run build";

/// Runs the install+build command in `workspace`
pub async fn run_build(publisher: &EventPublisher, workspace: &Path) -> Result<ExitStatus> {
    run_command(publisher, workspace, BUILD_COMMAND).await
}

/// Runs `command` through the shell, streaming its output
pub async fn run_command(
    publisher: &EventPublisher,
    workspace: &Path,
    command: &str,
) -> Result<ExitStatus> {
    tracing::info!("Running build command: {}", command);

    let mut child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn build process")?;

    let stdout = child
        .stdout
        .take()
        .context("build process has no stdout handle")?;
    let stderr = child
        .stderr
        .take()
        .context("build process has no stderr handle")?;

    let stdout_task = spawn_line_forwarder(publisher.clone(), stdout);
    let stderr_task = spawn_line_forwarder(publisher.clone(), stderr);

    let status = child.wait().await.context("failed to wait for build process")?;

    // Let the forwarders finish flushing whatever the process wrote last.
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    tracing::info!("Build command exited with {}", status);

    Ok(status)
}

/// Forwards every line of `reader` to the log channel
fn spawn_line_forwarder<R>(publisher: EventPublisher, reader: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Err(e) = publisher.log(line).await {
                        tracing::warn!("Failed to publish build output line: {:#}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read build output: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_channel::memory::MemoryChannel;
    use quay_channel::{Consumer, Producer};
    use quay_core::wire;
    use std::sync::Arc;
    use uuid::Uuid;

    fn publisher(channel: &MemoryChannel) -> EventPublisher {
        EventPublisher::new(
            Arc::new(channel.clone()) as Arc<dyn Producer>,
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
    }

    #[tokio::test]
    async fn test_output_lines_published_in_order() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("test", &[wire::LOG_TOPIC]);
        let publisher = publisher(&channel);

        let dir = tempfile::tempdir().unwrap();
        let status = run_command(&publisher, dir.path(), "printf 'first\\nsecond\\n'")
            .await
            .unwrap();

        assert!(status.success());

        let batch = consumer.poll(10).await.unwrap();
        let messages: Vec<String> = batch
            .iter()
            .map(|m| {
                wire::LogEventMessage::from_bytes(&m.payload)
                    .unwrap()
                    .message
            })
            .collect();

        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_stderr_is_captured() {
        let channel = MemoryChannel::new();
        let consumer = channel.subscribe("test", &[wire::LOG_TOPIC]);
        let publisher = publisher(&channel);

        let dir = tempfile::tempdir().unwrap();
        run_command(&publisher, dir.path(), "echo oops 1>&2")
            .await
            .unwrap();

        let batch = consumer.poll(10).await.unwrap();
        assert_eq!(batch.len(), 1);

        let parsed = wire::LogEventMessage::from_bytes(&batch[0].payload).unwrap();
        assert_eq!(parsed.message, "oops");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let channel = MemoryChannel::new();
        let publisher = publisher(&channel);

        let dir = tempfile::tempdir().unwrap();
        let status = run_command(&publisher, dir.path(), "exit 3").await.unwrap();

        assert!(!status.success());
        assert_eq!(status.code(), Some(3));
    }
}
