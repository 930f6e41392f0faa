//! Build task dispatch
//!
//! Capability interface for launching one isolated build task per
//! deployment. The orchestrator only ever sees the interface: a task is a
//! set of environment overrides and dispatch either yields an opaque
//! handle or a [`DispatchError`]. Any concrete scheduler (a container
//! orchestration API, a serverless invoke, the process spawner below) can
//! stand behind it.

use async_trait::async_trait;
use uuid::Uuid;

/// Execution parameters of one build task
#[derive(Debug, Clone)]
pub struct BuildTask {
    pub source_repo_url: String,
    pub project_id: Uuid,
    pub deployment_id: Uuid,
}

impl BuildTask {
    /// Environment overrides handed to the worker, its only inputs
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            ("SOURCE_REPO_URL".to_string(), self.source_repo_url.clone()),
            ("PROJECT_ID".to_string(), self.project_id.to_string()),
            ("DEPLOYMENT_ID".to_string(), self.deployment_id.to_string()),
        ]
    }
}

/// Opaque handle of a dispatched task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub id: String,
}

/// Dispatch error type
#[derive(Debug)]
pub enum DispatchError {
    /// The scheduler could not be reached or refused to start the task
    Unavailable(String),
    /// The dispatch call did not complete within the configured timeout
    TimedOut,
}

/// Scheduler capability for running build tasks
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Starts one isolated build task. Returns once the task is accepted,
    /// not once it completes.
    async fn dispatch(&self, task: BuildTask) -> Result<TaskHandle, DispatchError>;
}

/// Dispatcher that spawns the build worker as a detached OS process
///
/// The worker binary receives the task identity plus this dispatcher's
/// base environment (channel and artifact-store wiring). The child is not
/// awaited: its lifecycle is the worker's own, and its outcome travels
/// back through the log event channel.
pub struct ProcessDispatcher {
    program: String,
    base_env: Vec<(String, String)>,
}

impl ProcessDispatcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_env: Vec::new(),
        }
    }

    /// Adds a base environment variable passed to every dispatched task
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_env.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl TaskDispatcher for ProcessDispatcher {
    async fn dispatch(&self, task: BuildTask) -> Result<TaskHandle, DispatchError> {
        tracing::info!(
            "Dispatching build task for deployment {} ({})",
            task.deployment_id,
            task.source_repo_url
        );

        let mut command = tokio::process::Command::new(&self.program);
        command
            .envs(self.base_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .envs(task.env())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        let child = command.spawn().map_err(|e| {
            DispatchError::Unavailable(format!("failed to spawn build task: {}", e))
        })?;

        let id = child
            .id()
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!("Build task started (pid {})", id);

        Ok(TaskHandle { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_env_contract() {
        let task = BuildTask {
            source_repo_url: "https://example.com/org/repo".to_string(),
            project_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
        };

        let env = task.env();
        let get = |k: &str| {
            env.iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(
            get("SOURCE_REPO_URL").as_deref(),
            Some("https://example.com/org/repo")
        );
        assert_eq!(get("PROJECT_ID"), Some(task.project_id.to_string()));
        assert_eq!(get("DEPLOYMENT_ID"), Some(task.deployment_id.to_string()));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_unavailable() {
        let dispatcher = ProcessDispatcher::new("/nonexistent/quay-builder");

        let result = dispatcher
            .dispatch(BuildTask {
                source_repo_url: "https://example.com/org/repo".to_string(),
                project_id: Uuid::new_v4(),
                deployment_id: Uuid::new_v4(),
            })
            .await;

        assert!(matches!(result, Err(DispatchError::Unavailable(_))));
    }
}
