//! Source checkout
//!
//! Fetches the repository to build as an external `git clone`. The build
//! tool chain is opaque to the worker; only its exit status and output
//! matter.

use std::path::Path;

use anyhow::{Context, Result};

/// Clones `repo_url` into `workspace` (shallow)
pub async fn fetch_source(repo_url: &str, workspace: &Path) -> Result<()> {
    if let Some(parent) = workspace.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("failed to create workspace parent directory")?;
    }

    let output = tokio::process::Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(repo_url)
        .arg(workspace)
        .output()
        .await
        .context("failed to execute git clone. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "git clone failed with exit code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clone_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("checkout");

        let result = fetch_source("file:///nonexistent/repo.git", &target).await;

        assert!(result.is_err());
    }
}
