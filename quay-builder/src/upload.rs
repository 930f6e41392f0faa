//! Artifact upload
//!
//! Walks the build output directory recursively and uploads every file to
//! the object store, preserving relative paths under the project's key
//! prefix. The first failed upload aborts the remaining ones; the
//! deployment is already lost at that point.

use std::path::Path;

use anyhow::{Context, Result};
use object_store::path::Path as StorePath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::events::EventPublisher;

/// Key prefix all project artifacts live under
pub const ARTIFACT_PREFIX: &str = "__outputs";

/// Uploads every file under `output_dir`; returns the number uploaded
pub async fn upload_artifacts(
    publisher: &EventPublisher,
    store: &dyn ObjectStore,
    base: &StorePath,
    output_dir: &Path,
    project_id: Uuid,
) -> Result<usize> {
    if !output_dir.is_dir() {
        anyhow::bail!(
            "build output directory {} does not exist",
            output_dir.display()
        );
    }

    let mut uploaded = 0;

    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry.context("failed to walk build output directory")?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(output_dir)
            .context("walked file escaped the output directory")?;
        let relative_name = relative.to_string_lossy().replace('\\', "/");

        publisher.log(format!("Uploading {}", relative_name)).await?;

        let key = artifact_key(base, project_id, relative);

        let bytes = tokio::fs::read(entry.path())
            .await
            .with_context(|| format!("failed to read {}", entry.path().display()))?;

        let content_type = mime_guess::from_path(entry.path()).first_or_octet_stream();
        let options = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                content_type.to_string(),
            )]),
            ..Default::default()
        };

        store
            .put_opts(&key, bytes.into(), options)
            .await
            .with_context(|| format!("failed to upload {}", relative_name))?;

        publisher.log(format!("Uploaded {}", relative_name)).await?;
        uploaded += 1;
    }

    Ok(uploaded)
}

/// Store key of one artifact file: `<base>/__outputs/<project_id>/<path>`
fn artifact_key(base: &StorePath, project_id: Uuid, relative: &Path) -> StorePath {
    let mut key = base
        .child(ARTIFACT_PREFIX)
        .child(project_id.to_string());

    for component in relative.components() {
        key = key.child(component.as_os_str().to_string_lossy().as_ref());
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use quay_channel::memory::MemoryChannel;
    use std::sync::Arc;

    fn publisher() -> (MemoryChannel, EventPublisher) {
        let channel = MemoryChannel::new();
        let publisher = EventPublisher::new(
            Arc::new(channel.clone()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        (channel, publisher)
    }

    #[tokio::test]
    async fn test_uploads_files_recursively_skipping_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();

        let store = InMemory::new();
        let project_id = Uuid::new_v4();
        let (_channel, publisher) = publisher();

        let uploaded = upload_artifacts(
            &publisher,
            &store,
            &StorePath::default(),
            dir.path(),
            project_id,
        )
        .await
        .unwrap();

        assert_eq!(uploaded, 2);

        let index = StorePath::from(format!("__outputs/{}/index.html", project_id));
        let app = StorePath::from(format!("__outputs/{}/assets/app.js", project_id));
        assert!(store.head(&index).await.is_ok());
        assert!(store.head(&app).await.is_ok());
    }

    #[tokio::test]
    async fn test_per_file_events_published() {
        use quay_channel::Consumer;
        use quay_core::wire;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "x").unwrap();

        let (channel, publisher) = publisher();
        let consumer = channel.subscribe("test", &[wire::LOG_TOPIC]);

        upload_artifacts(
            &publisher,
            &InMemory::new(),
            &StorePath::default(),
            dir.path(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let batch = consumer.poll(10).await.unwrap();
        let messages: Vec<String> = batch
            .iter()
            .map(|m| {
                wire::LogEventMessage::from_bytes(&m.payload)
                    .unwrap()
                    .message
            })
            .collect();

        assert_eq!(
            messages,
            vec!["Uploading index.html", "Uploaded index.html"]
        );
    }

    #[tokio::test]
    async fn test_missing_output_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (_channel, publisher) = publisher();

        let result = upload_artifacts(
            &publisher,
            &InMemory::new(),
            &StorePath::default(),
            &dir.path().join("dist"),
            Uuid::new_v4(),
        )
        .await;

        assert!(result.is_err());
    }
}
