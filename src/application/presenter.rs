//! Turns a successful conversion body into a downloadable artifact.
//!
//! The rendered image is registered under a transient handle so observers can
//! display or save it later. At most one artifact is live per presenter;
//! registering a new one releases whatever was registered before.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

pub const LAYOUT_EXTENSION: &str = ".gbr";
pub const IMAGE_EXTENSION: &str = ".png";
pub const DEFAULT_RESULT_NAME: &str = "result.png";
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Transient reference to a registered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactHandle(Uuid);

impl ArtifactHandle {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// A rendered image plus the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub handle: ArtifactHandle,
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: &'static str,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum PresentError {
    #[error("artifact {0:?} has been released")]
    Released(ArtifactHandle),
    #[error("failed to save artifact to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Swap the layout extension for the image one, or fall back to a fixed name.
///
/// Matching is case-insensitive; a bare `.gbr` with no stem also falls back.
pub fn derive_file_name(primary_name: Option<&str>) -> String {
    let Some(name) = primary_name else {
        return DEFAULT_RESULT_NAME.to_string();
    };
    let split = name.len().checked_sub(LAYOUT_EXTENSION.len());
    match split {
        Some(split)
            if split > 0
                && name.is_char_boundary(split)
                && name[split..].eq_ignore_ascii_case(LAYOUT_EXTENSION) =>
        {
            format!("{}{IMAGE_EXTENSION}", &name[..split])
        }
        _ => DEFAULT_RESULT_NAME.to_string(),
    }
}

#[derive(Clone, Default)]
pub struct ResultPresenter {
    artifacts: Arc<DashMap<ArtifactHandle, Bytes>>,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` as the live artifact, releasing any previous one.
    pub fn present(&self, body: Bytes, primary_name: Option<&str>) -> Artifact {
        self.artifacts.clear();
        let handle = ArtifactHandle(Uuid::new_v4());
        let artifact = Artifact {
            handle,
            file_name: derive_file_name(primary_name),
            size_bytes: body.len() as u64,
            content_type: IMAGE_CONTENT_TYPE,
            created_at: OffsetDateTime::now_utc(),
        };
        self.artifacts.insert(handle, body);
        debug!(
            handle = %handle.0,
            file_name = %artifact.file_name,
            size_bytes = artifact.size_bytes,
            "artifact registered"
        );
        artifact
    }

    pub fn bytes(&self, handle: ArtifactHandle) -> Option<Bytes> {
        self.artifacts
            .get(&handle)
            .map(|entry| entry.value().clone())
    }

    /// Drop the resource behind `handle`. Releasing twice is a no-op.
    pub fn release(&self, handle: ArtifactHandle) {
        if self.artifacts.remove(&handle).is_some() {
            debug!(handle = %handle.0, "artifact released");
        }
    }

    pub fn live_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Write the artifact into `directory` under its derived name.
    pub async fn save(&self, artifact: &Artifact, directory: &Path) -> Result<PathBuf, PresentError> {
        let body = self
            .bytes(artifact.handle)
            .ok_or(PresentError::Released(artifact.handle))?;
        let path = directory.join(&artifact.file_name);
        let save_error = |source| PresentError::Save {
            path: path.display().to_string(),
            source,
        };
        fs::create_dir_all(directory).await.map_err(save_error)?;
        fs::write(&path, &body).await.map_err(save_error)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_extension_is_swapped() {
        assert_eq!(derive_file_name(Some("board.gbr")), "board.png");
        assert_eq!(derive_file_name(Some("Board.GBR")), "Board.png");
        assert_eq!(derive_file_name(Some("rev.b.gbr")), "rev.b.png");
    }

    #[test]
    fn other_names_fall_back_to_default() {
        assert_eq!(derive_file_name(None), "result.png");
        assert_eq!(derive_file_name(Some("board.gtl")), "result.png");
        assert_eq!(derive_file_name(Some(".gbr")), "result.png");
        assert_eq!(derive_file_name(Some("gbr")), "result.png");
        assert_eq!(derive_file_name(Some("платаgbr")), "result.png");
    }

    #[test]
    fn presenting_releases_the_previous_artifact() {
        let presenter = ResultPresenter::new();
        let first = presenter.present(Bytes::from_static(b"one"), Some("a.gbr"));
        let second = presenter.present(Bytes::from_static(b"two"), Some("b.gbr"));

        assert_eq!(presenter.live_count(), 1);
        assert!(presenter.bytes(first.handle).is_none());
        assert_eq!(
            presenter.bytes(second.handle).as_deref(),
            Some(b"two".as_slice())
        );
        assert_eq!(second.file_name, "b.png");
        assert_eq!(second.size_bytes, 3);
    }

    #[test]
    fn release_is_idempotent() {
        let presenter = ResultPresenter::new();
        let artifact = presenter.present(Bytes::from_static(b"png"), None);
        presenter.release(artifact.handle);
        presenter.release(artifact.handle);
        assert_eq!(presenter.live_count(), 0);
    }

    #[tokio::test]
    async fn save_writes_under_the_derived_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let presenter = ResultPresenter::new();
        let artifact = presenter.present(Bytes::from_static(b"\x89PNG"), Some("board.gbr"));

        let path = presenter
            .save(&artifact, dir.path())
            .await
            .expect("saved");
        assert_eq!(path, dir.path().join("board.png"));
        assert_eq!(std::fs::read(path).expect("read back"), b"\x89PNG");
    }

    #[tokio::test]
    async fn saving_a_released_artifact_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let presenter = ResultPresenter::new();
        let artifact = presenter.present(Bytes::from_static(b"png"), None);
        presenter.release(artifact.handle);

        let err = presenter
            .save(&artifact, dir.path())
            .await
            .expect_err("released");
        assert!(matches!(err, PresentError::Released(_)));
    }
}
