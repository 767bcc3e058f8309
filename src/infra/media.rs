//! Filesystem-backed storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use uuid::Uuid;

/// Errors that can occur while interacting with the media storage backend.
#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

/// Filesystem-backed media storage rooted at a configured directory.
#[derive(Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store the payload under a date-partitioned, collision-free path and
    /// return the relative path recorded against the post.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, MediaStorageError> {
        if data.is_empty() {
            return Err(MediaStorageError::EmptyPayload);
        }

        let stored_path = self.build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&absolute, &data).await?;
        Ok(stored_path)
    }

    /// Read the stored payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, MediaStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Resolve the absolute filesystem path, rejecting traversal outside the root.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }

    fn build_stored_path(&self, original_name: &str) -> String {
        let (year, month, day) = OffsetDateTime::now_utc().to_calendar_date();
        let directory = format!("posts/{year}/{:02}/{:02}", month as u8, day);
        let identifier = Uuid::new_v4();
        let filename = sanitize_filename(original_name);
        format!("{directory}/{identifier}-{filename}")
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");

    let mut base: String = stem
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    base.truncate(64);
    if base.trim_matches('-').is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, MediaStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = MediaStorage::new(dir.path().to_path_buf()).expect("storage");
        (dir, storage)
    }

    #[tokio::test]
    async fn stored_payload_round_trips() {
        let (_dir, storage) = storage();
        let stored = storage
            .store("picture.PNG", Bytes::from_static(b"png-bytes"))
            .await
            .expect("store");
        assert!(stored.ends_with(".png"), "got {stored}");

        let data = storage.read(&stored).await.expect("read");
        assert_eq!(data.as_ref(), b"png-bytes");
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let (_dir, storage) = storage();
        let result = storage.store("picture.png", Bytes::new()).await;
        assert!(matches!(result, Err(MediaStorageError::EmptyPayload)));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let (_dir, storage) = storage();
        let result = storage.read("../outside").await;
        assert!(matches!(result, Err(MediaStorageError::InvalidPath)));
    }

    #[test]
    fn filenames_are_sanitised() {
        assert_eq!(sanitize_filename("My Photo!.JPG"), "my-photo-.jpg");
        assert_eq!(sanitize_filename("....."), "upload");
        assert_eq!(sanitize_filename("archive.tar.gz"), "archive-tar.gz");
    }
}
