//! Filesystem storage for post images.
//!
//! Files are stored under a content-addressed name so re-uploading the same
//! bytes never duplicates data, and the stored path embedded in a post row
//! stays valid for as long as any post references it.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

/// Filesystem-backed media storage rooted at one directory.
#[derive(Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store the payload and return its stored path, relative to the root.
    pub async fn store(&self, original_name: &str, data: &Bytes) -> Result<String, MediaError> {
        if data.is_empty() {
            return Err(MediaError::EmptyPayload);
        }

        let stored_path = build_stored_path(original_name, data);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, data).await?;

        Ok(stored_path)
    }

    /// Read a stored payload back into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, MediaError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Reject absolute paths and any path escaping the storage root.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str, data: &Bytes) -> String {
    let digest = hex::encode(Sha256::digest(data));
    match normalized_extension(original_name) {
        Some(ext) => format!("posts/{digest}.{ext}"),
        None => format!("posts/{digest}"),
    }
}

fn normalized_extension(original: &str) -> Option<String> {
    Path::new(original)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_path_buf()).unwrap();

        let payload = Bytes::from_static(b"picture bytes");
        let stored = storage.store("cat photo.PNG", &payload).await.unwrap();
        assert!(stored.starts_with("posts/"));
        assert!(stored.ends_with(".png"));

        let read_back = storage.read(&stored).await.unwrap();
        assert_eq!(read_back, payload);
    }

    #[tokio::test]
    async fn identical_payloads_share_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_path_buf()).unwrap();

        let payload = Bytes::from_static(b"same bytes");
        let first = storage.store("a.gif", &payload).await.unwrap();
        let second = storage.store("b.gif", &payload).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_path_buf()).unwrap();

        assert!(matches!(
            storage.read("../outside").await,
            Err(MediaError::InvalidPath)
        ));
        assert!(matches!(
            storage.read("/etc/passwd").await,
            Err(MediaError::InvalidPath)
        ));
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().to_path_buf()).unwrap();

        assert!(matches!(
            storage.store("x.png", &Bytes::new()).await,
            Err(MediaError::EmptyPayload)
        ));
    }
}
