//! Local-filesystem object store.
//!
//! Objects live at `<root>/<bucket>/<key>` and are served from
//! `<public_base_url>/<bucket>/<key>`.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Bucket for video files.
pub const VIDEOS_BUCKET: &str = "videos";

/// Bucket for thumbnails.
pub const THUMBNAILS_BUCKET: &str = "thumbnails";

/// Object store errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

/// Object store rooted in a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of an object.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.public_base_url)
    }

    /// Store `bytes` under `bucket/key` and return its public URL.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        tracing::debug!(bucket, key, bytes = bytes.len(), "object stored");
        Ok(self.public_url(bucket, key))
    }

    /// Copy a local file into `bucket/key` and return its public URL.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
    ) -> Result<String, StorageError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(source, &path).await?;
        tracing::debug!(bucket, key, bytes, source = %source.display(), "object copied");
        Ok(self.public_url(bucket, key))
    }

    /// Remove objects. Missing objects are ignored.
    pub async fn remove(&self, bucket: &str, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            let path = self.object_path(bucket, key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        for part in [bucket, key] {
            if part.is_empty()
                || part == "."
                || part == ".."
                || part.contains('/')
                || part.contains('\\')
            {
                return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

/// File extension for a content type, used to build object keys.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(dir.path(), "http://cdn.test/media/");

        let url = store
            .upload(VIDEOS_BUCKET, "abc.mp4", b"video-bytes")
            .await
            .expect("upload");
        assert_eq!(url, "http://cdn.test/media/videos/abc.mp4");

        let on_disk = dir.path().join("videos").join("abc.mp4");
        assert_eq!(tokio::fs::read(&on_disk).await.expect("read"), b"video-bytes");

        store
            .remove(VIDEOS_BUCKET, &["abc.mp4", "missing.mp4"])
            .await
            .expect("remove");
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_upload_file_copies_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("clip.mp4");
        tokio::fs::write(&source, b"streamed").await.expect("write source");
        let store = LocalObjectStore::new(dir.path().join("media"), "http://cdn.test");

        let url = store
            .upload_file(VIDEOS_BUCKET, "v1.mp4", &source)
            .await
            .expect("upload_file");
        assert_eq!(url, "http://cdn.test/videos/v1.mp4");
        let stored = dir.path().join("media").join("videos").join("v1.mp4");
        assert_eq!(tokio::fs::read(&stored).await.expect("read"), b"streamed");
        assert!(source.exists());

        let missing = store
            .upload_file(VIDEOS_BUCKET, "v2.mp4", &dir.path().join("nope.mp4"))
            .await;
        assert!(matches!(missing, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(dir.path(), "http://cdn.test");
        assert!(matches!(
            store.upload(VIDEOS_BUCKET, "../escape", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.upload("..", "k", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("video/ogg"), "bin");
    }
}
