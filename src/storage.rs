//! File storage for uploaded attachments.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Where uploaded files live. Paths are relative (`{bucket}/{name}`) and end up in the
/// public URL under `/storage`.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores the bytes under a fresh name in `bucket` and returns the relative path.
    async fn store(&self, bytes: &[u8], bucket: &str, extension: Option<&str>) -> io::Result<String>;

    /// Missing files are not an error.
    async fn delete(&self, path: &str) -> io::Result<()>;

    async fn exists(&self, path: &str) -> io::Result<bool>;
}

/// Files on the local disk under `root`.
#[derive(Clone, Debug)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDiskStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored path; rejects anything escaping the root.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let rel = Path::new(path);
        let clean = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !clean || path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage path: {}", path),
            ));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl FileStorage for LocalDiskStorage {
    async fn store(&self, bytes: &[u8], bucket: &str, extension: Option<&str>) -> io::Result<String> {
        let name = match extension {
            Some(ext) if !ext.is_empty() => format!("{}.{}", uuid::Uuid::new_v4().simple(), ext),
            _ => uuid::Uuid::new_v4().simple().to_string(),
        };
        let path = format!("{}/{}", bucket, name);
        let target = self.resolve(&path)?;
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!(path = %path, size = bytes.len(), "stored file");
        Ok(path)
    }

    async fn delete(&self, path: &str) -> io::Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, path: &str) -> io::Result<bool> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target).await
    }
}

/// Deletes a stored file, logging instead of failing.
pub async fn discard(storage: &dyn FileStorage, path: &str) {
    if let Err(e) = storage.delete(path).await {
        tracing::warn!(path = %path, error = %e, "failed to delete stored file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());
        let path = storage.store(b"logo", "masjid-logos", Some("png")).await.unwrap();
        assert!(path.starts_with("masjid-logos/"));
        assert!(path.ends_with(".png"));
        assert!(storage.exists(&path).await.unwrap());
        assert_eq!(std::fs::read(dir.path().join(&path)).unwrap(), b"logo");

        storage.delete(&path).await.unwrap();
        assert!(!storage.exists(&path).await.unwrap());
        storage.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());
        let a = storage.store(b"a", "transaksi", Some("pdf")).await.unwrap();
        let b = storage.store(b"b", "transaksi", Some("pdf")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn paths_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path().join("public"));
        for bad in ["../secret", "/etc/passwd", "a/../../b", ""] {
            assert!(storage.delete(bad).await.is_err(), "{}", bad);
            assert!(storage.exists(bad).await.is_err(), "{}", bad);
        }
    }

    #[tokio::test]
    async fn discard_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());
        discard(&storage, "../outside").await;
    }
}
