use crate::domain::ports::BlobStore;
use crate::domain::proof::ContentHash;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores proof files on disk under `<root>/<first two hash chars>/<hash>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.as_str();
        self.root.join(&hex[..2]).join(hex)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, hash: &ContentHash, bytes: &[u8]) -> Result<String> {
        let path = self.path_for(hash);
        if !tokio::fs::try_exists(&path).await? {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            // Each writer gets its own temporary name; racing writers hold identical bytes.
            let partial = path.with_extension(format!("{}.partial", Uuid::new_v4().simple()));
            tokio::fs::write(&partial, bytes).await?;
            if let Err(err) = tokio::fs::rename(&partial, &path).await {
                let _ = tokio::fs::remove_file(&partial).await;
                if !tokio::fs::try_exists(&path).await? {
                    return Err(err.into());
                }
            }
        }
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_blob_store_writes_once() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let hash = ContentHash::of(b"%PDF-1.4 receipt");

        let url = store.put(&hash, b"%PDF-1.4 receipt").await.unwrap();
        let again = store.put(&hash, b"%PDF-1.4 receipt").await.unwrap();
        assert_eq!(url, again);

        let on_disk = std::fs::read(store.path_for(&hash)).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4 receipt");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fs_blob_store_concurrent_identical_puts() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FsBlobStore::new(dir.path()));
        let bytes: Arc<Vec<u8>> = Arc::new((0..2 * 1024 * 1024).map(|i| (i % 251) as u8).collect());
        let hash = ContentHash::of(&bytes);

        for _ in 0..10 {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    let bytes = bytes.clone();
                    let hash = hash.clone();
                    tokio::spawn(async move { store.put(&hash, &bytes).await })
                })
                .collect();
            for handle in handles {
                assert!(handle.await.unwrap().is_ok());
            }
            std::fs::remove_file(store.path_for(&hash)).unwrap_or_default();
        }

        store.put(&hash, &bytes).await.unwrap();
        assert_eq!(std::fs::read(store.path_for(&hash)).unwrap(), *bytes);
        let shard = store.path_for(&hash).parent().unwrap().to_path_buf();
        assert_eq!(std::fs::read_dir(shard).unwrap().count(), 1);
    }
}
