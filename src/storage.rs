use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Flat keyed byte storage for uploaded sources and rendered artifacts.
/// Sources are written once at upload time and never mutated; artifacts are
/// derived data and may be overwritten by a later render.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn exists(&self, key: &str) -> bool;

    async fn delete(&self, key: &str) -> Result<()>;
}

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("failed to create storage directory {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys are single flat names; separators are flattened so a crafted
        // key cannot escape the storage root
        let safe: String = key
            .chars()
            .map(|ch| match ch {
                '/' | '\\' => '_',
                _ => ch,
            })
            .collect();
        self.root.join(safe)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete {}", path.display()))?;
        Ok(())
    }
}
