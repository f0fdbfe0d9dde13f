use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

/// A flat directory of artifacts keyed by file name.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Absolute location of `name` inside this store.
    fn path_for(&self, name: &str) -> PathBuf;
    /// Writes `body` under `name`, replacing any previous content.
    async fn save(&self, name: &str, body: Bytes) -> anyhow::Result<PathBuf>;
    async fn exists(&self, name: &str) -> bool;
    /// Best-effort removal. Returns `false` if an existing file could not be removed.
    async fn remove(&self, name: &str) -> bool;
    /// Best-effort removal of every regular file. Returns how many removals failed.
    async fn clear(&self) -> usize;
}

#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create storage dir {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    async fn save(&self, name: &str, body: Bytes) -> anyhow::Result<PathBuf> {
        let path = self.path_for(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "file saved");
        Ok(path)
    }

    async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.path_for(name))
            .await
            .unwrap_or(false)
    }

    async fn remove(&self, name: &str) -> bool {
        let path = self.path_for(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove file");
                false
            }
        }
    }

    async fn clear(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %self.root.display(), error = %e, "failed to list storage dir");
                return 1;
            }
        };

        let mut failures = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.root.display(), error = %e, "failed to read dir entry");
                    failures += 1;
                    break;
                }
            };
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                _ => continue,
            }
            let path = entry.path();
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed to remove file");
                failures += 1;
            }
        }
        failures
    }
}

/// Rejects names that could escape the storage directory.
pub fn is_safe_file_name(name: &str) -> bool {
    // "", ".", "..", "..." all split into empty segments only
    !name.contains(['/', '\\', '\0']) && !name.split('.').all(str::is_empty)
}
