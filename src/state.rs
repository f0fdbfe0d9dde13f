use crate::config::AppConfig;
use crate::files::locks::FileLocks;
use crate::storage::{FileStorage, LocalStorage};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<AppConfig>,
    /// Raw CSV uploads.
    pub uploads: Arc<dyn FileStorage>,
    /// Converted Parquet artifacts.
    pub parquet: Arc<dyn FileStorage>,
    pub locks: FileLocks,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Self::from_config(config).await
    }

    pub async fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let store = Store::connect(&config.database_url).await?;
        let uploads = Arc::new(LocalStorage::new(&config.storage.upload_dir).await?) as Arc<dyn FileStorage>;
        let parquet = Arc::new(LocalStorage::new(&config.storage.parquet_dir).await?) as Arc<dyn FileStorage>;

        Ok(Self {
            store,
            config,
            uploads,
            parquet,
            locks: FileLocks::default(),
        })
    }

    /// Fully isolated state rooted in `root`, for tests.
    #[cfg(test)]
    pub async fn for_tests(root: &std::path::Path) -> Self {
        use crate::config::{JwtConfig, StorageConfig};

        let config = Arc::new(AppConfig {
            database_url: format!("sqlite://{}", root.join("metadata.db").display()),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            storage: StorageConfig {
                upload_dir: root.join("uploads"),
                parquet_dir: root.join("parquet"),
                max_upload_bytes: 1024 * 1024,
            },
        });
        Self::from_config(config).await.expect("test state")
    }
}
