use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::storage::{Storage, StorageClient};
use crate::store::{MemoryRecordStore, PgRecordStore, RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<AppConfig>,
    /// Unset when no report bucket is configured.
    pub storage: Option<Arc<dyn StorageClient>>,
}

impl AppState {
    /// Builds the state and, for the postgres backend, hands back the pool
    /// so the caller can run migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, Option<sqlx::PgPool>)> {
        let config = Arc::new(config);

        let (store, pool) = match config.store.backend {
            StoreBackend::Postgres => {
                let pg = PgRecordStore::connect(&config.store).await?;
                let pool = pg.pool().clone();
                (Arc::new(pg) as Arc<dyn RecordStore>, Some(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory record store; data is lost on restart");
                (Arc::new(MemoryRecordStore::new()) as Arc<dyn RecordStore>, None)
            }
        };

        let storage = match &config.storage {
            Some(cfg) => Some(Arc::new(Storage::new(cfg).await?) as Arc<dyn StorageClient>),
            None => None,
        };

        Ok((Self::from_parts(store, config, storage), pool))
    }

    pub fn from_parts(
        store: Arc<dyn RecordStore>,
        config: Arc<AppConfig>,
        storage: Option<Arc<dyn StorageClient>>,
    ) -> Self {
        Self {
            store,
            config,
            storage,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use async_trait::async_trait;
        use bytes::Bytes;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }
            async fn presign_get(&self, k: &str, _s: u64) -> anyhow::Result<String> {
                Ok(format!("https://fake.local/{}", k))
            }
        }

        let config = AppConfig::from_lookup(|key| {
            match key {
                "STORE_BACKEND" => Some("memory"),
                "JWT_SECRET" => Some("test-secret"),
                "JWT_ISSUER" => Some("test-issuer"),
                "JWT_AUDIENCE" => Some("test-aud"),
                "ENVIRONMENT" => Some("test"),
                _ => None,
            }
            .map(String::from)
        })
        .expect("test config");

        Self::from_parts(
            Arc::new(MemoryRecordStore::new()),
            Arc::new(config),
            Some(Arc::new(FakeStorage)),
        )
    }

    #[cfg(test)]
    pub fn fake_without_storage() -> Self {
        Self {
            storage: None,
            ..Self::fake()
        }
    }
}
