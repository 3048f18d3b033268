use crate::config::AppConfig;
use crate::storage::{Storage, StorageClient};
use crate::store::{pg::PgStore, Repository, UnitOfWork};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<dyn Repository>,
    pub uow: Arc<dyn UnitOfWork>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let store = Arc::new(PgStore::new(db));

        Ok(Self {
            config,
            repo: store.clone(),
            uow: store,
            storage,
        })
    }
}

#[cfg(test)]
pub use fake::FakeStorage;
