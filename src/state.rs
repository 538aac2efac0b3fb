use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    config::AppConfig,
    db,
    mail::{self, notifier::Notifier, Mailer},
    session::SessionStore,
    storage::{FsKvStore, KvStore},
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub kv: Arc<dyn KvStore>,
    pub sessions: Arc<SessionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_url).await?;
        let kv = Arc::new(FsKvStore::new(config.storage_dir.clone()).await?) as Arc<dyn KvStore>;
        let mailer = mail::mailer_from_config(&config.mail)?;
        Self::from_parts(db, config, kv, mailer)
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        kv: Arc<dyn KvStore>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let sessions = Arc::new(SessionStore::new(kv.clone()));
        let notifier = Arc::new(Notifier::new(mailer.clone(), &config.base_url)?);
        Ok(Self {
            db,
            config,
            kv,
            sessions,
            mailer,
            notifier,
        })
    }
}
