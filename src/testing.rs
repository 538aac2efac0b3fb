//! Shared fixtures for the inline test modules.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Response};
use sqlx::{sqlite::SqlitePoolOptions, Executor, SqlitePool};

use crate::{
    auth::{dto::PublicUser, password::hash_password, repo_types::User},
    config::{AppConfig, JwtConfig, MailConfig, MailTransport, SmtpConfig},
    mail::{EmailMessage, MailError, Mailer, SendReceipt},
    state::AppState,
    storage::{KvStore, MemoryKvStore},
};

/// Keeps every message instead of sending it. `failing()` rejects everything.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Waits for messages dispatched from spawned tasks.
    pub async fn wait_for(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..200 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(SendReceipt {
            message_id: format!("test-{}", sent.len()),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        storage_dir: "unused".into(),
        base_url: "http://localhost:5173".into(),
        jwt: JwtConfig {
            secret: "test".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
        mail: MailConfig {
            transport: MailTransport::Log,
            from: "Travelle <noreply@travelle.test>".into(),
            smtp: SmtpConfig {
                host: "localhost".into(),
                port: 25,
                secure: false,
                username: String::new(),
                password: String::new(),
            },
            endpoint_url: None,
            resend_api_key: None,
        },
    }
}

/// Fresh in-memory database with the schema applied.
pub async fn test_pool() -> SqlitePool {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::migrate(&db).await.unwrap();
    db
}

pub async fn test_state_with_mailer(mailer: Arc<dyn Mailer>) -> AppState {
    let kv = Arc::new(MemoryKvStore::new()) as Arc<dyn KvStore>;
    AppState::from_parts(test_pool().await, Arc::new(test_config()), kv, mailer).unwrap()
}

pub async fn test_state_with_kv(kv: Arc<dyn KvStore>) -> (AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::from_parts(test_pool().await, Arc::new(test_config()), kv, mailer.clone())
        .unwrap();
    (state, mailer)
}

/// Memory store whose writes fail for keys starting with `prefix`.
pub struct FailingWrites {
    inner: MemoryKvStore,
    prefix: &'static str,
}

impl FailingWrites {
    pub fn for_prefix(prefix: &'static str) -> Self {
        Self {
            inner: MemoryKvStore::new(),
            prefix,
        }
    }

    /// Seeds a value directly, bypassing the failing write path.
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner.put(key, value.to_string()).await.unwrap();
    }
}

#[async_trait]
impl KvStore for FailingWrites {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> anyhow::Result<()> {
        if key.starts_with(self.prefix) {
            anyhow::bail!("disk full");
        }
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.inner.remove(key).await
    }
}

pub async fn test_state() -> (AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    (test_state_with_mailer(mailer.clone()).await, mailer)
}

/// Inserts a user with a hashed password and returns its public record.
pub async fn create_user(state: &AppState, username: &str, email: &str, password: &str) -> PublicUser {
    let hash = hash_password(password).unwrap();
    let id = User::create(&state.db, username, username, email, &hash)
        .await
        .unwrap();
    User::find_by_id(&state.db, id).await.unwrap().unwrap().into()
}

/// Creates a user with a live session and returns it with a bearer header value.
pub async fn signed_in(state: &AppState, username: &str) -> (PublicUser, String) {
    let user = create_user(state, username, &format!("{username}@example.com"), "password123").await;
    state.sessions.establish(user.clone()).await.unwrap();
    let keys = crate::auth::dto::JwtKeys::from(&state.config.jwt);
    let token = keys.sign_access(user.id).unwrap();
    (user, format!("Bearer {token}"))
}

/// Three countries (one without cities), three cities, four places, two categories.
pub async fn seed_catalog(db: &SqlitePool) {
    db.execute(
        r#"
        INSERT INTO countries (id, name, flag) VALUES
            (1, 'Spain', 'es.png'),
            (2, 'Japan', 'jp.png'),
            (3, 'Iceland', 'is.png');
        INSERT INTO cities (id, name, country_id) VALUES
            (10, 'Madrid', 1),
            (11, 'Barcelona', 1),
            (20, 'Kyoto', 2);
        INSERT INTO places (id, name, description, price, rating, latitude, longitude, image1, image2, image3, city_id) VALUES
            (100, 'Prado Museum', 'Art museum', 15.0, 4.8, 40.4138, -3.6921, 'prado1.jpg', NULL, 'prado3.jpg', 10),
            (101, 'Retiro Park', 'Large park', 0.0, 4.7, 40.4153, -3.6845, 'retiro.jpg', NULL, NULL, 10),
            (110, 'Sagrada Familia', 'Basilica', 26.0, 4.9, 41.4036, 2.1744, 'sf.jpg', 'sf2.jpg', NULL, 11),
            (200, 'Kinkaku-ji', 'Golden pavilion', 5.0, 4.6, 35.0394, 135.7292, NULL, NULL, NULL, 20);
        INSERT INTO categories (id, name) VALUES (1, 'Museum'), (2, 'Outdoors');
        INSERT INTO place_categories (place_id, category_id) VALUES (100, 1), (101, 2);
        "#,
    )
    .await
    .unwrap();
}

pub async fn read_json(res: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
