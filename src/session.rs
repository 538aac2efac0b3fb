use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{auth::dto::PublicUser, storage::KvStore};

/// A logged-in user as remembered between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: PublicUser,
}

/// Auth state shared by every handler. Records live in the durable
/// key-value store and are cached in memory on first access.
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    cache: RwLock<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage_key(user_id: i64) -> String {
        format!("session_{user_id}")
    }

    pub async fn establish(&self, user: PublicUser) -> anyhow::Result<Session> {
        let session = Session { user };
        let id = session.user.id;
        self.kv
            .put(&Self::storage_key(id), serde_json::to_string(&session)?)
            .await?;
        self.cache.write().await.insert(id, session.clone());
        debug!(user_id = id, "session established");
        Ok(session)
    }

    /// Active session for `user_id`, loading it from durable storage if needed.
    /// Unreadable records count as no session.
    pub async fn current(&self, user_id: i64) -> Option<Session> {
        if let Some(s) = self.cache.read().await.get(&user_id) {
            return Some(s.clone());
        }

        let raw = match self.kv.get(&Self::storage_key(user_id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, user_id, "session storage read failed");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.user.id == user_id => {
                self.cache.write().await.insert(user_id, session.clone());
                Some(session)
            }
            Ok(_) => {
                warn!(user_id, "session record belongs to another user");
                None
            }
            Err(e) => {
                warn!(error = %e, user_id, "corrupt session record");
                None
            }
        }
    }

    pub async fn end(&self, user_id: i64) -> anyhow::Result<()> {
        self.cache.write().await.remove(&user_id);
        self.kv.remove(&Self::storage_key(user_id)).await?;
        debug!(user_id, "session ended");
        Ok(())
    }
}
