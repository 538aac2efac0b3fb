use std::sync::Arc;

use time::{Date, Duration};
use tracing::{debug, error, warn};

use super::model::{
    NewTripItem, NewTripList, TripItem, TripItemPatch, TripList, TripListPatch,
};
use crate::{
    error::{AppError, AppResult},
    storage::KvStore,
};

/// Days ahead that count as an upcoming trip.
pub const UPCOMING_WINDOW_DAYS: i64 = 30;

/// One user's trip lists, loaded whole from the key-value store and written
/// back whole after every mutation.
pub struct TripListStore {
    kv: Arc<dyn KvStore>,
    user_id: i64,
    lists: Vec<TripList>,
    error: Option<String>,
}

impl TripListStore {
    pub fn storage_key(user_id: i64) -> String {
        format!("tripLists_{user_id}")
    }

    /// Never fails: unreadable data yields an empty collection and a recorded error.
    pub async fn load(kv: Arc<dyn KvStore>, user_id: i64) -> Self {
        let key = Self::storage_key(user_id);
        let mut store = Self {
            kv,
            user_id,
            lists: Vec::new(),
            error: None,
        };

        let raw = match store.kv.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(user_id, "no trip lists stored");
                return store;
            }
            Err(e) => {
                error!(error = %e, user_id, "trip list storage read failed");
                store.error = Some("Could not load trip lists".into());
                return store;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) if value.is_array() => match serde_json::from_value::<Vec<TripList>>(value) {
                Ok(lists) => {
                    debug!(user_id, count = lists.len(), "trip lists loaded");
                    store.lists = lists;
                }
                Err(e) => {
                    warn!(error = %e, user_id, "stored trip lists have an unexpected shape");
                    store.error = Some("Stored trip lists are corrupt".into());
                }
            },
            Ok(_) => {
                warn!(user_id, "stored trip lists are not an array");
                store.error = Some("Stored trip lists are corrupt".into());
            }
            Err(e) => {
                warn!(error = %e, user_id, "stored trip lists are not valid JSON");
                store.error = Some("Stored trip lists are corrupt".into());
            }
        }
        store
    }

    /// Last load or save failure, if any. A later successful save clears it.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn lists(&self) -> &[TripList] {
        &self.lists
    }

    /// Writes the whole collection. Failures are recorded, not returned.
    async fn save(&mut self) -> bool {
        let payload = match serde_json::to_string(&self.lists) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, user_id = self.user_id, "serialize trip lists failed");
                self.error = Some("Could not save changes".into());
                return false;
            }
        };
        match self.kv.put(&Self::storage_key(self.user_id), payload).await {
            Ok(()) => {
                debug!(user_id = self.user_id, count = self.lists.len(), "trip lists saved");
                self.error = None;
                true
            }
            Err(e) => {
                error!(error = %e, user_id = self.user_id, "trip list storage write failed");
                self.error = Some("Could not save changes to storage".into());
                false
            }
        }
    }

    fn index_of(&self, list_id: &str) -> AppResult<usize> {
        self.lists
            .iter()
            .position(|l| l.id == list_id)
            .ok_or(AppError::NotFound("Trip list"))
    }

    fn item_index(list: &TripList, item_id: &str) -> AppResult<usize> {
        list.items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(AppError::NotFound("Item"))
    }

    pub fn get(&self, list_id: &str) -> AppResult<&TripList> {
        Ok(&self.lists[self.index_of(list_id)?])
    }

    pub async fn create(&mut self, input: NewTripList) -> TripList {
        let list = TripList::new(input);
        self.lists.push(list.clone());
        self.save().await;
        list
    }

    pub async fn update(&mut self, list_id: &str, patch: TripListPatch) -> AppResult<TripList> {
        let idx = self.index_of(list_id)?;
        self.lists[idx].apply(patch);
        let updated = self.lists[idx].clone();
        self.save().await;
        Ok(updated)
    }

    pub async fn delete(&mut self, list_id: &str) -> AppResult<()> {
        let idx = self.index_of(list_id)?;
        self.lists.remove(idx);
        self.save().await;
        Ok(())
    }

    pub async fn add_item(&mut self, list_id: &str, input: NewTripItem) -> AppResult<TripItem> {
        let idx = self.index_of(list_id)?;
        let item = TripItem::new(input);
        self.lists[idx].items.push(item.clone());
        self.save().await;
        Ok(item)
    }

    pub async fn update_item(
        &mut self,
        list_id: &str,
        item_id: &str,
        patch: TripItemPatch,
    ) -> AppResult<TripItem> {
        let idx = self.index_of(list_id)?;
        let list = &mut self.lists[idx];
        let pos = Self::item_index(list, item_id)?;
        list.items[pos].apply(patch);
        let item = list.items[pos].clone();
        self.save().await;
        Ok(item)
    }

    pub async fn delete_item(&mut self, list_id: &str, item_id: &str) -> AppResult<()> {
        let idx = self.index_of(list_id)?;
        let list = &mut self.lists[idx];
        let pos = Self::item_index(list, item_id)?;
        list.items.remove(pos);
        self.save().await;
        Ok(())
    }

    pub async fn toggle_item(&mut self, list_id: &str, item_id: &str) -> AppResult<TripItem> {
        let idx = self.index_of(list_id)?;
        let list = &mut self.lists[idx];
        let pos = Self::item_index(list, item_id)?;
        list.items[pos].completed = !list.items[pos].completed;
        let item = list.items[pos].clone();
        self.save().await;
        Ok(item)
    }

    /// Lists ordered by start date, soonest first.
    pub fn sorted(&self) -> Vec<TripList> {
        let mut lists = self.lists.clone();
        lists.sort_by_key(|l| l.start_date);
        lists
    }

    /// Sorted lists starting within `[today, today + 30 days]`.
    pub fn upcoming(&self, today: Date) -> Vec<TripList> {
        let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
        self.sorted()
            .into_iter()
            .filter(|l| l.start_date >= today && l.start_date <= horizon)
            .collect()
    }
}
