//! In-process store backend for single-node deployments and tests.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::game::GameState;

use super::{PlayerInfo, StoreError, TableStore};

#[derive(Default)]
struct Inner {
    /// Serialized game states. JSON, matching the redis backend, so both
    /// round-trip states identically.
    games: HashMap<String, String>,
    /// Lock deadlines; a past deadline counts as released.
    locks: HashMap<String, Instant>,
    players: HashMap<String, HashMap<String, PlayerInfo>>,
    leaving: HashMap<String, BTreeSet<String>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn save_game(&self, table_id: &str, state: &GameState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.inner.write().games.insert(table_id.to_owned(), json);
        Ok(())
    }

    async fn load_game(&self, table_id: &str) -> Result<Option<GameState>, StoreError> {
        let inner = self.inner.read();
        match inner.games.get(table_id) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(table_id.to_owned())),
            None => Ok(None),
        }
    }

    async fn delete_game(&self, table_id: &str) -> Result<(), StoreError> {
        self.inner.write().games.remove(table_id);
        Ok(())
    }

    async fn try_lock(&self, table_id: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let now = Instant::now();
        if let Some(deadline) = inner.locks.get(table_id) {
            if *deadline > now {
                return Ok(false);
            }
        }
        inner.locks.insert(table_id.to_owned(), now + ttl);
        Ok(true)
    }

    async fn unlock(&self, table_id: &str) -> Result<(), StoreError> {
        self.inner.write().locks.remove(table_id);
        Ok(())
    }

    async fn set_player_info(
        &self,
        table_id: &str,
        user_id: &str,
        info: PlayerInfo,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .players
            .entry(table_id.to_owned())
            .or_default()
            .insert(user_id.to_owned(), info);
        Ok(())
    }

    async fn player_info(
        &self,
        table_id: &str,
        user_id: &str,
    ) -> Result<Option<PlayerInfo>, StoreError> {
        Ok(self
            .inner
            .read()
            .players
            .get(table_id)
            .and_then(|m| m.get(user_id))
            .cloned())
    }

    async fn remove_player_info(&self, table_id: &str, user_id: &str) -> Result<(), StoreError> {
        if let Some(m) = self.inner.write().players.get_mut(table_id) {
            m.remove(user_id);
        }
        Ok(())
    }

    async fn mark_leaving(&self, table_id: &str, user_id: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .leaving
            .entry(table_id.to_owned())
            .or_default()
            .insert(user_id.to_owned());
        Ok(())
    }

    async fn take_leaving(&self, table_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .write()
            .leaving
            .remove(table_id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default())
    }
}
