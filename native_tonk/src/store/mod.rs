//! Shared table-state store.
//!
//! The store is a serialisation surface, not an owner: table sessions keep
//! the live [`GameState`] and write it through after every mutation so other
//! processes (and crash recovery) can read it back. It also carries the
//! per-table player registry, the "leaving after this round" set, and a
//! coarse per-table lock with TTL auto-expiry used to serialise leaves and
//! round transitions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::GameState;

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Registry entry for a seated (or recently seated) user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerInfo {
    pub username: String,
    pub is_ai: bool,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),
    #[error("corrupt stored state for table {0}")]
    Corrupt(String),
}

/// Backend-agnostic store interface. Any cache with atomic set-if-absent and
/// hash operations can implement this.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn save_game(&self, table_id: &str, state: &GameState) -> Result<(), StoreError>;
    async fn load_game(&self, table_id: &str) -> Result<Option<GameState>, StoreError>;
    async fn delete_game(&self, table_id: &str) -> Result<(), StoreError>;

    /// Acquire the per-table critical-section lock. Returns false when
    /// another actor holds it. The lock expires on its own after `ttl` so a
    /// crashed holder cannot deadlock the table.
    async fn try_lock(&self, table_id: &str, ttl: Duration) -> Result<bool, StoreError>;
    async fn unlock(&self, table_id: &str) -> Result<(), StoreError>;

    async fn set_player_info(
        &self,
        table_id: &str,
        user_id: &str,
        info: PlayerInfo,
    ) -> Result<(), StoreError>;
    async fn player_info(
        &self,
        table_id: &str,
        user_id: &str,
    ) -> Result<Option<PlayerInfo>, StoreError>;
    async fn remove_player_info(&self, table_id: &str, user_id: &str) -> Result<(), StoreError>;

    /// Queue a user for removal at the end of the current round.
    async fn mark_leaving(&self, table_id: &str, user_id: &str) -> Result<(), StoreError>;
    /// Drain the queued departures. Callers hold the per-table lock, which
    /// keeps the read-then-clear pair race-free.
    async fn take_leaving(&self, table_id: &str) -> Result<Vec<String>, StoreError>;
}
