//! Redis store backend for multi-process deployments.
//!
//! Connection handling follows the lazy `ConnectionManager` pattern: the
//! manager is created on first use and dropped on error so the next call
//! reconnects.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::game::GameState;

use super::{PlayerInfo, StoreError, TableStore};

pub struct RedisStore {
    client: redis::Client,
    connection: Mutex<Option<redis::aio::ConnectionManager>>,
    prefix: String,
}

impl RedisStore {
    pub fn new(url: &str, prefix: String) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(backend)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix,
        })
    }

    fn game_key(&self, table_id: &str) -> String {
        format!("{}game:{}", self.prefix, table_id)
    }

    fn lock_key(&self, table_id: &str) -> String {
        format!("{}lock:{}", self.prefix, table_id)
    }

    fn players_key(&self, table_id: &str) -> String {
        format!("{}players:{}", self.prefix, table_id)
    }

    fn leaving_key(&self, table_id: &str) -> String {
        format!("{}leaving:{}", self.prefix, table_id)
    }

    async fn ensure_connection(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<redis::aio::ConnectionManager>>, StoreError>
    {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(
                self.client
                    .get_connection_manager()
                    .await
                    .map_err(backend)?,
            );
        }
        Ok(guard)
    }
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

macro_rules! with_conn {
    ($self:ident, $guard:ident, $conn:ident, $body:expr) => {{
        let mut $guard = $self.ensure_connection().await?;
        let Some($conn) = $guard.as_mut() else {
            return Err(StoreError::Backend("no redis connection".to_owned()));
        };
        match $body {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(error = %err, "redis operation failed, resetting connection");
                *$guard = None;
                Err(backend(err))
            }
        }
    }};
}

#[async_trait]
impl TableStore for RedisStore {
    async fn save_game(&self, table_id: &str, state: &GameState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state).map_err(|e| StoreError::Backend(e.to_string()))?;
        let key = self.game_key(table_id);
        with_conn!(self, guard, conn, conn.set::<_, _, ()>(key, json).await)
    }

    async fn load_game(&self, table_id: &str) -> Result<Option<GameState>, StoreError> {
        let key = self.game_key(table_id);
        let json: Option<String> =
            with_conn!(self, guard, conn, conn.get::<_, Option<String>>(key).await)?;
        match json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(table_id.to_owned())),
            None => Ok(None),
        }
    }

    async fn delete_game(&self, table_id: &str) -> Result<(), StoreError> {
        let key = self.game_key(table_id);
        with_conn!(self, guard, conn, conn.del::<_, ()>(key).await)
    }

    async fn try_lock(&self, table_id: &str, ttl: Duration) -> Result<bool, StoreError> {
        let key = self.lock_key(table_id);
        let ttl_ms = ttl.as_millis().max(1) as u64;
        // SET NX PX: the reply is OK when acquired, nil when already held.
        let reply: Option<String> = with_conn!(
            self,
            guard,
            conn,
            redis::cmd("SET")
                .arg(&key)
                .arg("1")
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async(conn)
                .await
        )?;
        Ok(reply.is_some())
    }

    async fn unlock(&self, table_id: &str) -> Result<(), StoreError> {
        let key = self.lock_key(table_id);
        with_conn!(self, guard, conn, conn.del::<_, ()>(key).await)
    }

    async fn set_player_info(
        &self,
        table_id: &str,
        user_id: &str,
        info: PlayerInfo,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(&info).map_err(|e| StoreError::Backend(e.to_string()))?;
        let key = self.players_key(table_id);
        with_conn!(
            self,
            guard,
            conn,
            conn.hset::<_, _, _, ()>(key, user_id, json).await
        )
    }

    async fn player_info(
        &self,
        table_id: &str,
        user_id: &str,
    ) -> Result<Option<PlayerInfo>, StoreError> {
        let key = self.players_key(table_id);
        let json: Option<String> = with_conn!(
            self,
            guard,
            conn,
            conn.hget::<_, _, Option<String>>(key, user_id).await
        )?;
        match json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(table_id.to_owned())),
            None => Ok(None),
        }
    }

    async fn remove_player_info(&self, table_id: &str, user_id: &str) -> Result<(), StoreError> {
        let key = self.players_key(table_id);
        with_conn!(
            self,
            guard,
            conn,
            conn.hdel::<_, _, ()>(key, user_id).await
        )
    }

    async fn mark_leaving(&self, table_id: &str, user_id: &str) -> Result<(), StoreError> {
        let key = self.leaving_key(table_id);
        with_conn!(
            self,
            guard,
            conn,
            conn.sadd::<_, _, ()>(key, user_id).await
        )
    }

    async fn take_leaving(&self, table_id: &str) -> Result<Vec<String>, StoreError> {
        // Read-then-clear; callers hold the per-table lock.
        let key = self.leaving_key(table_id);
        let members: Vec<String> = with_conn!(
            self,
            guard,
            conn,
            conn.smembers::<_, Vec<String>>(key.clone()).await
        )?;
        if !members.is_empty() {
            with_conn!(self, guard, conn, conn.del::<_, ()>(key).await)?;
        }
        Ok(members)
    }
}
