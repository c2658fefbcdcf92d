//! Shared application state: one session per seeded table, each with its own
//! broadcast room.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tonk_shared::{ServerMsg, TablePublic, TableStatus};

use crate::bot::BotManager;
use crate::config::{Config, TableConfig};
use crate::game::GameState;
use crate::store::TableStore;
use crate::wallet::WalletStore;

pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Shared application state exposed to handlers. Tables are independent:
/// each session carries its own lock so traffic on one table never blocks
/// another.
#[derive(Clone)]
pub struct AppState {
    tables: Arc<RwLock<HashMap<String, Arc<RwLock<TableSession>>>>>,
    pub store: Arc<dyn TableStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the state and seed one session per configured table.
    pub fn new(
        config: Config,
        store: Arc<dyn TableStore>,
        wallets: Arc<dyn WalletStore>,
    ) -> Self {
        let mut tables = HashMap::new();
        for table_cfg in &config.tables {
            tables.insert(
                table_cfg.id.clone(),
                Arc::new(RwLock::new(TableSession::new(table_cfg))),
            );
        }
        AppState {
            tables: Arc::new(RwLock::new(tables)),
            store,
            wallets,
            config: Arc::new(config),
        }
    }

    pub(crate) async fn session(&self, table_id: &str) -> Option<Arc<RwLock<TableSession>>> {
        self.tables.read().await.get(table_id).cloned()
    }

    /// Subscribe to a table's room. New messages only; callers request the
    /// current state explicitly.
    pub async fn subscribe(&self, table_id: &str) -> Option<broadcast::Receiver<ServerMsg>> {
        let session = self.session(table_id).await?;
        let guard = session.read().await;
        Some(guard.broadcaster.subscribe())
    }
}

/// A seated (human or bot) participant as tracked between rounds.
#[derive(Clone, Debug)]
pub(crate) struct SeatInfo {
    pub user_id: String,
    pub username: String,
    pub is_ai: bool,
}

/// Lobby-level table descriptor plus its seat list.
#[derive(Clone, Debug)]
pub(crate) struct TableMeta {
    pub id: String,
    pub name: String,
    pub stake: i64,
    pub min_players: usize,
    pub max_players: usize,
    pub status: TableStatus,
    pub seats: Vec<SeatInfo>,
}

impl TableMeta {
    pub fn public(&self) -> TablePublic {
        TablePublic {
            table_id: self.id.clone(),
            name: self.name.clone(),
            stake: self.stake,
            min_players: self.min_players,
            max_players: self.max_players,
            current_player_count: self.seats.len(),
            status: self.status,
        }
    }

    pub fn humans(&self) -> usize {
        self.seats.iter().filter(|s| !s.is_ai).count()
    }

    pub fn bots(&self) -> usize {
        self.seats.iter().filter(|s| s.is_ai).count()
    }
}

/// Per-table session: the live game, its broadcast room and the round
/// bookkeeping the timers re-validate against.
pub(crate) struct TableSession {
    pub table: TableMeta,
    pub game: Option<GameState>,
    pub broadcaster: broadcast::Sender<ServerMsg>,
    /// True while a bot-driving loop runs for this table.
    pub driving: bool,
    /// True once the current round-end has been settled.
    pub round_settled: bool,
    /// True while a round-transition timer is armed.
    pub transition_scheduled: bool,
    /// Dealer seat for the next deal; rotated at each round transition.
    pub dealer_index: usize,
    bot_seq: usize,
    pub bot_manager: BotManager,
}

impl TableSession {
    pub fn new(cfg: &TableConfig) -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_BUFFER_SIZE);
        TableSession {
            table: TableMeta {
                id: cfg.id.clone(),
                name: cfg.name.clone(),
                stake: cfg.stake,
                min_players: cfg.min_players,
                max_players: cfg.max_players,
                status: TableStatus::Waiting,
                seats: Vec::new(),
            },
            game: None,
            broadcaster: tx,
            driving: false,
            round_settled: false,
            transition_scheduled: false,
            dealer_index: 0,
            bot_seq: 0,
            bot_manager: BotManager::new(),
        }
    }

    /// Send to every subscriber of this table's room. A full or empty
    /// channel is not an error.
    pub fn broadcast(&self, msg: ServerMsg) {
        let _ = self.broadcaster.send(msg);
    }

    pub fn next_bot_seat(&mut self) -> SeatInfo {
        self.bot_seq += 1;
        SeatInfo {
            user_id: format!("bot-{}-{}", self.table.id, self.bot_seq),
            username: format!("Bot {}", self.bot_seq),
            is_ai: true,
        }
    }
}
