//! Wallet records and the transactional settlement surface.
//!
//! Every round boundary touches money exactly once: antes are reserved when
//! a round starts and the payout/penalty set is applied when it ends. Both
//! run inside a single store transaction so a failure leaves no partial
//! write.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonk_shared::RoundEndReason;

pub mod memory;
pub mod settle;

pub use memory::InMemoryWalletStore;
pub use settle::{collect_antes, settle};

/// A user's balance record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wallet {
    pub user_id: String,
    pub available_balance: i64,
    pub pending_withdrawals: i64,
    pub lifetime_deposits: i64,
    pub lifetime_withdrawals: i64,
    pub match_earnings_history: Vec<EarningsEntry>,
}

impl Wallet {
    pub fn new(user_id: &str, opening_balance: i64) -> Self {
        Wallet {
            user_id: user_id.to_owned(),
            available_balance: opening_balance,
            pending_withdrawals: 0,
            lifetime_deposits: opening_balance,
            lifetime_withdrawals: 0,
            match_earnings_history: Vec::new(),
        }
    }
}

/// One line of a wallet's match-earnings history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EarningsEntry {
    pub match_id: String,
    /// Net amount applied to the wallet at settlement (negative for losses).
    pub delta: i64,
    pub at: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Win,
    Loss,
}

/// One wallet credit or debit, tied to the match that caused it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub match_id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub at: u64,
}

/// Per-player line of a match record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPlayerStats {
    pub user_id: String,
    pub stake: i64,
    pub buy_in: i64,
    /// Net credit applied at settlement: the winner's payout, a penalised
    /// loser's negative penalty, zero otherwise.
    pub payout: i64,
    pub final_hand_value: u32,
}

/// Immutable record of a settled round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecord {
    pub id: String,
    pub table_id: String,
    pub pot: i64,
    pub win_type: RoundEndReason,
    pub winner_id: String,
    pub players: Vec<MatchPlayerStats>,
    pub penalties: BTreeMap<String, i64>,
    pub at: u64,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet for user {0}")]
    NotFound(String),
    #[error("insufficient funds for {user_id}: need {needed}, have {available}")]
    InsufficientFunds {
        user_id: String,
        needed: i64,
        available: i64,
    },
    #[error("settlement would overdraw wallet {0}")]
    WouldGoNegative(String),
    #[error("wallet backend failure: {0}")]
    Backend(String),
}

/// Wallet persistence. `begin` opens a transaction; nothing is visible until
/// `commit`.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn WalletTxn + Send>, WalletError>;
    /// Read a wallet outside any transaction (join checks, balance pushes).
    async fn wallet(&self, user_id: &str) -> Result<Option<Wallet>, WalletError>;
    /// Create the wallet with `opening_balance` when missing; return the
    /// record either way.
    async fn ensure_wallet(
        &self,
        user_id: &str,
        opening_balance: i64,
    ) -> Result<Wallet, WalletError>;
}

/// Staged wallet mutations. Dropping a transaction without committing
/// discards it.
#[async_trait]
pub trait WalletTxn: Send {
    async fn load_wallet(&mut self, user_id: &str) -> Result<Wallet, WalletError>;
    /// Apply a delta to the available balance, refusing to overdraw.
    async fn adjust_balance(&mut self, user_id: &str, delta: i64) -> Result<i64, WalletError>;
    async fn append_earnings(
        &mut self,
        user_id: &str,
        entry: EarningsEntry,
    ) -> Result<(), WalletError>;
    async fn insert_match(&mut self, record: MatchRecord) -> Result<(), WalletError>;
    async fn insert_transaction(&mut self, record: TransactionRecord) -> Result<(), WalletError>;
    async fn commit(self: Box<Self>) -> Result<(), WalletError>;
    async fn rollback(self: Box<Self>);
}
