//! Public game-state types broadcast to table subscribers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cards::Card;

/// Table lifecycle status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    Starting,
    InProgress,
    RoundEnd,
}

/// How the current round ended.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundEndReason {
    Regular,
    Reem,
    AutoTriple,
    CaughtDrop,
    DeckEmpty,
}

/// Where a draw takes its card from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    Deck,
    Discard,
}

/// The most recent state transition, kept on the game for UI diffing.
/// Every variant carries explicit fields plus a unix-millis timestamp.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LastAction {
    #[serde(rename_all = "camelCase")]
    Draw {
        user_id: String,
        source: DrawSource,
        at: u64,
    },
    #[serde(rename_all = "camelCase")]
    Discard { user_id: String, card: Card, at: u64 },
    #[serde(rename_all = "camelCase")]
    Spread {
        user_id: String,
        cards: Vec<Card>,
        at: u64,
    },
    #[serde(rename_all = "camelCase")]
    Hit {
        user_id: String,
        card: Card,
        target_player_id: String,
        target_spread_index: usize,
        at: u64,
    },
    #[serde(rename_all = "camelCase")]
    Drop { user_id: String, at: u64 },
    #[serde(rename_all = "camelCase")]
    RoundEnd {
        reason: RoundEndReason,
        winner_id: String,
        at: u64,
    },
}

/// Winner credit and loser penalties for a settled round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoundPayouts {
    pub winner_id: String,
    pub winner_payout: i64,
    /// user id → penalty amount debited on top of the ante.
    pub penalties: BTreeMap<String, i64>,
}

/// A player's seat as seen by every table subscriber. The current design
/// exposes hands to the whole room; redaction is a wire-level concern for a
/// future version.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    pub user_id: String,
    pub username: String,
    pub is_ai: bool,
    pub hand: Vec<Card>,
    pub spreads: Vec<Vec<Card>>,
    pub has_taken_action_this_turn: bool,
    pub is_hit_locked: bool,
    pub hit_lock_counter: u8,
    pub current_buy_in: i64,
}

/// Complete public view of a table's game state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePublic {
    pub table_id: String,
    pub base_stake: i64,
    pub pot: i64,
    pub players: Vec<PlayerPublic>,
    pub current_dealer_index: usize,
    pub current_player_index: usize,
    pub turn: u64,
    pub deck_count: usize,
    pub discard_pile: Vec<Card>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<LastAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_ended_by: Option<RoundEndReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_winner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caught_dropping_player_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hand_scores: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payouts: Option<RoundPayouts>,
}

/// Lobby-level table summary carried by `tableUpdate` events.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TablePublic {
    pub table_id: String,
    pub name: String,
    pub stake: i64,
    pub min_players: usize,
    pub max_players: usize,
    pub current_player_count: usize,
    pub status: TableStatus,
}

/// Whether a table is gathering players or mid-game.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TableStatus {
    Waiting,
    InGame,
}
