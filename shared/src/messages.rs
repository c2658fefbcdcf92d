//! Client-server messaging protocol for the Tonk table server.
//!
//! Events are JSON objects tagged by event name. Identity travels in the
//! payload; token verification happens before a message reaches the table
//! session and is not modeled here.

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::game::{DrawSource, GameStatePublic, TablePublic};

/// Messages clients send to the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    JoinTable {
        table_id: String,
        user_id: String,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    LeaveTable {
        table_id: String,
        user_id: String,
        username: String,
    },
    /// Queue a departure for the end of the current round.
    #[serde(rename_all = "camelCase")]
    RequestLeaveTable { table_id: String, user_id: String },
    #[serde(rename_all = "camelCase")]
    DrawCard {
        table_id: String,
        user_id: String,
        source: DrawSource,
    },
    #[serde(rename_all = "camelCase")]
    DiscardCard {
        table_id: String,
        user_id: String,
        card: Card,
    },
    #[serde(rename_all = "camelCase")]
    Spread {
        table_id: String,
        user_id: String,
        cards: Vec<Card>,
    },
    #[serde(rename_all = "camelCase")]
    Hit {
        table_id: String,
        user_id: String,
        card: Card,
        target_player_id: String,
        target_spread_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    Drop { table_id: String, user_id: String },
    #[serde(rename_all = "camelCase")]
    RequestInitialGameState { table_id: String },
}

impl ClientMsg {
    /// The table a message is addressed to.
    pub fn table_id(&self) -> &str {
        match self {
            ClientMsg::JoinTable { table_id, .. }
            | ClientMsg::LeaveTable { table_id, .. }
            | ClientMsg::RequestLeaveTable { table_id, .. }
            | ClientMsg::DrawCard { table_id, .. }
            | ClientMsg::DiscardCard { table_id, .. }
            | ClientMsg::Spread { table_id, .. }
            | ClientMsg::Hit { table_id, .. }
            | ClientMsg::Drop { table_id, .. }
            | ClientMsg::RequestInitialGameState { table_id } => table_id,
        }
    }

    /// The acting user, when the event carries one.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ClientMsg::JoinTable { user_id, .. }
            | ClientMsg::LeaveTable { user_id, .. }
            | ClientMsg::RequestLeaveTable { user_id, .. }
            | ClientMsg::DrawCard { user_id, .. }
            | ClientMsg::DiscardCard { user_id, .. }
            | ClientMsg::Spread { user_id, .. }
            | ClientMsg::Hit { user_id, .. }
            | ClientMsg::Drop { user_id, .. } => Some(user_id),
            ClientMsg::RequestInitialGameState { .. } => None,
        }
    }
}

/// Messages the server sends to clients. Targeted variants are filtered by
/// the transport against the connection's bound identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    #[serde(rename_all = "camelCase")]
    InitialGameState { game_state: GameStatePublic },
    #[serde(rename_all = "camelCase")]
    GameStateUpdate { game_state: GameStatePublic },
    #[serde(rename_all = "camelCase")]
    TableUpdate {
        message: String,
        table: TablePublic,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_state: Option<GameStatePublic>,
    },
    #[serde(rename_all = "camelCase")]
    WalletBalanceUpdate { user_id: String, balance: i64 },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { user_id: String },
    #[serde(rename_all = "camelCase")]
    GameError { message: String },
    AckLeaveRequest,
}
