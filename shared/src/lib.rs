//! Shared wire types for the Tonk table server.
//!
//! Everything here is pure data: the card model for the 40-card Tonk deck,
//! the public game-state projection broadcast to table subscribers, and the
//! tagged JSON client/server message protocol. The server crate owns the
//! authoritative state; clients only ever see these types.

pub mod cards;
pub mod game;
pub mod messages;

pub use cards::{Card, Rank, Suit};
pub use game::{
    DrawSource, GameStatePublic, GameStatus, LastAction, PlayerPublic, RoundEndReason,
    RoundPayouts, TablePublic, TableStatus,
};
pub use messages::{ClientMsg, ServerMsg};
