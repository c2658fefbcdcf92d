//! Pure rules engine for the Tonk variant. No I/O: every function takes a
//! [`GameState`] plus action arguments and either mutates it or fails with a
//! typed [`GameError`] leaving the state untouched.

pub mod actions;
pub mod deck;
pub mod engine;
mod error;
pub mod flow;
pub mod payout;
pub mod spreads;

pub use engine::{GameState, PlayerState, Seat};
pub use error::GameError;

use tonk_shared::{Card, DrawSource};

/// A turn action, as resolved by the table session or the bot strategist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    Draw {
        source: DrawSource,
    },
    Discard {
        card: Card,
    },
    Spread {
        cards: Vec<Card>,
    },
    Hit {
        card: Card,
        target_player_id: String,
        target_spread_index: usize,
    },
    Drop,
}
