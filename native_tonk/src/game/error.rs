use thiserror::Error;
use tonk_shared::Card;

/// Rule violations raised by the engine. These surface to the offending
/// client only, as a `gameError` message; the game state is left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("you have already drawn this turn")]
    AlreadyActed,
    #[error("draw a card before spreading, hitting or discarding")]
    MustDrawFirst,
    #[error("card {0} is not in your hand")]
    CardNotInHand(Card),
    #[error("those cards do not form a valid spread")]
    InvalidSpread,
    #[error("card {0} cannot extend that spread")]
    InvalidHit(Card),
    #[error("cannot discard the card you took from the discard pile this turn")]
    RestrictedDiscard,
    #[error("cannot drop while hit-locked")]
    HitLocked,
    #[error("the discard pile is empty")]
    EmptyDiscard,
    #[error("no player {0} at this table")]
    NoSuchPlayer(String),
    #[error("player has no spread at index {0}")]
    NoSuchSpread(usize),
    #[error("the round is already over")]
    RoundOver,
    #[error("cannot deal to {0} players; tables seat 2 to 4")]
    PlayerCount(usize),
    #[error("deck exhausted while dealing")]
    ShortDeck,
}
