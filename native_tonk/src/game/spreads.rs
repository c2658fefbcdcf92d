//! Spread and hit predicates, hand valuation, Reem and auto-win detection.

use tonk_shared::{Card, RoundEndReason};

use super::engine::{GameState, PlayerState};

/// Total point value of a set of cards.
pub fn hand_value(cards: &[Card]) -> u32 {
    cards.iter().map(|c| c.value()).sum()
}

/// A spread is 3+ cards that either all share a rank, or all share a suit
/// with ranks forming a consecutive run in the variant's sequence order
/// (Jack directly follows Seven).
pub fn is_valid_spread(cards: &[Card]) -> bool {
    if cards.len() < 3 {
        return false;
    }
    is_rank_meld(cards) || is_run(cards)
}

/// All cards share a rank. Suits are necessarily distinct because the deck
/// holds one card per (suit, rank).
pub fn is_rank_meld(cards: &[Card]) -> bool {
    cards.windows(2).all(|w| w[0].rank == w[1].rank)
}

/// All cards share a suit and their sequence indices are consecutive.
pub fn is_run(cards: &[Card]) -> bool {
    if cards.iter().any(|c| c.suit != cards[0].suit) {
        return false;
    }
    let mut indices: Vec<u8> = cards.iter().map(|c| c.rank.sequence_index()).collect();
    indices.sort_unstable();
    indices.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Whether `card` may be added to an existing (valid) spread.
///
/// Rank-melds take the card only if it shares the rank and brings a suit not
/// already present. Runs take the card only if it shares the suit and sits
/// exactly one step below the run's minimum or above its maximum.
pub fn can_hit(spread: &[Card], card: Card) -> bool {
    if spread.is_empty() {
        return false;
    }
    if is_rank_meld(spread) {
        return card.rank == spread[0].rank && !spread.iter().any(|c| c.suit == card.suit);
    }
    if card.suit != spread[0].suit {
        return false;
    }
    let min = spread
        .iter()
        .map(|c| c.rank.sequence_index())
        .min()
        .unwrap_or(0);
    let max = spread
        .iter()
        .map(|c| c.rank.sequence_index())
        .max()
        .unwrap_or(0);
    let idx = card.rank.sequence_index();
    (min > 0 && idx == min - 1) || idx == max + 1
}

/// Reem: the player has laid exactly two spreads and holds no cards.
pub fn check_reem(player: &PlayerState) -> bool {
    player.spreads.len() == 2 && player.hand.is_empty()
}

/// Inspect freshly dealt hands for an automatic win. Applied once, before
/// any action. Triple-stake hands (41, or 11 and under) take precedence over
/// regular auto-wins (50 or 47); ties go to the earliest seat.
pub fn detect_auto_win(game: &GameState) -> Option<(usize, RoundEndReason)> {
    for (i, p) in game.players.iter().enumerate() {
        let v = hand_value(&p.hand);
        if v == 41 || v <= 11 {
            return Some((i, RoundEndReason::AutoTriple));
        }
    }
    for (i, p) in game.players.iter().enumerate() {
        let v = hand_value(&p.hand);
        if v == 50 || v == 47 {
            return Some((i, RoundEndReason::Regular));
        }
    }
    None
}
