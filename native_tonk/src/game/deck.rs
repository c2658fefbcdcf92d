//! Deck construction, shuffling and dealing.

use rand::seq::SliceRandom;
use tonk_shared::{Card, Rank, Suit};

use super::GameError;

/// Cards dealt to each seat at the start of a round.
pub const HAND_SIZE: usize = 5;

/// The canonical 40-card Tonk deck in suit-major order.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(40);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(suit, rank));
        }
    }
    deck
}

/// A fresh deck in a uniform random order. `rand::rng()` is a CSPRNG, which
/// keeps the shuffle unpredictable to clients.
pub fn shuffled_deck() -> Vec<Card> {
    let mut deck = build_deck();
    deck.shuffle(&mut rand::rng());
    deck
}

/// Deterministic shuffle for tests and replayable scenarios.
pub fn shuffled_deck_with_seed(seed: u64) -> Vec<Card> {
    // Simple LCG, constants from Numerical Recipes.
    fn lcg(next: &mut u64) -> u32 {
        *next = next.wrapping_mul(1664525).wrapping_add(1013904223);
        (*next >> 16) as u32
    }
    let mut deck = build_deck();
    let mut s = seed;
    for i in (1..deck.len()).rev() {
        let r = lcg(&mut s) as usize % (i + 1);
        deck.swap(i, r);
    }
    deck
}

/// Deal `HAND_SIZE` cards to each of `n_players` seats, round-robin one card
/// per seat from the top of the deck (the end of the Vec). The drawn cards
/// are removed from `deck`.
pub fn deal(deck: &mut Vec<Card>, n_players: usize) -> Result<Vec<Vec<Card>>, GameError> {
    if !(2..=4).contains(&n_players) {
        return Err(GameError::PlayerCount(n_players));
    }
    if deck.len() < n_players * HAND_SIZE {
        return Err(GameError::ShortDeck);
    }
    let mut hands = vec![Vec::with_capacity(HAND_SIZE); n_players];
    for _ in 0..HAND_SIZE {
        for hand in hands.iter_mut() {
            // len checked above
            let card = deck.pop().ok_or(GameError::ShortDeck)?;
            hand.push(card);
        }
    }
    Ok(hands)
}
