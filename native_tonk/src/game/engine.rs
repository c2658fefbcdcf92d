//! Core [`GameState`] and [`PlayerState`] definitions plus constructors and
//! small helpers. The whole state derives serde so the table store can
//! round-trip it.

use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tonk_shared::{
    Card, GameStatePublic, GameStatus, LastAction, PlayerPublic, RoundEndReason, RoundPayouts,
};

use super::{deck, GameError};

/// One participant's seat in a round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub user_id: String,
    pub username: String,
    pub is_ai: bool,
    pub hand: Vec<Card>,
    pub spreads: Vec<Vec<Card>>,
    pub has_taken_action_this_turn: bool,
    pub is_hit_locked: bool,
    pub hit_lock_counter: u8,
    /// Card drawn from the discard pile this turn; it may not go straight
    /// back onto the pile.
    pub restricted_discard_card: Option<Card>,
    pub current_buy_in: i64,
}

/// Seat descriptor used when constructing a round.
#[derive(Clone, Debug)]
pub struct Seat {
    pub user_id: String,
    pub username: String,
    pub is_ai: bool,
}

/// Authoritative per-table game state. Seat order defines turn order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub table_id: String,
    pub base_stake: i64,
    pub pot: i64,
    pub locked_antes: BTreeMap<String, i64>,
    pub players: Vec<PlayerState>,
    pub current_dealer_index: usize,
    pub current_player_index: usize,
    pub turn: u64,
    /// Top of the deck is the end of the Vec.
    pub deck: Vec<Card>,
    /// Newest discard is the end of the Vec.
    pub discard_pile: Vec<Card>,
    pub status: GameStatus,
    pub last_action: Option<LastAction>,
    pub round_ended_by: Option<RoundEndReason>,
    pub round_winner_id: Option<String>,
    pub caught_dropping_player_id: Option<String>,
    pub hand_scores: BTreeMap<String, u32>,
    pub payouts: Option<RoundPayouts>,
}

impl GameState {
    /// Start a round with a fresh uniformly shuffled deck.
    pub fn deal_new(
        table_id: &str,
        base_stake: i64,
        seats: &[Seat],
        dealer_index: usize,
    ) -> Result<Self, GameError> {
        Self::deal_from_deck(table_id, base_stake, seats, dealer_index, deck::shuffled_deck())
    }

    /// Start a round using the provided deck order. Deals round-robin and
    /// hands the first turn to the seat left of the dealer.
    pub fn deal_from_deck(
        table_id: &str,
        base_stake: i64,
        seats: &[Seat],
        dealer_index: usize,
        mut deck: Vec<Card>,
    ) -> Result<Self, GameError> {
        let hands = deck::deal(&mut deck, seats.len())?;
        let players: Vec<PlayerState> = seats
            .iter()
            .zip(hands)
            .map(|(seat, hand)| PlayerState {
                user_id: seat.user_id.clone(),
                username: seat.username.clone(),
                is_ai: seat.is_ai,
                hand,
                spreads: Vec::new(),
                has_taken_action_this_turn: false,
                is_hit_locked: false,
                hit_lock_counter: 0,
                restricted_discard_card: None,
                current_buy_in: base_stake,
            })
            .collect();

        let n = players.len();
        let dealer = dealer_index % n;
        Ok(GameState {
            table_id: table_id.to_owned(),
            base_stake,
            pot: 0,
            locked_antes: BTreeMap::new(),
            players,
            current_dealer_index: dealer,
            current_player_index: (dealer + 1) % n,
            turn: 1,
            deck,
            discard_pile: Vec::new(),
            status: GameStatus::InProgress,
            last_action: None,
            round_ended_by: None,
            round_winner_id: None,
            caught_dropping_player_id: None,
            hand_scores: BTreeMap::new(),
            payouts: None,
        })
    }

    /// Record collected antes on the state. Called once per round by the
    /// session after the wallet settler reserved the stakes.
    pub fn record_antes(&mut self, antes: BTreeMap<String, i64>) {
        self.pot = antes.values().sum();
        self.locked_antes = antes;
    }

    /// Seat index for a user id.
    pub fn player_index(&self, user_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn current_player(&self) -> &PlayerState {
        &self.players[self.current_player_index]
    }

    /// Public projection broadcast to the table's room.
    pub fn public(&self) -> GameStatePublic {
        GameStatePublic {
            table_id: self.table_id.clone(),
            base_stake: self.base_stake,
            pot: self.pot,
            players: self
                .players
                .iter()
                .map(|p| PlayerPublic {
                    user_id: p.user_id.clone(),
                    username: p.username.clone(),
                    is_ai: p.is_ai,
                    hand: p.hand.clone(),
                    spreads: p.spreads.clone(),
                    has_taken_action_this_turn: p.has_taken_action_this_turn,
                    is_hit_locked: p.is_hit_locked,
                    hit_lock_counter: p.hit_lock_counter,
                    current_buy_in: p.current_buy_in,
                })
                .collect(),
            current_dealer_index: self.current_dealer_index,
            current_player_index: self.current_player_index,
            turn: self.turn,
            deck_count: self.deck.len(),
            discard_pile: self.discard_pile.clone(),
            status: self.status,
            last_action: self.last_action.clone(),
            round_ended_by: self.round_ended_by,
            round_winner_id: self.round_winner_id.clone(),
            caught_dropping_player_id: self.caught_dropping_player_id.clone(),
            hand_scores: self.hand_scores.clone(),
            payouts: self.payouts.clone(),
        }
    }

    /// Count of every card tracked by this state (deck, discard, hands,
    /// spreads). Conservation demands this always equals 40.
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.discard_pile.len()
            + self
                .players
                .iter()
                .map(|p| p.hand.len() + p.spreads.iter().map(Vec::len).sum::<usize>())
                .sum::<usize>()
    }

    /// True if any card appears in more than one location.
    pub fn has_duplicate_cards(&self) -> bool {
        let mut seen: HashSet<Card> = HashSet::new();
        let all = self
            .deck
            .iter()
            .chain(self.discard_pile.iter())
            .chain(self.players.iter().flat_map(|p| {
                p.hand
                    .iter()
                    .chain(p.spreads.iter().flat_map(|s| s.iter()))
            }));
        for &card in all {
            if !seen.insert(card) {
                return true;
            }
        }
        false
    }

    pub(crate) fn touch(&mut self, action: LastAction) {
        self.last_action = Some(action);
    }

    /// Remove a seat mid-round (player left or disconnected). The leaver's
    /// hand and spreads return to the bottom of the deck so the 40-card
    /// census holds; their locked ante stays in the pot. Turn and dealer
    /// indices clamp modulo the shrunken seat list.
    pub fn remove_player(&mut self, user_id: &str) -> bool {
        let Some(idx) = self.player_index(user_id) else {
            return false;
        };
        let departed = self.players.remove(idx);
        let mut returned = departed.hand;
        returned.extend(departed.spreads.into_iter().flatten());
        self.deck.splice(0..0, returned);

        if self.players.is_empty() {
            return true;
        }
        if idx < self.current_player_index {
            self.current_player_index -= 1;
        }
        self.current_player_index %= self.players.len();
        if idx < self.current_dealer_index {
            self.current_dealer_index -= 1;
        }
        self.current_dealer_index %= self.players.len();
        true
    }
}

/// Milliseconds since the unix epoch, for `lastAction` stamps.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::shuffled_deck_with_seed;

    fn seats(n: usize) -> Vec<Seat> {
        (0..n)
            .map(|i| Seat {
                user_id: format!("u{i}"),
                username: format!("Player {i}"),
                is_ai: false,
            })
            .collect()
    }

    #[test]
    fn dealt_round_conserves_cards() {
        let g = GameState::deal_from_deck("t1", 10, &seats(3), 0, shuffled_deck_with_seed(42))
            .unwrap();
        assert_eq!(g.total_cards(), 40);
        assert!(!g.has_duplicate_cards());
        assert_eq!(g.deck.len(), 40 - 15);
        assert!(g.discard_pile.is_empty());
        assert_eq!(g.status, GameStatus::InProgress);
    }

    #[test]
    fn first_turn_goes_left_of_dealer() {
        let g = GameState::deal_from_deck("t1", 10, &seats(3), 2, shuffled_deck_with_seed(1))
            .unwrap();
        assert_eq!(g.current_dealer_index, 2);
        assert_eq!(g.current_player_index, 0);
        assert_eq!(g.turn, 1);
    }

    #[test]
    fn antes_set_the_pot() {
        let mut g = GameState::deal_from_deck("t1", 10, &seats(2), 0, shuffled_deck_with_seed(1))
            .unwrap();
        let antes: BTreeMap<String, i64> =
            [("u0".to_owned(), 10), ("u1".to_owned(), 10)].into_iter().collect();
        g.record_antes(antes);
        assert_eq!(g.pot, 20);
        assert_eq!(g.pot, g.locked_antes.values().sum::<i64>());
    }

    #[test]
    fn state_round_trips_through_json() {
        let g = GameState::deal_from_deck("t1", 25, &seats(4), 1, shuffled_deck_with_seed(99))
            .unwrap();
        let json = serde_json::to_string(&g).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }
}
