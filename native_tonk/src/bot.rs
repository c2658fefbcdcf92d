//! Bot decision making, separated from the session machinery that schedules
//! bot turns.
//!
//! The strategist only ever proposes actions that are legal for the seat's
//! current turn phase, so the session can apply its choice directly.

use anyhow::Result;
use tonk_shared::{Card, DrawSource};

use crate::game::{spreads, GameState, PlayerAction, PlayerState};

/// Rule-based strategist for bot seats.
#[derive(Debug, Clone)]
pub struct TonkStrategist {
    /// Drop when holding this many points or fewer before drawing.
    pub drop_threshold: u32,
}

impl Default for TonkStrategist {
    fn default() -> Self {
        Self { drop_threshold: 5 }
    }
}

impl TonkStrategist {
    /// Pick one action for the bot at `seat`. Priority: a spread that sets
    /// up (or completes) a Reem, then any spread, then any hit, then a cheap
    /// drop, then the draw, then a random discard.
    pub fn decide_action(&self, game: &GameState, seat: usize) -> PlayerAction {
        let player = &game.players[seat];

        if player.has_taken_action_this_turn {
            if let Some(cards) = reem_enabling_spread(player) {
                return PlayerAction::Spread { cards };
            }
            if let Some(cards) = first_valid_spread(&player.hand) {
                return PlayerAction::Spread { cards };
            }
            if let Some(action) = first_legal_hit(game, seat) {
                return action;
            }
            return PlayerAction::Discard {
                card: random_discard(player),
            };
        }

        if !player.is_hit_locked && spreads::hand_value(&player.hand) <= self.drop_threshold {
            return PlayerAction::Drop;
        }
        PlayerAction::Draw {
            source: DrawSource::Deck,
        }
    }
}

/// A spread whose removal leaves the rest of the hand as a second spread
/// (first spread of a Reem pair), or empties the hand when one spread is
/// already down (completing the Reem).
fn reem_enabling_spread(player: &PlayerState) -> Option<Vec<Card>> {
    for cards in spread_candidates(&player.hand) {
        let remaining = without(&player.hand, &cards);
        let wins = match player.spreads.len() {
            0 => remaining.len() >= 3 && spreads::is_valid_spread(&remaining),
            1 => remaining.is_empty(),
            _ => false,
        };
        if wins {
            return Some(cards);
        }
    }
    None
}

fn first_valid_spread(hand: &[Card]) -> Option<Vec<Card>> {
    spread_candidates(hand).into_iter().next()
}

/// All valid spreads available from a hand, smallest first. Enumerates 3-,
/// 4- and 5-card combinations.
fn spread_candidates(hand: &[Card]) -> Vec<Vec<Card>> {
    let mut found = Vec::new();
    for size in 3..=hand.len().min(5) {
        combinations(hand, size, &mut found);
    }
    found
}

fn combinations(hand: &[Card], size: usize, out: &mut Vec<Vec<Card>>) {
    let n = hand.len();
    let mut idx: Vec<usize> = (0..size).collect();
    loop {
        let cards: Vec<Card> = idx.iter().map(|&i| hand[i]).collect();
        if spreads::is_valid_spread(&cards) {
            out.push(cards);
        }
        // Advance to the next combination in lexicographic order.
        let mut i = size;
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            if idx[i] != i + n - size {
                break;
            }
            if i == 0 {
                return;
            }
        }
        idx[i] += 1;
        for j in i + 1..size {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

fn without(hand: &[Card], cards: &[Card]) -> Vec<Card> {
    let mut remaining = hand.to_vec();
    for card in cards {
        if let Some(pos) = remaining.iter().position(|c| c == card) {
            remaining.remove(pos);
        }
    }
    remaining
}

/// First card in hand that can extend any spread on the table.
fn first_legal_hit(game: &GameState, seat: usize) -> Option<PlayerAction> {
    for &card in &game.players[seat].hand {
        for target in &game.players {
            for (idx, spread) in target.spreads.iter().enumerate() {
                if spreads::can_hit(spread, card) {
                    return Some(PlayerAction::Hit {
                        card,
                        target_player_id: target.user_id.clone(),
                        target_spread_index: idx,
                    });
                }
            }
        }
    }
    None
}

/// Uniformly random discard, avoiding the restricted card while any
/// alternative exists.
fn random_discard(player: &PlayerState) -> Card {
    let candidates: Vec<Card> = player
        .hand
        .iter()
        .copied()
        .filter(|&c| Some(c) != player.restricted_discard_card)
        .collect();
    let pool = if candidates.is_empty() {
        &player.hand
    } else {
        &candidates
    };
    let idx = (rand::random::<f32>() * pool.len() as f32) as usize;
    pool[idx.min(pool.len() - 1)]
}

/// Interface between the table session and the strategist.
#[derive(Debug, Clone, Default)]
pub struct BotManager {
    strategist: TonkStrategist,
}

impl BotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next action for the bot at `seat`.
    pub fn generate_action(&self, game: &GameState, seat: usize) -> Result<PlayerAction> {
        anyhow::ensure!(seat < game.players.len(), "bot seat {seat} out of range");
        let action = self.strategist.decide_action(game, seat);
        tracing::debug!(seat, action = ?action, "bot decision");
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::build_deck;
    use std::collections::BTreeMap;
    use tonk_shared::{GameStatus, Rank, Suit};

    fn c(suit: Suit, rank: Rank) -> Card {
        Card::new(suit, rank)
    }

    fn bot_game(hand: Vec<Card>) -> GameState {
        let mut stock = build_deck();
        stock.retain(|card| !hand.contains(card));
        let other_hand: Vec<Card> = stock.split_off(stock.len() - 5);
        GameState {
            table_id: "t1".to_owned(),
            base_stake: 10,
            pot: 20,
            locked_antes: BTreeMap::new(),
            players: vec![
                PlayerState {
                    user_id: "bot-0".to_owned(),
                    username: "Bot".to_owned(),
                    is_ai: true,
                    hand,
                    spreads: Vec::new(),
                    has_taken_action_this_turn: false,
                    is_hit_locked: false,
                    hit_lock_counter: 0,
                    restricted_discard_card: None,
                    current_buy_in: 10,
                },
                PlayerState {
                    user_id: "u1".to_owned(),
                    username: "Human".to_owned(),
                    is_ai: false,
                    hand: other_hand,
                    spreads: Vec::new(),
                    has_taken_action_this_turn: false,
                    is_hit_locked: false,
                    hit_lock_counter: 0,
                    restricted_discard_card: None,
                    current_buy_in: 10,
                },
            ],
            current_dealer_index: 1,
            current_player_index: 0,
            turn: 1,
            deck: stock,
            discard_pile: Vec::new(),
            status: GameStatus::InProgress,
            last_action: None,
            round_ended_by: None,
            round_winner_id: None,
            caught_dropping_player_id: None,
            hand_scores: BTreeMap::new(),
            payouts: None,
        }
    }

    fn high_hand() -> Vec<Card> {
        vec![
            c(Suit::Hearts, Rank::King),
            c(Suit::Diamonds, Rank::Queen),
            c(Suit::Spades, Rank::Jack),
            c(Suit::Hearts, Rank::Seven),
            c(Suit::Diamonds, Rank::Six),
        ]
    }

    #[test]
    fn fresh_turn_without_options_draws_from_the_deck() {
        let g = bot_game(high_hand());
        let action = TonkStrategist::default().decide_action(&g, 0);
        assert_eq!(
            action,
            PlayerAction::Draw {
                source: DrawSource::Deck
            }
        );
    }

    #[test]
    fn cheap_hand_drops_before_drawing() {
        let g = bot_game(vec![
            c(Suit::Hearts, Rank::Ace),
            c(Suit::Diamonds, Rank::Two),
            c(Suit::Clubs, Rank::Ace),
        ]);
        let action = TonkStrategist::default().decide_action(&g, 0);
        assert_eq!(action, PlayerAction::Drop);
    }

    #[test]
    fn hit_locked_bot_draws_instead_of_dropping() {
        let mut g = bot_game(vec![
            c(Suit::Hearts, Rank::Ace),
            c(Suit::Diamonds, Rank::Two),
            c(Suit::Clubs, Rank::Ace),
        ]);
        g.players[0].is_hit_locked = true;
        g.players[0].hit_lock_counter = 2;
        let action = TonkStrategist::default().decide_action(&g, 0);
        assert_eq!(
            action,
            PlayerAction::Draw {
                source: DrawSource::Deck
            }
        );
    }

    #[test]
    fn spreads_once_it_has_drawn() {
        let mut g = bot_game(vec![
            c(Suit::Hearts, Rank::King),
            c(Suit::Clubs, Rank::King),
            c(Suit::Spades, Rank::King),
            c(Suit::Hearts, Rank::Seven),
            c(Suit::Diamonds, Rank::Six),
        ]);
        g.players[0].has_taken_action_this_turn = true;
        let action = TonkStrategist::default().decide_action(&g, 0);
        match action {
            PlayerAction::Spread { cards } => {
                assert_eq!(cards.len(), 3);
                assert!(cards.iter().all(|card| card.rank == Rank::King));
            }
            other => panic!("expected a spread, got {other:?}"),
        }
    }

    #[test]
    fn prefers_the_spread_that_sets_up_a_reem() {
        // Kings spread plus a club run: either order works, but the pair must
        // be chosen over nothing. Add a junk card so only the run + kings
        // split is NOT a full reem; the bot must still find a first spread
        // whose remainder is spreadable.
        let mut g = bot_game(vec![
            c(Suit::Hearts, Rank::King),
            c(Suit::Clubs, Rank::King),
            c(Suit::Spades, Rank::King),
            c(Suit::Clubs, Rank::Three),
            c(Suit::Clubs, Rank::Four),
            c(Suit::Clubs, Rank::Five),
        ]);
        g.players[0].has_taken_action_this_turn = true;
        let action = TonkStrategist::default().decide_action(&g, 0);
        let PlayerAction::Spread { cards } = action else {
            panic!("expected a spread");
        };
        let remaining = without(&g.players[0].hand, &cards);
        assert!(spreads::is_valid_spread(&remaining));
    }

    #[test]
    fn completes_a_reem_when_one_spread_is_down() {
        let mut g = bot_game(vec![
            c(Suit::Clubs, Rank::Three),
            c(Suit::Clubs, Rank::Four),
            c(Suit::Clubs, Rank::Five),
        ]);
        g.players[0].spreads.push(vec![
            c(Suit::Hearts, Rank::King),
            c(Suit::Clubs, Rank::King),
            c(Suit::Spades, Rank::King),
        ]);
        g.players[0].has_taken_action_this_turn = true;
        let action = TonkStrategist::default().decide_action(&g, 0);
        let PlayerAction::Spread { cards } = action else {
            panic!("expected the reem-completing spread");
        };
        assert_eq!(cards.len(), 3);
    }

    #[test]
    fn hits_a_table_spread_when_it_cannot_spread() {
        let mut g = bot_game(vec![
            c(Suit::Spades, Rank::Ace),
            c(Suit::Hearts, Rank::King),
            c(Suit::Diamonds, Rank::Queen),
            c(Suit::Hearts, Rank::Seven),
            c(Suit::Diamonds, Rank::Six),
        ]);
        g.players[1].spreads.push(vec![
            c(Suit::Hearts, Rank::Ace),
            c(Suit::Diamonds, Rank::Ace),
            c(Suit::Clubs, Rank::Ace),
        ]);
        g.players[0].has_taken_action_this_turn = true;
        let action = TonkStrategist::default().decide_action(&g, 0);
        assert_eq!(
            action,
            PlayerAction::Hit {
                card: c(Suit::Spades, Rank::Ace),
                target_player_id: "u1".to_owned(),
                target_spread_index: 0,
            }
        );
    }

    #[test]
    fn falls_back_to_a_discard_from_hand() {
        let mut g = bot_game(high_hand());
        g.players[0].has_taken_action_this_turn = true;
        let action = TonkStrategist::default().decide_action(&g, 0);
        let PlayerAction::Discard { card } = action else {
            panic!("expected a discard");
        };
        assert!(g.players[0].hand.contains(&card));
    }

    #[test]
    fn manager_rejects_out_of_range_seats() {
        let g = bot_game(high_hand());
        assert!(BotManager::new().generate_action(&g, 7).is_err());
    }
}
