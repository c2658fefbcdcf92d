//! Round payout calculation, dispatched on how the round ended.
//!
//! Winner credit and per-loser penalties follow the stake table; bot seats
//! participate in the arithmetic but have no wallet, so their share is
//! house-funded and absorbed at settlement time.

use std::collections::BTreeMap;

use tonk_shared::{RoundEndReason, RoundPayouts};

use super::GameState;

/// Compute the winner's credit and the loser penalties for a finished round.
/// Callers must only invoke this once `round_ended_by` and `round_winner_id`
/// are set; an unfinished game yields an empty payout.
pub fn compute_payouts(game: &GameState) -> RoundPayouts {
    let (Some(reason), Some(winner_id)) = (game.round_ended_by, game.round_winner_id.as_ref())
    else {
        return RoundPayouts::default();
    };

    let stake = game.base_stake;
    let losers: Vec<&str> = game
        .players
        .iter()
        .filter(|p| &p.user_id != winner_id)
        .map(|p| p.user_id.as_str())
        .collect();
    let n_losers = losers.len() as i64;

    let mut penalties: BTreeMap<String, i64> = BTreeMap::new();
    let winner_payout = match reason {
        RoundEndReason::Regular | RoundEndReason::DeckEmpty => game.pot,
        RoundEndReason::Reem => {
            for loser in &losers {
                penalties.insert((*loser).to_owned(), stake);
            }
            game.pot + stake * n_losers
        }
        RoundEndReason::AutoTriple => {
            for loser in &losers {
                penalties.insert((*loser).to_owned(), 3 * stake);
            }
            game.pot + 3 * stake * n_losers
        }
        RoundEndReason::CaughtDrop => {
            if let Some(dropper) = game.caught_dropping_player_id.clone() {
                penalties.insert(dropper, stake);
            }
            game.pot + stake
        }
    };

    RoundPayouts {
        winner_id: winner_id.clone(),
        winner_payout,
        penalties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::shuffled_deck_with_seed;
    use crate::game::Seat;
    use tonk_shared::GameStatus;

    fn finished_game(n: usize, reason: RoundEndReason, winner: usize) -> GameState {
        let seats: Vec<Seat> = (0..n)
            .map(|i| Seat {
                user_id: format!("u{i}"),
                username: format!("Player {i}"),
                is_ai: i != 0,
            })
            .collect();
        let mut g =
            GameState::deal_from_deck("t1", 10, &seats, 0, shuffled_deck_with_seed(3)).unwrap();
        g.record_antes(
            (0..n)
                .map(|i| (format!("u{i}"), 10))
                .collect(),
        );
        g.status = GameStatus::RoundEnd;
        g.round_ended_by = Some(reason);
        g.round_winner_id = Some(format!("u{winner}"));
        g
    }

    #[test]
    fn regular_win_takes_the_pot_only() {
        let g = finished_game(3, RoundEndReason::Regular, 0);
        let p = compute_payouts(&g);
        assert_eq!(p.winner_payout, 30);
        assert!(p.penalties.is_empty());
    }

    #[test]
    fn reem_adds_a_stake_per_loser() {
        let g = finished_game(3, RoundEndReason::Reem, 1);
        let p = compute_payouts(&g);
        assert_eq!(p.winner_payout, 30 + 10 * 2);
        assert_eq!(p.penalties.len(), 2);
        assert_eq!(p.penalties["u0"], 10);
        assert_eq!(p.penalties["u2"], 10);
    }

    #[test]
    fn auto_triple_charges_three_stakes() {
        let g = finished_game(3, RoundEndReason::AutoTriple, 0);
        let p = compute_payouts(&g);
        assert_eq!(p.winner_payout, 30 + 30 * 2);
        assert_eq!(p.penalties["u1"], 30);
        assert_eq!(p.penalties["u2"], 30);
    }

    #[test]
    fn caught_drop_charges_only_the_dropper() {
        let mut g = finished_game(3, RoundEndReason::CaughtDrop, 1);
        g.caught_dropping_player_id = Some("u0".to_owned());
        let p = compute_payouts(&g);
        assert_eq!(p.winner_payout, 30 + 10);
        assert_eq!(p.penalties.len(), 1);
        assert_eq!(p.penalties["u0"], 10);
    }

    #[test]
    fn deck_empty_pays_like_a_regular_win() {
        let g = finished_game(4, RoundEndReason::DeckEmpty, 3);
        let p = compute_payouts(&g);
        assert_eq!(p.winner_payout, 40);
        assert!(p.penalties.is_empty());
    }
}
