//! Turn rotation and round-end bookkeeping.

use tonk_shared::{GameStatus, LastAction, RoundEndReason};

use super::engine::now_millis;
use super::{payout, spreads, GameState};

impl GameState {
    /// Advance to the next seat: rotate the index, bump the turn counter,
    /// clear per-turn flags for everyone and decay hit-locks by one.
    pub(crate) fn next_turn(&mut self) {
        let n = self.players.len();
        self.current_player_index = (self.current_player_index + 1) % n;
        self.turn += 1;
        for p in &mut self.players {
            p.has_taken_action_this_turn = false;
            p.restricted_discard_card = None;
            if p.hit_lock_counter > 0 {
                p.hit_lock_counter -= 1;
                if p.hit_lock_counter == 0 {
                    p.is_hit_locked = false;
                }
            }
        }
    }

    /// Apply the hit penalty to a seat: two counts fresh, one more when the
    /// player is already locked.
    pub(crate) fn apply_hit_lock(&mut self, target: usize) {
        let p = &mut self.players[target];
        if p.is_hit_locked {
            p.hit_lock_counter += 1;
        } else {
            p.hit_lock_counter += 2;
            p.is_hit_locked = true;
        }
    }

    /// Seat holding the lowest hand value; ties go to the earliest seat.
    pub(crate) fn lowest_hand_index(&self) -> usize {
        let mut best = 0usize;
        let mut best_value = u32::MAX;
        for (i, p) in self.players.iter().enumerate() {
            let v = spreads::hand_value(&p.hand);
            if v < best_value {
                best = i;
                best_value = v;
            }
        }
        best
    }

    /// Close the round: record reason and winner, score every remaining
    /// hand, and compute the payouts that the settler will execute.
    pub fn end_round(&mut self, reason: RoundEndReason, winner: usize) {
        self.status = GameStatus::RoundEnd;
        self.round_ended_by = Some(reason);
        let winner_id = self.players[winner].user_id.clone();
        self.round_winner_id = Some(winner_id.clone());
        self.hand_scores = self
            .players
            .iter()
            .map(|p| (p.user_id.clone(), spreads::hand_value(&p.hand)))
            .collect();
        self.payouts = Some(payout::compute_payouts(self));
        self.touch(LastAction::RoundEnd {
            reason,
            winner_id,
            at: now_millis(),
        });
    }
}
