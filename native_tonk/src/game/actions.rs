//! Action application: guards and effects for every turn action.

use tonk_shared::{Card, DrawSource, GameStatus, LastAction, RoundEndReason};

use super::engine::now_millis;
use super::{spreads, GameError, GameState, PlayerAction};

impl GameState {
    /// Validate and apply one action for the seat at `actor`. On error the
    /// state is untouched.
    pub fn apply_player_action(
        &mut self,
        actor: usize,
        action: PlayerAction,
    ) -> Result<(), GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::RoundOver);
        }
        if actor != self.current_player_index {
            return Err(GameError::NotYourTurn);
        }
        match action {
            PlayerAction::Draw { source } => self.execute_draw(actor, source),
            PlayerAction::Discard { card } => self.execute_discard(actor, card),
            PlayerAction::Spread { cards } => self.execute_spread(actor, cards),
            PlayerAction::Hit {
                card,
                target_player_id,
                target_spread_index,
            } => self.execute_hit(actor, card, &target_player_id, target_spread_index),
            PlayerAction::Drop => self.execute_drop(actor),
        }
    }

    fn execute_draw(&mut self, actor: usize, source: DrawSource) -> Result<(), GameError> {
        if self.players[actor].has_taken_action_this_turn {
            return Err(GameError::AlreadyActed);
        }
        match source {
            DrawSource::Deck => {
                let Some(card) = self.deck.pop() else {
                    // Stock exhausted: the round resolves to the lowest hand.
                    let winner = self.lowest_hand_index();
                    self.end_round(RoundEndReason::DeckEmpty, winner);
                    return Ok(());
                };
                let user_id = self.players[actor].user_id.clone();
                self.players[actor].hand.push(card);
                self.players[actor].has_taken_action_this_turn = true;
                self.touch(LastAction::Draw {
                    user_id,
                    source,
                    at: now_millis(),
                });
            }
            DrawSource::Discard => {
                let Some(card) = self.discard_pile.pop() else {
                    return Err(GameError::EmptyDiscard);
                };
                let user_id = self.players[actor].user_id.clone();
                self.players[actor].hand.push(card);
                self.players[actor].restricted_discard_card = Some(card);
                self.players[actor].has_taken_action_this_turn = true;
                self.touch(LastAction::Draw {
                    user_id,
                    source,
                    at: now_millis(),
                });
            }
        }
        Ok(())
    }

    fn execute_discard(&mut self, actor: usize, card: Card) -> Result<(), GameError> {
        if !self.players[actor].has_taken_action_this_turn {
            return Err(GameError::MustDrawFirst);
        }
        let Some(pos) = self.players[actor].hand.iter().position(|&c| c == card) else {
            return Err(GameError::CardNotInHand(card));
        };
        if self.players[actor].restricted_discard_card == Some(card) {
            return Err(GameError::RestrictedDiscard);
        }
        let user_id = self.players[actor].user_id.clone();
        self.players[actor].hand.remove(pos);
        self.discard_pile.push(card);
        self.touch(LastAction::Discard {
            user_id,
            card,
            at: now_millis(),
        });
        self.next_turn();
        Ok(())
    }

    fn execute_spread(&mut self, actor: usize, cards: Vec<Card>) -> Result<(), GameError> {
        if !self.players[actor].has_taken_action_this_turn {
            return Err(GameError::MustDrawFirst);
        }
        // Verify ownership against a working copy so a failure leaves the
        // hand untouched.
        let mut remaining = self.players[actor].hand.clone();
        for card in &cards {
            let Some(pos) = remaining.iter().position(|c| c == card) else {
                return Err(GameError::CardNotInHand(*card));
            };
            remaining.remove(pos);
        }
        if !spreads::is_valid_spread(&cards) {
            return Err(GameError::InvalidSpread);
        }

        let mut meld = cards.clone();
        if spreads::is_run(&meld) {
            meld.sort_by_key(|c| c.rank.sequence_index());
        }
        let user_id = self.players[actor].user_id.clone();
        self.players[actor].hand = remaining;
        self.players[actor].spreads.push(meld);
        self.touch(LastAction::Spread {
            user_id,
            cards,
            at: now_millis(),
        });

        if spreads::check_reem(&self.players[actor]) {
            self.end_round(RoundEndReason::Reem, actor);
        }
        Ok(())
    }

    fn execute_hit(
        &mut self,
        actor: usize,
        card: Card,
        target_player_id: &str,
        target_spread_index: usize,
    ) -> Result<(), GameError> {
        if !self.players[actor].has_taken_action_this_turn {
            return Err(GameError::MustDrawFirst);
        }
        let Some(pos) = self.players[actor].hand.iter().position(|&c| c == card) else {
            return Err(GameError::CardNotInHand(card));
        };
        let Some(target) = self.player_index(target_player_id) else {
            return Err(GameError::NoSuchPlayer(target_player_id.to_owned()));
        };
        if target_spread_index >= self.players[target].spreads.len() {
            return Err(GameError::NoSuchSpread(target_spread_index));
        }
        if !spreads::can_hit(&self.players[target].spreads[target_spread_index], card) {
            return Err(GameError::InvalidHit(card));
        }

        let user_id = self.players[actor].user_id.clone();
        self.players[actor].hand.remove(pos);
        let spread = &mut self.players[target].spreads[target_spread_index];
        spread.push(card);
        if spreads::is_run(spread) {
            spread.sort_by_key(|c| c.rank.sequence_index());
        }
        self.apply_hit_lock(target);
        self.touch(LastAction::Hit {
            user_id,
            card,
            target_player_id: target_player_id.to_owned(),
            target_spread_index,
            at: now_millis(),
        });
        Ok(())
    }

    fn execute_drop(&mut self, actor: usize) -> Result<(), GameError> {
        if self.players[actor].has_taken_action_this_turn {
            return Err(GameError::AlreadyActed);
        }
        if self.players[actor].is_hit_locked {
            return Err(GameError::HitLocked);
        }

        let user_id = self.players[actor].user_id.clone();
        self.touch(LastAction::Drop {
            user_id: user_id.clone(),
            at: now_millis(),
        });

        // A drop only wins if the dropper's hand beats every other hand
        // outright; a tie counts as caught.
        let drop_value = spreads::hand_value(&self.players[actor].hand);
        let mut catcher: Option<(usize, u32)> = None;
        for (i, p) in self.players.iter().enumerate() {
            if i == actor {
                continue;
            }
            let v = spreads::hand_value(&p.hand);
            if v <= drop_value && catcher.map_or(true, |(_, best)| v < best) {
                catcher = Some((i, v));
            }
        }
        match catcher {
            Some((winner, _)) => {
                self.caught_dropping_player_id = Some(user_id);
                self.end_round(RoundEndReason::CaughtDrop, winner);
            }
            None => self.end_round(RoundEndReason::Regular, actor),
        }
        Ok(())
    }
}
