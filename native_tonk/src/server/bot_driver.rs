//! Deferred bot turns.
//!
//! After any state change that puts a bot on turn, a drive loop ticks at the
//! configured think time, re-validates that it is still that bot's turn (a
//! human leaving may have reshuffled the seats) and applies one strategist
//! action at a time, broadcasting after each.

use tonk_shared::{GameStatus, ServerMsg};

use super::state::AppState;
use super::table;

/// Drive bot turns for one table until a human is on turn, the round ends,
/// or the game disappears. Only one loop runs per table at a time.
pub async fn drive_bots(state: AppState, table_id: String) {
    let Some(session) = state.session(&table_id).await else {
        return;
    };
    {
        let mut s = session.write().await;
        if s.driving {
            return;
        }
        s.driving = true;
    }

    loop {
        // The pause makes bot play feel natural and doubles as the
        // staleness window: everything is re-checked after it.
        tokio::time::sleep(state.config.bot_think_time()).await;

        let should_act = {
            let s = session.read().await;
            match &s.game {
                Some(g) => {
                    g.status == GameStatus::InProgress && g.current_player().is_ai
                }
                None => false,
            }
        };
        if !should_act {
            break;
        }

        if !process_single_bot_action(&state, &table_id).await {
            break;
        }

        let round_ended = {
            let s = session.read().await;
            matches!(&s.game, Some(g) if g.status == GameStatus::RoundEnd)
        };
        if round_ended {
            table::settle_round_if_needed(&state, &table_id).await;
            table::schedule_round_transition(&state, &table_id).await;
            break;
        }
    }

    let mut s = session.write().await;
    s.driving = false;
}

/// Apply exactly one strategist action and broadcast the result. Returns
/// false when the turn was no longer a bot's or the action failed.
async fn process_single_bot_action(state: &AppState, table_id: &str) -> bool {
    let Some(session) = state.session(table_id).await else {
        return false;
    };
    let mut s = session.write().await;

    // Clone the manager first so the game can be borrowed mutably below.
    let bot_manager = s.bot_manager.clone();
    let Some(game) = s.game.as_mut() else {
        return false;
    };
    if game.status != GameStatus::InProgress {
        return false;
    }
    let seat = game.current_player_index;
    if !game.players[seat].is_ai {
        return false;
    }

    let bot_id = game.players[seat].user_id.clone();
    let action = match bot_manager.generate_action(game, seat) {
        Ok(action) => action,
        Err(err) => {
            tracing::error!(table = %table_id, bot = %bot_id, error = %err, "bot strategist failed");
            return false;
        }
    };

    if let Err(err) = game.apply_player_action(seat, action) {
        tracing::error!(table = %table_id, bot = %bot_id, error = %err, "bot action rejected");
        return false;
    }

    if let Err(err) = state.store.save_game(table_id, game).await {
        tracing::error!(table = %table_id, error = %err, "failed to persist bot action");
    }
    let game_state = game.public();
    s.broadcast(ServerMsg::GameStateUpdate { game_state });
    true
}
