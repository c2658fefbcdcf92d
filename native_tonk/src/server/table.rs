//! Table session orchestration: join/leave, round lifecycle, action routing
//! and the deferred round-transition handling.
//!
//! All game mutations for a table happen under that session's lock; leaves
//! and round transitions additionally take the store's per-table lock so
//! concurrent actors (other processes, timers) serialise correctly.

use std::future::Future;
use std::io::IsTerminal;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tokio::sync::RwLock;
use tonk_shared::{ClientMsg, GameStatus, ServerMsg, TableStatus};

use crate::game::{spreads, GameState, PlayerAction, Seat};
use crate::pretty;
use crate::store::PlayerInfo;
use crate::wallet;

use super::state::{AppState, TableSession};

/// Dispatch a client message. The return value goes only to the originating
/// connection; room-wide effects are broadcast through the table's channel.
pub async fn handle_client_msg(state: &AppState, msg: ClientMsg) -> ServerMsg {
    let table_id = msg.table_id().to_owned();
    let result = match msg {
        ClientMsg::JoinTable {
            table_id,
            user_id,
            username,
            avatar_url,
        } => join_table(state, &table_id, &user_id, &username, avatar_url).await,
        ClientMsg::LeaveTable {
            table_id, user_id, ..
        } => leave_table(state, &table_id, &user_id).await,
        ClientMsg::RequestLeaveTable { table_id, user_id } => {
            request_leave(state, &table_id, &user_id).await
        }
        ClientMsg::RequestInitialGameState { table_id } => initial_state(state, &table_id).await,
        ClientMsg::DrawCard {
            table_id,
            user_id,
            source,
        } => apply_action(state, &table_id, &user_id, PlayerAction::Draw { source }).await,
        ClientMsg::DiscardCard {
            table_id,
            user_id,
            card,
        } => apply_action(state, &table_id, &user_id, PlayerAction::Discard { card }).await,
        ClientMsg::Spread {
            table_id,
            user_id,
            cards,
        } => apply_action(state, &table_id, &user_id, PlayerAction::Spread { cards }).await,
        ClientMsg::Hit {
            table_id,
            user_id,
            card,
            target_player_id,
            target_spread_index,
        } => {
            apply_action(
                state,
                &table_id,
                &user_id,
                PlayerAction::Hit {
                    card,
                    target_player_id,
                    target_spread_index,
                },
            )
            .await
        }
        ClientMsg::Drop { table_id, user_id } => {
            apply_action(state, &table_id, &user_id, PlayerAction::Drop).await
        }
    };
    match result {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(table = %table_id, error = %err, "client message rejected");
            ServerMsg::GameError {
                message: err.to_string(),
            }
        }
    }
}

async fn join_table(
    state: &AppState,
    table_id: &str,
    user_id: &str,
    username: &str,
    avatar_url: Option<String>,
) -> Result<ServerMsg> {
    let session = state
        .session(table_id)
        .await
        .with_context(|| format!("no such table: {table_id}"))?;

    // Re-join: send the current state without touching the seat list.
    {
        let s = session.read().await;
        if s.table.seats.iter().any(|seat| seat.user_id == user_id) {
            return Ok(match &s.game {
                Some(game) => ServerMsg::InitialGameState {
                    game_state: game.public(),
                },
                None => ServerMsg::TableUpdate {
                    message: format!("{username} rejoined"),
                    table: s.table.public(),
                    game_state: None,
                },
            });
        }
        ensure!(
            s.table.seats.len() < s.table.max_players,
            "table {table_id} is full"
        );
    }

    // Joining needs headroom for several antes, not just one.
    let stake = {
        let s = session.read().await;
        s.table.stake
    };
    if let Some(opening) = state.config.grant_opening_balance {
        state
            .wallets
            .ensure_wallet(user_id, opening)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }
    let balance = wallet::settle::available_balance(state.wallets.as_ref(), user_id).await;
    ensure!(
        balance >= 4 * stake,
        "insufficient balance to join: need {} available",
        4 * stake
    );

    state
        .store
        .set_player_info(
            table_id,
            user_id,
            PlayerInfo {
                username: username.to_owned(),
                is_ai: false,
                avatar_url,
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut s = session.write().await;
    ensure!(
        s.table.seats.len() < s.table.max_players,
        "table {table_id} is full"
    );
    s.table.seats.push(super::state::SeatInfo {
        user_id: user_id.to_owned(),
        username: username.to_owned(),
        is_ai: false,
    });

    // A lone human should not wait for a second one: seat a bot for a 1v1.
    if s.table.status == TableStatus::Waiting && s.table.seats.len() == 1 {
        let bot = s.next_bot_seat();
        state
            .store
            .set_player_info(
                table_id,
                &bot.user_id,
                PlayerInfo {
                    username: bot.username.clone(),
                    is_ai: true,
                    avatar_url: None,
                },
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        s.table.seats.push(bot);
    }

    if s.table.status == TableStatus::Waiting && s.table.seats.len() >= s.table.min_players {
        start_round(state, &mut s).await?;
    }

    let table = s.table.public();
    let game_state = s.game.as_ref().map(|g| g.public());
    s.broadcast(ServerMsg::TableUpdate {
        message: format!("{username} joined"),
        table,
        game_state: game_state.clone(),
    });
    drop(s);

    after_state_change(state, table_id).await;

    Ok(match game_state {
        Some(game_state) => ServerMsg::InitialGameState { game_state },
        None => {
            let s = session.read().await;
            ServerMsg::TableUpdate {
                message: format!("{username} joined"),
                table: s.table.public(),
                game_state: None,
            }
        }
    })
}

async fn leave_table(state: &AppState, table_id: &str, user_id: &str) -> Result<ServerMsg> {
    let session = state
        .session(table_id)
        .await
        .with_context(|| format!("no such table: {table_id}"))?;

    let locked = state
        .store
        .try_lock(table_id, state.config.lock_ttl())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    ensure!(locked, "table {table_id} is busy; try again");

    let result = leave_locked(state, &session, table_id, user_id).await;
    if let Err(err) = state.store.unlock(table_id).await {
        tracing::warn!(table = %table_id, error = %err, "failed to release table lock");
    }
    let reply = result?;
    after_state_change(state, table_id).await;
    Ok(reply)
}

async fn leave_locked(
    state: &AppState,
    session: &Arc<RwLock<TableSession>>,
    table_id: &str,
    user_id: &str,
) -> Result<ServerMsg> {
    let mut s = session.write().await;
    ensure!(
        remove_seat(&mut s, user_id),
        "user {user_id} is not seated at table {table_id}"
    );
    state
        .store
        .remove_player_info(table_id, user_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    s.broadcast(ServerMsg::PlayerLeft {
        user_id: user_id.to_owned(),
    });

    if s.table.humans() == 0 {
        // Last human gone: nothing left worth simulating.
        reset_to_waiting(state, &mut s, "table empty; waiting for players").await?;
    } else if s.game.is_some() && s.table.seats.len() < s.table.min_players {
        reset_to_waiting(state, &mut s, "not enough players; waiting for more").await?;
    } else if let Some(game) = s.game.as_mut() {
        if game.status == GameStatus::InProgress {
            game.remove_player(user_id);
            state
                .store
                .save_game(table_id, game)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        let game_state = game.public();
        s.broadcast(ServerMsg::GameStateUpdate { game_state });
    } else {
        let table = s.table.public();
        s.broadcast(ServerMsg::TableUpdate {
            message: format!("{user_id} left"),
            table,
            game_state: None,
        });
    }

    Ok(ServerMsg::PlayerLeft {
        user_id: user_id.to_owned(),
    })
}

async fn request_leave(state: &AppState, table_id: &str, user_id: &str) -> Result<ServerMsg> {
    let session = state
        .session(table_id)
        .await
        .with_context(|| format!("no such table: {table_id}"))?;
    {
        let s = session.read().await;
        ensure!(
            s.table.seats.iter().any(|seat| seat.user_id == user_id),
            "user {user_id} is not seated at table {table_id}"
        );
        // No round running: leave right away instead of queuing.
        if s.game.is_none() {
            drop(s);
            return leave_table(state, table_id, user_id).await;
        }
    }
    state
        .store
        .mark_leaving(table_id, user_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(ServerMsg::AckLeaveRequest)
}

async fn initial_state(state: &AppState, table_id: &str) -> Result<ServerMsg> {
    let session = state
        .session(table_id)
        .await
        .with_context(|| format!("no such table: {table_id}"))?;
    let s = session.read().await;
    Ok(match &s.game {
        Some(game) => ServerMsg::InitialGameState {
            game_state: game.public(),
        },
        None => ServerMsg::TableUpdate {
            message: "waiting for players".to_owned(),
            table: s.table.public(),
            game_state: None,
        },
    })
}

async fn apply_action(
    state: &AppState,
    table_id: &str,
    user_id: &str,
    action: PlayerAction,
) -> Result<ServerMsg> {
    let session = state
        .session(table_id)
        .await
        .with_context(|| format!("no such table: {table_id}"))?;

    let reply = {
        let mut s = session.write().await;
        let game = s
            .game
            .as_mut()
            .context("no round in progress at this table")?;
        let actor = game
            .player_index(user_id)
            .with_context(|| format!("user {user_id} is not playing this round"))?;
        match game.apply_player_action(actor, action) {
            Err(err) => {
                // Rule violations go to the offender only; the room sees
                // nothing.
                return Ok(ServerMsg::GameError {
                    message: err.to_string(),
                });
            }
            Ok(()) => {
                state
                    .store
                    .save_game(table_id, game)
                    .await
                    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
                if let Some(last) = &game.last_action {
                    let line =
                        pretty::format_last_action(last, std::io::stdout().is_terminal());
                    tracing::info!(table = %table_id, "{line}");
                }
                let game_state = game.public();
                s.broadcast(ServerMsg::GameStateUpdate {
                    game_state: game_state.clone(),
                });
                ServerMsg::GameStateUpdate { game_state }
            }
        }
    };

    after_state_change(state, table_id).await;
    Ok(reply)
}

/// Post-mutation hook: settles and schedules the transition when the round
/// just ended, or kicks the bot driver when a bot is now on turn.
pub(crate) fn after_state_change<'a>(
    state: &'a AppState,
    table_id: &'a str,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        let Some(session) = state.session(table_id).await else {
            return;
        };
        let (round_ended, bot_turn) = {
            let s = session.read().await;
            match &s.game {
                Some(g) if g.status == GameStatus::RoundEnd => (true, false),
                Some(g) if g.status == GameStatus::InProgress => {
                    (false, g.current_player().is_ai)
                }
                _ => (false, false),
            }
        };
        if round_ended {
            settle_round_if_needed(state, table_id).await;
            schedule_round_transition(state, table_id).await;
        } else if bot_turn {
            let state = state.clone();
            let table_id = table_id.to_owned();
            tokio::spawn(async move {
                super::bot_driver::drive_bots(state, table_id).await;
            });
        }
    })
}

/// Deal the next round for the current seat list: shuffle, deal, collect
/// antes, then resolve any auto-win straight away.
pub(crate) async fn start_round(state: &AppState, s: &mut TableSession) -> Result<()> {
    let seats: Vec<Seat> = s
        .table
        .seats
        .iter()
        .map(|seat| Seat {
            user_id: seat.user_id.clone(),
            username: seat.username.clone(),
            is_ai: seat.is_ai,
        })
        .collect();
    ensure!(
        seats.len() >= s.table.min_players && seats.len() <= s.table.max_players,
        "cannot start a round with {} seats",
        seats.len()
    );

    let dealer = s.dealer_index % seats.len();
    let mut game = GameState::deal_new(&s.table.id, s.table.stake, &seats, dealer)?;
    wallet::collect_antes(state.wallets.as_ref(), &mut game)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("collecting antes")?;

    if let Some((winner, reason)) = spreads::detect_auto_win(&game) {
        tracing::info!(
            table = %s.table.id,
            winner = %game.players[winner].user_id,
            reason = ?reason,
            "auto-win on deal"
        );
        game.end_round(reason, winner);
    }

    s.table.status = TableStatus::InGame;
    s.round_settled = false;
    state
        .store
        .save_game(&s.table.id, &game)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let header =
        pretty::format_table_header(&game.public(), std::io::stdout().is_terminal());
    tracing::info!(table = %s.table.id, "{header}");
    s.game = Some(game);
    Ok(())
}

/// Settle the finished round exactly once. Failures keep the round in
/// round-end; the transition timer retries.
pub(crate) async fn settle_round_if_needed(state: &AppState, table_id: &str) {
    let Some(session) = state.session(table_id).await else {
        return;
    };
    let snapshot = {
        let s = session.read().await;
        match &s.game {
            Some(g) if g.status == GameStatus::RoundEnd && !s.round_settled => Some(g.clone()),
            _ => None,
        }
    };
    let Some(game) = snapshot else {
        return;
    };

    match wallet::settle(state.wallets.as_ref(), &game).await {
        Ok(record) => {
            {
                let mut s = session.write().await;
                s.round_settled = true;
            }
            tracing::info!(
                table = %table_id,
                match_id = %record.id,
                winner = %record.winner_id,
                pot = record.pot,
                win_type = ?record.win_type,
                "round settled"
            );
            let humans: Vec<String> = {
                let s = session.read().await;
                s.table
                    .seats
                    .iter()
                    .filter(|seat| !seat.is_ai)
                    .map(|seat| seat.user_id.clone())
                    .collect()
            };
            for user_id in humans {
                let balance =
                    wallet::settle::available_balance(state.wallets.as_ref(), &user_id).await;
                let s = session.read().await;
                s.broadcast(ServerMsg::WalletBalanceUpdate { user_id, balance });
            }
        }
        Err(err) => {
            tracing::error!(
                table = %table_id,
                error = %err,
                "settlement failed; round stays in round-end for retry"
            );
        }
    }
}

/// Arm the delayed round-transition handler, once per round end.
pub(crate) fn schedule_round_transition<'a>(
    state: &'a AppState,
    table_id: &'a str,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        let Some(session) = state.session(table_id).await else {
            return;
        };
        {
            let mut s = session.write().await;
            if s.transition_scheduled {
                return;
            }
            s.transition_scheduled = true;
        }
        let state = state.clone();
        let table_id = table_id.to_owned();
        let delay = state.config.round_transition_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_round_transition(&state, &table_id).await;
        });
    })
}

/// The delayed transition body. Takes the store lock, re-validates that the
/// table is still at a round end (the timer may be stale), then walks the
/// transition steps: queued leaves, minimum-seat check, bot eviction, dealer
/// rotation, next deal.
pub(crate) async fn run_round_transition(state: &AppState, table_id: &str) {
    let Some(session) = state.session(table_id).await else {
        return;
    };
    {
        let mut s = session.write().await;
        s.transition_scheduled = false;
    }
    match state
        .store
        .try_lock(table_id, state.config.lock_ttl())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(table = %table_id, "transition lock contended; another actor wins");
            return;
        }
        Err(err) => {
            tracing::error!(table = %table_id, error = %err, "transition lock failed");
            return;
        }
    }
    if let Err(err) = transition_locked(state, &session, table_id).await {
        tracing::error!(table = %table_id, error = %err, "round transition failed");
    }
    if let Err(err) = state.store.unlock(table_id).await {
        tracing::warn!(table = %table_id, error = %err, "failed to release table lock");
    }
}

async fn transition_locked(
    state: &AppState,
    session: &Arc<RwLock<TableSession>>,
    table_id: &str,
) -> Result<()> {
    // Stale fire: the round may already have been replaced.
    {
        let s = session.read().await;
        match &s.game {
            Some(g) if g.status == GameStatus::RoundEnd => {}
            _ => return Ok(()),
        }
    }

    settle_round_if_needed(state, table_id).await;
    {
        let s = session.read().await;
        if !s.round_settled {
            drop(s);
            // Leave the round at round-end and try again after another delay.
            schedule_round_transition(state, table_id).await;
            return Ok(());
        }
    }

    let leavers = state
        .store
        .take_leaving(table_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut s = session.write().await;
    for user_id in &leavers {
        if remove_seat(&mut s, user_id) {
            state
                .store
                .remove_player_info(table_id, user_id)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            s.broadcast(ServerMsg::PlayerLeft {
                user_id: user_id.clone(),
            });
        }
    }

    if s.table.humans() == 0 {
        return reset_to_waiting(state, &mut s, "table empty; waiting for players").await;
    }
    if s.table.seats.len() < s.table.min_players {
        return reset_to_waiting(state, &mut s, "not enough players; waiting for more").await;
    }
    // Humans-only rounds take precedence once enough humans are seated.
    if s.table.humans() >= s.table.min_players && s.table.bots() > 0 {
        evict_bots(state, &mut s).await?;
        if s.table.seats.len() < s.table.min_players {
            return reset_to_waiting(state, &mut s, "not enough players; waiting for more").await;
        }
    }

    s.dealer_index = (s.dealer_index + 1) % s.table.seats.len();
    start_round(state, &mut s).await?;

    let table = s.table.public();
    let game_state = s.game.as_ref().map(|g| g.public());
    s.broadcast(ServerMsg::TableUpdate {
        message: "next round starting".to_owned(),
        table,
        game_state: game_state.clone(),
    });
    if let Some(game_state) = game_state {
        s.broadcast(ServerMsg::GameStateUpdate { game_state });
    }
    drop(s);

    after_state_change(state, table_id).await;
    Ok(())
}

fn remove_seat(s: &mut TableSession, user_id: &str) -> bool {
    let before = s.table.seats.len();
    s.table.seats.retain(|seat| seat.user_id != user_id);
    s.table.seats.len() != before
}

async fn evict_bots(state: &AppState, s: &mut TableSession) -> Result<()> {
    let bots: Vec<String> = s
        .table
        .seats
        .iter()
        .filter(|seat| seat.is_ai)
        .map(|seat| seat.user_id.clone())
        .collect();
    for bot_id in &bots {
        state
            .store
            .remove_player_info(&s.table.id, bot_id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }
    s.table.seats.retain(|seat| !seat.is_ai);
    Ok(())
}

async fn reset_to_waiting(
    state: &AppState,
    s: &mut TableSession,
    message: &str,
) -> Result<()> {
    evict_bots(state, s).await?;
    s.table.status = TableStatus::Waiting;
    s.game = None;
    s.round_settled = false;
    state
        .store
        .delete_game(&s.table.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let table = s.table.public();
    s.broadcast(ServerMsg::TableUpdate {
        message: message.to_owned(),
        table,
        game_state: None,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, TableConfig};
    use crate::game::deck::shuffled_deck_with_seed;
    use crate::server::state::SeatInfo;
    use crate::store::MemoryStore;
    use crate::wallet::{settle::seed_wallet, InMemoryWalletStore};
    use std::sync::Arc;
    use tonk_shared::RoundEndReason;

    // The transition timer is never awaited in tests (the body is invoked
    // directly), so the delay is set high enough that no armed timer fires
    // mid-assertion.
    fn test_config() -> Config {
        Config {
            round_transition_delay_secs: 60,
            bot_think_ms: 5_000,
            grant_opening_balance: None,
            tables: vec![TableConfig {
                id: "t1".to_owned(),
                name: "Test".to_owned(),
                stake: 10,
                min_players: 2,
                max_players: 4,
            }],
            ..Config::default()
        }
    }

    fn app() -> (AppState, Arc<InMemoryWalletStore>) {
        let wallets = Arc::new(InMemoryWalletStore::new());
        let state = AppState::new(
            test_config(),
            Arc::new(MemoryStore::new()),
            wallets.clone(),
        );
        (state, wallets)
    }

    async fn join(state: &AppState, user: &str) -> ServerMsg {
        handle_client_msg(
            state,
            ClientMsg::JoinTable {
                table_id: "t1".to_owned(),
                user_id: user.to_owned(),
                username: user.to_owned(),
                avatar_url: None,
            },
        )
        .await
    }

    fn human_seat(user: &str) -> SeatInfo {
        SeatInfo {
            user_id: user.to_owned(),
            username: user.to_owned(),
            is_ai: false,
        }
    }

    /// Seat the given humans mid-round without going through join (which
    /// would seat a bot for the first lone human).
    async fn rig_round(state: &AppState, wallets: &InMemoryWalletStore, users: &[&str]) {
        for user in users {
            seed_wallet(wallets, user, 100);
        }
        let session = state.session("t1").await.expect("table seeded");
        let mut s = session.write().await;
        s.table.status = TableStatus::InGame;
        s.table.seats = users.iter().map(|u| human_seat(u)).collect();
        let seats: Vec<Seat> = users
            .iter()
            .map(|u| Seat {
                user_id: (*u).to_owned(),
                username: (*u).to_owned(),
                is_ai: false,
            })
            .collect();
        let mut game =
            GameState::deal_from_deck("t1", 10, &seats, 0, shuffled_deck_with_seed(1234))
                .unwrap();
        wallet::collect_antes(state.wallets.as_ref(), &mut game)
            .await
            .unwrap();
        s.game = Some(game);
        s.round_settled = false;
    }

    #[tokio::test]
    async fn join_requires_four_antes_of_headroom() {
        let (state, wallets) = app();
        seed_wallet(&wallets, "alice", 39);
        let resp = join(&state, "alice").await;
        assert!(matches!(resp, ServerMsg::GameError { .. }));

        seed_wallet(&wallets, "bob", 40);
        let resp = join(&state, "bob").await;
        assert!(!matches!(resp, ServerMsg::GameError { .. }));
    }

    #[tokio::test]
    async fn lone_human_gets_a_bot_opponent_and_the_round_starts() {
        let (state, wallets) = app();
        seed_wallet(&wallets, "alice", 100);

        let resp = join(&state, "alice").await;
        assert!(matches!(resp, ServerMsg::InitialGameState { .. }));

        let session = state.session("t1").await.unwrap();
        let s = session.read().await;
        assert_eq!(s.table.seats.len(), 2);
        assert_eq!(s.table.bots(), 1);
        assert_eq!(s.table.status, TableStatus::InGame);
        let game = s.game.as_ref().expect("round started");
        // One human ante plus the bot's house-funded share.
        assert_eq!(game.pot, 20);
        assert_eq!(game.locked_antes.len(), 2);
        assert_eq!(game.locked_antes.get("alice"), Some(&10));
    }

    #[tokio::test]
    async fn rejoin_returns_current_state_without_a_second_seat() {
        let (state, wallets) = app();
        seed_wallet(&wallets, "alice", 100);
        join(&state, "alice").await;
        let resp = join(&state, "alice").await;
        assert!(matches!(resp, ServerMsg::InitialGameState { .. }));
        let session = state.session("t1").await.unwrap();
        assert_eq!(session.read().await.table.seats.len(), 2);
    }

    #[tokio::test]
    async fn leave_mid_round_shrinks_the_seat_list_and_clamps_the_turn() {
        let (state, wallets) = app();
        rig_round(&state, &wallets, &["alice", "bob", "cara"]).await;
        // Make the leaver the current player at the last seat.
        let session = state.session("t1").await.unwrap();
        {
            let mut s = session.write().await;
            let game = s.game.as_mut().unwrap();
            game.current_player_index = 2;
        }

        let resp = handle_client_msg(
            &state,
            ClientMsg::LeaveTable {
                table_id: "t1".to_owned(),
                user_id: "cara".to_owned(),
                username: "cara".to_owned(),
            },
        )
        .await;
        assert!(matches!(resp, ServerMsg::PlayerLeft { .. }));

        let s = session.read().await;
        assert_eq!(s.table.seats.len(), 2);
        let game = s.game.as_ref().expect("round continues with two humans");
        assert_eq!(game.players.len(), 2);
        assert!(game.current_player_index < game.players.len());
        assert_eq!(game.total_cards(), 40);
        // The departed ante stays in the pot.
        assert_eq!(game.pot, 30);
    }

    #[tokio::test]
    async fn last_human_leaving_resets_the_table() {
        let (state, wallets) = app();
        seed_wallet(&wallets, "alice", 100);
        join(&state, "alice").await;

        let resp = handle_client_msg(
            &state,
            ClientMsg::LeaveTable {
                table_id: "t1".to_owned(),
                user_id: "alice".to_owned(),
                username: "alice".to_owned(),
            },
        )
        .await;
        assert!(matches!(resp, ServerMsg::PlayerLeft { .. }));

        let session = state.session("t1").await.unwrap();
        let s = session.read().await;
        assert_eq!(s.table.status, TableStatus::Waiting);
        assert!(s.table.seats.is_empty());
        assert!(s.game.is_none());
        drop(s);
        assert!(state.store.load_game("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queued_leave_is_processed_at_the_round_transition() {
        let (state, wallets) = app();
        rig_round(&state, &wallets, &["alice", "bob"]).await;

        let resp = handle_client_msg(
            &state,
            ClientMsg::RequestLeaveTable {
                table_id: "t1".to_owned(),
                user_id: "bob".to_owned(),
            },
        )
        .await;
        assert!(matches!(resp, ServerMsg::AckLeaveRequest));

        // The round keeps both players until it actually ends.
        let session = state.session("t1").await.unwrap();
        assert_eq!(session.read().await.game.as_ref().unwrap().players.len(), 2);

        {
            let mut s = session.write().await;
            s.game.as_mut().unwrap().end_round(RoundEndReason::Regular, 0);
        }
        run_round_transition(&state, "t1").await;

        let s = session.read().await;
        // Bob was removed; one human is below the minimum, so the table
        // waits for more players.
        assert!(s.table.seats.iter().all(|seat| seat.user_id != "bob"));
        assert_eq!(s.table.status, TableStatus::Waiting);
        assert!(s.game.is_none());
    }

    #[tokio::test]
    async fn transition_settles_then_rotates_the_dealer() {
        let (state, wallets) = app();
        rig_round(&state, &wallets, &["alice", "bob"]).await;

        let session = state.session("t1").await.unwrap();
        {
            let mut s = session.write().await;
            s.game.as_mut().unwrap().end_round(RoundEndReason::Regular, 0);
        }

        // Settlement lands before the next deal: the winner takes the pot.
        settle_round_if_needed(&state, "t1").await;
        assert_eq!(
            wallet::settle::available_balance(state.wallets.as_ref(), "alice").await,
            110
        );
        assert_eq!(
            wallet::settle::available_balance(state.wallets.as_ref(), "bob").await,
            90
        );

        run_round_transition(&state, "t1").await;

        let s = session.read().await;
        assert_eq!(s.dealer_index, 1);
        let game = s.game.as_ref().expect("next round dealt");
        assert_eq!(game.current_dealer_index, 1);
        assert_eq!(game.players.len(), 2);
    }

    #[tokio::test]
    async fn stale_transition_fires_are_no_ops() {
        let (state, wallets) = app();
        rig_round(&state, &wallets, &["alice", "bob"]).await;
        let session = state.session("t1").await.unwrap();
        let before = session.read().await.game.clone();

        // Round still in progress: the timer body must not touch anything.
        run_round_transition(&state, "t1").await;

        assert_eq!(session.read().await.game, before);
    }

    #[tokio::test]
    async fn actions_by_non_players_are_rejected() {
        let (state, wallets) = app();
        rig_round(&state, &wallets, &["alice", "bob"]).await;
        let resp = handle_client_msg(
            &state,
            ClientMsg::Drop {
                table_id: "t1".to_owned(),
                user_id: "mallory".to_owned(),
            },
        )
        .await;
        assert!(matches!(resp, ServerMsg::GameError { .. }));
    }
}
