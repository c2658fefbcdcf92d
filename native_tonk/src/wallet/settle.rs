//! Ante collection and round settlement.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::game::engine::now_millis;
use crate::game::GameState;

use super::{
    EarningsEntry, MatchPlayerStats, MatchRecord, TransactionKind, TransactionRecord, Wallet,
    WalletError, WalletStore, WalletTxn,
};

/// Reserve the base stake from every human wallet and record the antes on
/// the game. Bots ante from nowhere: their share inflates the pot without
/// touching a wallet. Fails the whole round setup if any human is short.
pub async fn collect_antes(
    wallets: &dyn WalletStore,
    game: &mut GameState,
) -> Result<(), WalletError> {
    let mut txn = wallets.begin().await?;
    match collect_antes_in(txn.as_mut(), game).await {
        Ok(antes) => {
            txn.commit().await?;
            game.record_antes(antes);
            Ok(())
        }
        Err(err) => {
            txn.rollback().await;
            Err(err)
        }
    }
}

async fn collect_antes_in(
    txn: &mut (dyn WalletTxn + Send),
    game: &GameState,
) -> Result<BTreeMap<String, i64>, WalletError> {
    let stake = game.base_stake;
    let mut antes = BTreeMap::new();
    for player in &game.players {
        antes.insert(player.user_id.clone(), stake);
        if player.is_ai {
            continue;
        }
        let wallet = txn.load_wallet(&player.user_id).await?;
        if wallet.available_balance < stake {
            return Err(WalletError::InsufficientFunds {
                user_id: player.user_id.clone(),
                needed: stake,
                available: wallet.available_balance,
            });
        }
        txn.adjust_balance(&player.user_id, -stake).await?;
    }
    Ok(antes)
}

/// Execute the payouts of a finished round as one transaction: credit the
/// winner, debit penalised players, append earnings history, and record the
/// match plus one transaction row per movement. Any failure aborts the lot.
///
/// The match id is minted up front and threaded through every row. Bot
/// seats have no wallet: credits owed to or penalties owed by bots are
/// absorbed by the house.
pub async fn settle(
    wallets: &dyn WalletStore,
    game: &GameState,
) -> Result<MatchRecord, WalletError> {
    let payouts = game
        .payouts
        .clone()
        .ok_or_else(|| WalletError::Backend("settle called before round end".to_owned()))?;

    let match_id = Uuid::new_v4().to_string();
    let at = now_millis();

    let mut txn = wallets.begin().await?;
    match settle_in(txn.as_mut(), game, &payouts, &match_id, at).await {
        Ok(record) => {
            txn.insert_match(record.clone()).await?;
            txn.commit().await?;
            Ok(record)
        }
        Err(err) => {
            txn.rollback().await;
            Err(err)
        }
    }
}

async fn settle_in(
    txn: &mut (dyn WalletTxn + Send),
    game: &GameState,
    payouts: &tonk_shared::RoundPayouts,
    match_id: &str,
    at: u64,
) -> Result<MatchRecord, WalletError> {
    let mut applied: BTreeMap<String, i64> = BTreeMap::new();

    let winner_is_human = game
        .players
        .iter()
        .any(|p| p.user_id == payouts.winner_id && !p.is_ai);
    if winner_is_human && payouts.winner_payout > 0 {
        txn.adjust_balance(&payouts.winner_id, payouts.winner_payout)
            .await?;
        applied.insert(payouts.winner_id.clone(), payouts.winner_payout);
    }

    for (user_id, penalty) in &payouts.penalties {
        let is_human = game
            .players
            .iter()
            .any(|p| &p.user_id == user_id && !p.is_ai);
        if !is_human {
            continue;
        }
        txn.adjust_balance(user_id, -penalty).await?;
        applied.insert(user_id.clone(), -penalty);
    }

    for (user_id, delta) in &applied {
        txn.append_earnings(
            user_id,
            EarningsEntry {
                match_id: match_id.to_owned(),
                delta: *delta,
                at,
            },
        )
        .await?;
        txn.insert_transaction(TransactionRecord {
            id: Uuid::new_v4().to_string(),
            match_id: match_id.to_owned(),
            user_id: user_id.clone(),
            kind: if *delta >= 0 {
                TransactionKind::Win
            } else {
                TransactionKind::Loss
            },
            amount: delta.abs(),
            at,
        })
        .await?;
    }

    let win_type = game
        .round_ended_by
        .ok_or_else(|| WalletError::Backend("round has no end reason".to_owned()))?;
    let players = game
        .players
        .iter()
        .map(|p| MatchPlayerStats {
            user_id: p.user_id.clone(),
            stake: game.base_stake,
            buy_in: p.current_buy_in,
            payout: applied.get(&p.user_id).copied().unwrap_or(0),
            final_hand_value: game.hand_scores.get(&p.user_id).copied().unwrap_or(0),
        })
        .collect();

    Ok(MatchRecord {
        id: match_id.to_owned(),
        table_id: game.table_id.clone(),
        pot: game.pot,
        win_type,
        winner_id: payouts.winner_id.clone(),
        players,
        penalties: payouts.penalties.clone(),
        at,
    })
}

/// Convenience used by join checks and tests: a user's current available
/// balance, zero when no wallet exists.
pub async fn available_balance(wallets: &dyn WalletStore, user_id: &str) -> i64 {
    match wallets.wallet(user_id).await {
        Ok(Some(w)) => w.available_balance,
        _ => 0,
    }
}

/// Seed helper for tests and local bootstrapping.
pub fn seed_wallet(store: &super::InMemoryWalletStore, user_id: &str, balance: i64) {
    store.put_wallet(Wallet::new(user_id, balance));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::shuffled_deck_with_seed;
    use crate::game::{GameState, Seat};
    use crate::wallet::InMemoryWalletStore;
    use tonk_shared::{GameStatus, RoundEndReason, RoundPayouts};

    fn seats() -> Vec<Seat> {
        vec![
            Seat {
                user_id: "alice".to_owned(),
                username: "Alice".to_owned(),
                is_ai: false,
            },
            Seat {
                user_id: "bob".to_owned(),
                username: "Bob".to_owned(),
                is_ai: false,
            },
            Seat {
                user_id: "bot-1".to_owned(),
                username: "Bot 1".to_owned(),
                is_ai: true,
            },
        ]
    }

    fn fresh_game() -> GameState {
        GameState::deal_from_deck("t1", 10, &seats(), 0, shuffled_deck_with_seed(17)).unwrap()
    }

    #[tokio::test]
    async fn antes_debit_humans_only() {
        let store = InMemoryWalletStore::new();
        seed_wallet(&store, "alice", 100);
        seed_wallet(&store, "bob", 100);
        let mut game = fresh_game();

        collect_antes(&store, &mut game).await.unwrap();

        assert_eq!(available_balance(&store, "alice").await, 90);
        assert_eq!(available_balance(&store, "bob").await, 90);
        // Bot ante inflates the pot from nowhere.
        assert_eq!(game.pot, 30);
        assert_eq!(game.locked_antes.len(), 3);
    }

    #[tokio::test]
    async fn short_human_fails_the_whole_collection() {
        let store = InMemoryWalletStore::new();
        seed_wallet(&store, "alice", 100);
        seed_wallet(&store, "bob", 4);
        let mut game = fresh_game();

        let err = collect_antes(&store, &mut game).await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        // Nothing was debited and no antes were recorded.
        assert_eq!(available_balance(&store, "alice").await, 100);
        assert_eq!(available_balance(&store, "bob").await, 4);
        assert_eq!(game.pot, 0);
    }

    #[tokio::test]
    async fn reem_settlement_moves_the_table_amounts() {
        let store = InMemoryWalletStore::new();
        seed_wallet(&store, "alice", 90);
        seed_wallet(&store, "bob", 90);
        let mut game = fresh_game();
        game.record_antes(
            [("alice", 10), ("bob", 10), ("bot-1", 10)]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v as i64))
                .collect(),
        );
        game.status = GameStatus::RoundEnd;
        game.round_ended_by = Some(RoundEndReason::Reem);
        game.round_winner_id = Some("alice".to_owned());
        game.payouts = Some(RoundPayouts {
            winner_id: "alice".to_owned(),
            winner_payout: 30 + 10 * 2,
            penalties: [("bob".to_owned(), 10), ("bot-1".to_owned(), 10)]
                .into_iter()
                .collect(),
        });

        let record = settle(&store, &game).await.unwrap();

        assert_eq!(available_balance(&store, "alice").await, 140);
        assert_eq!(available_balance(&store, "bob").await, 80);
        assert_eq!(record.win_type, RoundEndReason::Reem);
        assert_eq!(record.pot, 30);

        // Every transaction row carries the match id minted up front.
        let txns = store.transactions();
        assert_eq!(txns.len(), 2);
        assert!(txns.iter().all(|t| t.match_id == record.id));
        let history = store
            .wallet("alice")
            .await
            .unwrap()
            .unwrap()
            .match_earnings_history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].delta, 50);
    }

    #[tokio::test]
    async fn settlement_aborts_whole_when_a_debit_would_overdraw() {
        let store = InMemoryWalletStore::new();
        seed_wallet(&store, "alice", 90);
        seed_wallet(&store, "bob", 3);
        let mut game = fresh_game();
        game.record_antes(
            [("alice", 10), ("bob", 10), ("bot-1", 10)]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v as i64))
                .collect(),
        );
        game.status = GameStatus::RoundEnd;
        game.round_ended_by = Some(RoundEndReason::AutoTriple);
        game.round_winner_id = Some("alice".to_owned());
        game.payouts = Some(RoundPayouts {
            winner_id: "alice".to_owned(),
            winner_payout: 30 + 30 * 2,
            penalties: [("bob".to_owned(), 30), ("bot-1".to_owned(), 30)]
                .into_iter()
                .collect(),
        });

        let err = settle(&store, &game).await.unwrap_err();
        assert!(matches!(err, WalletError::WouldGoNegative(_)));
        // The winner credit was staged but must not have leaked out.
        assert_eq!(available_balance(&store, "alice").await, 90);
        assert_eq!(available_balance(&store, "bob").await, 3);
        assert!(store.matches().is_empty());
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn human_deltas_plus_house_share_balance_to_zero() {
        let store = InMemoryWalletStore::new();
        seed_wallet(&store, "alice", 90);
        seed_wallet(&store, "bob", 90);
        let mut game = fresh_game();
        game.record_antes(
            [("alice", 10), ("bob", 10), ("bot-1", 10)]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v as i64))
                .collect(),
        );
        game.status = GameStatus::RoundEnd;
        game.round_ended_by = Some(RoundEndReason::Reem);
        game.round_winner_id = Some("alice".to_owned());
        game.payouts = Some(RoundPayouts {
            winner_id: "alice".to_owned(),
            winner_payout: 30 + 10 * 2,
            penalties: [("bob".to_owned(), 10), ("bot-1".to_owned(), 10)]
                .into_iter()
                .collect(),
        });

        let record = settle(&store, &game).await.unwrap();

        // Winner +50, penalised human −10; antes already moved −10 each.
        // The house covered the bot's ante (10) and penalty (10), and keeps
        // nothing: human deltas (+50 −10 −10 −10) + house share (−20) = 0.
        let human_deltas: i64 = record
            .players
            .iter()
            .filter(|p| !p.user_id.starts_with("bot"))
            .map(|p| p.payout - game.base_stake)
            .sum();
        let house_share: i64 = -2 * game.base_stake;
        assert_eq!(human_deltas + house_share, 0);
    }
}
