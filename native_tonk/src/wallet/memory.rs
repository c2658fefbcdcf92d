//! In-memory wallet store. Transactions stage every write and apply the lot
//! on commit, so an aborted settlement leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    EarningsEntry, MatchRecord, TransactionRecord, Wallet, WalletError, WalletStore, WalletTxn,
};

#[derive(Default)]
struct Inner {
    wallets: HashMap<String, Wallet>,
    matches: Vec<MatchRecord>,
    transactions: Vec<TransactionRecord>,
}

#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a wallet, replacing any existing record for the user.
    pub fn put_wallet(&self, wallet: Wallet) {
        self.inner
            .write()
            .wallets
            .insert(wallet.user_id.clone(), wallet);
    }

    pub fn matches(&self) -> Vec<MatchRecord> {
        self.inner.read().matches.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.inner.read().transactions.clone()
    }
}

pub struct InMemoryWalletTxn {
    inner: Arc<RwLock<Inner>>,
    staged_wallets: HashMap<String, Wallet>,
    staged_matches: Vec<MatchRecord>,
    staged_transactions: Vec<TransactionRecord>,
}

impl InMemoryWalletTxn {
    fn staged(&mut self, user_id: &str) -> Result<&mut Wallet, WalletError> {
        match self.staged_wallets.entry(user_id.to_owned()) {
            std::collections::hash_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let wallet = self
                    .inner
                    .read()
                    .wallets
                    .get(user_id)
                    .cloned()
                    .ok_or_else(|| WalletError::NotFound(user_id.to_owned()))?;
                Ok(entry.insert(wallet))
            }
        }
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn begin(&self) -> Result<Box<dyn WalletTxn + Send>, WalletError> {
        Ok(Box::new(InMemoryWalletTxn {
            inner: Arc::clone(&self.inner),
            staged_wallets: HashMap::new(),
            staged_matches: Vec::new(),
            staged_transactions: Vec::new(),
        }))
    }

    async fn wallet(&self, user_id: &str) -> Result<Option<Wallet>, WalletError> {
        Ok(self.inner.read().wallets.get(user_id).cloned())
    }

    async fn ensure_wallet(
        &self,
        user_id: &str,
        opening_balance: i64,
    ) -> Result<Wallet, WalletError> {
        let mut inner = self.inner.write();
        let wallet = inner
            .wallets
            .entry(user_id.to_owned())
            .or_insert_with(|| Wallet::new(user_id, opening_balance));
        Ok(wallet.clone())
    }
}

#[async_trait]
impl WalletTxn for InMemoryWalletTxn {
    async fn load_wallet(&mut self, user_id: &str) -> Result<Wallet, WalletError> {
        self.staged(user_id).map(|w| w.clone())
    }

    async fn adjust_balance(&mut self, user_id: &str, delta: i64) -> Result<i64, WalletError> {
        let wallet = self.staged(user_id)?;
        let next = wallet.available_balance + delta;
        if next < 0 {
            return Err(WalletError::WouldGoNegative(user_id.to_owned()));
        }
        wallet.available_balance = next;
        Ok(next)
    }

    async fn append_earnings(
        &mut self,
        user_id: &str,
        entry: EarningsEntry,
    ) -> Result<(), WalletError> {
        self.staged(user_id)?.match_earnings_history.push(entry);
        Ok(())
    }

    async fn insert_match(&mut self, record: MatchRecord) -> Result<(), WalletError> {
        self.staged_matches.push(record);
        Ok(())
    }

    async fn insert_transaction(&mut self, record: TransactionRecord) -> Result<(), WalletError> {
        self.staged_transactions.push(record);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), WalletError> {
        let mut inner = self.inner.write();
        for (user_id, wallet) in self.staged_wallets {
            inner.wallets.insert(user_id, wallet);
        }
        inner.matches.extend(self.staged_matches);
        inner.transactions.extend(self.staged_transactions);
        Ok(())
    }

    async fn rollback(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let store = InMemoryWalletStore::new();
        store.put_wallet(Wallet::new("u0", 100));

        let mut txn = store.begin().await.unwrap();
        txn.adjust_balance("u0", -40).await.unwrap();
        txn.rollback().await;

        assert_eq!(
            store.wallet("u0").await.unwrap().unwrap().available_balance,
            100
        );
    }

    #[tokio::test]
    async fn committed_writes_apply_together() {
        let store = InMemoryWalletStore::new();
        store.put_wallet(Wallet::new("u0", 100));
        store.put_wallet(Wallet::new("u1", 50));

        let mut txn = store.begin().await.unwrap();
        txn.adjust_balance("u0", -10).await.unwrap();
        txn.adjust_balance("u1", 10).await.unwrap();
        txn.commit().await.unwrap();

        assert_eq!(
            store.wallet("u0").await.unwrap().unwrap().available_balance,
            90
        );
        assert_eq!(
            store.wallet("u1").await.unwrap().unwrap().available_balance,
            60
        );
    }

    #[tokio::test]
    async fn overdraw_is_refused() {
        let store = InMemoryWalletStore::new();
        store.put_wallet(Wallet::new("u0", 5));
        let mut txn = store.begin().await.unwrap();
        let err = txn.adjust_balance("u0", -10).await.unwrap_err();
        assert!(matches!(err, WalletError::WouldGoNegative(_)));
    }

    #[tokio::test]
    async fn missing_wallet_is_not_found() {
        let store = InMemoryWalletStore::new();
        let mut txn = store.begin().await.unwrap();
        assert!(matches!(
            txn.load_wallet("ghost").await.unwrap_err(),
            WalletError::NotFound(_)
        ));
    }
}
