//! In-memory subscription ledger.
//!
//! Useful for development, tests and single-process demos. A transaction
//! holds the ledger's async mutex from `begin` until commit or drop and works
//! on a staged copy of the state, so uncommitted writes are never visible and
//! concurrent transactions apply strictly one after the other.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::billing::{CoinbaseSubscription, Coupon, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{LedgerTransaction, SubscriptionLedger};

/// Full contents of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub subscriptions: BTreeMap<UserId, Subscription>,
    pub coinbase_subscriptions: BTreeMap<UserId, CoinbaseSubscription>,
    pub coupons: Vec<Coupon>,
}

/// In-memory implementation of the SubscriptionLedger port.
#[derive(Default)]
pub struct InMemorySubscriptionLedger {
    state: Arc<Mutex<LedgerState>>,
    fail_next_commit: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl InMemorySubscriptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }

    /// Writes a subscription directly, bypassing transactions.
    pub async fn seed_subscription(&self, subscription: Subscription) {
        self.state
            .lock()
            .await
            .subscriptions
            .insert(subscription.user_id, subscription);
    }

    /// Writes a Coinbase subscription directly, bypassing transactions.
    pub async fn seed_coinbase(&self, subscription: CoinbaseSubscription) {
        self.state
            .lock()
            .await
            .coinbase_subscriptions
            .insert(subscription.user_id, subscription);
    }

    /// Makes the next `commit` fail with a database error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of explicit rollbacks so far.
    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionLedger for InMemorySubscriptionLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, DomainError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(InMemoryLedgerTransaction {
            guard,
            staged,
            fail_next_commit: self.fail_next_commit.clone(),
            commits: self.commits.clone(),
            rollbacks: self.rollbacks.clone(),
        }))
    }
}

/// Staged writes over an exclusively held ledger.
pub struct InMemoryLedgerTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
    fail_next_commit: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

#[async_trait]
impl LedgerTransaction for InMemoryLedgerTransaction {
    async fn get_by_user(&mut self, user_id: UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.staged.subscriptions.get(&user_id).cloned())
    }

    async fn get_by_subscription_id(
        &mut self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .staged
            .subscriptions
            .values()
            .find(|s| s.subscription_id == subscription_id)
            .cloned())
    }

    async fn upsert(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let taken = self.staged.subscriptions.values().any(|s| {
            s.subscription_id == subscription.subscription_id && s.user_id != subscription.user_id
        });
        if taken {
            return Err(DomainError::new(
                ErrorCode::SubscriptionConflict,
                format!(
                    "Subscription {} belongs to another user",
                    subscription.subscription_id
                ),
            ));
        }

        self.staged
            .subscriptions
            .insert(subscription.user_id, subscription.clone());
        Ok(())
    }

    async fn delete(&mut self, subscription_id: &str) -> Result<bool, DomainError> {
        let before = self.staged.subscriptions.len();
        self.staged
            .subscriptions
            .retain(|_, s| s.subscription_id != subscription_id);
        Ok(self.staged.subscriptions.len() < before)
    }

    async fn get_coinbase_by_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<CoinbaseSubscription>, DomainError> {
        Ok(self.staged.coinbase_subscriptions.get(&user_id).cloned())
    }

    async fn upsert_coinbase(&mut self, subscription: &CoinbaseSubscription) -> Result<(), DomainError> {
        self.staged
            .coinbase_subscriptions
            .insert(subscription.user_id, subscription.clone());
        Ok(())
    }

    async fn insert_coupon(&mut self, coupon: &Coupon) -> Result<(), DomainError> {
        if self.staged.coupons.iter().any(|c| c.code == coupon.code) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionConflict,
                "Coupon code already exists",
            ));
        }
        self.staged.coupons.push(coupon.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut this = *self;

        if this.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DomainError::database("commit transaction", "injected failure"));
        }

        *this.guard = this.staged;
        this.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
