//! In-process [`Store`] for tests and `STORE_BACKEND=memory` runs.
//!
//! A unit of work holds the single state mutex for its whole lifetime and
//! edits a private copy, which replaces the shared state only on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, UnitOfWork};
use crate::ledger::{LedgerError, LedgerResult};
use crate::models::{
    ItemType, PointLog, PricingPolicy, Tournament, TournamentEntry, TransactionRecord,
    TransactionStatus, User, Voucher, VoucherStatus,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    transactions: Vec<TransactionRecord>,
    point_logs: Vec<PointLog>,
    vouchers: Vec<Voucher>,
    pricing: Vec<PricingPolicy>,
    tournaments: Vec<Tournament>,
    entries: Vec<TournamentEntry>,
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store seeded with the default price list.
    pub fn new() -> Self {
        let state = MemoryState {
            pricing: PricingPolicy::defaults(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Test helper: inserts a user with a starting balance, bypassing the
    /// ledger.
    pub async fn seed_user(&self, mut user: User, balance: i64) -> User {
        user.balance = balance;
        self.state
            .lock()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    pub async fn entries(&self) -> Vec<TournamentEntry> {
        self.state.lock().await.entries.clone()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> LedgerResult<MemoryUnitOfWork> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnitOfWork { guard, working })
    }

    async fn create_user(&self, user: &User) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(LedgerError::ValidationError(format!(
                "email '{}' is already registered",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> LedgerResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn list_transactions(
        &self,
        user_id: Option<Uuid>,
        status: Option<TransactionStatus>,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let state = self.state.lock().await;
        let rows = state
            .transactions
            .iter()
            .filter(|t| user_id.map_or(true, |id| t.user_id == id))
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &TransactionRecord| t.created_at))
    }

    async fn list_point_logs(&self, user_id: Uuid) -> LedgerResult<Vec<PointLog>> {
        let state = self.state.lock().await;
        let rows = state
            .point_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |l: &PointLog| l.created_at))
    }

    async fn list_vouchers(&self, user_id: Uuid) -> LedgerResult<Vec<Voucher>> {
        let state = self.state.lock().await;
        let rows = state
            .vouchers
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |v: &Voucher| v.created_at))
    }

    async fn list_pricing(&self) -> LedgerResult<Vec<PricingPolicy>> {
        Ok(self.state.lock().await.pricing.clone())
    }

    async fn upsert_pricing(&self, policy: &PricingPolicy) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        let position = state
            .pricing
            .iter()
            .position(|p| p.item_type == policy.item_type && p.tier == policy.tier);
        match position {
            Some(index) => state.pricing[index] = policy.clone(),
            None => state.pricing.push(policy.clone()),
        }
        Ok(())
    }

    async fn create_tournament(&self, tournament: &Tournament) -> LedgerResult<()> {
        self.state.lock().await.tournaments.push(tournament.clone());
        Ok(())
    }

    async fn list_tournaments(&self) -> LedgerResult<Vec<Tournament>> {
        let mut tournaments = self.state.lock().await.tournaments.clone();
        tournaments.sort_by_key(|t| t.starts_at);
        Ok(tournaments)
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_balance(&mut self, user_id: Uuid) -> LedgerResult<Option<i64>> {
        Ok(self.working.users.get(&user_id).map(|u| u.balance))
    }

    async fn set_balance(&mut self, user_id: Uuid, balance: i64) -> LedgerResult<()> {
        let user = self
            .working
            .users
            .get_mut(&user_id)
            .ok_or_else(|| LedgerError::not_found("user", user_id))?;
        user.balance = balance;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn lock_transaction(&mut self, id: Uuid) -> LedgerResult<Option<TransactionRecord>> {
        Ok(self.working.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_transaction(&mut self, record: &TransactionRecord) -> LedgerResult<()> {
        self.working.transactions.push(record.clone());
        Ok(())
    }

    async fn update_transaction(&mut self, record: &TransactionRecord) -> LedgerResult<()> {
        let existing = self
            .working
            .transactions
            .iter_mut()
            .find(|t| t.id == record.id)
            .ok_or_else(|| LedgerError::not_found("transaction", record.id))?;
        existing.status = record.status;
        existing.metadata = record.metadata.clone();
        existing.updated_at = record.updated_at;
        Ok(())
    }

    async fn insert_point_log(&mut self, log: &PointLog) -> LedgerResult<()> {
        self.working.point_logs.push(log.clone());
        Ok(())
    }

    async fn insert_vouchers(&mut self, vouchers: &[Voucher]) -> LedgerResult<()> {
        self.working.vouchers.extend_from_slice(vouchers);
        Ok(())
    }

    async fn lock_voucher(&mut self, id: Uuid) -> LedgerResult<Option<Voucher>> {
        Ok(self.working.vouchers.iter().find(|v| v.id == id).cloned())
    }

    async fn set_voucher_status(
        &mut self,
        id: Uuid,
        status: VoucherStatus,
        used_at: Option<DateTime<Utc>>,
    ) -> LedgerResult<()> {
        let voucher = self
            .working
            .vouchers
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| LedgerError::not_found("voucher", id))?;
        voucher.status = status;
        voucher.used_at = used_at;
        Ok(())
    }

    async fn tournament_exists(&mut self, id: Uuid) -> LedgerResult<bool> {
        Ok(self.working.tournaments.iter().any(|t| t.id == id))
    }

    async fn count_entries(
        &mut self,
        tournament_id: Uuid,
        user_id: Uuid,
        entry_type: ItemType,
    ) -> LedgerResult<i64> {
        let count = self
            .working
            .entries
            .iter()
            .filter(|e| {
                e.tournament_id == tournament_id && e.user_id == user_id && e.entry_type == entry_type
            })
            .count();
        Ok(count as i64)
    }

    async fn insert_tournament_entry(&mut self, entry: &TournamentEntry) -> LedgerResult<()> {
        self.working.entries.push(entry.clone());
        Ok(())
    }

    async fn commit(self) -> LedgerResult<()> {
        let MemoryUnitOfWork { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRole, TransactionMetadata};

    fn adjustment(user_id: Uuid) -> TransactionRecord {
        TransactionRecord::new(
            user_id,
            100,
            TransactionMetadata::AdminAdjustment {
                admin_id: Uuid::new_v4(),
                note: "seed".to_string(),
            },
            TransactionStatus::Completed,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_writes() {
        let store = MemoryStore::new();
        let user = store
            .seed_user(User::new("Ana", "ana@example.com", MemberRole::Regular), 500)
            .await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_balance(user.id, 0).await.unwrap();
            tx.insert_transaction(&adjustment(user.id)).await.unwrap();
        }

        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().balance, 500);
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let user = store
            .seed_user(User::new("Ana", "ana@example.com", MemberRole::Regular), 500)
            .await;

        let mut tx = store.begin().await.unwrap();
        tx.set_balance(user.id, 600).await.unwrap();
        tx.insert_transaction(&adjustment(user.id)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().balance, 600);
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store
            .create_user(&User::new("Ana", "ana@example.com", MemberRole::Regular))
            .await
            .unwrap();

        let result = store
            .create_user(&User::new("Ana B", "ana@example.com", MemberRole::Guest))
            .await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
    }
}
