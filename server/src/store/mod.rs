//! Persistence seam for the ledger.
//!
//! A [`Store`] serves plain reads and opens [`UnitOfWork`]s. Every balance
//! change goes through a unit of work: its `lock_*` methods take row locks
//! (or the equivalent) that hold until [`UnitOfWork::commit`] or drop, and
//! dropping without committing discards every write made through it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ledger::LedgerResult;
use crate::models::{
    ItemType, PointLog, PricingPolicy, Tournament, TournamentEntry, TransactionRecord,
    TransactionStatus, User, Voucher, VoucherStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: UnitOfWork;

    async fn begin(&self) -> LedgerResult<Self::Tx>;

    async fn create_user(&self, user: &User) -> LedgerResult<()>;
    async fn find_user(&self, id: Uuid) -> LedgerResult<Option<User>>;

    /// Newest first. `user_id`/`status` narrow the listing when set.
    async fn list_transactions(
        &self,
        user_id: Option<Uuid>,
        status: Option<TransactionStatus>,
    ) -> LedgerResult<Vec<TransactionRecord>>;
    async fn list_point_logs(&self, user_id: Uuid) -> LedgerResult<Vec<PointLog>>;
    async fn list_vouchers(&self, user_id: Uuid) -> LedgerResult<Vec<Voucher>>;

    async fn list_pricing(&self) -> LedgerResult<Vec<PricingPolicy>>;
    async fn upsert_pricing(&self, policy: &PricingPolicy) -> LedgerResult<()>;

    async fn create_tournament(&self, tournament: &Tournament) -> LedgerResult<()>;
    async fn list_tournaments(&self) -> LedgerResult<Vec<Tournament>>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sized {
    /// Locks the user's row for the rest of the unit of work and returns the
    /// current balance, or `None` for an unknown user.
    async fn lock_balance(&mut self, user_id: Uuid) -> LedgerResult<Option<i64>>;
    async fn set_balance(&mut self, user_id: Uuid, balance: i64) -> LedgerResult<()>;

    async fn lock_transaction(&mut self, id: Uuid) -> LedgerResult<Option<TransactionRecord>>;
    async fn insert_transaction(&mut self, record: &TransactionRecord) -> LedgerResult<()>;
    /// Persists `status`, `metadata` and `updated_at` of an existing record.
    async fn update_transaction(&mut self, record: &TransactionRecord) -> LedgerResult<()>;

    async fn insert_point_log(&mut self, log: &PointLog) -> LedgerResult<()>;

    async fn insert_vouchers(&mut self, vouchers: &[Voucher]) -> LedgerResult<()>;
    async fn lock_voucher(&mut self, id: Uuid) -> LedgerResult<Option<Voucher>>;
    async fn set_voucher_status(
        &mut self,
        id: Uuid,
        status: VoucherStatus,
        used_at: Option<DateTime<Utc>>,
    ) -> LedgerResult<()>;

    async fn tournament_exists(&mut self, id: Uuid) -> LedgerResult<bool>;
    async fn count_entries(
        &mut self,
        tournament_id: Uuid,
        user_id: Uuid,
        entry_type: ItemType,
    ) -> LedgerResult<i64>;
    async fn insert_tournament_entry(&mut self, entry: &TournamentEntry) -> LedgerResult<()>;

    async fn commit(self) -> LedgerResult<()>;
}
