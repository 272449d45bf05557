use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{Store, UnitOfWork};
use crate::ledger::{LedgerError, LedgerResult};
use crate::models::{
    ItemType, PointLog, PricingPolicy, Tournament, TournamentEntry, TransactionRecord,
    TransactionStatus, User, Voucher, VoucherStatus,
};

const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount, transaction_type, status, metadata, created_at, updated_at";
const VOUCHER_COLUMNS: &str =
    "id, user_id, transaction_id, voucher_type, status, price_paid, expires_at, used_at, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> LedgerResult<PgUnitOfWork> {
        Ok(PgUnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    async fn create_user(&self, user: &User) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, balance, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.balance)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => LedgerError::ValidationError(
                format!("email '{}' is already registered", user.email),
            ),
            other => other.into(),
        })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> LedgerResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, balance, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_transactions(
        &self,
        user_id: Option<Uuid>,
        status: Option<TransactionStatus>,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn list_point_logs(&self, user_id: Uuid) -> LedgerResult<Vec<PointLog>> {
        let logs = sqlx::query_as::<_, PointLog>(
            "SELECT id, user_id, transaction_id, amount, balance_after, reason, created_at \
             FROM point_logs WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn list_vouchers(&self, user_id: Uuid) -> LedgerResult<Vec<Voucher>> {
        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(vouchers)
    }

    async fn list_pricing(&self) -> LedgerResult<Vec<PricingPolicy>> {
        let policies = sqlx::query_as::<_, PricingPolicy>(
            "SELECT item_type, tier, price, active, updated_at FROM pricing_policies \
             ORDER BY item_type, tier",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(policies)
    }

    async fn upsert_pricing(&self, policy: &PricingPolicy) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO pricing_policies (item_type, tier, price, active, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (item_type, tier) DO UPDATE \
             SET price = EXCLUDED.price, active = EXCLUDED.active, updated_at = EXCLUDED.updated_at",
        )
        .bind(policy.item_type)
        .bind(policy.tier)
        .bind(policy.price)
        .bind(policy.active)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_tournament(&self, tournament: &Tournament) -> LedgerResult<()> {
        sqlx::query("INSERT INTO tournaments (id, name, starts_at, created_at) VALUES ($1, $2, $3, $4)")
            .bind(tournament.id)
            .bind(&tournament.name)
            .bind(tournament.starts_at)
            .bind(tournament.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_tournaments(&self) -> LedgerResult<Vec<Tournament>> {
        let tournaments = sqlx::query_as::<_, Tournament>(
            "SELECT id, name, starts_at, created_at FROM tournaments ORDER BY starts_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tournaments)
    }
}

/// One Postgres transaction. Dropping it without [`UnitOfWork::commit`]
/// rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_balance(&mut self, user_id: Uuid) -> LedgerResult<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(balance)
    }

    async fn set_balance(&mut self, user_id: Uuid, balance: i64) -> LedgerResult<()> {
        sqlx::query("UPDATE users SET balance = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(balance)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn lock_transaction(&mut self, id: Uuid) -> LedgerResult<Option<TransactionRecord>> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(record)
    }

    async fn insert_transaction(&mut self, record: &TransactionRecord) -> LedgerResult<()> {
        sqlx::query(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.amount)
        .bind(record.transaction_type)
        .bind(record.status)
        .bind(Json(&record.metadata))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_transaction(&mut self, record: &TransactionRecord) -> LedgerResult<()> {
        sqlx::query(
            "UPDATE transactions SET status = $2, metadata = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.status)
        .bind(Json(&record.metadata))
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_point_log(&mut self, log: &PointLog) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO point_logs (id, user_id, transaction_id, amount, balance_after, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.transaction_id)
        .bind(log.amount)
        .bind(log.balance_after)
        .bind(&log.reason)
        .bind(log.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_vouchers(&mut self, vouchers: &[Voucher]) -> LedgerResult<()> {
        for voucher in vouchers {
            sqlx::query(&format!(
                "INSERT INTO vouchers ({VOUCHER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ))
            .bind(voucher.id)
            .bind(voucher.user_id)
            .bind(voucher.transaction_id)
            .bind(voucher.voucher_type)
            .bind(voucher.status)
            .bind(voucher.price_paid)
            .bind(voucher.expires_at)
            .bind(voucher.used_at)
            .bind(voucher.created_at)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn lock_voucher(&mut self, id: Uuid) -> LedgerResult<Option<Voucher>> {
        let voucher = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(voucher)
    }

    async fn set_voucher_status(
        &mut self,
        id: Uuid,
        status: VoucherStatus,
        used_at: Option<DateTime<Utc>>,
    ) -> LedgerResult<()> {
        sqlx::query("UPDATE vouchers SET status = $2, used_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(used_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn tournament_exists(&mut self, id: Uuid) -> LedgerResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tournaments WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn count_entries(
        &mut self,
        tournament_id: Uuid,
        user_id: Uuid,
        entry_type: ItemType,
    ) -> LedgerResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tournament_entries \
             WHERE tournament_id = $1 AND user_id = $2 AND entry_type = $3",
        )
        .bind(tournament_id)
        .bind(user_id)
        .bind(entry_type)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert_tournament_entry(&mut self, entry: &TournamentEntry) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO tournament_entries \
             (id, tournament_id, user_id, entry_type, voucher_id, transaction_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.tournament_id)
        .bind(entry.user_id)
        .bind(entry.entry_type)
        .bind(entry.voucher_id)
        .bind(entry.transaction_id)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
