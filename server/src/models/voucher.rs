use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::pricing::ItemType;
use crate::ledger::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    Active,
    Used,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voucher {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: Uuid,
    pub voucher_type: ItemType,
    pub status: VoucherStatus,
    pub price_paid: i64,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    pub fn issue(
        user_id: Uuid,
        transaction_id: Uuid,
        voucher_type: ItemType,
        price_paid: i64,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> LedgerResult<Self> {
        let expires_at = now.checked_add_signed(validity).ok_or_else(|| {
            LedgerError::ValidationError("voucher expiry is out of range".to_string())
        })?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            transaction_id,
            voucher_type,
            status: VoucherStatus::Active,
            price_paid,
            expires_at,
            used_at: None,
            created_at: now,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Stored status lags expiry; nothing sweeps `ACTIVE` rows, so readers
    /// derive it here.
    pub fn effective_status(&self, now: DateTime<Utc>) -> VoucherStatus {
        match self.status {
            VoucherStatus::Active if self.is_expired(now) => VoucherStatus::Expired,
            status => status,
        }
    }

    pub fn with_effective_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}
