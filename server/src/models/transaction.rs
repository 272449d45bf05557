use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::pricing::ItemType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Charge,
    VoucherPurchase,
    TournamentEntry,
    AdminAdjustment,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_final(self) -> bool {
        self != TransactionStatus::Pending
    }
}

/// Per-type audit details. Each variant belongs to exactly one
/// [`TransactionType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionMetadata {
    Charge {
        depositor_name: String,
        #[serde(default)]
        reviewed_by: Option<Uuid>,
        #[serde(default)]
        note: Option<String>,
    },
    VoucherPurchase {
        voucher_type: ItemType,
        quantity: u32,
        unit_price: i64,
    },
    TournamentEntry {
        tournament_id: Uuid,
        entry_type: ItemType,
    },
    AdminAdjustment {
        admin_id: Uuid,
        note: String,
    },
    Withdrawal {
        destination: String,
        #[serde(default)]
        reviewed_by: Option<Uuid>,
        #[serde(default)]
        note: Option<String>,
    },
}

impl TransactionMetadata {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            TransactionMetadata::Charge { .. } => TransactionType::Charge,
            TransactionMetadata::VoucherPurchase { .. } => TransactionType::VoucherPurchase,
            TransactionMetadata::TournamentEntry { .. } => TransactionType::TournamentEntry,
            TransactionMetadata::AdminAdjustment { .. } => TransactionType::AdminAdjustment,
            TransactionMetadata::Withdrawal { .. } => TransactionType::Withdrawal,
        }
    }

    /// Stamps the reviewer onto request-style records. Other kinds carry
    /// their actor from creation and are left untouched.
    pub fn record_review(&mut self, reviewer: Uuid, review_note: Option<String>) {
        match self {
            TransactionMetadata::Charge {
                reviewed_by, note, ..
            }
            | TransactionMetadata::Withdrawal {
                reviewed_by, note, ..
            } => {
                *reviewed_by = Some(reviewer);
                if review_note.is_some() {
                    *note = review_note;
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    #[sqlx(json)]
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        user_id: Uuid,
        amount: i64,
        metadata: TransactionMetadata,
        status: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            transaction_type: metadata.transaction_type(),
            status,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}
