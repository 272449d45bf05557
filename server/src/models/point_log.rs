use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only audit line written next to every completed balance change.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: Uuid,
    pub amount: i64,
    pub balance_after: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
