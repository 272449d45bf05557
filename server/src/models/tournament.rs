use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::pricing::ItemType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(name: impl Into<String>, starts_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            starts_at,
            created_at: Utc::now(),
        }
    }
}

/// A seat taken in a tournament, paid either with a voucher or with points.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TournamentEntry {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub user_id: Uuid,
    pub entry_type: ItemType,
    pub voucher_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
