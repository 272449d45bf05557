use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::pricing::PricingTier;

/// Account role. Governs privileges; prices are keyed by [`PricingTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Guest,
    Regular,
    Admin,
}

impl MemberRole {
    pub fn pricing_tier(self) -> PricingTier {
        match self {
            MemberRole::Guest => PricingTier::Guest,
            MemberRole::Regular | MemberRole::Admin => PricingTier::Member,
        }
    }

    pub fn is_admin(self) -> bool {
        self == MemberRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: MemberRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            role,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
