use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Something a member can pay points for. Vouchers and tournament entries
/// share the same two item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    BuyIn,
    ReBuy,
}

impl ItemType {
    pub fn label(self) -> &'static str {
        match self {
            ItemType::BuyIn => "buy-in",
            ItemType::ReBuy => "re-buy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingTier {
    Member,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PricingPolicy {
    pub item_type: ItemType,
    pub tier: PricingTier,
    pub price: i64,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl PricingPolicy {
    pub fn new(item_type: ItemType, tier: PricingTier, price: i64) -> Self {
        Self {
            item_type,
            tier,
            price,
            active: true,
            updated_at: Utc::now(),
        }
    }

    /// Same rows the initial migration seeds.
    pub fn defaults() -> Vec<PricingPolicy> {
        vec![
            PricingPolicy::new(ItemType::BuyIn, PricingTier::Member, 25_000),
            PricingPolicy::new(ItemType::BuyIn, PricingTier::Guest, 30_000),
            PricingPolicy::new(ItemType::ReBuy, PricingTier::Member, 20_000),
            PricingPolicy::new(ItemType::ReBuy, PricingTier::Guest, 25_000),
        ]
    }
}
