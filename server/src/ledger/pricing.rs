use crate::ledger::error::{LedgerError, LedgerResult};
use crate::models::{ItemType, PricingPolicy, PricingTier};

/// Price of one `item_type` at `tier` among the active policy rows. A row
/// without a positive price does not count as configured.
pub fn price_for(
    policies: &[PricingPolicy],
    item_type: ItemType,
    tier: PricingTier,
) -> LedgerResult<i64> {
    policies
        .iter()
        .find(|p| p.active && p.price > 0 && p.item_type == item_type && p.tier == tier)
        .map(|p| p.price)
        .ok_or(LedgerError::PricingNotConfigured { item_type, tier })
}
