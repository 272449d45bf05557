//! Error taxonomy for ledger operations.

use thiserror::Error;

use crate::models::{ItemType, PricingTier};

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A debit would leave the balance below zero.
    #[error("Insufficient balance: {balance} available, {requested} requested ({shortfall} short)")]
    InsufficientBalance {
        balance: i64,
        requested: i64,
        shortfall: i64,
    },

    #[error("{0} not found")]
    EntityNotFound(String),

    /// The target record is not in a state that allows the operation, such
    /// as confirming an already finalized transaction.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No active price configured for {item_type:?} at tier {tier:?}")]
    PricingNotConfigured { item_type: ItemType, tier: PricingTier },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error")]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        LedgerError::EntityNotFound(format!("{entity} '{id}'"))
    }

    pub(crate) fn insufficient(balance: i64, amount: i64) -> Self {
        let requested = amount.saturating_neg();
        LedgerError::InsufficientBalance {
            balance,
            requested,
            shortfall: requested.saturating_sub(balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_names_shortfall() {
        let err = LedgerError::insufficient(20_000, -30_000);
        match err {
            LedgerError::InsufficientBalance {
                balance,
                requested,
                shortfall,
            } => {
                assert_eq!(balance, 20_000);
                assert_eq!(requested, 30_000);
                assert_eq!(shortfall, 10_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(LedgerError::insufficient(0, -1).to_string().contains("1 short"));
    }

    #[test]
    fn test_insufficient_saturates_at_extremes() {
        match LedgerError::insufficient(100, i64::MIN) {
            LedgerError::InsufficientBalance {
                requested,
                shortfall,
                ..
            } => {
                assert_eq!(requested, i64::MAX);
                assert_eq!(shortfall, i64::MAX - 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
