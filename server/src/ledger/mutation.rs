use serde::Serialize;
use uuid::Uuid;

use crate::ledger::error::{LedgerError, LedgerResult};
use crate::models::{
    ItemType, PointLog, TournamentEntry, TransactionMetadata, TransactionRecord, Voucher,
};

pub const MAX_VOUCHERS_PER_PURCHASE: u32 = 20;

/// Rows created in the same unit of work as a balance change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    IssueVouchers {
        voucher_type: ItemType,
        quantity: u32,
        unit_price: i64,
    },
    RecordTournamentEntry {
        tournament_id: Uuid,
        entry_type: ItemType,
    },
}

/// A signed change to one user's balance plus everything recorded with it.
#[derive(Debug, Clone)]
pub struct LedgerMutation {
    pub user_id: Uuid,
    pub amount: i64,
    pub metadata: TransactionMetadata,
    /// Human-readable line for the point log.
    pub reason: String,
    pub side_effects: Vec<SideEffect>,
}

impl LedgerMutation {
    pub fn new(
        user_id: Uuid,
        amount: i64,
        metadata: TransactionMetadata,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            metadata,
            reason: reason.into(),
            side_effects: Vec::new(),
        }
    }

    pub fn with_side_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount == 0 {
            return Err(LedgerError::ValidationError(
                "amount must be non-zero".to_string(),
            ));
        }
        // The negation of i64::MIN has no i64 representation.
        if self.amount == i64::MIN {
            return Err(LedgerError::ValidationError(
                "amount is out of range".to_string(),
            ));
        }
        for effect in &self.side_effects {
            if let SideEffect::IssueVouchers { quantity, .. } = effect {
                validate_quantity(*quantity)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_quantity(quantity: u32) -> LedgerResult<()> {
    if quantity == 0 || quantity > MAX_VOUCHERS_PER_PURCHASE {
        return Err(LedgerError::ValidationError(format!(
            "quantity must be between 1 and {MAX_VOUCHERS_PER_PURCHASE}"
        )));
    }
    Ok(())
}

/// Everything a committed mutation wrote.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReceipt {
    pub transaction: TransactionRecord,
    pub point_log: PointLog,
    pub balance: i64,
    pub vouchers: Vec<Voucher>,
    pub entry: Option<TournamentEntry>,
}
