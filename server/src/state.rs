use std::sync::Arc;

use crate::ledger::LedgerService;

/// Shared by every handler. Cloning is cheap.
pub struct AppState<S> {
    pub ledger: Arc<LedgerService<S>>,
}

impl<S> AppState<S> {
    pub fn new(ledger: LedgerService<S>) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}
