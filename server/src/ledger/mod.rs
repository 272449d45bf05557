pub mod error;
pub mod mutation;
pub mod pricing;
pub mod service;

pub use error::{LedgerError, LedgerResult};
pub use mutation::{LedgerMutation, LedgerReceipt, SideEffect, MAX_VOUCHERS_PER_PURCHASE};
pub use pricing::price_for;
pub use service::LedgerService;
