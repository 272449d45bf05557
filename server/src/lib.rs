//! Point ledger, voucher and tournament-entry API for a poker club.
//!
//! Members hold an integer point balance. Every change to it (confirmed
//! charges and withdrawals, voucher purchases, tournament entries paid with
//! points, admin adjustments) goes through [`ledger::LedgerService`], which
//! checks, writes and audits the change inside one store transaction.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
