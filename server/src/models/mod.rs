pub mod point_log;
pub mod pricing;
pub mod tournament;
pub mod transaction;
pub mod user;
pub mod voucher;

pub use point_log::PointLog;
pub use pricing::{ItemType, PricingPolicy, PricingTier};
pub use tournament::{Tournament, TournamentEntry};
pub use transaction::{TransactionMetadata, TransactionRecord, TransactionStatus, TransactionType};
pub use user::{MemberRole, User};
pub use voucher::{Voucher, VoucherStatus};
