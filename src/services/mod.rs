pub mod holdings_service;
pub mod lock_service;
pub mod ranking_service;
pub mod stats_service;
pub mod transaction_service;

pub use lock_service::{InMemoryLockProvider, LockProvider, LockToken, UserLockService};
pub use transaction_service::TransactionEngine;
