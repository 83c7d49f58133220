pub mod balance;
pub mod ledger_store;
pub mod memory;
pub mod pg_ledger;
pub mod pg_users;
pub mod price_queries;

pub use balance::{BalanceProvider, UserDirectory};
pub use ledger_store::LedgerStore;
pub use pg_ledger::PgLedgerStore;
pub use pg_users::PgUserStore;
