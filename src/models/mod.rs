mod holding;
mod ranking;
mod stats;
mod transaction;
mod user;

pub use holding::Holding;
pub use ranking::{RankedUser, RankingPage};
pub use stats::TransactionStats;
pub use transaction::{
    CreateTransaction, HistoryFilter, PageParams, Pagination, TransactionPage, TransactionRecord,
    TransactionStatus, TransactionType,
};
pub use user::UserSummary;
