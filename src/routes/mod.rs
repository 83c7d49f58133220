pub(crate) mod health;
pub(crate) mod ranking;
pub(crate) mod transactions;
