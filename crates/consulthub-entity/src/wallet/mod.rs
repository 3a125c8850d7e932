//! Wallet, advisor account, and transaction entities.

pub mod account;
pub mod transaction;

pub use account::{AdvisorAccount, UserAccount};
pub use transaction::{NewTransaction, Transaction, TransactionKind, TransactionStatus};
