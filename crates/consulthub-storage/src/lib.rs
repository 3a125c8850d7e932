//! # consulthub-storage
//!
//! Collaborator seams of the session and billing core:
//!
//! - [`SessionStore`]: durable session rows
//! - [`MessageStore`]: chat message CRUD
//! - [`WalletStore`]: balances, advisor accounts and the transaction ledger
//!
//! The relational schema lives outside this workspace; the `memory`
//! module provides single-node implementations used by the server binary
//! and by tests.

pub mod memory;
pub mod traits;

pub use memory::{MemoryMessageStore, MemorySessionStore, MemoryWalletStore};
pub use traits::{MessageStore, SessionStore, WalletStore};
