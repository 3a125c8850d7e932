//! In-memory collaborator implementations for single-node deployments.

pub mod message;
pub mod session;
pub mod wallet;

pub use message::MemoryMessageStore;
pub use session::MemorySessionStore;
pub use wallet::MemoryWalletStore;
