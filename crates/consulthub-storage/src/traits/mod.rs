//! Collaborator traits implemented by storage backends.

pub mod message;
pub mod session;
pub mod wallet;

pub use message::MessageStore;
pub use session::SessionStore;
pub use wallet::WalletStore;
