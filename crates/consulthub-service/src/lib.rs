//! # consulthub-service
//!
//! Session orchestration for ConsultHub:
//!
//! - [`SessionManager`]: authoritative in-memory state of every active
//!   session, its state machine, participants and billing ticks
//! - [`SessionFacade`]: start/join/leave/end/status/notes flows that combine
//!   the manager with the billing engine
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod session;

pub use session::{
    CreateSessionRequest, EndSessionRequest, SessionFacade, SessionManager, SessionStats,
};
