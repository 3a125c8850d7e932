//! Session domain entities.

pub mod model;
pub mod status;

pub use model::{
    NewSession, ParticipantEvent, SessionBilling, SessionEnd, SessionMetrics, SessionPatch,
    SessionRecord,
};
pub use status::{SessionStatus, SessionType};
