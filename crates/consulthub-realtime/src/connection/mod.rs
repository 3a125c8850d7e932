//! Connection lifecycle, liveness and session membership.

pub mod handle;
pub mod heartbeat;
pub mod registry;
