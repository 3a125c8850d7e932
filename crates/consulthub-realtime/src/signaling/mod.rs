//! Call signaling between the two participants of a session.

pub mod relay;

pub use relay::{SessionSignalStats, SignalMessage, SignalingRelay};
