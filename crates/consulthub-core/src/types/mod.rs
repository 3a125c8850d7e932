//! Core type definitions used across the ConsultHub workspace.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{ceil_minutes, round_currency};
