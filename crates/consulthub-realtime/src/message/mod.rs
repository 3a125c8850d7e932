//! Real-time envelope definitions, builders and inbound frame checks.

pub mod builder;
pub mod types;
pub mod validator;
