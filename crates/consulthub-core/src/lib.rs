//! # consulthub-core
//!
//! Core crate for ConsultHub. Contains configuration schemas, typed
//! numeric identifiers, money rounding helpers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other ConsultHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
