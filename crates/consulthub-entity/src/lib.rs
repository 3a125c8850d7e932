//! # consulthub-entity
//!
//! Domain entity models for ConsultHub. Every struct in this crate is
//! either a record owned by the persistence collaborator or a value object
//! exchanged with it. All entities derive `Debug`, `Clone`, `Serialize` and
//! `Deserialize` and use camelCase on the wire.

pub mod message;
pub mod session;
pub mod wallet;
