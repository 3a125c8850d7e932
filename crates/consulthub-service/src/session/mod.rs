//! Session lifecycle services.

pub mod facade;
pub mod manager;
pub mod model;
pub mod results;
pub mod ticker;

pub use facade::SessionFacade;
pub use manager::SessionManager;
pub use model::{ActiveSession, CreateSessionRequest, EndSessionParams, SessionStats};
pub use results::{
    EndBilling, EndSessionRequest, EndSessionResult, JoinResult, SessionStatusView,
    StartSessionResult,
};
pub use ticker::BillingTicks;
