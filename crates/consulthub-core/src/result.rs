//! Convenience result type alias for ConsultHub.

use crate::error::AppError;

/// A specialized `Result` type for ConsultHub operations.
pub type AppResult<T> = Result<T, AppError>;
