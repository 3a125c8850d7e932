//! Input checks run before any billing side effect.

use consulthub_core::error::AppError;
use consulthub_core::result::AppResult;

use crate::types::{PayoutRequest, SessionBillingData};

/// Validates a cost calculation input.
pub fn validate_billing_data(data: &SessionBillingData) -> AppResult<()> {
    if !data.session_id.is_valid() {
        return Err(AppError::validation("Invalid billing data: session id"));
    }
    if !data.advisor_id.is_valid() {
        return Err(AppError::validation("Invalid billing data: advisor id"));
    }
    if !data.rate_per_minute.is_finite() || data.rate_per_minute < 0.0 {
        return Err(AppError::validation("Invalid billing data: rate per minute"));
    }
    if data.end_time <= data.start_time {
        return Err(AppError::validation(
            "Invalid billing data: end time must be after start time",
        ));
    }
    Ok(())
}

/// Validates a payout calculation input.
pub fn validate_payout(request: &PayoutRequest) -> AppResult<()> {
    if !request.advisor_id.is_valid() {
        return Err(AppError::validation("Invalid payout data: advisor id"));
    }
    if !request.total_amount.is_finite() || request.total_amount < 0.0 {
        return Err(AppError::validation("Invalid payout data: total amount"));
    }
    if let Some(rate) = request.platform_fee {
        if !(0.0..=1.0).contains(&rate) {
            return Err(AppError::validation("Invalid payout data: platform fee rate"));
        }
    }
    Ok(())
}

/// Checks that a transfer amount is a positive finite number.
pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}
