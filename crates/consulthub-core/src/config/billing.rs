//! Billing and payout configuration.

use serde::{Deserialize, Serialize};

/// Billing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Platform fee withheld from advisor payouts (0.0 - 1.0).
    #[serde(default = "default_fee_rate")]
    pub platform_fee_rate: f64,
    /// Payment method recorded on session charges.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    /// Payout method recorded on advisor payouts.
    #[serde(default = "default_payout_method")]
    pub payout_method: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: default_fee_rate(),
            payment_method: default_payment_method(),
            payout_method: default_payout_method(),
        }
    }
}

fn default_fee_rate() -> f64 {
    0.20
}

fn default_payment_method() -> String {
    "wallet".to_string()
}

fn default_payout_method() -> String {
    "bank_transfer".to_string()
}
