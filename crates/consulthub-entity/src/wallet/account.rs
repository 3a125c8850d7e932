//! Client wallet and advisor earnings accounts.

use serde::{Deserialize, Serialize};

use consulthub_core::types::UserId;

/// A client's prepaid wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Owner.
    pub user_id: UserId,
    /// Spendable balance, in minor units.
    pub balance: f64,
    /// Fraction discounted from every session charge (0.0 - 1.0).
    pub discount_rate: Option<f64>,
}

/// An advisor's earnings ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorAccount {
    /// Advisor.
    pub advisor_id: UserId,
    /// Platform fee override (0.0 - 1.0); `None` uses the platform default.
    pub custom_fee_rate: Option<f64>,
    /// Net earnings paid out so far, in minor units.
    pub earnings: f64,
}
