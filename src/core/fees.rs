//! Transfer fee policy
//!
//! Fees are a pure function of the transfer amount:
//! `fee = max(amount * rate, min_fee)`, rounded to 2 decimal places.

use crate::types::{money, TransferError};
use rust_decimal::Decimal;

/// Fee policy applied to every transfer
///
/// The default schedule charges 2.5% of the transfer amount with a 5.00
/// minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    /// Proportional rate applied to the transfer amount
    pub rate: Decimal,
    /// Floor charged when the proportional fee falls below it
    pub min_fee: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            rate: Decimal::new(25, 3),     // 0.025
            min_fee: Decimal::new(500, 2), // 5.00
        }
    }
}

impl FeeSchedule {
    /// Calculate the fee for a transfer amount
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the amount is zero or negative.
    pub fn calculate(&self, amount: Decimal) -> Result<Decimal, TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::invalid_amount(amount));
        }

        let proportional = money::round_money(amount * self.rate);
        Ok(proportional.max(self.min_fee))
    }
}
