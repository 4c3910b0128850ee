//! Fee calculation
//!
//! Two fee sources live here. [`FeeEstimator`] is an advisory figure for
//! display before anything is built. [`LinearFee`] is the protocol rule
//! the builder applies to the serialized transaction, and is authoritative.

use crate::{Error, Result};
use adapay_params::protocol::LOVELACE_PER_ADA;
use adapay_params::{LedgerLimits, ProtocolParams};

/// Advisory fee for a minimal transaction (0.17 ADA)
pub const BASE_FEE_ESTIMATE: u64 = 170_000;

/// Advisory surcharge when a memo is attached (0.03 ADA)
pub const MEMO_FEE_ESTIMATE: u64 = 30_000;

/// Advisory surcharge above [`LARGE_AMOUNT_THRESHOLD`] (0.02 ADA)
pub const LARGE_AMOUNT_FEE_ESTIMATE: u64 = 20_000;

/// Payments above this are assumed to need more inputs
pub const LARGE_AMOUNT_THRESHOLD: u64 = 100 * LOVELACE_PER_ADA;

/// Maximum fee the builder will produce (safety limit, 5 ADA)
pub const MAX_FEE: u64 = 5 * LOVELACE_PER_ADA;

/// Advisory fee estimate for display
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeEstimator;

impl FeeEstimator {
    /// Create estimator
    pub fn new() -> Self {
        Self
    }

    /// Approximate fee for sending `amount` lovelace.
    ///
    /// Non-decreasing in both `amount` and `has_memo`. Never binding: the
    /// built transaction's fee comes from its serialized size.
    pub fn estimate(&self, amount: u64, has_memo: bool) -> u64 {
        let mut fee = BASE_FEE_ESTIMATE;
        if has_memo {
            fee += MEMO_FEE_ESTIMATE;
        }
        if amount > LARGE_AMOUNT_THRESHOLD {
            fee += LARGE_AMOUNT_FEE_ESTIMATE;
        }
        fee
    }

    /// Largest amount that leaves room for the estimated fee
    pub fn max_sendable(&self, balance: u64, has_memo: bool) -> u64 {
        let small = balance.saturating_sub(self.estimate(0, has_memo));
        if small <= LARGE_AMOUNT_THRESHOLD {
            return small;
        }
        let large = balance.saturating_sub(self.estimate(balance, has_memo));
        large.max(LARGE_AMOUNT_THRESHOLD)
    }
}

/// Linear fee rule `a * size + b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearFee {
    /// Lovelace per byte
    pub coefficient: u64,
    /// Constant lovelace
    pub constant: u64,
}

impl LinearFee {
    /// Fee rule from protocol parameters
    pub fn from_params(params: &ProtocolParams) -> Self {
        Self {
            coefficient: params.min_fee_a,
            constant: params.min_fee_b,
        }
    }

    /// Minimum fee for a transaction of `size` bytes
    pub fn min_fee(&self, size: usize) -> Result<u64> {
        (size as u64)
            .checked_mul(self.coefficient)
            .and_then(|v| v.checked_add(self.constant))
            .ok_or_else(|| Error::AmountOverflow(format!("fee for {} bytes", size)))
    }

    /// Reject fees below the constant term or above [`MAX_FEE`]
    pub fn validate_fee(&self, fee: u64) -> Result<()> {
        if fee < self.constant {
            return Err(Error::TransactionBuild(format!(
                "Fee {} is below minimum {}",
                fee, self.constant
            )));
        }

        if fee > MAX_FEE {
            return Err(Error::FeeTooHigh(format!(
                "Fee {} exceeds maximum {}",
                fee, MAX_FEE
            )));
        }

        Ok(())
    }
}

/// Minimum lovelace an output of `output_size` serialized bytes must hold
pub fn min_output_value(params: &ProtocolParams, output_size: usize) -> Result<u64> {
    let overhead = LedgerLimits::standard().utxo_entry_overhead;
    overhead
        .checked_add(output_size as u64)
        .and_then(|bytes| bytes.checked_mul(params.coins_per_utxo_byte))
        .ok_or_else(|| Error::AmountOverflow("minimum output value".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_components() {
        let estimator = FeeEstimator::new();
        assert_eq!(estimator.estimate(1_000_000, false), 170_000);
        assert_eq!(estimator.estimate(1_000_000, true), 200_000);
        assert_eq!(estimator.estimate(LARGE_AMOUNT_THRESHOLD, false), 170_000);
        assert_eq!(estimator.estimate(LARGE_AMOUNT_THRESHOLD + 1, false), 190_000);
        assert_eq!(estimator.estimate(LARGE_AMOUNT_THRESHOLD + 1, true), 220_000);
    }

    #[test]
    fn test_max_sendable() {
        let estimator = FeeEstimator::new();
        assert_eq!(estimator.max_sendable(10_000_000, false), 9_830_000);
        assert_eq!(estimator.max_sendable(100_000, false), 0);
        assert_eq!(
            estimator.max_sendable(500 * LOVELACE_PER_ADA, true),
            500 * LOVELACE_PER_ADA - 220_000
        );
    }

    #[test]
    fn test_max_sendable_never_exceeds_balance_after_fee() {
        let estimator = FeeEstimator::new();
        for balance in [0, 170_000, 100_170_000, 100_180_000, 100_200_000, 1_000_000_000] {
            for memo in [false, true] {
                let max = estimator.max_sendable(balance, memo);
                assert!(max + estimator.estimate(max, memo) <= balance.max(estimator.estimate(0, memo)));
            }
        }
    }

    #[test]
    fn test_linear_fee() {
        let fee = LinearFee::from_params(&ProtocolParams::mainnet());
        assert_eq!(fee.min_fee(0).unwrap(), 155_381);
        assert_eq!(fee.min_fee(300).unwrap(), 155_381 + 44 * 300);
        assert!(fee.validate_fee(200_000).is_ok());
        assert!(fee.validate_fee(100).is_err());
        assert!(matches!(fee.validate_fee(MAX_FEE + 1), Err(Error::FeeTooHigh(_))));
    }

    #[test]
    fn test_min_output_value() {
        let params = ProtocolParams::mainnet();
        assert_eq!(min_output_value(&params, 65).unwrap(), 4_310 * 225);
    }
}
