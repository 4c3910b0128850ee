//! UTXO selection
//!
//! Greedy accumulation of spendable outputs until a target is covered.
//! Pure-coin outputs are spent before outputs carrying native assets; any
//! assets pulled in are returned through the change output.

use crate::amount::checked_sum;
use crate::utxo::UnspentOutput;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Order in which outputs are considered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Provider order
    InOrder,
    /// Largest value first; equal values keep provider order
    #[default]
    LargestFirst,
}

/// Selection result
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected outputs
    pub inputs: Vec<UnspentOutput>,
    /// Total lovelace of selected outputs
    pub total_value: u64,
    /// Every spendable output was taken
    pub exhausted: bool,
}

/// Greedy UTXO selector
#[derive(Debug, Clone)]
pub struct UtxoSelector {
    strategy: SelectionStrategy,
    safety_margin: u64,
}

impl UtxoSelector {
    /// Create selector with strategy and the extra lovelace to collect beyond a target
    pub fn new(strategy: SelectionStrategy, safety_margin: u64) -> Self {
        Self {
            strategy,
            safety_margin,
        }
    }

    /// Selection strategy
    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Decode raw provider entries, skipping undecodable ones
    pub fn decode_available(raw: &[String]) -> Vec<UnspentOutput> {
        let mut decoded = Vec::with_capacity(raw.len());
        for (position, entry) in raw.iter().enumerate() {
            match UnspentOutput::decode_hex(entry) {
                Ok(utxo) => decoded.push(utxo),
                Err(e) => {
                    tracing::warn!("Skipping malformed UTXO at position {}: {}", position, e);
                }
            }
        }
        decoded
    }

    fn spendable<'a>(&self, available: &'a [UnspentOutput]) -> Vec<&'a UnspentOutput> {
        let mut spendable: Vec<&UnspentOutput> = available.iter().collect();

        // sort_by is stable: asset-bearing outputs last, strategy order within each group
        match self.strategy {
            SelectionStrategy::InOrder => {
                spendable.sort_by_key(|utxo| utxo.value.has_assets());
            }
            SelectionStrategy::LargestFirst => {
                spendable.sort_by(|a, b| {
                    a.value
                        .has_assets()
                        .cmp(&b.value.has_assets())
                        .then_with(|| b.coin().cmp(&a.coin()))
                });
            }
        }
        spendable
    }

    /// Select outputs until `target` plus the safety margin is covered.
    ///
    /// Stops as soon as that threshold is reached. When every spendable
    /// output is taken and the total still covers `target` (but not the
    /// margin), the selection succeeds with `exhausted` set.
    pub fn select(&self, available: &[UnspentOutput], target: u64) -> Result<SelectionResult> {
        let threshold = target.saturating_add(self.safety_margin);

        tracing::debug!(
            "Selecting UTXOs: target={}, margin={}, candidates={}",
            target,
            self.safety_margin,
            available.len()
        );

        let spendable = self.spendable(available);
        let candidates = spendable.len();

        let mut inputs = Vec::new();
        let mut total = 0u64;
        for utxo in spendable {
            if total >= threshold {
                break;
            }
            total = total
                .checked_add(utxo.coin())
                .ok_or_else(|| Error::AmountOverflow("Selected value overflow".to_string()))?;
            inputs.push(utxo.clone());
        }

        if total < target {
            return Err(Error::InsufficientFunds {
                required: target,
                available: total,
            });
        }

        let exhausted = inputs.len() == candidates;
        tracing::debug!(
            "Selected {} of {} UTXOs, total={}, exhausted={}",
            inputs.len(),
            candidates,
            total,
            exhausted
        );

        Ok(SelectionResult {
            inputs,
            total_value: total,
            exhausted,
        })
    }

    /// Every spendable output, in strategy order
    pub fn select_all(&self, available: &[UnspentOutput]) -> Result<SelectionResult> {
        let inputs: Vec<UnspentOutput> = self.spendable(available).into_iter().cloned().collect();
        let total_value = checked_sum(inputs.iter().map(|u| u.coin()))?;
        Ok(SelectionResult {
            inputs,
            total_value,
            exhausted: true,
        })
    }
}

impl Default for UtxoSelector {
    fn default() -> Self {
        Self::new(SelectionStrategy::default(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::utxo::{OutputReference, Value};
    use std::collections::BTreeMap;

    fn utxo(tag: u8, coin: u64) -> UnspentOutput {
        let mut bytes = vec![0x60];
        bytes.extend_from_slice(&[0x22; 28]);
        UnspentOutput::new(
            OutputReference::new([tag; 32], 0),
            Address::from_bytes(bytes).unwrap(),
            Value::from_coin(coin),
        )
    }

    #[test]
    fn test_largest_first_stops_at_threshold() {
        let selector = UtxoSelector::new(SelectionStrategy::LargestFirst, 0);
        let available = vec![utxo(1, 1_000_000), utxo(2, 5_000_000), utxo(3, 3_000_000)];

        let result = selector.select(&available, 4_000_000).unwrap();
        assert_eq!(result.inputs.len(), 1);
        assert_eq!(result.total_value, 5_000_000);
        assert!(!result.exhausted);
    }

    #[test]
    fn test_in_order_preserves_provider_order() {
        let selector = UtxoSelector::new(SelectionStrategy::InOrder, 0);
        let available = vec![utxo(1, 1_000_000), utxo(2, 5_000_000), utxo(3, 3_000_000)];

        let result = selector.select(&available, 4_000_000).unwrap();
        assert_eq!(result.inputs.len(), 2);
        assert_eq!(result.inputs[0].input.transaction_id, [1; 32]);
        assert_eq!(result.total_value, 6_000_000);
    }

    #[test]
    fn test_equal_values_keep_provider_order() {
        let selector = UtxoSelector::new(SelectionStrategy::LargestFirst, 0);
        let available = vec![utxo(1, 2_000_000), utxo(2, 2_000_000), utxo(3, 2_000_000)];

        let result = selector.select(&available, 3_000_000).unwrap();
        let order: Vec<u8> = result.inputs.iter().map(|u| u.input.transaction_id[0]).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_safety_margin_collects_more() {
        let selector = UtxoSelector::new(SelectionStrategy::LargestFirst, 1_500_000);
        let available = vec![utxo(1, 5_000_000), utxo(2, 1_000_000), utxo(3, 1_000_000)];

        // 5 ADA alone misses 4 + 1.5; the first 1 ADA output reaches the threshold
        let result = selector.select(&available, 4_000_000).unwrap();
        assert_eq!(result.inputs.len(), 2);
        assert_eq!(result.total_value, 6_000_000);
        assert!(!result.exhausted);

        let result = selector.select(&available, 5_000_000).unwrap();
        assert_eq!(result.inputs.len(), 3);
        assert_eq!(result.total_value, 7_000_000);
        assert!(result.exhausted);
    }

    #[test]
    fn test_margin_is_best_effort_when_target_is_met() {
        let selector = UtxoSelector::new(SelectionStrategy::LargestFirst, 10_000_000);
        let available = vec![utxo(1, 5_000_000)];

        let result = selector.select(&available, 4_000_000).unwrap();
        assert!(result.exhausted);
        assert_eq!(result.total_value, 5_000_000);
    }

    #[test]
    fn test_insufficient_funds_reports_available() {
        let selector = UtxoSelector::default();
        let available = vec![utxo(1, 300_000), utxo(2, 200_000)];

        match selector.select(&available, 600_000) {
            Err(Error::InsufficientFunds {
                required,
                available,
            }) => {
                assert_eq!(required, 600_000);
                assert_eq!(available, 500_000);
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }
    }

    #[test]
    fn test_asset_bearing_outputs_are_spent_last() {
        let selector = UtxoSelector::default();
        let mut with_assets = utxo(1, 10_000_000);
        let mut names = BTreeMap::new();
        names.insert(b"NFT".to_vec(), 1);
        with_assets.value.assets.insert(vec![5; 28], names);
        let available = vec![with_assets, utxo(2, 2_000_000)];

        let result = selector.select(&available, 1_000_000).unwrap();
        assert_eq!(result.inputs.len(), 1);
        assert_eq!(result.inputs[0].input.transaction_id, [2; 32]);

        let result = selector.select(&available, 3_000_000).unwrap();
        assert_eq!(result.inputs.len(), 2);
        assert_eq!(result.inputs[1].input.transaction_id, [1; 32]);
        assert_eq!(result.total_value, 12_000_000);
        assert!(result.exhausted);
    }

    #[test]
    fn test_asset_only_wallet_is_spendable() {
        let selector = UtxoSelector::default();
        let mut with_assets = utxo(1, 100_000_000);
        let mut names = BTreeMap::new();
        names.insert(b"TOKEN".to_vec(), 1);
        with_assets.value.assets.insert(vec![6; 28], names);

        let all = selector.select_all(&[with_assets]).unwrap();
        assert_eq!(all.total_value, 100_000_000);
        assert_eq!(all.inputs.len(), 1);
    }

    #[test]
    fn test_decode_available_skips_malformed() {
        let good = utxo(4, 1_000_000).to_hex().unwrap();
        let raw = vec!["zz".to_string(), good, "8200".to_string()];
        let decoded = UtxoSelector::decode_available(&raw);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].coin(), 1_000_000);
    }
}
