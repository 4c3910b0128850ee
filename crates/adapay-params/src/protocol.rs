//! Protocol parameters for Cardano transaction construction

use crate::network::NetworkType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lovelace per ADA
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Protocol parameters that affect fee and output sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Linear fee coefficient (lovelace per transaction byte)
    pub min_fee_a: u64,
    /// Linear fee constant (lovelace)
    pub min_fee_b: u64,
    /// Lovelace charged per byte of a stored output
    pub coins_per_utxo_byte: u64,
    /// Maximum serialized transaction size (bytes)
    pub max_tx_size: u32,
    /// Maximum serialized value size of a single output (bytes)
    pub max_value_size: u32,
    /// Stake key registration deposit (lovelace)
    pub key_deposit: u64,
    /// Pool registration deposit (lovelace)
    pub pool_deposit: u64,
}

impl ProtocolParams {
    /// Create protocol params for mainnet
    pub fn mainnet() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            coins_per_utxo_byte: 4_310,
            max_tx_size: 16_384,
            max_value_size: 5_000,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
        }
    }

    /// Create protocol params for the test networks
    ///
    /// Preprod and preview currently track mainnet values.
    pub fn testnet() -> Self {
        Self::mainnet()
    }

    /// Get protocol params by network type
    pub fn from_network(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Preprod | NetworkType::Preview => Self::testnet(),
        }
    }

    /// Reject parameter sets that would make every fee or output check meaningless
    pub fn validate(&self) -> Result<()> {
        if self.min_fee_a == 0 || self.min_fee_b == 0 {
            return Err(Error::InvalidParameter(
                "fee coefficients must be non-zero".to_string(),
            ));
        }
        if self.coins_per_utxo_byte == 0 {
            return Err(Error::InvalidParameter(
                "coins_per_utxo_byte must be non-zero".to_string(),
            ));
        }
        if self.max_tx_size == 0 {
            return Err(Error::InvalidParameter(
                "max_tx_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Ledger rules that are not governed by protocol parameter updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLimits {
    /// Maximum lovelace supply
    pub max_lovelace_supply: u64,
    /// Constant per-output overhead used by the minimum-UTxO rule (bytes)
    pub utxo_entry_overhead: u64,
    /// Maximum byte length of a single metadata text or bytes value
    pub metadata_text_max_bytes: usize,
}

impl LedgerLimits {
    /// Limits shared by every network
    pub const fn standard() -> Self {
        Self {
            max_lovelace_supply: 45_000_000_000 * LOVELACE_PER_ADA,
            utxo_entry_overhead: 160,
            metadata_text_max_bytes: 64,
        }
    }

    /// Check if amount is valid (within max supply)
    pub const fn is_valid_amount(&self, lovelace: u64) -> bool {
        lovelace <= self.max_lovelace_supply
    }
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self::standard()
    }
}
