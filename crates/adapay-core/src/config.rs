//! Send configuration

use crate::memo::{DEFAULT_METADATA_LABEL, MAX_MEMO_CHARS};
use crate::selection::{SelectionStrategy, UtxoSelector};
use crate::{Error, Result};
use adapay_params::protocol::LOVELACE_PER_ADA;
use adapay_params::{Network, NetworkType, ProtocolParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// UTXO selection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Order in which UTXOs are considered
    pub strategy: SelectionStrategy,
    /// Lovelace collected beyond payment plus fee so change is not dust
    pub safety_margin: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::LargestFirst,
            safety_margin: 500_000,
        }
    }
}

/// Memo settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoConfig {
    /// Maximum memo length in characters
    pub max_chars: usize,
    /// Metadata label the memo is stored under
    pub metadata_label: u64,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            max_chars: MAX_MEMO_CHARS,
            metadata_label: DEFAULT_METADATA_LABEL,
        }
    }
}

/// Configuration for building and sending payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Network the wallet is expected to be on
    pub network: NetworkType,
    /// Protocol parameters; network defaults when absent
    pub protocol: Option<ProtocolParams>,
    /// UTXO selection
    pub selection: SelectionConfig,
    /// Memo handling
    pub memo: MemoConfig,
    /// Smallest payment accepted (lovelace)
    pub min_send_lovelace: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Preview,
            protocol: None,
            selection: SelectionConfig::default(),
            memo: MemoConfig::default(),
            min_send_lovelace: LOVELACE_PER_ADA,
        }
    }
}

impl SendConfig {
    /// Default configuration for a network
    pub fn for_network(network: NetworkType) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: SendConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::debug!("Loaded send config from {}", path.display());
        Ok(config)
    }

    /// Reject configurations that cannot produce a valid transaction
    pub fn validate(&self) -> Result<()> {
        if self.memo.metadata_label == 0 {
            return Err(Error::Config("memo.metadata_label must be non-zero".to_string()));
        }
        if self.memo.max_chars == 0 {
            return Err(Error::Config("memo.max_chars must be non-zero".to_string()));
        }
        self.protocol_params().validate()?;
        Ok(())
    }

    /// Network constants
    pub fn network_params(&self) -> Network {
        Network::from_type(self.network)
    }

    /// Effective protocol parameters
    pub fn protocol_params(&self) -> ProtocolParams {
        self.protocol
            .clone()
            .unwrap_or_else(|| ProtocolParams::from_network(self.network))
    }

    /// Selector configured from these settings
    pub fn selector(&self) -> UtxoSelector {
        UtxoSelector::new(self.selection.strategy, self.selection.safety_margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SendConfig::default();
        assert_eq!(config.network, NetworkType::Preview);
        assert_eq!(config.selection.strategy, SelectionStrategy::LargestFirst);
        assert_eq!(config.selection.safety_margin, 500_000);
        assert_eq!(config.memo.max_chars, 100);
        assert_eq!(config.memo.metadata_label, 674);
        assert_eq!(config.min_send_lovelace, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"network": "mainnet", "selection": {{"strategy": "in_order"}}}}"#
        )
        .unwrap();

        let config = SendConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.network, NetworkType::Mainnet);
        assert_eq!(config.selection.strategy, SelectionStrategy::InOrder);
        assert_eq!(config.selection.safety_margin, 500_000);
        assert_eq!(config.network_params().network_id, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"memo": {{"metadata_label": 0}}}}"#).unwrap();
        assert!(matches!(
            SendConfig::from_json_file(file.path()),
            Err(Error::Config(_))
        ));

        let config = SendConfig {
            protocol: Some(ProtocolParams {
                min_fee_b: 0,
                ..ProtocolParams::mainnet()
            }),
            ..SendConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SendConfig::from_json_file(dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
