//! Cardano network definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network type enumeration
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Pre-production testnet
    Preprod,
    /// Preview testnet
    #[default]
    Preview,
}

impl NetworkType {
    /// Whether this is one of the test networks
    pub const fn is_testnet(&self) -> bool {
        !matches!(self, NetworkType::Mainnet)
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Network::from_type(*self).name)
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkType::Mainnet),
            "preprod" => Ok(NetworkType::Preprod),
            "preview" => Ok(NetworkType::Preview),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Human-readable name
    pub name: &'static str,
    /// Network id carried in the low nibble of every Shelley address header
    pub network_id: u8,
    /// Protocol magic used by the node handshake
    pub protocol_magic: u32,
    /// Bech32 human-readable part for payment addresses
    pub address_hrp: &'static str,
    /// Bech32 human-readable part for reward (stake) addresses
    pub reward_hrp: &'static str,
    /// Block explorer base URL
    pub explorer_url: &'static str,
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "mainnet",
            network_id: 1,
            protocol_magic: 764_824_073,
            address_hrp: "addr",
            reward_hrp: "stake",
            explorer_url: "https://cardanoscan.io",
        }
    }

    /// Get pre-production testnet parameters
    pub const fn preprod() -> Self {
        Self {
            network_type: NetworkType::Preprod,
            name: "preprod",
            network_id: 0,
            protocol_magic: 1,
            address_hrp: "addr_test",
            reward_hrp: "stake_test",
            explorer_url: "https://preprod.cardanoscan.io",
        }
    }

    /// Get preview testnet parameters
    pub const fn preview() -> Self {
        Self {
            network_type: NetworkType::Preview,
            name: "preview",
            network_id: 0,
            protocol_magic: 2,
            address_hrp: "addr_test",
            reward_hrp: "stake_test",
            explorer_url: "https://preview.cardanoscan.io",
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Preprod => Self::preprod(),
            NetworkType::Preview => Self::preview(),
        }
    }

    /// Prefix every payment address on this network starts with (`addr1`, `addr_test1`)
    pub fn address_prefix(&self) -> String {
        format!("{}1", self.address_hrp)
    }

    /// Explorer link for a transaction id
    pub fn explorer_tx_url(&self, tx_id: &str) -> String {
        format!("{}/transaction/{}", self.explorer_url, tx_id)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::from_type(NetworkType::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_params() {
        let net = Network::mainnet();
        assert_eq!(net.network_type, NetworkType::Mainnet);
        assert_eq!(net.network_id, 1);
        assert_eq!(net.address_prefix(), "addr1");
        assert!(!net.network_type.is_testnet());
    }

    #[test]
    fn test_testnets_share_network_id() {
        assert_eq!(Network::preprod().network_id, 0);
        assert_eq!(Network::preview().network_id, 0);
        assert_eq!(Network::preview().address_prefix(), "addr_test1");
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("Mainnet".parse::<NetworkType>().unwrap(), NetworkType::Mainnet);
        assert_eq!("preview".parse::<NetworkType>().unwrap(), NetworkType::Preview);
        assert!("testnet".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_network_type_serde() {
        let json = serde_json::to_string(&NetworkType::Preprod).unwrap();
        assert_eq!(json, "\"preprod\"");
        let back: NetworkType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NetworkType::Preprod);
    }

    #[test]
    fn test_explorer_url() {
        let url = Network::preview().explorer_tx_url("abcd");
        assert_eq!(url, "https://preview.cardanoscan.io/transaction/abcd");
    }
}
