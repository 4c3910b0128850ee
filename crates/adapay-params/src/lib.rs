//! Cardano network parameters and constants
//!
//! This crate provides network-specific constants (address prefixes,
//! network ids) and the protocol parameters used to price and bound
//! transactions built by the wallet.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod network;
pub mod protocol;

pub use network::{Network, NetworkType};
pub use protocol::{LedgerLimits, ProtocolParams};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Protocol parameter out of range
    #[error("Invalid protocol parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
