//! Signing provider interface
//!
//! The browser wallet extension is reached through this trait instead of a
//! globally injected object. Every call can fail with a [`ProviderError`]
//! whose kind follows the wallet's error codes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Rejection kinds reported by a signing provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderErrorKind {
    /// Malformed request (API code -1)
    InvalidRequest,
    /// Provider-internal failure (API code -2)
    Internal,
    /// Request refused, e.g. wallet not enabled (API code -3)
    Refused,
    /// Active account changed mid-request (API code -4)
    AccountChange,
    /// Signer could not produce a witness (sign code 1)
    ProofGeneration,
    /// User declined the signing prompt (sign code 2)
    UserDeclined,
    /// Relay refused the transaction (send code 1)
    SendRefused,
    /// Relay failed to process the transaction (send code 2)
    SendFailure,
    /// Operation not implemented by this provider
    Unsupported,
}

impl ProviderErrorKind {
    /// Kind for a general API error code
    pub fn from_api_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::InvalidRequest),
            -2 => Some(Self::Internal),
            -3 => Some(Self::Refused),
            -4 => Some(Self::AccountChange),
            _ => None,
        }
    }

    /// Kind for a signing error code
    pub fn from_sign_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::ProofGeneration),
            2 => Some(Self::UserDeclined),
            _ => None,
        }
    }

    /// Kind for a submission error code
    pub fn from_send_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::SendRefused),
            2 => Some(Self::SendFailure),
            _ => None,
        }
    }
}

/// A rejected provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {info}")]
pub struct ProviderError {
    /// Rejection kind
    pub kind: ProviderErrorKind,
    /// Provider's message, verbatim
    pub info: String,
}

impl ProviderError {
    /// Create a provider error
    pub fn new(kind: ProviderErrorKind, info: impl Into<String>) -> Self {
        Self {
            kind,
            info: info.into(),
        }
    }
}

/// Result of a provider call
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Optional operations a provider supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Wallet can build and send a payment itself
    pub supports_standard_send: bool,
    /// Wallet exposes an experimental send entry point
    pub supports_experimental_send: bool,
    /// Wallet can sign a transaction it did not build
    pub supports_partial_sign: bool,
}

/// Operations consumed from a connected wallet
#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Display name
    fn name(&self) -> &str;

    /// Supported optional operations
    fn capabilities(&self) -> ProviderCapabilities;

    /// Network id the wallet is connected to
    async fn network_id(&self) -> ProviderResult<u8>;

    /// Hex-encoded CBOR unspent outputs
    async fn unspent_outputs(&self) -> ProviderResult<Vec<String>>;

    /// Change address, hex or text
    async fn change_address(&self) -> ProviderResult<String>;

    /// Addresses that have appeared on chain
    async fn used_addresses(&self) -> ProviderResult<Vec<String>>;

    /// Addresses not yet seen on chain
    async fn unused_addresses(&self) -> ProviderResult<Vec<String>>;

    /// Reward addresses
    async fn reward_addresses(&self) -> ProviderResult<Vec<String>>;

    /// Balance as decimal, hex or CBOR hex
    async fn balance(&self) -> ProviderResult<String>;

    /// Sign `unsigned_hex` and return the witness set as hex
    async fn sign_transaction(&self, unsigned_hex: &str, partial: bool) -> ProviderResult<String>;

    /// Broadcast `signed_hex` and return the transaction id
    async fn submit_transaction(&self, signed_hex: &str) -> ProviderResult<String>;
}
