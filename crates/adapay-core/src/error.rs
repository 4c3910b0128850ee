//! Error types for adapay core
//!
//! Typed taxonomy shared by transaction construction, signing coordination
//! and submission. Every kind maps to a distinct user-facing message.

use crate::amount::lovelace_to_ada;
use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// adapay core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed address or address for the wrong network
    #[error("Invalid address: {0}")]
    Address(String),

    /// Selection or change computation came up short
    #[error("Insufficient funds: required {required} lovelace, available {available} lovelace")]
    InsufficientFunds {
        /// Lovelace needed to cover payment plus fee
        required: u64,
        /// Lovelace the wallet could actually spend
        available: u64,
    },

    /// Memo cannot be attached as metadata
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The signer declined the request
    #[error("Signing rejected by user: {0}")]
    UserRejected(String),

    /// The signer lacks a capability the flow needs
    #[error("Unsupported signer operation: {0}")]
    UnsupportedOperation(String),

    /// Post-sign verification found the signed transaction does not match the draft
    #[error("Transaction reassembly failed: {0}")]
    Reassembly(String),

    /// The relay rejected the signed transaction; carries the provider's raw reason
    #[error("Transaction submission failed: {0}")]
    Submission(String),

    /// Uncategorized rejection or malformed response from the signing provider
    #[error("Signing provider error: {0}")]
    UnknownProvider(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Balance string could not be classified or parsed
    #[error("Balance decode error: {0}")]
    BalanceDecode(String),

    /// CBOR or hex payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// CBOR encoding failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Fee above the safety ceiling
    #[error("Fee too high: {0}")]
    FeeTooHigh(String),

    /// Transaction building error
    #[error("Transaction build error: {0}")]
    TransactionBuild(String),

    /// Transaction exceeds the protocol size limit
    #[error("Transaction too large: {size} bytes exceeds maximum {max} bytes")]
    TransactionTooLarge {
        /// Estimated signed size
        size: usize,
        /// Protocol maximum
        max: usize,
    },

    /// The signing provider is connected to a different network
    #[error("Network mismatch: configured network id {expected}, provider reports {actual}")]
    NetworkMismatch {
        /// Network id from configuration
        expected: u8,
        /// Network id reported by the provider
        actual: u8,
    },

    /// Another send attempt is still running for this account
    #[error("A send is already in progress for this account")]
    SendInProgress,

    /// Illegal state machine transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Address(_)
                | Error::InsufficientFunds { .. }
                | Error::InvalidMetadata(_)
                | Error::UserRejected(_)
                | Error::UnsupportedOperation(_)
                | Error::Submission(_)
                | Error::InvalidAmount(_)
                | Error::NetworkMismatch { .. }
                | Error::SendInProgress
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Address(_) => {
                "The recipient address is invalid for the selected network. Please check and try again.".to_string()
            }
            Error::InsufficientFunds { required, available } => format!(
                "You don't have enough funds for this transaction. Requested {} ADA including fees, but only {} ADA is available.",
                lovelace_to_ada(*required),
                lovelace_to_ada(*available)
            ),
            Error::InvalidMetadata(_) => {
                "Your memo cannot be attached. Please shorten it and remove control characters.".to_string()
            }
            Error::UserRejected(_) => {
                "The transaction was declined in your wallet. Nothing was sent.".to_string()
            }
            Error::UnsupportedOperation(_) => {
                "Your wallet does not support signing this kind of transaction.".to_string()
            }
            Error::Reassembly(_) => {
                "The signed transaction did not match what was built, so it was not submitted.".to_string()
            }
            Error::Submission(reason) => {
                format!("The network rejected the transaction: {}", reason)
            }
            Error::UnknownProvider(_) => {
                "Your wallet returned an unexpected error. Please try again.".to_string()
            }
            Error::InvalidAmount(_) => {
                "The amount is invalid. Please enter a valid amount.".to_string()
            }
            Error::NetworkMismatch { .. } => {
                "Your wallet is connected to a different network. Please switch networks and try again.".to_string()
            }
            Error::SendInProgress => {
                "A transaction is already being sent. Please wait for it to finish.".to_string()
            }
            Error::TransactionTooLarge { .. } => {
                "This payment needs too many inputs to fit in one transaction.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InsufficientFunds { .. }
            | Error::InvalidAmount(_)
            | Error::AmountOverflow(_)
            | Error::BalanceDecode(_) => ErrorCategory::Amount,
            Error::Address(_) | Error::NetworkMismatch { .. } => ErrorCategory::Address,
            Error::InvalidMetadata(_) => ErrorCategory::Metadata,
            Error::FeeTooHigh(_) => ErrorCategory::Fee,
            Error::TransactionBuild(_)
            | Error::TransactionTooLarge { .. }
            | Error::Reassembly(_)
            | Error::Decode(_)
            | Error::Encode(_) => ErrorCategory::Transaction,
            Error::UserRejected(_)
            | Error::UnsupportedOperation(_)
            | Error::UnknownProvider(_) => ErrorCategory::Signer,
            Error::Submission(_) => ErrorCategory::Network,
            Error::SendInProgress | Error::InvalidStateTransition { .. } => ErrorCategory::Flow,
            Error::Config(_) | Error::Io(_) | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(e: minicbor::decode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<minicbor::encode::Error<std::convert::Infallible>> for Error {
    fn from(e: minicbor::encode::Error<std::convert::Infallible>) -> Self {
        Error::Encode(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Decode(format!("invalid hex: {}", e))
    }
}

impl From<adapay_params::Error> for Error {
    fn from(e: adapay_params::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Amount-related errors
    Amount,
    /// Address-related errors
    Address,
    /// Memo/metadata errors
    Metadata,
    /// Fee-related errors
    Fee,
    /// Transaction construction or decoding errors
    Transaction,
    /// Signing provider errors
    Signer,
    /// Relay/network errors
    Network,
    /// Send flow sequencing errors
    Flow,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Amount => write!(f, "Amount"),
            ErrorCategory::Address => write!(f, "Address"),
            ErrorCategory::Metadata => write!(f, "Metadata"),
            ErrorCategory::Fee => write!(f, "Fee"),
            ErrorCategory::Transaction => write!(f, "Transaction"),
            ErrorCategory::Signer => write!(f, "Signer"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Flow => write!(f, "Flow"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_detection() {
        assert!(Error::Address("test".to_string()).is_user_error());
        assert!(Error::InsufficientFunds {
            required: 2,
            available: 1
        }
        .is_user_error());
        assert!(!Error::Decode("test".to_string()).is_user_error());
        assert!(!Error::Reassembly("test".to_string()).is_user_error());
    }

    #[test]
    fn test_insufficient_funds_message_names_both_amounts() {
        let error = Error::InsufficientFunds {
            required: 600_000 + 170_000,
            available: 500_000,
        };
        let msg = error.user_message();
        assert!(msg.contains("0.770000 ADA"));
        assert!(msg.contains("0.500000 ADA"));
    }

    #[test]
    fn test_submission_message_keeps_reason() {
        let error = Error::Submission("BadInputsUTxO".to_string());
        assert!(error.user_message().contains("BadInputsUTxO"));
    }

    #[test]
    fn test_classifiable_errors_have_distinct_messages() {
        let errors = [
            Error::Address(String::new()),
            Error::InsufficientFunds {
                required: 1,
                available: 0,
            },
            Error::InvalidMetadata(String::new()),
            Error::UserRejected(String::new()),
            Error::UnsupportedOperation(String::new()),
            Error::Reassembly(String::new()),
            Error::Submission(String::new()),
            Error::UnknownProvider(String::new()),
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.user_message()).collect();
        assert_eq!(messages.len(), errors.len());
        assert!(messages.iter().all(|m| !m.contains("something went wrong")));
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::Address("test".to_string()).category(),
            ErrorCategory::Address
        );
        assert_eq!(
            Error::InvalidMetadata("test".to_string()).category(),
            ErrorCategory::Metadata
        );
        assert_eq!(
            Error::UserRejected("test".to_string()).category(),
            ErrorCategory::Signer
        );
        assert_eq!(
            Error::Submission("test".to_string()).category(),
            ErrorCategory::Network
        );
        assert_eq!(Error::SendInProgress.category(), ErrorCategory::Flow);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Amount.to_string(), "Amount");
        assert_eq!(ErrorCategory::Signer.to_string(), "Signer");
        assert_eq!(ErrorCategory::Network.to_string(), "Network");
    }
}
