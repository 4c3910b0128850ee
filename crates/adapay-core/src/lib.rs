//! adapay wallet core
//!
//! This crate implements transaction construction for sending ADA through an
//! external signer: address handling, UTXO selection, fee calculation,
//! metadata, and reassembly of the signed transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod amount;
pub mod balance;
pub mod config;
pub mod error;
pub mod fees;
pub mod hash;
pub mod memo;
pub mod selection;
pub mod signed;
pub mod transaction;
pub mod utxo;

#[cfg(feature = "test-helpers")]
pub mod testing;

pub use address::{abbreviate, Address, AddressCodec, AddressKind};
pub use amount::{ada_to_lovelace, lovelace_to_ada};
pub use balance::{decode_balance, Balance, BalanceEncoding};
pub use config::{MemoConfig, SelectionConfig, SendConfig};
pub use error::{Error, ErrorCategory, Result};
pub use fees::{FeeEstimator, LinearFee, MAX_FEE};
pub use memo::{AuxiliaryData, Memo, DEFAULT_METADATA_LABEL, MAX_MEMO_CHARS};
pub use selection::{SelectionResult, SelectionStrategy, UtxoSelector};
pub use signed::SignedTransaction;
pub use transaction::{PaymentRequest, TransactionBuilder, TransactionDraft, TxOutput};
pub use utxo::{merge_assets, MultiAsset, OutputReference, UnspentOutput, Value};
