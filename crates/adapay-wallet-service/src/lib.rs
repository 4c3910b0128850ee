//! adapay wallet service
//!
//! Async send flow over an external signing provider. The provider builds
//! nothing: this crate fetches its UTXOs, builds the transaction with
//! `adapay-core`, asks it for a witness set, reassembles and submits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod provider;
pub mod session;
pub mod state;
pub mod submission;

pub use coordinator::{SendOutcome, SendReceipt, SendRequest, SigningCoordinator};
pub use provider::{
    ProviderCapabilities, ProviderError, ProviderErrorKind, ProviderResult, SigningProvider,
};
pub use session::AccountSnapshot;
pub use state::{AbortReason, SendAttempt, SendState, StateTransition};
pub use submission::SubmissionClient;
