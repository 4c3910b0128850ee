//! Submission of signed transactions

use crate::provider::{ProviderError, ProviderErrorKind, SigningProvider};
use adapay_core::{abbreviate, Error, Result, SignedTransaction};
use std::sync::Arc;

/// Hands signed transactions to the provider's broadcast operation.
///
/// No retries: a rejected transaction is reported with the provider's
/// reason and left to the caller.
pub struct SubmissionClient<P: ?Sized> {
    provider: Arc<P>,
}

impl<P: SigningProvider + ?Sized> SubmissionClient<P> {
    /// Create client over `provider`
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Submit and return the provider's transaction id
    pub async fn submit(&self, signed: &SignedTransaction) -> Result<String> {
        let local_id = signed.id();
        tracing::debug!("Submitting transaction {}", abbreviate(&local_id));

        let returned = self
            .provider
            .submit_transaction(&signed.to_hex())
            .await
            .map_err(submission_error)?;

        let returned = returned.trim().to_ascii_lowercase();
        if returned.is_empty() {
            tracing::warn!(
                "{} returned no transaction id; using computed id",
                self.provider.name()
            );
            return Ok(local_id);
        }
        if returned != local_id {
            tracing::warn!(
                "{} returned transaction id {} but the body hashes to {}",
                self.provider.name(),
                abbreviate(&returned),
                abbreviate(&local_id)
            );
        }

        tracing::info!("Submitted transaction {}", returned);
        Ok(returned)
    }
}

fn submission_error(error: ProviderError) -> Error {
    match error.kind {
        ProviderErrorKind::SendRefused | ProviderErrorKind::SendFailure => {
            Error::Submission(error.info)
        }
        _ => Error::UnknownProvider(error.to_string()),
    }
}
