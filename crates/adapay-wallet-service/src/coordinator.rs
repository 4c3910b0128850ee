//! Two-phase signing coordinator
//!
//! Drives one payment from user input to a submitted transaction: validate,
//! read the account's UTXOs and change address, build, ask the signer for a
//! witness over the metadata-free transaction, reassemble with the withheld
//! metadata, verify, and submit.

use crate::provider::{ProviderError, ProviderErrorKind, SigningProvider};
use crate::state::{SendAttempt, SendState};
use crate::submission::SubmissionClient;
use adapay_core::{
    abbreviate, lovelace_to_ada, AddressCodec, Error, PaymentRequest, Result, SendConfig,
    SignedTransaction, TransactionBuilder, UtxoSelector,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Caller-facing payment request, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient address, text or hex
    pub recipient: String,
    /// Amount in ADA, as typed
    pub amount_ada: String,
    /// Optional memo
    #[serde(default)]
    pub memo: Option<String>,
}

impl SendRequest {
    /// Create request
    pub fn new(
        recipient: impl Into<String>,
        amount_ada: impl Into<String>,
        memo: Option<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            amount_ada: amount_ada.into(),
            memo,
        }
    }
}

/// Result of a successful send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Transaction id reported by the provider
    pub transaction_id: String,
    /// Fee paid (lovelace)
    pub fee: u64,
    /// Fee paid (ADA, six decimals)
    pub fee_ada: String,
    /// Explorer link for the transaction
    pub explorer_url: String,
    /// Attempt that produced this receipt
    pub attempt_id: Uuid,
}

/// Everything known about a finished attempt
#[derive(Debug)]
pub struct SendOutcome {
    /// State trace
    pub attempt: SendAttempt,
    /// Receipt or the error that aborted the attempt
    pub result: Result<SendReceipt>,
    /// Signed transaction hex when submission failed after signing, for
    /// manual resubmission
    pub signed_transaction_hex: Option<String>,
}

/// Clears the in-flight flag when the attempt ends, including when the
/// send future is dropped
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Send coordinator for one connected account
pub struct SigningCoordinator<P: ?Sized> {
    provider: Arc<P>,
    config: SendConfig,
    builder: TransactionBuilder,
    submission: SubmissionClient<P>,
    in_flight: AtomicBool,
}

impl<P: SigningProvider + ?Sized> SigningCoordinator<P> {
    /// Create coordinator over `provider`
    pub fn new(provider: Arc<P>, config: SendConfig) -> Result<Self> {
        let builder = TransactionBuilder::new(&config)?;
        Ok(Self {
            submission: SubmissionClient::new(Arc::clone(&provider)),
            provider,
            config,
            builder,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Configuration in effect
    pub fn config(&self) -> &SendConfig {
        &self.config
    }

    /// Whether a send is currently running
    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send a payment and return its receipt
    pub async fn send(&self, request: &SendRequest) -> Result<SendReceipt> {
        self.execute(request).await.result
    }

    /// Send a payment and return the full attempt trace.
    ///
    /// A second call while one is running fails with
    /// [`Error::SendInProgress`] without touching the provider.
    pub async fn execute(&self, request: &SendRequest) -> SendOutcome {
        let mut attempt = SendAttempt::new();

        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                let error = Error::SendInProgress;
                attempt.abort(&error);
                return SendOutcome {
                    attempt,
                    result: Err(error),
                    signed_transaction_hex: None,
                };
            }
        };

        tracing::info!(
            "Send attempt {} started via {}",
            attempt.id(),
            self.provider.name()
        );

        let mut signed_hex = None;
        let result = self.run(&mut attempt, request, &mut signed_hex).await;

        match &result {
            Ok(receipt) => tracing::info!(
                "Send attempt {} submitted {} (fee {} ADA)",
                attempt.id(),
                receipt.transaction_id,
                receipt.fee_ada
            ),
            Err(e) => attempt.abort(e),
        }

        SendOutcome {
            signed_transaction_hex: if result.is_err() { signed_hex } else { None },
            attempt,
            result,
        }
    }

    async fn run(
        &self,
        attempt: &mut SendAttempt,
        request: &SendRequest,
        signed_hex: &mut Option<String>,
    ) -> Result<SendReceipt> {
        // Everything that can be rejected without I/O is rejected first.
        let payment = PaymentRequest::parse(
            &self.config,
            &request.recipient,
            &request.amount_ada,
            request.memo.as_deref(),
        )?;
        if !self.provider.capabilities().supports_partial_sign {
            return Err(Error::UnsupportedOperation(format!(
                "{} cannot sign externally built transactions",
                self.provider.name()
            )));
        }

        let network = self.builder.network();
        let actual = self.provider.network_id().await.map_err(read_error)?;
        if actual != network.network_id {
            return Err(Error::NetworkMismatch {
                expected: network.network_id,
                actual,
            });
        }

        let (raw_utxos, raw_change) = tokio::try_join!(
            async { self.provider.unspent_outputs().await.map_err(read_error) },
            async { self.provider.change_address().await.map_err(read_error) },
        )?;

        let available = UtxoSelector::decode_available(&raw_utxos);
        tracing::debug!(
            "Fetched {} UTXOs ({} decodable)",
            raw_utxos.len(),
            available.len()
        );
        let change_address = AddressCodec::decode(&raw_change)?;

        let draft = self.builder.build(&available, &payment, &change_address)?;
        attempt.advance(SendState::Built)?;

        let unsigned_hex = draft.unsigned_hex()?;
        attempt.advance(SendState::AwaitingSignature)?;
        tracing::info!(
            "Awaiting signature for {} ({} inputs, fee {})",
            abbreviate(&draft.id()?),
            draft.inputs().len(),
            draft.fee()
        );

        let witness_set_hex = self
            .provider
            .sign_transaction(&unsigned_hex, true)
            .await
            .map_err(signing_error)?;
        attempt.advance(SendState::Signed)?;

        let signed = SignedTransaction::assemble(&draft, &witness_set_hex)?;
        signed.verify_against(&draft)?;
        *signed_hex = Some(signed.to_hex());
        attempt.advance(SendState::Reassembled)?;

        let transaction_id = self.submission.submit(&signed).await?;
        attempt.advance(SendState::Submitted)?;

        Ok(SendReceipt {
            explorer_url: network.explorer_tx_url(&transaction_id),
            transaction_id,
            fee: draft.fee(),
            fee_ada: lovelace_to_ada(draft.fee()),
            attempt_id: attempt.id(),
        })
    }
}

/// Read calls only fail with uncategorized provider errors
pub(crate) fn read_error(error: ProviderError) -> Error {
    Error::UnknownProvider(error.to_string())
}

fn signing_error(error: ProviderError) -> Error {
    match error.kind {
        ProviderErrorKind::UserDeclined => Error::UserRejected(error.info),
        ProviderErrorKind::Unsupported => Error::UnsupportedOperation(error.info),
        _ => Error::UnknownProvider(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_error_mapping() {
        assert!(matches!(
            signing_error(ProviderError::new(ProviderErrorKind::UserDeclined, "no")),
            Error::UserRejected(_)
        ));
        assert!(matches!(
            signing_error(ProviderError::new(ProviderErrorKind::Unsupported, "signTx")),
            Error::UnsupportedOperation(_)
        ));
        assert!(matches!(
            signing_error(ProviderError::new(ProviderErrorKind::ProofGeneration, "hw")),
            Error::UnknownProvider(_)
        ));
    }

    #[test]
    fn test_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        {
            let _first = InFlightGuard::acquire(&flag).unwrap();
            assert!(InFlightGuard::acquire(&flag).is_none());
        }
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_send_request_json() {
        let request: SendRequest =
            serde_json::from_str(r#"{"recipient": "addr_test1xyz", "amount_ada": "2.5"}"#).unwrap();
        assert_eq!(request.memo, None);
        assert_eq!(request.amount_ada, "2.5");
    }
}
