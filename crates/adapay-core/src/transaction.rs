//! Transaction construction
//!
//! [`TransactionBuilder`] turns a validated [`PaymentRequest`] and the
//! account's current UTXOs into a balanced [`TransactionDraft`]. The fee is
//! derived from the serialized size of the finished transaction, including
//! metadata and one placeholder key witness per input, and is iterated
//! until it no longer changes.

use crate::address::{abbreviate, Address, AddressCodec};
use crate::amount::{ada_to_lovelace, checked_sum, lovelace_to_ada};
use crate::config::SendConfig;
use crate::fees::{min_output_value, LinearFee};
use crate::hash::blake2b_256;
use crate::memo::{AuxiliaryData, Memo};
use crate::selection::{SelectionResult, UtxoSelector};
use crate::signed::transaction_bytes;
use crate::utxo::{encode_value, merge_assets, MultiAsset, UnspentOutput};
use crate::{Error, Result};
use adapay_params::{Network, ProtocolParams};
use minicbor::Encoder;

const MAX_BALANCE_ROUNDS: usize = 16;
const MAX_FEE_ITERATIONS: usize = 10;

const VKEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Destination
    pub address: Address,
    /// Lovelace
    pub coin: u64,
    /// Native assets; only change outputs carry any
    pub assets: MultiAsset,
}

impl TxOutput {
    /// Create lovelace-only output
    pub fn new(address: Address, coin: u64) -> Self {
        Self::with_assets(address, coin, MultiAsset::new())
    }

    /// Create output carrying native assets
    pub fn with_assets(address: Address, coin: u64, assets: MultiAsset) -> Self {
        Self {
            address,
            coin,
            assets,
        }
    }

    fn encode(&self, e: &mut Encoder<Vec<u8>>) -> Result<()> {
        e.array(2)?.bytes(self.address.as_bytes())?;
        encode_value(e, self.coin, &self.assets)
    }

    /// Serialized size in bytes
    pub fn encoded_len(&self) -> Result<usize> {
        let mut e = Encoder::new(Vec::new());
        self.encode(&mut e)?;
        Ok(e.into_writer().len())
    }
}

/// A validated payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Recipient payment address
    pub recipient: Address,
    /// Amount in lovelace
    pub amount: u64,
    /// Optional memo attached as metadata
    pub memo: Option<Memo>,
}

impl PaymentRequest {
    /// Create from already-validated parts
    pub fn new(recipient: Address, amount: u64, memo: Option<Memo>) -> Self {
        Self {
            recipient,
            amount,
            memo,
        }
    }

    /// Validate user input: recipient on the configured network, ADA amount
    /// truncated to lovelace and at least the configured minimum, memo within
    /// bounds. Blank memos are dropped.
    pub fn parse(
        config: &SendConfig,
        recipient: &str,
        amount_ada: &str,
        memo: Option<&str>,
    ) -> Result<Self> {
        let codec = AddressCodec::new(config.network_params());
        let recipient = codec.parse_payment_address(recipient)?;

        let amount = ada_to_lovelace(amount_ada)?;
        if amount == 0 {
            return Err(Error::InvalidAmount("Amount must be greater than zero".to_string()));
        }
        if amount < config.min_send_lovelace {
            return Err(Error::InvalidAmount(format!(
                "Minimum send is {} ADA",
                lovelace_to_ada(config.min_send_lovelace)
            )));
        }

        let memo = match memo {
            Some(text) if !text.trim().is_empty() => {
                Some(Memo::with_limit(text, config.memo.max_chars)?)
            }
            _ => None,
        };

        Ok(Self::new(recipient, amount, memo))
    }
}

/// Balanced, unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    inputs: Vec<UnspentOutput>,
    outputs: Vec<TxOutput>,
    fee: u64,
    change_index: Option<usize>,
    auxiliary_data: Option<AuxiliaryData>,
}

impl TransactionDraft {
    /// Spent outputs, in selection order
    pub fn inputs(&self) -> &[UnspentOutput] {
        &self.inputs
    }

    /// Recipient output followed by the change output, if any
    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    /// Fee in lovelace
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Change output, if one was created
    pub fn change_output(&self) -> Option<&TxOutput> {
        self.change_index.and_then(|i| self.outputs.get(i))
    }

    /// Attached metadata
    pub fn auxiliary_data(&self) -> Option<&AuxiliaryData> {
        self.auxiliary_data.as_ref()
    }

    /// Memo text, if any
    pub fn memo(&self) -> Option<&str> {
        self.auxiliary_data.as_ref().map(|aux| aux.memo().as_str())
    }

    /// Sum of input lovelace
    pub fn total_input(&self) -> Result<u64> {
        checked_sum(self.inputs.iter().map(|u| u.coin()))
    }

    /// Sum of output lovelace
    pub fn total_output(&self) -> Result<u64> {
        checked_sum(self.outputs.iter().map(|o| o.coin))
    }

    /// Native assets across all inputs
    pub fn input_assets(&self) -> Result<MultiAsset> {
        let mut total = MultiAsset::new();
        for utxo in &self.inputs {
            merge_assets(&mut total, &utxo.value.assets)?;
        }
        Ok(total)
    }

    /// Native assets across all outputs
    pub fn output_assets(&self) -> Result<MultiAsset> {
        let mut total = MultiAsset::new();
        for output in &self.outputs {
            merge_assets(&mut total, &output.assets)?;
        }
        Ok(total)
    }

    /// `inputs == outputs + fee` in lovelace, and every input asset reappears in the outputs
    pub fn is_balanced(&self) -> bool {
        let coin_balanced = match (self.total_input(), self.total_output()) {
            (Ok(inputs), Ok(outputs)) => outputs.checked_add(self.fee) == Some(inputs),
            _ => false,
        };
        coin_balanced
            && matches!(
                (self.input_assets(), self.output_assets()),
                (Ok(inputs), Ok(outputs)) if inputs == outputs
            )
    }

    /// Serialized auxiliary data
    pub fn auxiliary_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.auxiliary_data.as_ref().map(|aux| aux.to_bytes()).transpose()
    }

    /// Serialized transaction body
    pub fn body_bytes(&self) -> Result<Vec<u8>> {
        encode_body(
            &self.inputs,
            &self.outputs,
            self.fee,
            self.auxiliary_bytes()?.as_deref(),
        )
    }

    /// Transaction id (hex blake2b-256 of the body)
    pub fn id(&self) -> Result<String> {
        Ok(hex::encode(blake2b_256(&self.body_bytes()?)))
    }

    /// Transaction presented for signing: empty witness set, metadata withheld
    pub fn unsigned_bytes(&self) -> Result<Vec<u8>> {
        let mut e = Encoder::new(Vec::new());
        e.map(0)?;
        let empty_witnesses = e.into_writer();
        Ok(transaction_bytes(
            &self.body_bytes()?,
            &empty_witnesses,
            true,
            None,
        ))
    }

    /// Hex of [`TransactionDraft::unsigned_bytes`]
    pub fn unsigned_hex(&self) -> Result<String> {
        Ok(hex::encode(self.unsigned_bytes()?))
    }

    /// Signed size assuming one key witness per input
    pub fn estimated_signed_size(&self) -> Result<usize> {
        signed_size(
            &self.body_bytes()?,
            self.inputs.len(),
            self.auxiliary_bytes()?.as_deref(),
        )
    }
}

fn encode_body(
    inputs: &[UnspentOutput],
    outputs: &[TxOutput],
    fee: u64,
    auxiliary_data: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    e.map(if auxiliary_data.is_some() { 4 } else { 3 })?;

    e.u8(0)?.array(inputs.len() as u64)?;
    for utxo in inputs {
        e.array(2)?
            .bytes(&utxo.input.transaction_id)?
            .u32(utxo.input.index)?;
    }

    e.u8(1)?.array(outputs.len() as u64)?;
    for output in outputs {
        output.encode(&mut e)?;
    }

    e.u8(2)?.u64(fee)?;

    if let Some(aux) = auxiliary_data {
        e.u8(7)?.bytes(&blake2b_256(aux))?;
    }

    Ok(e.into_writer())
}

fn placeholder_witness_set(count: usize) -> Result<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    if count == 0 {
        e.map(0)?;
    } else {
        e.map(1)?.u8(0)?.array(count as u64)?;
        for _ in 0..count {
            e.array(2)?
                .bytes(&[0u8; VKEY_LEN])?
                .bytes(&[0u8; SIGNATURE_LEN])?;
        }
    }
    Ok(e.into_writer())
}

fn signed_size(body: &[u8], witness_count: usize, auxiliary_data: Option<&[u8]>) -> Result<usize> {
    let witnesses = placeholder_witness_set(witness_count)?;
    Ok(transaction_bytes(body, &witnesses, true, auxiliary_data).len())
}

enum Balance {
    Done {
        outputs: Vec<TxOutput>,
        fee: u64,
        change_index: Option<usize>,
    },
    Short {
        required: u64,
    },
}

/// Builds balanced drafts from a payment request and the account's UTXOs
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    network: Network,
    params: ProtocolParams,
    fee_rule: LinearFee,
    selector: UtxoSelector,
    metadata_label: u64,
}

impl TransactionBuilder {
    /// Create builder from configuration
    pub fn new(config: &SendConfig) -> Result<Self> {
        config.validate()?;
        let params = config.protocol_params();
        Ok(Self {
            network: config.network_params(),
            fee_rule: LinearFee::from_params(&params),
            params,
            selector: config.selector(),
            metadata_label: config.memo.metadata_label,
        })
    }

    /// Network drafts are built for
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Protocol parameters in effect
    pub fn protocol_params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Build a balanced draft paying `request` from `available`.
    ///
    /// Selection starts at payment plus the constant fee term and grows
    /// while the selected inputs cannot cover payment plus the size-based
    /// fee, or leave change below the minimum output value. Dust change is
    /// folded into the fee only once every spendable output is selected and
    /// no native assets need returning.
    pub fn build(
        &self,
        available: &[UnspentOutput],
        request: &PaymentRequest,
        change_address: &Address,
    ) -> Result<TransactionDraft> {
        if request.amount == 0 {
            return Err(Error::InvalidAmount("Amount must be greater than zero".to_string()));
        }
        self.check_address(&request.recipient, "recipient")?;
        self.check_address(change_address, "change")?;

        let recipient = TxOutput::new(request.recipient.clone(), request.amount);
        let auxiliary_data = request
            .memo
            .clone()
            .map(|memo| AuxiliaryData::new(self.metadata_label, memo));
        let aux_bytes = auxiliary_data
            .as_ref()
            .map(|aux| aux.to_bytes())
            .transpose()?;

        tracing::debug!(
            "Building payment of {} lovelace to {} (memo: {}, candidates: {})",
            request.amount,
            abbreviate(&request.recipient.to_hex()),
            auxiliary_data.is_some(),
            available.len()
        );

        let mut target = request
            .amount
            .checked_add(self.fee_rule.constant)
            .ok_or_else(|| Error::AmountOverflow("Payment plus fee overflow".to_string()))?;

        // every round that selects more takes at least one more output
        let rounds = MAX_BALANCE_ROUNDS.max(available.len().saturating_add(1));
        for round in 0..rounds {
            let selection = match self.selector.select(available, target) {
                Ok(selection) => selection,
                // the target may overshoot; the whole wallet can still balance
                Err(Error::InsufficientFunds { .. }) => self.selector.select_all(available)?,
                Err(e) => return Err(e),
            };

            match self.balance(&selection, &recipient, change_address, aux_bytes.as_deref())? {
                Balance::Done {
                    outputs,
                    fee,
                    change_index,
                } => {
                    let draft = TransactionDraft {
                        inputs: selection.inputs,
                        outputs,
                        fee,
                        change_index,
                        auxiliary_data,
                    };
                    return self.finish(draft);
                }
                Balance::Short { required } => {
                    if selection.exhausted {
                        return Err(Error::InsufficientFunds {
                            required,
                            available: selection.total_value,
                        });
                    }
                    tracing::debug!(
                        "Round {}: {} lovelace selected, {} required; selecting more",
                        round,
                        selection.total_value,
                        required
                    );
                    target = required;
                }
            }
        }

        Err(Error::TransactionBuild(format!(
            "Could not balance transaction after {} selection rounds",
            rounds
        )))
    }

    /// Fee for spending `inputs` into a single `recipient` output
    pub fn minimum_fee(
        &self,
        inputs: &[UnspentOutput],
        recipient: &TxOutput,
        memo: Option<&Memo>,
    ) -> Result<u64> {
        let aux_bytes = memo
            .map(|m| AuxiliaryData::new(self.metadata_label, m.clone()).to_bytes())
            .transpose()?;
        let (_, fee) = self
            .settle_fee(inputs, recipient, None, 0, aux_bytes.as_deref())?
            .ok_or_else(|| Error::TransactionBuild("fee did not settle".to_string()))?;
        Ok(fee)
    }

    fn check_address(&self, address: &Address, role: &str) -> Result<()> {
        if !address.kind().is_payment() {
            return Err(Error::Address(format!(
                "{} address is not a payment address",
                role
            )));
        }
        if address.network_id() != Some(self.network.network_id) {
            return Err(Error::Address(format!(
                "{} address is not on {}",
                role, self.network.name
            )));
        }
        Ok(())
    }

    fn balance(
        &self,
        selection: &SelectionResult,
        recipient: &TxOutput,
        change_address: &Address,
        aux_bytes: Option<&[u8]>,
    ) -> Result<Balance> {
        let total_in = selection.total_value;
        let mut assets = MultiAsset::new();
        for utxo in &selection.inputs {
            merge_assets(&mut assets, &utxo.value.assets)?;
        }

        let (single, fee_no_change) = self
            .settle_fee(&selection.inputs, recipient, None, total_in, aux_bytes)?
            .ok_or_else(|| Error::TransactionBuild("fee did not settle".to_string()))?;
        let required = recipient
            .coin
            .checked_add(fee_no_change)
            .ok_or_else(|| Error::AmountOverflow("Payment plus fee overflow".to_string()))?;
        if total_in < required {
            tracing::debug!(
                "Inputs of {} lovelace do not cover {} lovelace",
                total_in,
                required
            );
            return Ok(Balance::Short { required });
        }

        let change = TxOutput::with_assets(change_address.clone(), total_in, assets);
        let min_change = min_output_value(&self.params, change.encoded_len()?)?;
        let settled = self.settle_fee(
            &selection.inputs,
            recipient,
            Some(&change),
            total_in,
            aux_bytes,
        )?;

        let fee_with_change = match settled {
            Some((outputs, fee)) => {
                if outputs[1].coin >= min_change {
                    return Ok(Balance::Done {
                        outputs,
                        fee,
                        change_index: Some(1),
                    });
                }
                tracing::debug!(
                    "Change of {} lovelace is below the minimum output of {}",
                    outputs[1].coin,
                    min_change
                );
                fee
            }
            None => fee_no_change.saturating_add(
                self.fee_rule
                    .coefficient
                    .saturating_mul(change.encoded_len()? as u64),
            ),
        };

        let leftover = total_in - required;
        if change.assets.is_empty() && (leftover == 0 || selection.exhausted) {
            if leftover > 0 {
                tracing::debug!("Folding {} lovelace of change into the fee", leftover);
            }
            return Ok(Balance::Done {
                outputs: single,
                fee: fee_no_change + leftover,
                change_index: None,
            });
        }

        // a change output is needed: select enough to make it spendable
        let required = recipient
            .coin
            .checked_add(fee_with_change)
            .and_then(|sum| sum.checked_add(min_change))
            .ok_or_else(|| Error::AmountOverflow("Payment plus change overflow".to_string()))?
            .max(total_in.saturating_add(1));
        Ok(Balance::Short { required })
    }

    /// Smallest fee that covers the transaction's own size.
    ///
    /// With a change output the change absorbs the fee, so the outputs are
    /// rebuilt each iteration; the template's address and assets are kept.
    /// Returns `None` when the inputs cannot fund a change output at all.
    fn settle_fee(
        &self,
        inputs: &[UnspentOutput],
        recipient: &TxOutput,
        change: Option<&TxOutput>,
        total_in: u64,
        aux_bytes: Option<&[u8]>,
    ) -> Result<Option<(Vec<TxOutput>, u64)>> {
        let mut fee = self.fee_rule.constant;
        for _ in 0..MAX_FEE_ITERATIONS {
            let outputs = match change {
                None => vec![recipient.clone()],
                Some(template) => {
                    let coin = total_in
                        .checked_sub(recipient.coin)
                        .and_then(|rest| rest.checked_sub(fee));
                    match coin {
                        Some(coin) => vec![
                            recipient.clone(),
                            TxOutput::with_assets(template.address.clone(), coin, template.assets.clone()),
                        ],
                        None => return Ok(None),
                    }
                }
            };

            let body = encode_body(inputs, &outputs, fee, aux_bytes)?;
            let required = self
                .fee_rule
                .min_fee(signed_size(&body, inputs.len(), aux_bytes)?)?;
            if required <= fee {
                return Ok(Some((outputs, fee)));
            }
            fee = required;
        }
        Err(Error::TransactionBuild(format!(
            "Fee did not converge after {} iterations",
            MAX_FEE_ITERATIONS
        )))
    }

    fn finish(&self, draft: TransactionDraft) -> Result<TransactionDraft> {
        self.fee_rule.validate_fee(draft.fee)?;

        let recipient = &draft.outputs[0];
        let min_recipient = min_output_value(&self.params, recipient.encoded_len()?)?;
        if recipient.coin < min_recipient {
            return Err(Error::InvalidAmount(format!(
                "Amount {} ADA is below the minimum output of {} ADA",
                lovelace_to_ada(recipient.coin),
                lovelace_to_ada(min_recipient)
            )));
        }

        let size = draft.estimated_signed_size()?;
        let max = self.params.max_tx_size as usize;
        if size > max {
            return Err(Error::TransactionTooLarge { size, max });
        }

        let required_fee = self.fee_rule.min_fee(size)?;
        if draft.fee < required_fee {
            return Err(Error::TransactionBuild(format!(
                "Fee {} is below the {} required for {} bytes",
                draft.fee, required_fee, size
            )));
        }

        if let Some(change) = draft.change_output() {
            let min_change = min_output_value(&self.params, change.encoded_len()?)?;
            if change.coin < min_change {
                return Err(Error::TransactionBuild(format!(
                    "Change of {} lovelace is below the minimum output of {}",
                    change.coin, min_change
                )));
            }
        }

        if !draft.is_balanced() {
            return Err(Error::TransactionBuild(
                "inputs do not equal outputs plus fee".to_string(),
            ));
        }

        tracing::info!(
            "Built transaction: inputs={}, outputs={}, fee={}, change={}, size={}",
            draft.inputs.len(),
            draft.outputs.len(),
            draft.fee,
            draft.change_output().map(|o| o.coin).unwrap_or(0),
            size
        );

        Ok(draft)
    }
}
