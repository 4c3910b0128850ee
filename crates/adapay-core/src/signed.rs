//! Signed transaction reassembly
//!
//! The signer only ever sees the body with an empty witness set. Its
//! witness set is combined with the original body bytes and the metadata
//! withheld during signing, then the result is decoded again and checked
//! against the draft before anything is submitted.

use crate::hash::{blake2b_256, HASH_LEN};
use crate::memo::AuxiliaryData;
use crate::transaction::TransactionDraft;
use crate::{Error, Result};
use minicbor::data::{Tag, Type};
use minicbor::Decoder;

const TX_ARRAY_HEADER: u8 = 0x84;
const CBOR_FALSE: u8 = 0xf4;
const CBOR_TRUE: u8 = 0xf5;
const CBOR_NULL: u8 = 0xf6;

const SET_TAG: u64 = 258;
const VKEY_WITNESS_KEY: u64 = 0;
const AUX_HASH_KEY: u64 = 7;

/// `[body, witness_set, is_valid, auxiliary_data | null]`, with each part
/// copied verbatim so the body hash is preserved
pub(crate) fn transaction_bytes(
    body: &[u8],
    witness_set: &[u8],
    is_valid: bool,
    auxiliary_data: Option<&[u8]>,
) -> Vec<u8> {
    let aux_len = auxiliary_data.map_or(1, |a| a.len());
    let mut out = Vec::with_capacity(3 + body.len() + witness_set.len() + aux_len);
    out.push(TX_ARRAY_HEADER);
    out.extend_from_slice(body);
    out.extend_from_slice(witness_set);
    out.push(if is_valid { CBOR_TRUE } else { CBOR_FALSE });
    match auxiliary_data {
        Some(aux) => out.extend_from_slice(aux),
        None => out.push(CBOR_NULL),
    }
    out
}

/// Fully assembled transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    body: Vec<u8>,
    witness_set: Vec<u8>,
    is_valid: bool,
    auxiliary_data: Option<Vec<u8>>,
}

impl SignedTransaction {
    /// Combine `draft` with the witness set a signer returned.
    ///
    /// A witness set that is not a CBOR map with at least one key witness
    /// is reported as a provider fault.
    pub fn assemble(draft: &TransactionDraft, witness_set_hex: &str) -> Result<Self> {
        let witness_set = hex::decode(witness_set_hex.trim()).map_err(|e| {
            Error::UnknownProvider(format!("witness set is not hex: {}", e))
        })?;
        let count = count_vkey_witnesses(&witness_set)
            .map_err(|e| Error::UnknownProvider(format!("malformed witness set: {}", e)))?;
        if count == 0 {
            return Err(Error::UnknownProvider(
                "witness set contains no signatures".to_string(),
            ));
        }

        tracing::debug!("Assembling transaction with {} key witnesses", count);

        Ok(Self {
            body: draft.body_bytes()?,
            witness_set,
            is_valid: true,
            auxiliary_data: draft.auxiliary_bytes()?,
        })
    }

    /// Build from already-serialized parts
    pub fn from_raw_parts(
        body: Vec<u8>,
        witness_set: Vec<u8>,
        is_valid: bool,
        auxiliary_data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            body,
            witness_set,
            is_valid,
            auxiliary_data,
        }
    }

    /// Split serialized transaction bytes into their parts
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut d = Decoder::new(bytes);
        if d.array()? != Some(4) {
            return Err(Error::Decode("transaction must be a 4-element array".to_string()));
        }

        let start = d.position();
        d.skip()?;
        let body = bytes[start..d.position()].to_vec();

        let start = d.position();
        d.skip()?;
        let witness_set = bytes[start..d.position()].to_vec();

        let is_valid = d.bool()?;

        let auxiliary_data = if d.datatype()? == Type::Null {
            d.null()?;
            None
        } else {
            let start = d.position();
            d.skip()?;
            Some(bytes[start..d.position()].to_vec())
        };

        if d.position() != bytes.len() {
            return Err(Error::Decode("trailing bytes after transaction".to_string()));
        }

        Ok(Self {
            body,
            witness_set,
            is_valid,
            auxiliary_data,
        })
    }

    /// Serialized transaction
    pub fn to_bytes(&self) -> Vec<u8> {
        transaction_bytes(
            &self.body,
            &self.witness_set,
            self.is_valid,
            self.auxiliary_data.as_deref(),
        )
    }

    /// Hex of [`SignedTransaction::to_bytes`]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Transaction id (hex blake2b-256 of the body)
    pub fn id(&self) -> String {
        hex::encode(blake2b_256(&self.body))
    }

    /// Body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Auxiliary data bytes
    pub fn auxiliary_data(&self) -> Option<&[u8]> {
        self.auxiliary_data.as_deref()
    }

    /// Memo stored under `label`, read back from the serialized transaction
    pub fn decode_memo(&self, label: u64) -> Result<Option<String>> {
        let reparsed = Self::from_bytes(&self.to_bytes())?;
        match reparsed.auxiliary_data {
            Some(aux) => AuxiliaryData::decode_memo(&aux, label),
            None => Ok(None),
        }
    }

    /// Check the assembled transaction against the draft it came from.
    ///
    /// The body must be unchanged, the metadata must be byte-identical to
    /// what was withheld during signing and match the hash committed in the
    /// body, and the memo must decode back to the original text.
    pub fn verify_against(&self, draft: &TransactionDraft) -> Result<()> {
        if self.body != draft.body_bytes()? {
            return Err(Error::Reassembly("transaction body changed".to_string()));
        }

        let reparsed = Self::from_bytes(&self.to_bytes())
            .map_err(|e| Error::Reassembly(format!("assembled bytes do not decode: {}", e)))?;
        let committed = committed_metadata_hash(&reparsed.body)?;

        match (draft.auxiliary_data(), reparsed.auxiliary_data.as_deref()) {
            (None, None) => {
                if committed.is_some() {
                    return Err(Error::Reassembly(
                        "body commits to metadata that is not attached".to_string(),
                    ));
                }
            }
            (Some(_), None) => {
                tracing::warn!("Metadata missing from assembled transaction");
                return Err(Error::Reassembly("metadata was dropped".to_string()));
            }
            (None, Some(_)) => {
                return Err(Error::Reassembly(
                    "unexpected metadata attached".to_string(),
                ));
            }
            (Some(original), Some(attached)) => {
                let expected = original.to_bytes()?;
                if attached != expected.as_slice() {
                    tracing::warn!("Metadata bytes differ from the withheld metadata");
                    return Err(Error::Reassembly("metadata was altered".to_string()));
                }
                if committed != Some(blake2b_256(attached)) {
                    return Err(Error::Reassembly(
                        "metadata hash does not match the body".to_string(),
                    ));
                }
                let memo = AuxiliaryData::decode_memo(attached, original.label())
                    .map_err(|e| Error::Reassembly(format!("metadata does not decode: {}", e)))?;
                if memo.as_deref() != Some(original.memo().as_str()) {
                    return Err(Error::Reassembly(
                        "memo does not match the original".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Metadata hash committed under body key 7
fn committed_metadata_hash(body: &[u8]) -> Result<Option<[u8; HASH_LEN]>> {
    let mut d = Decoder::new(body);
    let entries = d
        .map()?
        .ok_or_else(|| Error::Decode("indefinite-length body".to_string()))?;
    for _ in 0..entries {
        if d.u64()? == AUX_HASH_KEY {
            let hash = d.bytes()?;
            if hash.len() != HASH_LEN {
                return Err(Error::Decode("metadata hash has wrong length".to_string()));
            }
            let mut out = [0u8; HASH_LEN];
            out.copy_from_slice(hash);
            return Ok(Some(out));
        }
        d.skip()?;
    }
    Ok(None)
}

/// Number of key witnesses in a witness set map
fn count_vkey_witnesses(witness_set: &[u8]) -> Result<u64> {
    let mut d = Decoder::new(witness_set);
    let entries = d
        .map()?
        .ok_or_else(|| Error::Decode("indefinite-length witness set".to_string()))?;

    let mut count = 0;
    for _ in 0..entries {
        if d.u64()? != VKEY_WITNESS_KEY {
            d.skip()?;
            continue;
        }
        if d.datatype()? == Type::Tag {
            let tag = d.tag()?;
            if tag != Tag::new(SET_TAG) {
                return Err(Error::Decode(format!("unexpected tag {:?} on key witnesses", tag)));
            }
        }
        let witnesses = d
            .array()?
            .ok_or_else(|| Error::Decode("indefinite-length key witnesses".to_string()))?;
        for _ in 0..witnesses {
            d.skip()?;
        }
        count += witnesses;
    }

    if d.position() != witness_set.len() {
        return Err(Error::Decode("trailing bytes after witness set".to_string()));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_bytes_layout() {
        let bytes = transaction_bytes(&[0xa0], &[0xa0], true, None);
        assert_eq!(bytes, vec![0x84, 0xa0, 0xa0, 0xf5, 0xf6]);

        let parsed = SignedTransaction::from_bytes(&bytes).unwrap();
        assert!(parsed.auxiliary_data().is_none());
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn test_count_witnesses() {
        // {0: [[h'00', h'00']]}
        let single = hex::decode("a100818241004100").unwrap();
        assert_eq!(count_vkey_witnesses(&single).unwrap(), 1);
        // {0: 258([[h'00', h'00'], [h'00', h'00']])}
        let tagged = hex::decode("a100d901028282410041008241004100").unwrap();
        assert_eq!(count_vkey_witnesses(&tagged).unwrap(), 2);
        assert_eq!(count_vkey_witnesses(&[0xa0]).unwrap(), 0);
        assert!(count_vkey_witnesses(&[0x80]).is_err());
    }

    #[test]
    fn test_committed_hash_lookup() {
        // {2: 0, 7: h'00..00'}
        let mut body = hex::decode("a2020007").unwrap();
        body.extend_from_slice(&[0x58, 0x20]);
        body.extend_from_slice(&[0x11; 32]);
        assert_eq!(committed_metadata_hash(&body).unwrap(), Some([0x11; 32]));
        assert_eq!(committed_metadata_hash(&[0xa1, 0x02, 0x00]).unwrap(), None);
    }
}
