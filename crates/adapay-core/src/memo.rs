//! Memo handling and transaction metadata
//!
//! A memo is short user text carried on-chain as auxiliary data under a
//! single metadata label (674 by default). Text longer than the ledger's
//! per-string limit is split into a list of chunks on character boundaries.

use crate::hash::{blake2b_256, HASH_LEN};
use crate::{Error, Result};
use adapay_params::LedgerLimits;
use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

/// Maximum memo length in characters
pub const MAX_MEMO_CHARS: usize = 100;

/// Well-known metadata label for transaction messages
pub const DEFAULT_METADATA_LABEL: u64 = 674;

/// Tag wrapping the Alonzo-era auxiliary data map
const ALONZO_AUX_TAG: u64 = 259;

/// Validated memo text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo(String);

impl Memo {
    /// Create a memo with the default character limit
    pub fn new(text: &str) -> Result<Self> {
        Self::with_limit(text, MAX_MEMO_CHARS)
    }

    /// Create a memo, rejecting empty text, control characters and text
    /// longer than `max_chars` characters
    pub fn with_limit(text: &str, max_chars: usize) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::InvalidMetadata("Memo is empty".to_string()));
        }

        if !Self::is_valid_memo_text(text) {
            return Err(Error::InvalidMetadata(
                "Memo contains invalid characters (control characters not allowed)".to_string(),
            ));
        }

        let chars = text.chars().count();
        if chars > max_chars {
            return Err(Error::InvalidMetadata(format!(
                "Memo is {} characters, maximum is {}",
                chars, max_chars
            )));
        }

        Ok(Self(text.to_string()))
    }

    /// Allows printable text plus newline, tab and carriage return
    fn is_valid_memo_text(text: &str) -> bool {
        text.chars()
            .all(|c| c == '\n' || c == '\t' || c == '\r' || !c.is_control())
    }

    /// Memo text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// Length in UTF-8 bytes
    pub fn byte_len(&self) -> usize {
        self.0.len()
    }

    /// Split into pieces of at most `max_bytes`, never inside a character
    pub fn chunks(&self, max_bytes: usize) -> Vec<&str> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut end = 0;
        for (offset, c) in self.0.char_indices() {
            let next = offset + c.len_utf8();
            if next - start > max_bytes {
                chunks.push(&self.0[start..end]);
                start = end;
            }
            end = next;
        }
        if start < end {
            chunks.push(&self.0[start..end]);
        }
        chunks
    }
}

/// Auxiliary data carrying a memo under one metadata label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryData {
    label: u64,
    memo: Memo,
}

impl AuxiliaryData {
    /// Attach `memo` under `label`
    pub fn new(label: u64, memo: Memo) -> Self {
        Self { label, memo }
    }

    /// Metadata label
    pub fn label(&self) -> u64 {
        self.label
    }

    /// Attached memo
    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    /// Serialize as a Shelley metadata map `{label: text | [text]}`
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let max = LedgerLimits::standard().metadata_text_max_bytes;
        let chunks = self.memo.chunks(max);

        let mut e = Encoder::new(Vec::new());
        e.map(1)?.u64(self.label)?;
        if chunks.len() == 1 {
            e.str(chunks[0])?;
        } else {
            e.array(chunks.len() as u64)?;
            for chunk in chunks {
                e.str(chunk)?;
            }
        }
        Ok(e.into_writer())
    }

    /// Hash committed in the transaction body
    pub fn hash(&self) -> Result<[u8; HASH_LEN]> {
        Ok(blake2b_256(&self.to_bytes()?))
    }

    /// Read the text stored under `label` from serialized auxiliary data.
    ///
    /// Accepts the plain metadata map, the `[metadata, scripts]` array form
    /// and the tagged map form. Returns `None` when the label is absent.
    pub fn decode_memo(bytes: &[u8], label: u64) -> Result<Option<String>> {
        let mut d = Decoder::new(bytes);

        match d.datatype()? {
            Type::Map => {}
            Type::Array => {
                d.array()?;
            }
            Type::Tag => {
                let tag = d.tag()?;
                if tag != Tag::new(ALONZO_AUX_TAG) {
                    return Err(Error::InvalidMetadata(format!(
                        "unexpected auxiliary data tag {:?}",
                        tag
                    )));
                }
                let entries = definite(d.map()?)?;
                let mut found = false;
                for _ in 0..entries {
                    if d.u64()? == 0 {
                        found = true;
                        break;
                    }
                    d.skip()?;
                }
                if !found {
                    return Ok(None);
                }
            }
            other => {
                return Err(Error::InvalidMetadata(format!(
                    "auxiliary data has unexpected type {}",
                    other
                )))
            }
        }

        let entries = definite(d.map()?)?;
        for _ in 0..entries {
            let key = d.u64()?;
            if key != label {
                d.skip()?;
                continue;
            }
            return decode_text_metadatum(&mut d).map(Some);
        }
        Ok(None)
    }
}

fn definite(len: Option<u64>) -> Result<u64> {
    len.ok_or_else(|| Error::Decode("indefinite-length metadata is not supported".to_string()))
}

fn decode_text_metadatum(d: &mut Decoder<'_>) -> Result<String> {
    match d.datatype()? {
        Type::String => Ok(d.str()?.to_string()),
        Type::Array => {
            let parts = definite(d.array()?)?;
            let mut text = String::new();
            for _ in 0..parts {
                text.push_str(d.str()?);
            }
            Ok(text)
        }
        other => Err(Error::InvalidMetadata(format!(
            "memo metadatum has unexpected type {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_limits() {
        assert!(Memo::new("Thanks for lunch").is_ok());
        assert!(Memo::new(&"a".repeat(MAX_MEMO_CHARS)).is_ok());
        assert!(Memo::new(&"a".repeat(MAX_MEMO_CHARS + 1)).is_err());
        assert!(Memo::new("").is_err());
        assert!(Memo::new("bell\u{7}").is_err());
        assert!(Memo::new("line one\nline two").is_ok());
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_MEMO_CHARS);
        let memo = Memo::new(&text).unwrap();
        assert_eq!(memo.char_count(), MAX_MEMO_CHARS);
        assert_eq!(memo.byte_len(), 2 * MAX_MEMO_CHARS);
    }

    #[test]
    fn test_chunks_respect_char_boundaries() {
        let memo = Memo::new(&"€".repeat(30)).unwrap();
        let chunks = memo.chunks(64);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() <= 64));
        assert_eq!(chunks.concat(), memo.as_str());
    }

    #[test]
    fn test_short_memo_is_single_text() {
        let aux = AuxiliaryData::new(DEFAULT_METADATA_LABEL, Memo::new("hi").unwrap());
        let bytes = aux.to_bytes().unwrap();
        // {674: "hi"}
        assert_eq!(hex::encode(&bytes), "a11902a2626869");
        assert_eq!(
            AuxiliaryData::decode_memo(&bytes, DEFAULT_METADATA_LABEL).unwrap(),
            Some("hi".to_string())
        );
    }

    #[test]
    fn test_long_memo_roundtrips_through_chunks() {
        let text = "x".repeat(MAX_MEMO_CHARS);
        let aux = AuxiliaryData::new(DEFAULT_METADATA_LABEL, Memo::new(&text).unwrap());
        let bytes = aux.to_bytes().unwrap();
        assert_eq!(
            AuxiliaryData::decode_memo(&bytes, DEFAULT_METADATA_LABEL).unwrap(),
            Some(text)
        );
    }

    #[test]
    fn test_missing_label_is_none() {
        let aux = AuxiliaryData::new(1, Memo::new("other").unwrap());
        let bytes = aux.to_bytes().unwrap();
        assert_eq!(
            AuxiliaryData::decode_memo(&bytes, DEFAULT_METADATA_LABEL).unwrap(),
            None
        );
    }

    #[test]
    fn test_tagged_aux_form() {
        let mut e = Encoder::new(Vec::new());
        e.tag(Tag::new(259)).unwrap();
        e.map(1).unwrap().u64(0).unwrap();
        e.map(1).unwrap().u64(674).unwrap().str("tagged").unwrap();
        let bytes = e.into_writer();
        assert_eq!(
            AuxiliaryData::decode_memo(&bytes, 674).unwrap(),
            Some("tagged".to_string())
        );
    }

    #[test]
    fn test_hash_changes_with_text() {
        let a = AuxiliaryData::new(674, Memo::new("a").unwrap());
        let b = AuxiliaryData::new(674, Memo::new("b").unwrap());
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }
}
