//! Unspent outputs as returned by a signing provider
//!
//! Each entry is CBOR `[[tx_hash, index], output]`. The output is either the
//! legacy array form `[address, value, datum_hash?]` or the post-Alonzo map
//! form `{0: address, 1: value, 2: datum, 3: script_ref}`; the value is a
//! bare coin or `[coin, multiasset]`.

use crate::address::Address;
use crate::hash::HASH_LEN;
use crate::{Error, Result};
use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use std::collections::BTreeMap;
use std::fmt;

const POLICY_ID_LEN: usize = 28;

/// Reference to an output of a prior transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputReference {
    /// Hash of the transaction that created the output
    pub transaction_id: [u8; HASH_LEN],
    /// Position within that transaction's outputs
    pub index: u32,
}

impl OutputReference {
    /// Create an output reference
    pub fn new(transaction_id: [u8; HASH_LEN], index: u32) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

impl fmt::Display for OutputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", hex::encode(self.transaction_id), self.index)
    }
}

/// Native assets keyed by policy id, then asset name
pub type MultiAsset = BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, u64>>;

/// Coin plus any native assets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    /// Lovelace
    pub coin: u64,
    /// Native assets
    pub assets: MultiAsset,
}

impl Value {
    /// Pure-coin value
    pub fn from_coin(coin: u64) -> Self {
        Self {
            coin,
            assets: MultiAsset::new(),
        }
    }

    /// Whether any native asset is present
    pub fn has_assets(&self) -> bool {
        self.assets.values().any(|names| !names.is_empty())
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Self::from_coin(d.u64()?)),
            Type::Array => {
                expect_array(d, 2, "value")?;
                let coin = d.u64()?;
                let mut assets = MultiAsset::new();
                let policies = definite(d.map()?, "multiasset")?;
                for _ in 0..policies {
                    let policy = d.bytes()?;
                    if policy.len() != POLICY_ID_LEN {
                        return Err(Error::Decode(format!(
                            "policy id is {} bytes, expected {}",
                            policy.len(),
                            POLICY_ID_LEN
                        )));
                    }
                    let policy = policy.to_vec();
                    let names = definite(d.map()?, "asset map")?;
                    let mut entry = BTreeMap::new();
                    for _ in 0..names {
                        let name = d.bytes()?.to_vec();
                        entry.insert(name, d.u64()?);
                    }
                    assets.insert(policy, entry);
                }
                Ok(Self { coin, assets })
            }
            other => Err(Error::Decode(format!("value has unexpected type {}", other))),
        }
    }

    fn encode(&self, e: &mut Encoder<Vec<u8>>) -> Result<()> {
        encode_value(e, self.coin, &self.assets)
    }
}

/// `coin` alone, or `[coin, multiasset]` when assets are present
pub(crate) fn encode_value(e: &mut Encoder<Vec<u8>>, coin: u64, assets: &MultiAsset) -> Result<()> {
    if assets.is_empty() {
        e.u64(coin)?;
        return Ok(());
    }
    e.array(2)?.u64(coin)?;
    e.map(assets.len() as u64)?;
    for (policy, names) in assets {
        e.bytes(policy)?.map(names.len() as u64)?;
        for (name, quantity) in names {
            e.bytes(name)?.u64(*quantity)?;
        }
    }
    Ok(())
}

/// Add every quantity in `from` to `into`; zero quantities are dropped
pub fn merge_assets(into: &mut MultiAsset, from: &MultiAsset) -> Result<()> {
    for (policy, names) in from {
        for (name, quantity) in names {
            if *quantity == 0 {
                continue;
            }
            let entry = into
                .entry(policy.clone())
                .or_default()
                .entry(name.clone())
                .or_insert(0);
            *entry = entry
                .checked_add(*quantity)
                .ok_or_else(|| Error::AmountOverflow("asset quantity overflow".to_string()))?;
        }
    }
    Ok(())
}

/// A spendable output owned by the connected account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    /// Where the output lives
    pub input: OutputReference,
    /// Owning address
    pub address: Address,
    /// Locked value
    pub value: Value,
}

impl UnspentOutput {
    /// Create an unspent output
    pub fn new(input: OutputReference, address: Address, value: Value) -> Self {
        Self {
            input,
            address,
            value,
        }
    }

    /// Lovelace held by this output
    pub fn coin(&self) -> u64 {
        self.value.coin
    }

    /// Decode a hex-encoded provider entry
    pub fn decode_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())?;
        Self::from_cbor(&bytes)
    }

    /// Decode a CBOR provider entry
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let mut d = Decoder::new(bytes);
        expect_array(&mut d, 2, "unspent output")?;

        expect_array(&mut d, 2, "output reference")?;
        let hash = d.bytes()?;
        if hash.len() != HASH_LEN {
            return Err(Error::Decode(format!(
                "transaction hash is {} bytes, expected {}",
                hash.len(),
                HASH_LEN
            )));
        }
        let mut transaction_id = [0u8; HASH_LEN];
        transaction_id.copy_from_slice(hash);
        let index = d.u32()?;

        let (address, value) = decode_output(&mut d)?;

        if d.position() != bytes.len() {
            return Err(Error::Decode(format!(
                "{} trailing bytes after unspent output",
                bytes.len() - d.position()
            )));
        }

        Ok(Self {
            input: OutputReference::new(transaction_id, index),
            address,
            value,
        })
    }

    /// Encode in the provider's legacy array form
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut e = Encoder::new(Vec::new());
        e.array(2)?;
        e.array(2)?
            .bytes(&self.input.transaction_id)?
            .u32(self.input.index)?;
        e.array(2)?.bytes(self.address.as_bytes())?;
        self.value.encode(&mut e)?;
        Ok(e.into_writer())
    }

    /// Hex of [`UnspentOutput::to_cbor`]
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_cbor()?))
    }
}

fn decode_output(d: &mut Decoder<'_>) -> Result<(Address, Value)> {
    match d.datatype()? {
        Type::Array => {
            let len = definite(d.array()?, "output")?;
            if !(2..=3).contains(&len) {
                return Err(Error::Decode(format!("output array has {} fields", len)));
            }
            let address = Address::from_bytes(d.bytes()?.to_vec())?;
            let value = Value::decode(d)?;
            if len == 3 {
                d.skip()?;
            }
            Ok((address, value))
        }
        Type::Map => {
            let fields = definite(d.map()?, "output")?;
            let mut address = None;
            let mut value = None;
            for _ in 0..fields {
                match d.u64()? {
                    0 => address = Some(Address::from_bytes(d.bytes()?.to_vec())?),
                    1 => value = Some(Value::decode(d)?),
                    _ => {
                        d.skip()?;
                    }
                }
            }
            match (address, value) {
                (Some(address), Some(value)) => Ok((address, value)),
                _ => Err(Error::Decode(
                    "output map is missing address or value".to_string(),
                )),
            }
        }
        other => Err(Error::Decode(format!("output has unexpected type {}", other))),
    }
}

fn definite(len: Option<u64>, what: &str) -> Result<u64> {
    len.ok_or_else(|| Error::Decode(format!("indefinite-length {} is not supported", what)))
}

fn expect_array(d: &mut Decoder<'_>, expected: u64, what: &str) -> Result<()> {
    let len = definite(d.array()?, what)?;
    if len != expected {
        return Err(Error::Decode(format!(
            "{} has {} elements, expected {}",
            what, len, expected
        )));
    }
    Ok(())
}
