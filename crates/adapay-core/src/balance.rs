//! Balance decoding
//!
//! Providers report balances as a decimal string, a bare hex integer, or a
//! hex-encoded CBOR value (a uint, or `[coin, multiasset]`). The encoding is
//! classified first and then parsed; nothing falls through to a default.
//!
//! Precedence, first match wins:
//! 1. `0x` prefix: hex
//! 2. digits only: CBOR when the string is a canonical length-prefixed CBOR
//!    uint (`18xx` with xx >= 24, `19xxxx` with xxxx >= 0x100), else decimal
//! 3. other hex digits: CBOR when the bytes form one complete CBOR value, else hex

use crate::{Error, Result};
use minicbor::data::Type;
use minicbor::Decoder;

/// Wire encoding of a balance string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEncoding {
    /// Plain base-10 digits
    Decimal,
    /// Big-endian hex integer, optionally `0x`-prefixed
    Hex,
    /// Hex-encoded CBOR value
    Cbor,
}

impl BalanceEncoding {
    /// Classify a raw balance string
    pub fn classify(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(Error::BalanceDecode("balance is empty".to_string()));
        }

        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Ok(BalanceEncoding::Hex);
            }
            return Err(Error::BalanceDecode(format!("'{}' is not valid hex", s)));
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            if is_prefixed_cbor_uint(s) {
                return Ok(BalanceEncoding::Cbor);
            }
            return Ok(BalanceEncoding::Decimal);
        }

        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::BalanceDecode(format!(
                "'{}' is not a decimal, hex or CBOR balance",
                s
            )));
        }

        if s.len() % 2 == 0 {
            if let Ok(bytes) = hex::decode(s) {
                if decode_cbor_coin(&bytes).is_ok() {
                    return Ok(BalanceEncoding::Cbor);
                }
            }
        }
        Ok(BalanceEncoding::Hex)
    }
}

/// Decoded balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    /// Lovelace
    pub lovelace: u64,
    /// Encoding the value arrived in
    pub encoding: BalanceEncoding,
}

/// Classify and parse a provider balance string
pub fn decode_balance(raw: &str) -> Result<Balance> {
    let encoding = BalanceEncoding::classify(raw)?;
    let s = raw.trim();

    let lovelace = match encoding {
        BalanceEncoding::Decimal => s
            .parse::<u64>()
            .map_err(|e| Error::BalanceDecode(format!("decimal balance: {}", e)))?,
        BalanceEncoding::Hex => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u64::from_str_radix(digits, 16)
                .map_err(|e| Error::BalanceDecode(format!("hex balance: {}", e)))?
        }
        BalanceEncoding::Cbor => {
            let bytes = hex::decode(s)
                .map_err(|e| Error::BalanceDecode(format!("CBOR balance: {}", e)))?;
            decode_cbor_coin(&bytes)?
        }
    };

    tracing::debug!("Decoded balance {} lovelace from {:?}", lovelace, encoding);

    Ok(Balance { lovelace, encoding })
}

/// Canonical one- or two-byte CBOR uint behind a 0x18/0x19 header.
/// Wider headers (0x1a, 0x1b) always contain hex letters.
fn is_prefixed_cbor_uint(s: &str) -> bool {
    let Ok(bytes) = hex::decode(s) else {
        return false;
    };
    match bytes.as_slice() {
        [0x18, value] => *value >= 24,
        [0x19, high, low] => u16::from_be_bytes([*high, *low]) > u8::MAX as u16,
        _ => false,
    }
}

/// Coin from a complete CBOR uint or `[coin, multiasset]`
fn decode_cbor_coin(bytes: &[u8]) -> Result<u64> {
    let mut d = Decoder::new(bytes);
    let coin = match d.datatype()? {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => d.u64()?,
        Type::Array => {
            if d.array()? != Some(2) {
                return Err(Error::BalanceDecode(
                    "CBOR value must be [coin, multiasset]".to_string(),
                ));
            }
            let coin = d.u64()?;
            if !matches!(d.datatype()?, Type::Map | Type::MapIndef) {
                return Err(Error::BalanceDecode(
                    "CBOR value must be [coin, multiasset]".to_string(),
                ));
            }
            d.skip()?;
            coin
        }
        other => {
            return Err(Error::BalanceDecode(format!(
                "CBOR balance has unexpected type {}",
                other
            )))
        }
    };

    if d.position() != bytes.len() {
        return Err(Error::BalanceDecode(
            "trailing bytes after CBOR balance".to_string(),
        ));
    }
    Ok(coin)
}
