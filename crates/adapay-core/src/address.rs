//! Address decoding, normalization and per-network validation
//!
//! Cardano addresses travel in two forms: the raw header-prefixed bytes a
//! signing provider hands back as hex, and the canonical text form (bech32
//! for Shelley and reward addresses, base58 for Byron). [`AddressCodec`]
//! converts between them and enforces the configured network.

use crate::{Error, Result};
use adapay_params::Network;
use bech32::{Bech32, Hrp};
use std::fmt;

/// Shortest text address accepted for a payment
pub const MIN_ADDRESS_TEXT_LEN: usize = 50;

/// Longest text address accepted for a payment
pub const MAX_ADDRESS_TEXT_LEN: usize = 120;

const KEY_HASH_LEN: usize = 28;
const BASE_ADDRESS_LEN: usize = 1 + 2 * KEY_HASH_LEN;
const SINGLE_CREDENTIAL_LEN: usize = 1 + KEY_HASH_LEN;
const MAINNET_ID: u8 = 1;

/// Address family, from the high nibble of the header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Payment + stake credential (types 0-3)
    Base,
    /// Payment credential + chain pointer (types 4-5)
    Pointer,
    /// Payment credential only (types 6-7)
    Enterprise,
    /// Legacy bootstrap address (type 8)
    Byron,
    /// Stake credential only (types 14-15)
    Reward,
}

impl AddressKind {
    /// Whether coins can be sent to this kind of address
    pub fn is_payment(&self) -> bool {
        matches!(
            self,
            AddressKind::Base | AddressKind::Pointer | AddressKind::Enterprise
        )
    }
}

/// Raw address bytes with a checked header
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    bytes: Vec<u8>,
}

impl Address {
    /// Parse raw address bytes, checking header type and length
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = *bytes
            .first()
            .ok_or_else(|| Error::Address("empty address".to_string()))?;

        let expected_len_ok = match header >> 4 {
            0..=3 => bytes.len() == BASE_ADDRESS_LEN,
            // Three variable-length naturals follow the payment credential.
            4 | 5 => bytes.len() >= SINGLE_CREDENTIAL_LEN + 3,
            6 | 7 | 14 | 15 => bytes.len() == SINGLE_CREDENTIAL_LEN,
            // Byron addresses are a CBOR array; 0x82 is the only valid first byte.
            8 => header == 0x82 && bytes.len() > SINGLE_CREDENTIAL_LEN,
            other => {
                return Err(Error::Address(format!(
                    "unknown address header type {}",
                    other
                )))
            }
        };

        if !expected_len_ok {
            return Err(Error::Address(format!(
                "invalid length {} for address header {:#04x}",
                bytes.len(),
                header
            )));
        }

        Ok(Self { bytes })
    }

    /// Parse from a hex string of raw address bytes
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::Address(format!("invalid hex address: {}", e)))?;
        Self::from_bytes(bytes)
    }

    /// Parse from canonical text (bech32 or base58)
    pub fn from_text(text: &str) -> Result<Self> {
        if let Ok((hrp, data)) = bech32::decode(text) {
            let address = Self::from_bytes(data)?;
            let expected = address.bech32_hrp()?;
            if hrp.to_lowercase() != expected {
                return Err(Error::Address(format!(
                    "prefix '{}' does not match address header (expected '{}')",
                    hrp.to_lowercase(),
                    expected
                )));
            }
            return Ok(address);
        }

        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|_| Error::Address("not a bech32 or base58 address".to_string()))?;
        let address = Self::from_bytes(bytes)?;
        if address.kind() != AddressKind::Byron {
            return Err(Error::Address(
                "base58 text must encode a Byron address".to_string(),
            ));
        }
        Ok(address)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw bytes as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Header type (high nibble)
    pub fn header_type(&self) -> u8 {
        self.bytes[0] >> 4
    }

    /// Address family
    pub fn kind(&self) -> AddressKind {
        match self.header_type() {
            0..=3 => AddressKind::Base,
            4 | 5 => AddressKind::Pointer,
            6 | 7 => AddressKind::Enterprise,
            8 => AddressKind::Byron,
            _ => AddressKind::Reward,
        }
    }

    /// Network id from the header's low nibble; Byron addresses carry none
    pub fn network_id(&self) -> Option<u8> {
        match self.kind() {
            AddressKind::Byron => None,
            _ => Some(self.bytes[0] & 0x0f),
        }
    }

    /// Payment credential hash for Shelley payment addresses
    pub fn payment_credential(&self) -> Option<&[u8]> {
        if self.kind().is_payment() {
            Some(&self.bytes[1..SINGLE_CREDENTIAL_LEN])
        } else {
            None
        }
    }

    fn bech32_hrp(&self) -> Result<&'static str> {
        let mainnet = self.network_id() == Some(MAINNET_ID);
        match self.kind() {
            AddressKind::Base | AddressKind::Pointer | AddressKind::Enterprise => {
                Ok(if mainnet { "addr" } else { "addr_test" })
            }
            AddressKind::Reward => Ok(if mainnet { "stake" } else { "stake_test" }),
            AddressKind::Byron => Err(Error::Address(
                "Byron addresses have no bech32 form".to_string(),
            )),
        }
    }

    /// Canonical text form
    pub fn to_text(&self) -> Result<String> {
        if self.kind() == AddressKind::Byron {
            return Ok(bs58::encode(&self.bytes).into_string());
        }
        let hrp = Hrp::parse(self.bech32_hrp()?)
            .map_err(|e| Error::Address(format!("invalid prefix: {}", e)))?;
        bech32::encode::<Bech32>(hrp, &self.bytes)
            .map_err(|e| Error::Address(format!("bech32 encoding failed: {}", e)))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("kind", &self.kind())
            .field("hex", &abbreviate(&self.to_hex()))
            .finish()
    }
}

/// Shorten an address or hash for log lines and display
pub fn abbreviate(value: &str) -> String {
    const PREFIX: usize = 12;
    const SUFFIX: usize = 8;
    if value.len() <= PREFIX + SUFFIX + 3 || !value.is_ascii() {
        return value.to_string();
    }
    format!("{}...{}", &value[..PREFIX], &value[value.len() - SUFFIX..])
}

fn is_hex_encoded(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Address codec bound to the configured network
#[derive(Debug, Clone)]
pub struct AddressCodec {
    network: Network,
}

impl AddressCodec {
    /// Create a codec for the given network
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// Network this codec validates against
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Convert an address to its canonical text encoding.
    ///
    /// Hex-encoded binary addresses are rendered as bech32 (or base58 for
    /// Byron). Text addresses are checked and returned unchanged, so
    /// `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(address: &str) -> Result<String> {
        let trimmed = address.trim();
        if is_hex_encoded(trimmed) {
            return Address::from_hex(trimmed)?.to_text();
        }
        Address::from_text(trimmed)?;
        Ok(trimmed.to_string())
    }

    /// Decode an address in either form without any network check
    pub fn decode(address: &str) -> Result<Address> {
        let trimmed = address.trim();
        if is_hex_encoded(trimmed) {
            Address::from_hex(trimmed)
        } else {
            Address::from_text(trimmed)
        }
    }

    /// Whether `address` is a payment address on the configured network
    pub fn validate(&self, address: &str) -> bool {
        match self.parse_payment_address(address) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Address {} rejected: {}", abbreviate(address.trim()), e);
                false
            }
        }
    }

    /// Parse a payment address and enforce the configured network.
    ///
    /// Every check must pass: prefix, length window, checksum, header type
    /// and header network id. A parser failure is never downgraded to a
    /// pattern match.
    pub fn parse_payment_address(&self, address: &str) -> Result<Address> {
        let text = Self::normalize(address)?;

        let prefix = self.network.address_prefix();
        if !text.starts_with(&prefix) {
            return Err(Error::Address(format!(
                "address must start with '{}' on {}",
                prefix, self.network.name
            )));
        }

        if text.len() < MIN_ADDRESS_TEXT_LEN || text.len() > MAX_ADDRESS_TEXT_LEN {
            return Err(Error::Address(format!(
                "address length {} outside {}..={}",
                text.len(),
                MIN_ADDRESS_TEXT_LEN,
                MAX_ADDRESS_TEXT_LEN
            )));
        }

        let parsed = Address::from_text(&text)?;
        if !parsed.kind().is_payment() {
            return Err(Error::Address(format!(
                "{:?} addresses cannot receive payments",
                parsed.kind()
            )));
        }

        match parsed.network_id() {
            Some(id) if id == self.network.network_id => Ok(parsed),
            other => Err(Error::Address(format!(
                "address network id {:?} does not match {} (id {})",
                other, self.network.name, self.network.network_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enterprise_bytes(network_id: u8, fill: u8) -> Vec<u8> {
        let mut bytes = vec![0x60 | network_id];
        bytes.extend_from_slice(&[fill; KEY_HASH_LEN]);
        bytes
    }

    fn base_bytes(network_id: u8, fill: u8) -> Vec<u8> {
        let mut bytes = vec![network_id];
        bytes.extend_from_slice(&[fill; 2 * KEY_HASH_LEN]);
        bytes
    }

    #[test]
    fn test_hex_normalizes_to_bech32() {
        let hex_addr = hex::encode(base_bytes(0, 7));
        let text = AddressCodec::normalize(&hex_addr).unwrap();
        assert!(text.starts_with("addr_test1"));
        assert_eq!(AddressCodec::normalize(&text).unwrap(), text);
    }

    #[test]
    fn test_mainnet_header_uses_mainnet_prefix() {
        let text = Address::from_bytes(enterprise_bytes(1, 3))
            .unwrap()
            .to_text()
            .unwrap();
        assert!(text.starts_with("addr1"));
    }

    #[test]
    fn test_validate_enforces_network() {
        let preview = AddressCodec::new(Network::preview());
        let mainnet = AddressCodec::new(Network::mainnet());

        let test_addr = Address::from_bytes(base_bytes(0, 9)).unwrap().to_text().unwrap();
        let main_addr = Address::from_bytes(base_bytes(1, 9)).unwrap().to_text().unwrap();

        assert!(preview.validate(&test_addr));
        assert!(!preview.validate(&main_addr));
        assert!(mainnet.validate(&main_addr));
        assert!(!mainnet.validate(&test_addr));
    }

    #[test]
    fn test_corrupted_checksum_is_invalid() {
        let codec = AddressCodec::new(Network::preview());
        let text = Address::from_bytes(base_bytes(0, 4)).unwrap().to_text().unwrap();
        let mut chars: Vec<char> = text.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'q' { 'p' } else { 'q' };
        let corrupted: String = chars.into_iter().collect();

        assert!(!codec.validate(&corrupted));
    }

    #[test]
    fn test_pattern_only_match_is_rejected() {
        let codec = AddressCodec::new(Network::preview());
        let fake = format!("addr_test1{}", "q".repeat(60));
        assert!(!codec.validate(&fake));
    }

    #[test]
    fn test_reward_address_cannot_receive_payment() {
        let mut bytes = vec![0xe0];
        bytes.extend_from_slice(&[1u8; KEY_HASH_LEN]);
        let reward = Address::from_bytes(bytes).unwrap();
        let text = reward.to_text().unwrap();
        assert!(text.starts_with("stake_test1"));

        let codec = AddressCodec::new(Network::preview());
        assert!(!codec.validate(&text));
    }

    #[test]
    fn test_byron_roundtrip_through_base58() {
        let mut bytes = vec![0x82, 0xd8, 0x18];
        bytes.extend_from_slice(&[0x42; 40]);
        let hex_addr = hex::encode(&bytes);

        let text = AddressCodec::normalize(&hex_addr).unwrap();
        assert_eq!(AddressCodec::normalize(&text).unwrap(), text);
        assert_eq!(AddressCodec::decode(&text).unwrap().kind(), AddressKind::Byron);
    }

    #[test]
    fn test_invalid_encodings_error() {
        assert!(AddressCodec::normalize("").is_err());
        assert!(AddressCodec::normalize("zz").is_err());
        assert!(AddressCodec::normalize("9f00").is_err());
        assert!(Address::from_bytes(vec![0x61, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_unknown_network_id_normalizes_but_fails_validation() {
        let bytes = enterprise_bytes(3, 5);
        let text = AddressCodec::normalize(&hex::encode(&bytes)).unwrap();
        assert!(text.starts_with("addr_test1"));
        assert!(!AddressCodec::new(Network::preview()).validate(&text));
    }

    #[test]
    fn test_payment_credential() {
        let address = Address::from_bytes(base_bytes(0, 0xab)).unwrap();
        assert_eq!(address.payment_credential().unwrap(), &[0xab; KEY_HASH_LEN][..]);
    }

    #[test]
    fn test_abbreviate() {
        let long = "addr_test1qz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer";
        let short = abbreviate(long);
        assert!(short.starts_with("addr_test1qz"));
        assert!(short.contains("..."));
        assert_eq!(abbreviate("short"), "short");
    }
}
