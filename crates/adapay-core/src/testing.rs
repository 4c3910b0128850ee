//! Fixtures for tests in this and downstream crates

use crate::address::Address;
use crate::utxo::{OutputReference, UnspentOutput, Value};
use minicbor::Encoder;

/// Enterprise address (header type 6) with a repeated-byte key hash
pub fn enterprise_address(network_id: u8, fill: u8) -> Address {
    let mut bytes = vec![0x60 | (network_id & 0x0f)];
    bytes.extend_from_slice(&[fill; 28]);
    Address::from_bytes(bytes).expect("valid enterprise address")
}

/// Base address (header type 0) with repeated-byte credentials
pub fn base_address(network_id: u8, fill: u8) -> Address {
    let mut bytes = vec![network_id & 0x0f];
    bytes.extend_from_slice(&[fill; 56]);
    Address::from_bytes(bytes).expect("valid base address")
}

/// Pure-coin UTXO owned by `owner`
pub fn utxo(tag: u8, index: u32, coin: u64, owner: &Address) -> UnspentOutput {
    UnspentOutput::new(
        OutputReference::new([tag; 32], index),
        owner.clone(),
        Value::from_coin(coin),
    )
}

/// Hex of a witness set holding `count` zeroed key witnesses
pub fn witness_set_hex(count: usize) -> String {
    let mut e = Encoder::new(Vec::new());
    e.map(1).expect("encode").u8(0).expect("encode");
    e.array(count as u64).expect("encode");
    for _ in 0..count {
        e.array(2)
            .expect("encode")
            .bytes(&[0u8; 32])
            .expect("encode")
            .bytes(&[0u8; 64])
            .expect("encode");
    }
    hex::encode(e.into_writer())
}
