//! Fuzz test for provider UTXO decoding

#![no_main]

use adapay_core::UnspentOutput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = UnspentOutput::from_cbor(data);
});
