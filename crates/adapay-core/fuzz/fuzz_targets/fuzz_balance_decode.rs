//! Fuzz test for balance decoding

#![no_main]

use adapay_core::decode_balance;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = decode_balance(s);
    }
});
