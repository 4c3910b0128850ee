//! Fuzz test for address normalization
//!
//! Normalization must never panic and must be idempotent on success

#![no_main]

use adapay_core::AddressCodec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(normalized) = AddressCodec::normalize(s) {
            assert_eq!(AddressCodec::normalize(&normalized).ok(), Some(normalized));
        }
    }

    let _ = adapay_core::Address::from_bytes(data.to_vec());
});
