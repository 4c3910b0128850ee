//! Fuzz test for memo parsing
//!
//! Covers memo validation and metadata decoding of arbitrary bytes

#![no_main]

use adapay_core::{AuxiliaryData, Memo, DEFAULT_METADATA_LABEL};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(memo) = Memo::new(s) {
            let aux = AuxiliaryData::new(DEFAULT_METADATA_LABEL, memo.clone());
            let bytes = aux.to_bytes().expect("memo encodes");
            let decoded = AuxiliaryData::decode_memo(&bytes, DEFAULT_METADATA_LABEL)
                .expect("memo decodes");
            assert_eq!(decoded.as_deref(), Some(memo.as_str()));
        }
    }

    let _ = AuxiliaryData::decode_memo(data, DEFAULT_METADATA_LABEL);
});
