//! Ledger hashing

/// Length of a blake2b-256 digest
pub const HASH_LEN: usize = 32;

/// blake2b-256 digest, as used for transaction ids and metadata hashes
pub fn blake2b_256(data: &[u8]) -> [u8; HASH_LEN] {
    let hash = blake2b_simd::Params::new().hash_length(HASH_LEN).hash(data);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(hash.as_bytes());
    out
}
