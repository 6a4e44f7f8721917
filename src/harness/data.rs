//! Synthetic load data.

use rand::Rng;
use uuid::Uuid;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Value written by the load harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRecord {
    pub key: String,
    pub data: String,
}

impl SyntheticRecord {
    /// A record with a fresh random UUID key.
    pub fn with_random_key(data: &str) -> Self {
        Self {
            key: Uuid::new_v4().to_string(),
            data: data.to_string(),
        }
    }
}

/// Random payload of `len` ASCII letters.
pub fn random_payload(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

/// Approximate heap footprint of one record with a `chars`-long payload,
/// rounded down to 8-byte alignment.
pub fn estimated_footprint_bytes(chars: usize) -> u64 {
    8 * (((chars as u64 * 2) + 45) / 8)
}
