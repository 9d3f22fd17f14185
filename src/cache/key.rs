//! Key Codec Module
//!
//! Maps logical cache keys to physical keys the backing cache accepts.
//!
//! Keys are kept readable and prefix-preserving instead of being hashed
//! whole, because group removal matches on the physical key's prefix.

use sha2::{Digest, Sha256};

use crate::cache::{CACHE_KEY_MAX_LEN, HASH_SUFFIX_MAX_WIDTH};

// == Encode ==
/// Encodes a logical key into a physical cache key.
///
/// Keys of at most [`CACHE_KEY_MAX_LEN`] characters are only sanitized.
/// Longer keys keep their first [`CACHE_KEY_MAX_LEN`] characters and get a
/// decimal hash of the dropped remainder appended.
///
/// Two overlong keys sharing the same head whose remainders collide in the
/// 64-bit suffix hash map to the same physical key. That risk is accepted.
pub fn encode_key(logical: &str) -> String {
    match logical.char_indices().nth(CACHE_KEY_MAX_LEN) {
        None => sanitize(logical),
        Some((split, _)) => {
            let (head, tail) = logical.split_at(split);
            let mut key = sanitize(head);
            key.push_str(&suffix_hash(tail).to_string());
            debug_assert!(key.chars().count() <= CACHE_KEY_MAX_LEN + HASH_SUFFIX_MAX_WIDTH);
            key
        }
    }
}

// == Sanitize ==
/// Replaces every forbidden character with `'0'`, leaving the length intact.
pub fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if is_forbidden(c) { '0' } else { c })
        .collect()
}

/// Control characters (0x00-0x1F) and space are rejected by the cache.
pub fn is_forbidden(c: char) -> bool {
    c <= '\u{20}'
}

// Stable across processes and releases, unlike `DefaultHasher`.
fn suffix_hash(tail: &str) -> u64 {
    let digest = Sha256::digest(tail.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
