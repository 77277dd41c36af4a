//! # Client Address Hashing
//!
//! One-way hashing of client network addresses for privacy-preserving
//! storage in rate-limit and audit records. Raw addresses never reach
//! storage.

use sha2::{Digest, Sha256};

/// Hash a client network address to a lowercase hex string.
///
/// The address is trimmed before hashing so `"10.0.0.1"` and `"10.0.0.1 "`
/// rate-limit together.
pub fn hash_address(address: &str) -> String {
    let digest = Sha256::digest(address.trim().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_64_hex_chars() {
        let h = hash_address("203.0.113.7");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn deterministic() {
        assert_eq!(hash_address("203.0.113.7"), hash_address("203.0.113.7"));
    }

    #[test]
    fn trims_before_hashing() {
        assert_eq!(hash_address(" 203.0.113.7 "), hash_address("203.0.113.7"));
    }

    #[test]
    fn different_addresses_differ() {
        assert_ne!(hash_address("203.0.113.7"), hash_address("203.0.113.8"));
    }

    #[test]
    fn output_does_not_contain_input() {
        let h = hash_address("203.0.113.7");
        assert!(!h.contains("203"));
    }
}
