//! Keccak-256 digest, reserved for EVM-adjacent proof data.
//!
//! Every internal commitment (Merkle leaves/roots, operation IDs, the
//! custody chain) uses [`crate::Hash`] (SHA-256). This type exists only for
//! data that crosses into an EVM contract's own hashing convention — e.g.
//! encoding a governance proof field the way the target contract will
//! re-derive it on-chain. Do not use this for anything internal.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeccakHash([u8; 32]);

impl KeccakHash {
    /// Zero digest.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Digest of `bytes` under Keccak-256.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Wrap raw digest bytes without hashing.
    ///
    /// # Panics
    /// Panics if `bytes` is not exactly 32 bytes.
    pub fn from_digest_bytes(bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), 32, "KeccakHash must be exactly 32 bytes");
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Bytes as a fixed-size array reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding, `0x`-prefixed to match EVM convention.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for KeccakHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeccakHash({})", self.to_hex())
    }
}

impl fmt::Display for KeccakHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(
            KeccakHash::from_bytes(b"governance"),
            KeccakHash::from_bytes(b"governance")
        );
    }

    #[test]
    fn differs_from_sha256() {
        // Sanity check this is genuinely a different primitive from crate::Hash.
        let keccak = KeccakHash::from_bytes(b"abc");
        let sha256 = crate::Hash::from_bytes(b"abc");
        assert_ne!(keccak.as_bytes(), sha256.as_bytes());
    }

    #[test]
    fn hex_prefixed() {
        assert!(KeccakHash::ZERO.to_hex().starts_with("0x"));
        assert_eq!(KeccakHash::ZERO.to_hex().len(), 66);
    }
}
