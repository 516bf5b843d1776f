//! Keyed-hash signatures (HMAC) with constant-time verification.
//!
//! The hash function is chosen at runtime through `MacAlgorithm`, so the
//! CBC-HMAC cryptor and the record signer can share one implementation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::errors::{CryptStoreError, Result};

/// Hash function used inside HMAC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl MacAlgorithm {
    /// Length of the tag this algorithm produces, in bytes.
    pub fn output_len(self) -> usize {
        match self {
            MacAlgorithm::Sha256 => 32,
            MacAlgorithm::Sha512 => 64,
        }
    }

    /// Compute the HMAC of `message` under `key`.
    pub fn sign(self, key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        match self {
            MacAlgorithm::Sha256 => hmac_tag::<Hmac<Sha256>>(key, message),
            MacAlgorithm::Sha512 => hmac_tag::<Hmac<Sha512>>(key, message),
        }
    }

    /// Recompute the tag over `message` and compare it to `expected`.
    ///
    /// The comparison runs in constant time regardless of where the first
    /// differing byte is.  A length mismatch also fails.
    pub fn verify(self, expected: &[u8], key: &[u8], message: &[u8]) -> Result<()> {
        let actual = self.sign(key, message)?;
        if bool::from(actual.ct_eq(expected)) {
            Ok(())
        } else {
            Err(CryptStoreError::SignatureInvalid)
        }
    }

    /// Like `sign`, but returns the tag as standard base64 text.
    pub fn sign_encoded(self, key: &[u8], message: &[u8]) -> Result<String> {
        Ok(BASE64.encode(self.sign(key, message)?))
    }

    /// Verify a base64 tag produced by `sign_encoded`.
    ///
    /// Compares the encoded forms so a malformed `expected` is simply a
    /// mismatch rather than a decode error.
    pub fn verify_encoded(self, expected: &str, key: &[u8], message: &[u8]) -> Result<()> {
        let actual = self.sign_encoded(key, message)?;
        if bool::from(actual.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(CryptStoreError::SignatureInvalid)
        }
    }
}

fn hmac_tag<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| CryptStoreError::HmacError(format!("invalid HMAC key: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"integrity-key-0123456789";

    #[test]
    fn sign_is_deterministic() {
        let a = MacAlgorithm::Sha256.sign(KEY, b"message").unwrap();
        let b = MacAlgorithm::Sha256.sign(KEY, b"message").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn sha512_tag_length() {
        let tag = MacAlgorithm::Sha512.sign(KEY, b"message").unwrap();
        assert_eq!(tag.len(), MacAlgorithm::Sha512.output_len());
    }

    #[test]
    fn verify_accepts_matching_tag() {
        let tag = MacAlgorithm::Sha256.sign(KEY, b"message").unwrap();
        assert!(MacAlgorithm::Sha256.verify(&tag, KEY, b"message").is_ok());
    }

    #[test]
    fn verify_rejects_other_message() {
        let tag = MacAlgorithm::Sha256.sign(KEY, b"message").unwrap();
        let result = MacAlgorithm::Sha256.verify(&tag, KEY, b"massage");
        assert!(matches!(result, Err(CryptStoreError::SignatureInvalid)));
    }

    #[test]
    fn verify_rejects_truncated_tag() {
        let tag = MacAlgorithm::Sha256.sign(KEY, b"message").unwrap();
        let result = MacAlgorithm::Sha256.verify(&tag[..31], KEY, b"message");
        assert!(matches!(result, Err(CryptStoreError::SignatureInvalid)));
    }

    #[test]
    fn verify_rejects_other_key() {
        let tag = MacAlgorithm::Sha256.sign(KEY, b"message").unwrap();
        let result = MacAlgorithm::Sha256.verify(&tag, b"another-key-0123456789", b"message");
        assert!(result.is_err());
    }

    #[test]
    fn encoded_roundtrip() {
        let tag = MacAlgorithm::Sha256.sign_encoded(KEY, b"payload").unwrap();
        assert!(MacAlgorithm::Sha256
            .verify_encoded(&tag, KEY, b"payload")
            .is_ok());
        assert!(MacAlgorithm::Sha256
            .verify_encoded("not-base64!", KEY, b"payload")
            .is_err());
    }
}
