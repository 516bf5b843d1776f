//! Cryptographic primitives for CryptStore.
//!
//! This module provides:
//! - PKCS#7 padding (`padding`)
//! - HMAC signing and constant-time verification (`signature`)
//! - AES-CBC + HMAC encrypt-then-MAC (`cbc_hmac`)
//! - AES-GCM authenticated encryption (`gcm`)
//! - Keyfile generation and loading (`keyfile`)
//!
//! Both ciphers implement the `Cryptor` trait and produce self-describing
//! packages that carry their additional data behind a 2-byte big-endian
//! length header.

pub mod cbc_hmac;
pub mod gcm;
pub mod keyfile;
pub mod padding;
pub mod signature;

use rand::TryRngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{CryptStoreError, KeyRole, Result};

pub use cbc_hmac::CbcHmacCryptor;
pub use gcm::GcmCryptor;
pub use keyfile::{generate_keyfile, load_keyfile, KeyMaterial};
pub use signature::MacAlgorithm;

/// Minimum length of any encryption or integrity key, in bytes.
pub const MIN_KEY_LEN: usize = 16;

/// Size of the additional-data length header in a cipher package.
pub const AD_HEADER_LEN: usize = 2;

/// Largest additional-data block the 2-byte header can describe.
pub const MAX_AD_LEN: usize = u16::MAX as usize;

/// Authenticated encryption of a message plus additional data.
///
/// Key validation lives in each implementation's constructor, so a value
/// of this trait is always ready to use.
pub trait Cryptor {
    /// Seal `message`, binding `additional_data` to it, into a cipher package.
    fn encrypt(&self, message: &[u8], additional_data: &[u8]) -> Result<Vec<u8>>;

    /// Open a cipher package and return `(plaintext, additional_data)`.
    ///
    /// Nothing derived from the package is returned unless its integrity
    /// check passed.
    fn decrypt(&self, cipher_package: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;
}

/// Which authenticated-encryption construction a store uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CipherMode {
    #[default]
    CbcHmac,
    Gcm,
}

impl CipherMode {
    /// Build a cryptor of this kind.
    ///
    /// GCM ignores `integrity_key`; CBC-HMAC needs both keys and `mac`.
    pub fn cryptor(
        self,
        encryption_key: &[u8],
        integrity_key: &[u8],
        mac: MacAlgorithm,
    ) -> Result<Box<dyn Cryptor>> {
        Ok(match self {
            CipherMode::CbcHmac => Box::new(CbcHmacCryptor::new(encryption_key, integrity_key, mac)?),
            CipherMode::Gcm => Box::new(GcmCryptor::new(encryption_key)?),
        })
    }
}

/// AES flavour selected by the length of the encryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AesKeySize {
    Aes128,
    Aes192,
    Aes256,
}

impl AesKeySize {
    /// Validate an encryption key and pick the matching AES variant.
    pub(crate) fn for_key(key: &[u8]) -> Result<Self> {
        if key.len() < MIN_KEY_LEN {
            return Err(CryptStoreError::KeyTooShort {
                role: KeyRole::Encryption,
                min: MIN_KEY_LEN,
                actual: key.len(),
            });
        }
        match key.len() {
            16 => Ok(AesKeySize::Aes128),
            24 => Ok(AesKeySize::Aes192),
            32 => Ok(AesKeySize::Aes256),
            len => Err(CryptStoreError::UnsupportedKeyLength {
                role: KeyRole::Encryption,
                len,
            }),
        }
    }
}

/// Fill `buf` from the OS CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    rand::rngs::OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptStoreError::RandomnessUnavailable(e.to_string()))
}

/// Append `AD-length ‖ AD` to `out`.
pub(crate) fn write_ad_block(out: &mut Vec<u8>, additional_data: &[u8]) -> Result<()> {
    let len = u16::try_from(additional_data.len())
        .map_err(|_| CryptStoreError::AdditionalDataTooLarge(additional_data.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(additional_data);
    Ok(())
}

/// Split `AD-length ‖ AD ‖ rest` into `(AD, rest)`.
///
/// Fails with `CipherTextTooShort` when the header or the declared AD runs
/// past the end of `data`.
pub(crate) fn read_ad_block(data: &[u8]) -> Result<(&[u8], &[u8])> {
    if data.len() < AD_HEADER_LEN {
        return Err(CryptStoreError::CipherTextTooShort);
    }
    let (header, rest) = data.split_at(AD_HEADER_LEN);
    let ad_len = usize::from(u16::from_be_bytes([header[0], header[1]]));
    if rest.len() < ad_len {
        return Err(CryptStoreError::CipherTextTooShort);
    }
    Ok(rest.split_at(ad_len))
}
