//! AES-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and puts it
//! at the front of the package.  The additional data is bound to the tag by
//! GCM itself and is also carried in the package, so `decrypt` can hand it
//! back without an out-of-band channel.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | AD-length: 2 bytes BE | AD | ciphertext + 16-byte tag ]

use aes::Aes192;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};

use super::{fill_random, read_ad_block, write_ad_block, AesKeySize, Cryptor, AD_HEADER_LEN};
use crate::errors::{CryptStoreError, KeyRole, Result};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Largest plaintext GCM can protect under one nonce (2^39 - 256 bits).
pub const MAX_MESSAGE_LEN: u64 = (1 << 36) - 32;

type Aes192Gcm = AesGcm<Aes192, U12>;

enum GcmCipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// AEAD cryptor over AES-GCM.
pub struct GcmCryptor {
    cipher: GcmCipher,
}

impl GcmCryptor {
    /// Build the cipher from the raw key bytes (16, 24 or 32 bytes).
    pub fn new(encryption_key: &[u8]) -> Result<Self> {
        let size = AesKeySize::for_key(encryption_key)?;
        let invalid = |_| CryptStoreError::UnsupportedKeyLength {
            role: KeyRole::Encryption,
            len: encryption_key.len(),
        };

        let cipher = match size {
            AesKeySize::Aes128 => {
                GcmCipher::Aes128(Aes128Gcm::new_from_slice(encryption_key).map_err(invalid)?)
            }
            AesKeySize::Aes192 => {
                GcmCipher::Aes192(Aes192Gcm::new_from_slice(encryption_key).map_err(invalid)?)
            }
            AesKeySize::Aes256 => {
                GcmCipher::Aes256(Aes256Gcm::new_from_slice(encryption_key).map_err(invalid)?)
            }
        };

        Ok(Self { cipher })
    }

    fn seal(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg, aad };
        let sealed = match &self.cipher {
            GcmCipher::Aes128(c) => c.encrypt(nonce.into(), payload),
            GcmCipher::Aes192(c) => c.encrypt(nonce.into(), payload),
            GcmCipher::Aes256(c) => c.encrypt(nonce.into(), payload),
        };
        sealed.map_err(|_| CryptStoreError::MessageTooLarge {
            len: msg.len() as u64,
            max: MAX_MESSAGE_LEN,
        })
    }

    fn open(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg, aad };
        let opened = match &self.cipher {
            GcmCipher::Aes128(c) => c.decrypt(nonce.into(), payload),
            GcmCipher::Aes192(c) => c.decrypt(nonce.into(), payload),
            GcmCipher::Aes256(c) => c.decrypt(nonce.into(), payload),
        };
        opened.map_err(|_| CryptStoreError::IntegrityCompromised)
    }
}

impl Cryptor for GcmCryptor {
    fn encrypt(&self, message: &[u8], additional_data: &[u8]) -> Result<Vec<u8>> {
        if message.len() as u64 > MAX_MESSAGE_LEN {
            return Err(CryptStoreError::MessageTooLarge {
                len: message.len() as u64,
                max: MAX_MESSAGE_LEN,
            });
        }

        let mut nonce = [0u8; NONCE_LEN];
        fill_random(&mut nonce)?;

        let mut package = Vec::with_capacity(
            NONCE_LEN + AD_HEADER_LEN + additional_data.len() + message.len() + TAG_LEN,
        );
        package.extend_from_slice(&nonce);
        write_ad_block(&mut package, additional_data)?;

        let sealed = self.seal(&nonce, message, additional_data)?;
        package.extend_from_slice(&sealed);
        Ok(package)
    }

    fn decrypt(&self, cipher_package: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        if cipher_package.len() < NONCE_LEN + AD_HEADER_LEN {
            return Err(CryptStoreError::CipherTextTooShort);
        }

        let (nonce, rest) = cipher_package.split_at(NONCE_LEN);
        let (additional_data, sealed) = read_ad_block(rest)?;

        let plaintext = self.open(nonce, sealed, additional_data)?;
        Ok((plaintext, additional_data.to_vec()))
    }
}
