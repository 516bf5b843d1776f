//! AES-CBC with PKCS#7 padding, authenticated with HMAC (encrypt-then-MAC).
//!
//! Layout of a cipher package:
//!
//! ```text
//! [ MAC | AD-length: 2 bytes BE | AD | IV: 16 bytes | ciphertext (padded) ]
//! ```
//!
//! The MAC covers every byte after the MAC field.  Decryption verifies it
//! before looking at any other field, so a tampered package never reaches
//! the padding check.
//!
//! The encryption key and the integrity key must be distinct and should be
//! rotated together.  The whole package is held in memory to compute the
//! MAC, so this is not meant for payloads that do not fit in RAM.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use zeroize::Zeroizing;

use super::padding::{pad, unpad};
use super::signature::MacAlgorithm;
use super::{
    fill_random, read_ad_block, write_ad_block, AesKeySize, Cryptor, AD_HEADER_LEN, MIN_KEY_LEN,
};
use crate::errors::{CryptStoreError, KeyRole, Result};

/// AES block size (and IV length) in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Encrypt-then-MAC cryptor over AES-CBC and HMAC.
pub struct CbcHmacCryptor {
    encryption_key: Zeroizing<Vec<u8>>,
    integrity_key: Zeroizing<Vec<u8>>,
    aes: AesKeySize,
    mac: MacAlgorithm,
}

impl CbcHmacCryptor {
    /// Validate both keys and build the cryptor.
    ///
    /// Both keys must be at least 16 bytes, the encryption key must be a
    /// valid AES key length, and the two keys must not be equal.
    pub fn new(encryption_key: &[u8], integrity_key: &[u8], mac: MacAlgorithm) -> Result<Self> {
        let aes = AesKeySize::for_key(encryption_key)?;
        if integrity_key.len() < MIN_KEY_LEN {
            return Err(CryptStoreError::KeyTooShort {
                role: KeyRole::Integrity,
                min: MIN_KEY_LEN,
                actual: integrity_key.len(),
            });
        }
        if encryption_key == integrity_key {
            return Err(CryptStoreError::KeysMustDiffer);
        }

        Ok(Self {
            encryption_key: Zeroizing::new(encryption_key.to_vec()),
            integrity_key: Zeroizing::new(integrity_key.to_vec()),
            aes,
            mac,
        })
    }

    fn mac_len(&self) -> usize {
        self.mac.output_len()
    }

    fn cbc_encrypt(&self, iv: &[u8], buf: &mut [u8]) -> Result<()> {
        match self.aes {
            AesKeySize::Aes128 => cbc_encrypt::<Aes128>(&self.encryption_key, iv, buf),
            AesKeySize::Aes192 => cbc_encrypt::<Aes192>(&self.encryption_key, iv, buf),
            AesKeySize::Aes256 => cbc_encrypt::<Aes256>(&self.encryption_key, iv, buf),
        }
    }

    fn cbc_decrypt(&self, iv: &[u8], buf: &mut [u8]) -> Result<()> {
        match self.aes {
            AesKeySize::Aes128 => cbc_decrypt::<Aes128>(&self.encryption_key, iv, buf),
            AesKeySize::Aes192 => cbc_decrypt::<Aes192>(&self.encryption_key, iv, buf),
            AesKeySize::Aes256 => cbc_decrypt::<Aes256>(&self.encryption_key, iv, buf),
        }
    }
}

impl Cryptor for CbcHmacCryptor {
    fn encrypt(&self, message: &[u8], additional_data: &[u8]) -> Result<Vec<u8>> {
        let mac_len = self.mac_len();
        let padding = pad(message.len(), BLOCK_SIZE)?;

        let mut iv = [0u8; BLOCK_SIZE];
        fill_random(&mut iv)?;

        let total = mac_len
            + AD_HEADER_LEN
            + additional_data.len()
            + BLOCK_SIZE
            + message.len()
            + padding.len();
        let mut package = Vec::with_capacity(total);

        // Reserve the MAC field; it is filled in once everything after it is final.
        package.resize(mac_len, 0);
        write_ad_block(&mut package, additional_data)?;
        package.extend_from_slice(&iv);

        let body_start = package.len();
        package.extend_from_slice(message);
        package.extend_from_slice(&padding);
        self.cbc_encrypt(&iv, &mut package[body_start..])?;

        let tag = self.mac.sign(&self.integrity_key, &package[mac_len..])?;
        package[..mac_len].copy_from_slice(&tag);

        Ok(package)
    }

    fn decrypt(&self, cipher_package: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let mac_len = self.mac_len();

        if cipher_package.len() < mac_len + BLOCK_SIZE {
            return Err(CryptStoreError::CipherTextInvalid);
        }
        if cipher_package.len() < mac_len + AD_HEADER_LEN + BLOCK_SIZE {
            return Err(CryptStoreError::CipherTextTooShort);
        }

        // Verify first: nothing below runs on unauthenticated bytes.
        let (tag, authenticated) = cipher_package.split_at(mac_len);
        self.mac
            .verify(tag, &self.integrity_key, authenticated)
            .map_err(|_| CryptStoreError::IntegrityCompromised)?;

        let (additional_data, rest) = read_ad_block(authenticated)?;
        if rest.len() < BLOCK_SIZE {
            return Err(CryptStoreError::CipherTextTooShort);
        }
        let (iv, ciphertext) = rest.split_at(BLOCK_SIZE);
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptStoreError::CipherTextInvalid);
        }

        let mut plaintext = ciphertext.to_vec();
        self.cbc_decrypt(iv, &mut plaintext)?;
        let message_len = unpad(&plaintext)?;
        plaintext.truncate(message_len);

        Ok((plaintext, additional_data.to_vec()))
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let len = buf.len();
    cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptStoreError::UnsupportedKeyLength {
            role: KeyRole::Encryption,
            len: key.len(),
        })?
        .encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|_| CryptStoreError::PaddingInvalid)?;
    Ok(())
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptStoreError::UnsupportedKeyLength {
            role: KeyRole::Encryption,
            len: key.len(),
        })?
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| CryptStoreError::CipherTextInvalid)?;
    Ok(())
}
