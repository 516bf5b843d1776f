//! Keyfile handling.
//!
//! A keyfile is 32 random bytes.  The first half is the encryption key and
//! the second half the integrity key, so one file is enough to drive the
//! CBC-HMAC cryptor and the record signer.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use super::fill_random;
use crate::errors::{CryptStoreError, Result};

/// Expected length of a keyfile in bytes (256 bits).
pub const KEYFILE_LEN: usize = 32;

/// Encryption and integrity keys loaded from a keyfile.
pub struct KeyMaterial {
    pub encryption_key: Zeroizing<Vec<u8>>,
    pub integrity_key: Zeroizing<Vec<u8>>,
}

impl KeyMaterial {
    /// Split raw keyfile bytes into the two keys.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYFILE_LEN {
            return Err(CryptStoreError::KeyfileError(format!(
                "keyfile must be exactly {} bytes, got {}",
                KEYFILE_LEN,
                bytes.len()
            )));
        }
        let (encryption, integrity) = bytes.split_at(KEYFILE_LEN / 2);
        Ok(Self {
            encryption_key: Zeroizing::new(encryption.to_vec()),
            integrity_key: Zeroizing::new(integrity.to_vec()),
        })
    }
}

/// Generate a new random keyfile and write it to `path`.
///
/// The file is written with restrictive permissions (owner-only read).
/// Refuses to overwrite an existing file.
pub fn generate_keyfile(path: &Path) -> Result<KeyMaterial> {
    if path.exists() {
        return Err(CryptStoreError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let mut keyfile = Zeroizing::new(vec![0u8; KEYFILE_LEN]);
    fill_random(&mut keyfile)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                CryptStoreError::KeyfileError(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, keyfile.as_slice())
        .map_err(|e| CryptStoreError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            CryptStoreError::KeyfileError(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    KeyMaterial::from_bytes(&keyfile)
}

/// Load a keyfile from disk and split it into its two keys.
pub fn load_keyfile(path: &Path) -> Result<KeyMaterial> {
    if !path.exists() {
        return Err(CryptStoreError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let data = Zeroizing::new(
        fs::read(path)
            .map_err(|e| CryptStoreError::KeyfileError(format!("failed to read keyfile: {e}")))?,
    );

    KeyMaterial::from_bytes(&data)
}
