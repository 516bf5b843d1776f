//! PKCS#7 block padding.
//!
//! `pad` always adds between 1 and `block_size` bytes, so a message that
//! already fills whole blocks still gets a full extra block.  Every padding
//! byte holds the pad count, which is what `unpad` checks on the way out.

use crate::errors::{CryptStoreError, Result};

/// Build the padding for a message of `len` bytes.
///
/// `block_size` must be in `1..=255`; AES uses 16.
pub fn pad(len: usize, block_size: usize) -> Result<Vec<u8>> {
    let block = u8::try_from(block_size)
        .ok()
        .filter(|&b| b > 0)
        .ok_or_else(|| {
            CryptStoreError::InvalidState(format!("block size {block_size} is out of range"))
        })?;
    let count = block - (len % block_size) as u8;
    Ok(vec![count; usize::from(count)])
}

/// Return the plaintext length of `data` once its padding is stripped.
///
/// Fails with `EmptyInput` on an empty buffer and with `PaddingInvalid`
/// when the claimed pad count is zero, longer than the buffer, or any of
/// the trailing bytes disagrees with it.
pub fn unpad(data: &[u8]) -> Result<usize> {
    let last = *data.last().ok_or(CryptStoreError::EmptyInput)?;
    let count = usize::from(last);

    if count == 0 || count > data.len() {
        return Err(CryptStoreError::PaddingInvalid);
    }

    let start = data.len() - count;
    if data[start..].iter().any(|&b| b != last) {
        return Err(CryptStoreError::PaddingInvalid);
    }

    Ok(start)
}
