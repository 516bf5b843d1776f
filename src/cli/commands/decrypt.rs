//! `cryptstore decrypt` — open a base64 cipher package.
//!
//! Nothing is printed unless the package authenticates.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cli::{arg_or_stdin, output, resolve_keys, store_options, Cli};
use crate::config::Settings;
use crate::errors::{CryptStoreError, Result};

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, settings: &Settings, package: Option<&str>, show_ad: bool) -> Result<()> {
    let keys = resolve_keys(cli)?;
    let encryption = keys.encryption().ok_or_else(|| {
        CryptStoreError::CommandFailed(
            "an encryption key is required: pass --encryption-key or use --keyfile".into(),
        )
    })?;
    let options = store_options(cli, settings);
    let integrity = keys.integrity.as_deref().map(Vec::as_slice).unwrap_or_default();

    let cryptor = options.cipher.cryptor(encryption, integrity, options.mac)?;
    let encoded = arg_or_stdin(package)?;
    let raw = BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptStoreError::MalformedInput(format!("cipher package: {e}")))?;

    let (plaintext, additional_data) = cryptor.decrypt(&raw)?;

    if show_ad {
        output::note(&format!(
            "additional data: {}",
            String::from_utf8_lossy(&additional_data)
        ));
    }
    let text = String::from_utf8(plaintext)
        .map_err(|_| CryptStoreError::MalformedInput("message is not valid UTF-8".into()))?;
    println!("{text}");
    Ok(())
}
