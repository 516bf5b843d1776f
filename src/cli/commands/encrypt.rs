//! `cryptstore encrypt` — seal a message with the configured cipher.
//!
//! Prints the cipher package as standard base64 on stdout.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cli::{arg_or_stdin, resolve_keys, store_options, Cli};
use crate::config::Settings;
use crate::errors::{CryptStoreError, Result};

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, settings: &Settings, message: Option<&str>, ad: &str) -> Result<()> {
    let keys = resolve_keys(cli)?;
    let encryption = keys.encryption().ok_or_else(|| {
        CryptStoreError::CommandFailed(
            "an encryption key is required: pass --encryption-key or use --keyfile".into(),
        )
    })?;
    let options = store_options(cli, settings);
    let integrity = keys.integrity.as_deref().map(Vec::as_slice).unwrap_or_default();

    let cryptor = options.cipher.cryptor(encryption, integrity, options.mac)?;
    let message = arg_or_stdin(message)?;
    let package = cryptor.encrypt(message.as_bytes(), ad.as_bytes())?;

    println!("{}", BASE64.encode(package));
    Ok(())
}
