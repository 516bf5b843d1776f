//! `cryptstore update` — append a new value to a key.

use chrono::Utc;

use crate::cli::output;
use crate::cli::{arg_or_stdin, open_store, parse_key, resolve_keys, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::store::parse_timestamp;

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    id: &str,
    value: Option<&str>,
    at: Option<&str>,
) -> Result<()> {
    let key = parse_key(cli, settings, id)?;
    let timestamp = match at {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };
    let keys = resolve_keys(cli)?;
    let store = open_store(cli, settings)?;

    let value = arg_or_stdin(value)?;
    let appended = store.insert(
        keys.integrity()?,
        keys.encryption(),
        timestamp,
        &key,
        &value,
    )?;

    output::success(&format!("Updated '{}'", key.identifier()));
    output::tip(&format!("signature: {}", appended.signature));
    Ok(())
}
