//! `cryptstore create` — register a new key.

use crate::cli::output;
use crate::cli::{open_store, parse_key, resolve_keys, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `create` command.
pub fn execute(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let key = parse_key(cli, settings, id)?;
    let keys = resolve_keys(cli)?;
    let store = open_store(cli, settings)?;

    store.register(keys.integrity()?, keys.encryption(), &key)?;

    let mode = if keys.encryption().is_some() {
        "encrypted"
    } else {
        "signed only"
    };
    output::success(&format!(
        "Registered '{}' in namespace '{}' ({mode})",
        key.identifier(),
        key.namespace()
    ));
    Ok(())
}
