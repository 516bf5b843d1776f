//! `cryptstore history` — show every stored value of a key.

use crate::cli::output;
use crate::cli::{open_store, parse_key, resolve_keys, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `history` command.
pub fn execute(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let key = parse_key(cli, settings, id)?;
    let keys = resolve_keys(cli)?;
    let store = open_store(cli, settings)?;

    let vaults = store.history(keys.integrity()?, keys.encryption(), &key)?;

    output::info(&format!(
        "'{}' in namespace '{}' — {} value(s)",
        key.identifier(),
        key.namespace(),
        vaults.len()
    ));
    output::print_history_table(&vaults);

    Ok(())
}
