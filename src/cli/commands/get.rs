//! `cryptstore get` — print the latest value of a key.

use crate::cli::{open_store, parse_key, resolve_keys, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let key = parse_key(cli, settings, id)?;
    let keys = resolve_keys(cli)?;
    let store = open_store(cli, settings)?;

    let vault = store.get(keys.integrity()?, keys.encryption(), &key)?;
    println!("{}", vault.payload);

    Ok(())
}
