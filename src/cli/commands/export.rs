//! `cryptstore export` — print the latest record of a key as a transport line.
//!
//! The line can be fed to `cryptstore merge` on another store that shares
//! the integrity key.

use crate::cli::{open_store, parse_key, resolve_keys, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `export` command.
pub fn execute(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let key = parse_key(cli, settings, id)?;
    let keys = resolve_keys(cli)?;
    let store = open_store(cli, settings)?;

    let line = store.export(keys.integrity()?, keys.encryption(), &key)?;
    println!("{line}");

    Ok(())
}
