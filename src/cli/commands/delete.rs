//! `cryptstore delete` — remove a key and all of its values.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, parse_key, Cli};
use crate::config::Settings;
use crate::errors::{CryptStoreError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, settings: &Settings, id: &str, force: bool) -> Result<()> {
    let key = parse_key(cli, settings, id)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete '{}' and its whole history?",
                key.identifier()
            ))
            .default(false)
            .interact()
            .map_err(|e| CryptStoreError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let store = open_store(cli, settings)?;
    store.delete(&key)?;

    output::success(&format!("Deleted '{}'", key.identifier()));
    Ok(())
}
