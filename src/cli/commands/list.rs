//! `cryptstore list` — display the keys of a namespace in a table.

use crate::cli::output;
use crate::cli::{namespace, open_store, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    page: usize,
    page_size: Option<usize>,
    all: bool,
    unsorted: bool,
) -> Result<()> {
    let ns = namespace(cli, settings);
    let size = if all {
        0
    } else {
        page_size.unwrap_or(settings.page_size)
    };

    let store = open_store(cli, settings)?;
    let keys = store.keys(ns, !unsorted, size, page)?;

    if size == 0 {
        output::info(&format!("namespace '{ns}' — {} key(s)", keys.len()));
    } else {
        output::info(&format!(
            "namespace '{ns}' — page {page}, {} key(s)",
            keys.len()
        ));
    }
    output::print_keys_table(&keys);

    Ok(())
}
