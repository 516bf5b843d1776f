//! `cryptstore merge` — reconcile transport lines from another store.
//!
//! Each line is verified and merged on its own; one bad line does not
//! stop the others.  The command fails if any line was not merged.

use crate::cli::output;
use crate::cli::{arg_or_stdin, open_store, resolve_keys, Cli};
use crate::config::Settings;
use crate::errors::{CryptStoreError, Result};
use crate::store::{deserialize, SigningKey};

/// Execute the `merge` command.
pub fn execute(cli: &Cli, settings: &Settings, records: &[String]) -> Result<()> {
    let lines = collect_lines(records)?;
    if lines.is_empty() {
        output::info("Nothing to merge.");
        return Ok(());
    }

    let keys = resolve_keys(cli)?;
    let integrity = keys.integrity()?;
    let store = open_store(cli, settings)?;
    let signing = SigningKey::new(integrity, store.options().mac)?;

    // Lines that fail to parse are reported; the rest go in one batch.
    let mut failed = 0usize;
    let mut batch = Vec::with_capacity(lines.len());
    let mut origin = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        match deserialize(&signing, std::slice::from_ref(line)) {
            Ok(records) => {
                origin.extend(std::iter::repeat(i + 1).take(records.len()));
                batch.extend(records);
            }
            Err(e) => {
                failed += 1;
                output::warning(&format!("line {}: {e}", i + 1));
            }
        }
    }

    let mut merged = 0usize;
    let outcomes = store.import(integrity, keys.encryption(), &batch);
    for (line_no, outcome) in origin.iter().zip(outcomes) {
        match outcome {
            Ok(_) => merged += 1,
            Err(e) => {
                failed += 1;
                output::warning(&format!("line {line_no}: {e}"));
            }
        }
    }

    if failed > 0 {
        return Err(CryptStoreError::CommandFailed(format!(
            "merged {merged} of {} record(s)",
            lines.len()
        )));
    }
    output::success(&format!("Merged {merged} record(s)"));
    Ok(())
}

/// Lines from the arguments, or from stdin when none were given.
fn collect_lines(records: &[String]) -> Result<Vec<String>> {
    let raw = if records.is_empty() {
        arg_or_stdin(None)?
    } else {
        records.join("\n")
    };
    Ok(split_lines(&raw))
}

/// Split on line endings only; the payload is the last field, so trailing
/// whitespace belongs to it.
fn split_lines(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
