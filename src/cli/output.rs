//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  Status lines go to stderr
//! whenever a command's stdout carries data meant for piping.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::{format_timestamp, Key, Vault};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Like `info`, but on stderr.
pub fn note(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of keys (Identifier, Kind).
pub fn print_keys_table(keys: &[Key]) {
    if keys.is_empty() {
        info("No keys on this page.");
        tip("Run `cryptstore create <ID>` to register a key.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Identifier", "Kind"]);

    for key in keys {
        table.add_row(vec![key.identifier().to_string(), key.kind().to_string()]);
    }

    println!("{table}");
}

/// Print every version of a key (#, Timestamp, Value, Signature).
pub fn print_history_table(vaults: &[Vault]) {
    if vaults.is_empty() {
        info("No values stored for this key yet.");
        tip("Run `cryptstore update <ID> <VALUE>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Timestamp", "Value", "Signature"]);

    for (i, vault) in vaults.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            format_timestamp(&vault.timestamp),
            vault.payload.clone(),
            short_signature(&vault.signature),
        ]);
    }

    println!("{table}");
}

fn short_signature(signature: &str) -> String {
    match signature.char_indices().nth(12) {
        Some((idx, _)) => format!("{}\u{2026}", &signature[..idx]),
        None => signature.to_string(),
    }
}
