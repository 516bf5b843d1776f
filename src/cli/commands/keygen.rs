//! `cryptstore keygen` — generate a new random keyfile.
//!
//! The keyfile holds a 16-byte encryption key followed by a 16-byte
//! integrity key; pass it back with `--keyfile <path>`.

use std::path::Path;

use crate::cli::output;
use crate::crypto::generate_keyfile;
use crate::errors::Result;

/// Execute the `keygen` command.
pub fn execute(path: &str) -> Result<()> {
    generate_keyfile(Path::new(path))?;

    output::success(&format!("Keyfile written to {path}"));
    output::tip("Keep it out of version control; anyone holding it can read and forge records.");
    Ok(())
}
