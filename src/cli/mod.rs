//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::{load_keyfile, CipherMode};
use crate::errors::{CryptStoreError, Result};
use crate::store::{FileStore, Key, KeyKind, StoreManager, StoreOptions};

/// CryptStore CLI: authenticated, append-only encrypted record store.
#[derive(Parser)]
#[command(
    name = "cryptstore",
    about = "Authenticated encrypted record store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Namespace for keys (default: from .cryptstore.toml, else "default")
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// How key identifiers are interpreted and ordered
    #[arg(long, value_enum, default_value_t = KeyKind::String, global = true)]
    pub kind: KeyKind,

    /// Store directory (default: .cryptstore)
    #[arg(long, global = true)]
    pub store_dir: Option<String>,

    /// Cipher for encrypted keys (default: from settings, else cbc-hmac)
    #[arg(long, value_enum, global = true)]
    pub cipher: Option<CipherMode>,

    /// Integrity key used to sign and verify records
    #[arg(
        short = 's',
        long,
        env = "CRYPTSTORE_INTEGRITY_KEY",
        hide_env_values = true,
        global = true
    )]
    pub integrity_key: Option<String>,

    /// Encryption key; keys created with one must always be used with one
    #[arg(
        short = 'k',
        long,
        env = "CRYPTSTORE_ENCRYPTION_KEY",
        hide_env_values = true,
        global = true
    )]
    pub encryption_key: Option<String>,

    /// Keyfile supplying both keys (see `cryptstore keygen`)
    #[arg(long, global = true)]
    pub keyfile: Option<String>,

    /// Ignore any encryption key and work with unencrypted keys
    #[arg(long, global = true)]
    pub plain: bool,

    /// Log filter when RUST_LOG is unset (default: from settings, else warn)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a new random keyfile
    Keygen {
        /// Path for the keyfile
        path: String,
    },

    /// Encrypt a message and print the base64 cipher package
    Encrypt {
        /// Message to encrypt (read from stdin if omitted)
        message: Option<String>,
        /// Additional data to authenticate alongside the message
        #[arg(long, default_value = "")]
        ad: String,
    },

    /// Decrypt a base64 cipher package and print the message
    Decrypt {
        /// Cipher package (read from stdin if omitted)
        package: Option<String>,
        /// Also print the additional data
        #[arg(long)]
        show_ad: bool,
    },

    /// Register a new key
    Create {
        /// Key identifier
        id: String,
    },

    /// Append a new value to a key
    Update {
        /// Key identifier
        id: String,
        /// Value to store (read from stdin if omitted)
        value: Option<String>,
        /// RFC 3339 timestamp for the entry (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Print the latest value of a key
    Get {
        /// Key identifier
        id: String,
    },

    /// Show every stored value of a key
    History {
        /// Key identifier
        id: String,
    },

    /// Print the latest record of a key as a transport line
    Export {
        /// Key identifier
        id: String,
    },

    /// Merge transport lines from another store
    Merge {
        /// Transport lines (read from stdin, one per line, if omitted)
        records: Vec<String>,
    },

    /// Delete a key and all of its values
    Delete {
        /// Key identifier
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List the keys of a namespace
    List {
        /// Page to show, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
        /// Keys per page (default: from settings)
        #[arg(long)]
        page_size: Option<usize>,
        /// Show every key on one page
        #[arg(long)]
        all: bool,
        /// Keep directory order instead of sorting
        #[arg(long)]
        unsorted: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Key material resolved from flags, environment and keyfile.
pub struct Keys {
    pub integrity: Option<Zeroizing<Vec<u8>>>,
    pub encryption: Option<Zeroizing<Vec<u8>>>,
}

impl Keys {
    /// The integrity key, which every store command needs.
    pub fn integrity(&self) -> Result<&[u8]> {
        self.integrity.as_deref().map(Vec::as_slice).ok_or_else(|| {
            CryptStoreError::CommandFailed(
                "an integrity key is required: pass --integrity-key, set \
                 CRYPTSTORE_INTEGRITY_KEY or use --keyfile"
                    .into(),
            )
        })
    }

    /// The encryption key, if one was supplied.
    pub fn encryption(&self) -> Option<&[u8]> {
        self.encryption.as_deref().map(Vec::as_slice)
    }
}

/// Resolve keys, trying in order:
/// 1. `--integrity-key` / `--encryption-key` (or their env vars)
/// 2. the two halves of `--keyfile`
///
/// `--plain` drops the encryption key whatever its source.
pub fn resolve_keys(cli: &Cli) -> Result<Keys> {
    let from_file = match &cli.keyfile {
        Some(path) => Some(load_keyfile(Path::new(path))?),
        None => None,
    };

    let text_key = |value: &Option<String>| {
        value
            .as_ref()
            .filter(|v| !v.is_empty())
            .map(|v| Zeroizing::new(v.as_bytes().to_vec()))
    };

    let mut integrity = text_key(&cli.integrity_key);
    let mut encryption = text_key(&cli.encryption_key);
    if let Some(material) = from_file {
        integrity = integrity.or(Some(material.integrity_key));
        encryption = encryption.or(Some(material.encryption_key));
    }
    if cli.plain {
        encryption = None;
    }

    Ok(Keys {
        integrity,
        encryption,
    })
}

/// Directory the store lives in: `--store-dir`, else the settings value
/// relative to the current directory.
pub fn store_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    match &cli.store_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(settings.store_path(&std::env::current_dir()?)),
    }
}

/// Cipher and MAC for this invocation; `--cipher` overrides the settings.
pub fn store_options(cli: &Cli, settings: &Settings) -> StoreOptions {
    let mut options = settings.store_options();
    if let Some(cipher) = cli.cipher {
        options.cipher = cipher;
    }
    options
}

/// Open the store described by the CLI arguments and settings.
pub fn open_store(cli: &Cli, settings: &Settings) -> Result<StoreManager> {
    let persistence = FileStore::open(store_path(cli, settings)?)?;
    Ok(StoreManager::new(persistence, store_options(cli, settings)))
}

/// Namespace for this invocation.
pub fn namespace<'a>(cli: &'a Cli, settings: &'a Settings) -> &'a str {
    cli.namespace
        .as_deref()
        .unwrap_or(&settings.default_namespace)
}

/// Build a key from a command-line identifier using `--kind`.
pub fn parse_key(cli: &Cli, settings: &Settings, id: &str) -> Result<Key> {
    Key::parse(namespace(cli, settings), id, cli.kind)
}

/// Use `arg` if given, else read all of stdin without its trailing newline.
pub fn arg_or_stdin(arg: Option<&str>) -> Result<String> {
    if let Some(value) = arg {
        return Ok(value.to_string());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.strip_suffix('\n').unwrap_or(&buf);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["cryptstore"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn namespace_falls_back_to_settings() {
        let settings = Settings::default();
        assert_eq!(namespace(&cli(&["get", "x"]), &settings), "default");
        assert_eq!(namespace(&cli(&["-n", "billing", "get", "x"]), &settings), "billing");
    }

    #[test]
    fn kind_flag_controls_key_parsing() {
        let settings = Settings::default();
        let c = cli(&["--kind", "integer", "get", "42"]);
        assert_eq!(parse_key(&c, &settings, "42").unwrap().kind(), KeyKind::Integer);
        assert!(parse_key(&c, &settings, "forty-two").is_err());
    }

    #[test]
    fn cipher_flag_overrides_settings() {
        let settings = Settings::default();
        let c = cli(&["--cipher", "gcm", "list"]);
        assert_eq!(store_options(&c, &settings).cipher, CipherMode::Gcm);
        assert_eq!(
            store_options(&cli(&["list"]), &settings).cipher,
            CipherMode::CbcHmac
        );
    }

    #[test]
    fn plain_drops_encryption_key() {
        let c = cli(&[
            "--integrity-key",
            "integrity-key-0123",
            "--encryption-key",
            "0123456789abcdef",
            "--plain",
            "list",
        ]);
        let keys = resolve_keys(&c).unwrap();
        assert_eq!(keys.integrity().unwrap(), b"integrity-key-0123");
        assert!(keys.encryption().is_none());
    }

    #[test]
    fn missing_integrity_key_is_reported() {
        let keys = Keys {
            integrity: None,
            encryption: None,
        };
        assert!(keys.integrity().is_err());
    }

    #[test]
    fn store_dir_flag_wins() {
        let settings = Settings::default();
        let c = cli(&["--store-dir", "/tmp/elsewhere", "list"]);
        assert_eq!(
            store_path(&c, &settings).unwrap(),
            PathBuf::from("/tmp/elsewhere")
        );
    }
}
