use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::{CipherMode, MacAlgorithm};
use crate::errors::{CryptStoreError, Result};
use crate::store::StoreOptions;

/// Project-level configuration, loaded from `.cryptstore.toml`.
///
/// Every field has a sensible default so CryptStore works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the store files.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Namespace used when none is given on the command line.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Cipher for encrypted keys: "cbc-hmac" or "gcm".
    #[serde(default)]
    pub cipher: CipherMode,

    /// Hash used for signatures and the CBC-HMAC tag: "sha256" or "sha512".
    #[serde(default)]
    pub mac: MacAlgorithm,

    /// Keys per page for `list`.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_dir() -> String {
    ".cryptstore".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            default_namespace: default_namespace(),
            cipher: CipherMode::default(),
            mac: MacAlgorithm::default(),
            page_size: default_page_size(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".cryptstore.toml";

    /// Load settings from `<project_dir>/.cryptstore.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        toml::from_str(&contents).map_err(|e| {
            CryptStoreError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Full path of the store directory.
    ///
    /// Example: `project_dir/.cryptstore`
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_dir)
    }

    /// Cipher and MAC choices for `StoreManager::new`.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            cipher: self.cipher,
            mac: self.mac,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
