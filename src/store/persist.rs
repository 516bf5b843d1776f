//! Line-oriented persistence for store entries.
//!
//! Every stored name maps to one append-only text file.  Entries are
//! separated by a single `\n`; the last line of a file is its current
//! entry.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{CryptStoreError, Result};

/// Storage collaborator consumed by `StoreManager`.
pub trait Persistence {
    /// Create an empty entry file.  Fails with `KeyAlreadyExists` if present.
    fn create(&self, name: &str) -> Result<()>;

    /// Whether a file with this name exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Every line of the file, oldest first.
    fn read_whole(&self, name: &str) -> Result<Vec<String>>;

    /// The last line of the file.  Fails with `EntryEmpty` if it has none.
    fn read_last(&self, name: &str) -> Result<String>;

    /// Append one line.  The file is left unchanged if the write fails.
    fn append_to(&self, name: &str, entry: &str) -> Result<()>;

    /// Remove the file.
    fn delete(&self, name: &str) -> Result<()>;

    /// Names of all stored files.
    fn list(&self) -> Result<Vec<String>>;
}

/// `Persistence` over a single flat directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the directory at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_existing(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        if !path.exists() {
            return Err(CryptStoreError::KeyNotFound(name.to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }
}

impl Persistence for FileStore {
    fn create(&self, name: &str) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(name))
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    CryptStoreError::KeyAlreadyExists(name.to_string())
                }
                _ => CryptStoreError::Io(e),
            })?;
        debug!(file = name, "created");
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path(name).try_exists()?)
    }

    fn read_whole(&self, name: &str) -> Result<Vec<String>> {
        let content = self.read_existing(name)?;
        if content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(content.split('\n').map(str::to_string).collect())
    }

    fn read_last(&self, name: &str) -> Result<String> {
        let content = self.read_existing(name)?;
        match content.rsplit('\n').next() {
            Some(last) if !content.is_empty() => Ok(last.to_string()),
            _ => Err(CryptStoreError::EntryEmpty(name.to_string())),
        }
    }

    fn append_to(&self, name: &str, entry: &str) -> Result<()> {
        if entry.contains('\n') {
            return Err(CryptStoreError::MalformedInput(
                "entry cannot contain a line break".into(),
            ));
        }

        let path = self.path(name);
        if !path.exists() {
            return Err(CryptStoreError::KeyNotFound(name.to_string()));
        }

        let mut file = OpenOptions::new().append(true).open(&path)?;
        let line = if file.metadata()?.len() > 0 {
            format!("\n{entry}")
        } else {
            entry.to_string()
        };
        // Separator and entry go out in a single write.
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        debug!(file = name, bytes = line.len(), "appended");
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if !path.exists() {
            return Err(CryptStoreError::KeyNotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        debug!(file = name, "deleted");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
