//! High-level store operations used by CLI commands.
//!
//! Each key owns two append-only files:
//!
//! - `FILES_$$$<key>.filesdata`: one line per stored vault, newest last.
//! - `FILES_$$$<key>.filesmeta`: a `Meta` entry holding a signed random
//!   version tag and whether the key's data is encrypted.
//!
//! `<key>` is the key's canonical text `namespace$$$Kind$$$identifier`.
//!
//! Integrity and encryption keys are passed per call and never stored.
//! There is no locking: a key supports at most one writer at a time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::key::{Key, KeyKind, KEY_TEXT_SEPARATOR};
use super::persist::{FileStore, Persistence};
use super::record::{self, Meta, Record, SigningKey, Vault};
use crate::crypto::{CipherMode, Cryptor, MacAlgorithm};
use crate::errors::{CryptStoreError, Result};

const FILE_PREFIX: &str = "FILES_$$$";
const DATA_SUFFIX: &str = ".filesdata";
const META_SUFFIX: &str = ".filesmeta";

/// Cipher and MAC choices for a store, fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub cipher: CipherMode,
    pub mac: MacAlgorithm,
}

/// Outcome of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// Signature of the stored vault.
    pub signature: String,
    /// The exact line written to the data file.
    pub entry: String,
}

/// Drives the per-key state machine on top of a `Persistence`.
pub struct StoreManager<P: Persistence = FileStore> {
    persistence: P,
    options: StoreOptions,
}

impl<P: Persistence> StoreManager<P> {
    pub fn new(persistence: P, options: StoreOptions) -> Self {
        Self {
            persistence,
            options,
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    // ------------------------------------------------------------------
    // Key lifecycle
    // ------------------------------------------------------------------

    /// Create the data and metadata files for `key`.
    ///
    /// With an encryption key, the metadata entry is encrypted and every
    /// later call must supply an encryption key as well.
    pub fn register(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        key: &Key,
    ) -> Result<()> {
        let signing = SigningKey::new(integrity_key, self.options.mac)?;
        let data = data_name(key);
        let meta = meta_name(key);

        if self.persistence.exists(&data)? || self.persistence.exists(&meta)? {
            return Err(CryptStoreError::KeyAlreadyExists(key.to_string()));
        }

        let tag = Vault::new(&signing, key, Utc::now(), Uuid::new_v4().to_string())?;
        let tag_json = tag.to_json()?;
        let entry = match encryption_key {
            Some(enc) => self.seal(integrity_key, enc, key, &tag_json)?,
            None => tag_json,
        };
        let meta_line = serde_json::to_string(&Meta {
            payload: entry,
            encrypted: encryption_key.is_some(),
        })
        .map_err(|e| CryptStoreError::SerializationError(format!("meta: {e}")))?;

        self.persistence.create(&data)?;
        let written = self
            .persistence
            .create(&meta)
            .and_then(|()| self.persistence.append_to(&meta, &meta_line));
        if let Err(e) = written {
            // Leave neither file behind so the key can be registered again.
            if let Err(cleanup) = self.persistence.delete(&data) {
                warn!(key = %key, error = %cleanup, "failed to roll back data file");
            }
            match self.persistence.exists(&meta) {
                Ok(true) => {
                    if let Err(cleanup) = self.persistence.delete(&meta) {
                        warn!(key = %key, error = %cleanup, "failed to roll back meta file");
                    }
                }
                Ok(false) => {}
                Err(check) => {
                    warn!(key = %key, error = %check, "failed to check meta file during rollback");
                }
            }
            return Err(e);
        }

        info!(
            namespace = key.namespace(),
            identifier = %key.identifier(),
            encrypted = encryption_key.is_some(),
            "registered key"
        );
        Ok(())
    }

    /// Remove both files of `key`.  Fails if either is missing.
    pub fn delete(&self, key: &Key) -> Result<()> {
        let data = data_name(key);
        let meta = meta_name(key);
        if !self.persistence.exists(&data)? || !self.persistence.exists(&meta)? {
            return Err(CryptStoreError::KeyNotFound(key.to_string()));
        }
        self.persistence.delete(&data)?;
        self.persistence.delete(&meta)?;

        info!(namespace = key.namespace(), identifier = %key.identifier(), "deleted key");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    /// Sign `payload` at `timestamp` and append it to the key's data file.
    pub fn insert(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        timestamp: DateTime<Utc>,
        key: &Key,
        payload: &str,
    ) -> Result<Appended> {
        let signing = SigningKey::new(integrity_key, self.options.mac)?;
        self.load_meta(&signing, integrity_key, encryption_key, key)?;

        let vault = Vault::new(&signing, key, timestamp, payload)?;
        let json = vault.to_json()?;
        let entry = match encryption_key {
            Some(enc) => self.seal(integrity_key, enc, key, &json)?,
            None => json,
        };

        self.persistence
            .append_to(&data_name(key), &entry)
            .map_err(|e| for_key(e, key))?;

        debug!(
            namespace = key.namespace(),
            identifier = %key.identifier(),
            encrypted = encryption_key.is_some(),
            "inserted entry"
        );
        Ok(Appended {
            signature: vault.signature,
            entry,
        })
    }

    /// The latest verified vault of `key`.
    pub fn get(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        key: &Key,
    ) -> Result<Vault> {
        let signing = SigningKey::new(integrity_key, self.options.mac)?;
        self.load_meta(&signing, integrity_key, encryption_key, key)?;

        let line = self
            .persistence
            .read_last(&data_name(key))
            .map_err(|e| for_key(e, key))?;
        self.open_entry(&signing, integrity_key, encryption_key, key, &line)
    }

    /// Every verified vault of `key`, oldest first.
    pub fn history(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        key: &Key,
    ) -> Result<Vec<Vault>> {
        let signing = SigningKey::new(integrity_key, self.options.mac)?;
        self.load_meta(&signing, integrity_key, encryption_key, key)?;

        self.persistence
            .read_whole(&data_name(key))
            .map_err(|e| for_key(e, key))?
            .iter()
            .map(|line| self.open_entry(&signing, integrity_key, encryption_key, key, line))
            .collect()
    }

    /// The latest record of `key` as transport text.
    pub fn export(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        key: &Key,
    ) -> Result<String> {
        let vault = self.get(integrity_key, encryption_key, key)?;
        let signing = SigningKey::new(integrity_key, self.options.mac)?;
        record::serialize(
            &Record {
                key: key.clone(),
                vault,
            },
            &signing,
        )
    }

    // ------------------------------------------------------------------
    // Enumeration
    // ------------------------------------------------------------------

    /// Registered keys of `namespace`, optionally sorted, one page at a time.
    ///
    /// Pages are 1-based; `page_size == 0` returns everything.  A page past
    /// the end is empty.
    pub fn keys(
        &self,
        namespace: &str,
        sorted: bool,
        page_size: usize,
        page_number: usize,
    ) -> Result<Vec<Key>> {
        let mut keys: Vec<Key> = self
            .persistence
            .list()?
            .iter()
            .filter_map(|name| parse_data_name(namespace, name))
            .collect();

        if sorted {
            keys.sort();
        }

        if page_size == 0 {
            return Ok(keys);
        }
        let start = page_number.saturating_sub(1).saturating_mul(page_size);
        if start >= keys.len() {
            return Ok(Vec::new());
        }
        let end = start.saturating_add(page_size).min(keys.len());
        Ok(keys.drain(start..end).collect())
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Merge records from another store, one outcome per record.
    ///
    /// An incoming record is appended when the local key has no entry yet
    /// or its latest entry is not newer.  Equal timestamps with different
    /// payloads are a conflict.  Failures do not stop the batch.
    pub fn import(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        records: &[Record],
    ) -> Vec<Result<Appended>> {
        records
            .iter()
            .map(|record| {
                let outcome = self.merge_one(integrity_key, encryption_key, record);
                if let Err(e) = &outcome {
                    warn!(
                        namespace = record.key.namespace(),
                        identifier = %record.key.identifier(),
                        error = %e,
                        "record not merged"
                    );
                }
                outcome
            })
            .collect()
    }

    fn merge_one(
        &self,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        record: &Record,
    ) -> Result<Appended> {
        let signing = SigningKey::new(integrity_key, self.options.mac)?;
        record.vault.verify(&signing, &record.key)?;

        let local = match self.get(integrity_key, encryption_key, &record.key) {
            Ok(vault) => Some(vault),
            Err(CryptStoreError::EntryEmpty(_)) => None,
            Err(e) => return Err(e),
        };

        if let Some(local) = local {
            let incoming = &record.vault;
            if local.timestamp == incoming.timestamp && local.payload != incoming.payload {
                return Err(CryptStoreError::ConflictingTimestamp);
            }
            if local.timestamp > incoming.timestamp {
                return Err(CryptStoreError::RecordIsOlder);
            }
        }

        self.insert(
            integrity_key,
            encryption_key,
            record.vault.timestamp,
            &record.key,
            &record.vault.payload,
        )
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Read and validate the metadata of `key`.
    ///
    /// Checks the caller's encryption intent against the stored flag, then
    /// decrypts if needed, verifies the version-tag vault and checks that
    /// its payload is a UUID.
    fn load_meta(
        &self,
        signing: &SigningKey<'_>,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        key: &Key,
    ) -> Result<Meta> {
        let line = self
            .persistence
            .read_last(&meta_name(key))
            .map_err(|e| match e {
                CryptStoreError::KeyNotFound(_) | CryptStoreError::EntryEmpty(_) => {
                    CryptStoreError::KeyNotFound(key.to_string())
                }
                other => other,
            })?;
        let meta: Meta = serde_json::from_str(&line)
            .map_err(|e| CryptStoreError::MalformedInput(format!("metadata: {e}")))?;

        if meta.encrypted != encryption_key.is_some() {
            return Err(CryptStoreError::EncryptionModeMismatch {
                encrypted: meta.encrypted,
            });
        }

        let tag = self.open_entry(signing, integrity_key, encryption_key, key, &meta.payload)?;
        Uuid::parse_str(&tag.payload).map_err(|_| {
            CryptStoreError::InvalidState(format!("metadata of '{key}' has no version tag"))
        })?;

        Ok(meta)
    }

    /// Decrypt (if needed), parse and verify one stored vault.
    fn open_entry(
        &self,
        signing: &SigningKey<'_>,
        integrity_key: &[u8],
        encryption_key: Option<&[u8]>,
        key: &Key,
        entry: &str,
    ) -> Result<Vault> {
        let vault = match encryption_key {
            Some(enc) => Vault::from_json(&self.open(integrity_key, enc, key, entry)?)?,
            None => Vault::from_json(entry)?,
        };
        vault.verify(signing, key)?;
        Ok(vault)
    }

    fn cryptor(&self, integrity_key: &[u8], encryption_key: &[u8]) -> Result<Box<dyn Cryptor>> {
        self.options
            .cipher
            .cryptor(encryption_key, integrity_key, self.options.mac)
    }

    /// Encrypt `text` bound to `key` and return the package as base64.
    fn seal(
        &self,
        integrity_key: &[u8],
        encryption_key: &[u8],
        key: &Key,
        text: &str,
    ) -> Result<String> {
        let package = self
            .cryptor(integrity_key, encryption_key)?
            .encrypt(text.as_bytes(), key.to_string().as_bytes())?;
        Ok(BASE64.encode(package))
    }

    /// Inverse of `seal`; the package must have been bound to `key`.
    fn open(
        &self,
        integrity_key: &[u8],
        encryption_key: &[u8],
        key: &Key,
        entry: &str,
    ) -> Result<String> {
        let package = BASE64
            .decode(entry)
            .map_err(|e| CryptStoreError::MalformedInput(format!("stored entry: {e}")))?;
        let (plain, ad) = self
            .cryptor(integrity_key, encryption_key)?
            .decrypt(&package)?;
        if ad != key.to_string().as_bytes() {
            return Err(CryptStoreError::IntegrityCompromised);
        }
        String::from_utf8(plain)
            .map_err(|_| CryptStoreError::MalformedInput("stored entry is not UTF-8".into()))
    }
}

/// Replace a persistence-level file name in an error with the key text.
fn for_key(err: CryptStoreError, key: &Key) -> CryptStoreError {
    match err {
        CryptStoreError::KeyNotFound(_) => CryptStoreError::KeyNotFound(key.to_string()),
        CryptStoreError::EntryEmpty(_) => CryptStoreError::EntryEmpty(key.to_string()),
        other => other,
    }
}

fn data_name(key: &Key) -> String {
    format!("{FILE_PREFIX}{key}{DATA_SUFFIX}")
}

fn meta_name(key: &Key) -> String {
    format!("{FILE_PREFIX}{key}{META_SUFFIX}")
}

/// Recover the key from a data file name, if it belongs to `namespace`.
fn parse_data_name(namespace: &str, name: &str) -> Option<Key> {
    let text = name.strip_prefix(FILE_PREFIX)?.strip_suffix(DATA_SUFFIX)?;
    let mut parts = text.splitn(3, KEY_TEXT_SEPARATOR);
    let (ns, kind, identifier) = (parts.next()?, parts.next()?, parts.next()?);
    if ns != namespace {
        return None;
    }

    let parsed = kind
        .parse::<KeyKind>()
        .and_then(|kind| Key::parse(ns, identifier, kind));
    match parsed {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(file = name, error = %e, "skipping unreadable key file name");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const INTEGRITY: &[u8] = b"integrity-key-0123";
    const ENCRYPTION: &[u8] = b"0123456789abcdef";

    fn manager() -> (TempDir, StoreManager) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        (dir, StoreManager::new(store, StoreOptions::default()))
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn file_names_roundtrip_through_key_text() {
        let key = Key::new("ns", 12i64).unwrap();
        assert_eq!(data_name(&key), "FILES_$$$ns$$$Integer$$$12.filesdata");
        assert_eq!(parse_data_name("ns", &data_name(&key)), Some(key.clone()));
        assert_eq!(parse_data_name("other", &data_name(&key)), None);
        assert_eq!(parse_data_name("ns", &meta_name(&key)), None);
    }

    #[test]
    fn identifier_may_contain_dollars() {
        let key = Key::new("ns", "a$$$b").unwrap();
        assert_eq!(parse_data_name("ns", &data_name(&key)), Some(key));
    }

    #[test]
    fn bad_file_names_are_skipped() {
        assert_eq!(
            parse_data_name("ns", "FILES_$$$ns$$$Integer$$$abc.filesdata"),
            None
        );
        assert_eq!(parse_data_name("ns", "unrelated.txt"), None);
    }

    #[test]
    fn register_writes_signed_version_tag() {
        let (_dir, m) = manager();
        let key = Key::new("ns", "k").unwrap();
        m.register(INTEGRITY, None, &key).unwrap();

        let line = m.persistence().read_last(&meta_name(&key)).unwrap();
        let meta: Meta = serde_json::from_str(&line).unwrap();
        assert!(!meta.encrypted);
        let tag = Vault::from_json(&meta.payload).unwrap();
        assert!(Uuid::parse_str(&tag.payload).is_ok());
    }

    #[test]
    fn encrypted_entries_are_not_plaintext() {
        let (_dir, m) = manager();
        let key = Key::new("ns", "k").unwrap();
        m.register(INTEGRITY, Some(ENCRYPTION), &key).unwrap();
        let appended = m
            .insert(INTEGRITY, Some(ENCRYPTION), day(1), &key, "top-secret")
            .unwrap();
        assert!(!appended.entry.contains("top-secret"));
        assert_eq!(
            m.get(INTEGRITY, Some(ENCRYPTION), &key).unwrap().payload,
            "top-secret"
        );
    }

    #[test]
    fn entry_moved_to_another_key_is_rejected() {
        let (_dir, m) = manager();
        let a = Key::new("ns", "a").unwrap();
        let b = Key::new("ns", "b").unwrap();
        m.register(INTEGRITY, Some(ENCRYPTION), &a).unwrap();
        m.register(INTEGRITY, Some(ENCRYPTION), &b).unwrap();
        let appended = m
            .insert(INTEGRITY, Some(ENCRYPTION), day(1), &a, "x")
            .unwrap();
        m.persistence()
            .append_to(&data_name(&b), &appended.entry)
            .unwrap();
        assert!(matches!(
            m.get(INTEGRITY, Some(ENCRYPTION), &b),
            Err(CryptStoreError::IntegrityCompromised)
        ));
    }

    #[test]
    fn register_refuses_when_either_file_exists() {
        let (_dir, m) = manager();
        let key = Key::new("ns", "k").unwrap();
        m.persistence().create(&meta_name(&key)).unwrap();
        assert!(matches!(
            m.register(INTEGRITY, None, &key),
            Err(CryptStoreError::KeyAlreadyExists(_))
        ));
        assert!(!m.persistence().exists(&data_name(&key)).unwrap());
    }

    /// File store whose meta files cannot be written or removed.
    struct StuckMeta(FileStore);

    impl Persistence for StuckMeta {
        fn create(&self, name: &str) -> Result<()> {
            self.0.create(name)
        }
        fn exists(&self, name: &str) -> Result<bool> {
            self.0.exists(name)
        }
        fn read_whole(&self, name: &str) -> Result<Vec<String>> {
            self.0.read_whole(name)
        }
        fn read_last(&self, name: &str) -> Result<String> {
            self.0.read_last(name)
        }
        fn append_to(&self, name: &str, entry: &str) -> Result<()> {
            if name.ends_with(META_SUFFIX) {
                return Err(CryptStoreError::InvalidState("meta is read-only".into()));
            }
            self.0.append_to(name, entry)
        }
        fn delete(&self, name: &str) -> Result<()> {
            if name.ends_with(META_SUFFIX) {
                return Err(CryptStoreError::InvalidState("meta is read-only".into()));
            }
            self.0.delete(name)
        }
        fn list(&self) -> Result<Vec<String>> {
            self.0.list()
        }
    }

    #[test]
    fn register_rollback_survives_failed_meta_cleanup() {
        let dir = TempDir::new().unwrap();
        let m = StoreManager::new(
            StuckMeta(FileStore::open(dir.path()).unwrap()),
            StoreOptions::default(),
        );
        let key = Key::new("ns", "k").unwrap();

        assert!(matches!(
            m.register(INTEGRITY, None, &key),
            Err(CryptStoreError::InvalidState(_))
        ));
        assert!(!m.persistence().exists(&data_name(&key)).unwrap());
        assert!(m.persistence().exists(&meta_name(&key)).unwrap());
    }

    #[test]
    fn gcm_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let m = StoreManager::new(
            FileStore::open(dir.path()).unwrap(),
            StoreOptions {
                cipher: CipherMode::Gcm,
                mac: MacAlgorithm::Sha512,
            },
        );
        let key = Key::new("ns", day(3)).unwrap();
        m.register(INTEGRITY, Some(ENCRYPTION), &key).unwrap();
        m.insert(INTEGRITY, Some(ENCRYPTION), day(1), &key, "g")
            .unwrap();
        assert_eq!(m.get(INTEGRITY, Some(ENCRYPTION), &key).unwrap().payload, "g");
    }

    #[test]
    fn equal_timestamp_and_payload_is_appended_again() {
        let (_dir, m) = manager();
        let key = Key::new("ns", "k").unwrap();
        m.register(INTEGRITY, None, &key).unwrap();
        let appended = m.insert(INTEGRITY, None, day(1), &key, "same").unwrap();

        let vault = m.get(INTEGRITY, None, &key).unwrap();
        assert_eq!(vault.signature, appended.signature);
        let results = m.import(INTEGRITY, None, &[Record { key: key.clone(), vault }]);
        assert!(results[0].is_ok());
        assert_eq!(m.history(INTEGRITY, None, &key).unwrap().len(), 2);
    }
}
