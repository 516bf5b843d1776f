//! Signed vaults, key metadata and the record transport codec.
//!
//! A `Vault` is one signed `(timestamp, payload)` pair.  Its signature is an
//! HMAC over the text
//!
//! ```text
//! <namespace>, <identifier>, <RFC 3339 UTC timestamp>, <payload>
//! ```
//!
//! and is computed with the integrity key whether or not the store also
//! encrypts, so authenticity holds even when confidentiality is off.
//!
//! A `Record` pairs a vault with its key and travels between stores as one
//! line of text:
//!
//! ```text
//! signature ::: timestamp ::: namespace ::: kind ::: identifier ::: payload
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::{Key, KeyKind, FIELD_JOIN};
use super::{format_timestamp, parse_timestamp, RECORD_SEPARATOR};
use crate::crypto::{MacAlgorithm, MIN_KEY_LEN};
use crate::errors::{CryptStoreError, KeyRole, Result};

/// Number of fields in a record's transport text.
const RECORD_FIELDS: usize = 6;

// ---------------------------------------------------------------------------
// SigningKey
// ---------------------------------------------------------------------------

/// Integrity key plus the hash it signs with.
#[derive(Clone, Copy)]
pub struct SigningKey<'a> {
    key: &'a [u8],
    mac: MacAlgorithm,
}

impl<'a> SigningKey<'a> {
    pub fn new(key: &'a [u8], mac: MacAlgorithm) -> Result<Self> {
        if key.len() < MIN_KEY_LEN {
            return Err(CryptStoreError::KeyTooShort {
                role: KeyRole::Integrity,
                min: MIN_KEY_LEN,
                actual: key.len(),
            });
        }
        Ok(Self { key, mac })
    }

    fn sign(&self, text: &str) -> Result<String> {
        self.mac.sign_encoded(self.key, text.as_bytes())
    }

    fn verify(&self, signature: &str, text: &str) -> Result<()> {
        self.mac.verify_encoded(signature, self.key, text.as_bytes())
    }
}

impl std::fmt::Debug for SigningKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key", &"[REDACTED]")
            .field("mac", &self.mac)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// One signed, timestamped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    pub timestamp: DateTime<Utc>,
    pub payload: String,
    /// Base64 HMAC over the signing text.
    pub signature: String,
}

/// JSON shape of a vault.  Every field is optional on read so that a
/// missing timestamp is reported as a state error rather than a parse error.
#[derive(Serialize, Deserialize)]
struct VaultJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ts: Option<String>,
    #[serde(default)]
    payload: String,
    #[serde(default)]
    signature: String,
}

impl Vault {
    /// Sign `payload` for `key` at `timestamp`.
    pub fn new(
        signing: &SigningKey<'_>,
        key: &Key,
        timestamp: DateTime<Utc>,
        payload: impl Into<String>,
    ) -> Result<Self> {
        let payload = payload.into();
        let signature = signing.sign(&signing_text(key, &timestamp, &payload))?;
        Ok(Self {
            timestamp,
            payload,
            signature,
        })
    }

    /// Recompute the signature for `key` and compare it in constant time.
    pub fn verify(&self, signing: &SigningKey<'_>, key: &Key) -> Result<()> {
        signing.verify(
            &self.signature,
            &signing_text(key, &self.timestamp, &self.payload),
        )
    }

    /// Compact JSON form used for data lines and metadata entries.
    pub fn to_json(&self) -> Result<String> {
        let wire = VaultJson {
            ts: Some(format_timestamp(&self.timestamp)),
            payload: self.payload.clone(),
            signature: self.signature.clone(),
        };
        serde_json::to_string(&wire)
            .map_err(|e| CryptStoreError::SerializationError(format!("vault: {e}")))
    }

    /// Parse the compact JSON form.  Does not verify the signature.
    pub fn from_json(text: &str) -> Result<Self> {
        let wire: VaultJson = serde_json::from_str(text)
            .map_err(|e| CryptStoreError::MalformedInput(format!("vault JSON: {e}")))?;
        let ts = wire
            .ts
            .ok_or_else(|| CryptStoreError::InvalidState("vault has no timestamp".into()))?;
        Ok(Self {
            timestamp: parse_timestamp(&ts)?,
            payload: wire.payload,
            signature: wire.signature,
        })
    }
}

fn signing_text(key: &Key, timestamp: &DateTime<Utc>, payload: &str) -> String {
    format!(
        "{}{FIELD_JOIN}{}{FIELD_JOIN}{}{FIELD_JOIN}{}",
        key.namespace(),
        key.identifier(),
        format_timestamp(timestamp),
        payload
    )
}

// ---------------------------------------------------------------------------
// Meta
// ---------------------------------------------------------------------------

/// Content of a key's metadata file.
///
/// `payload` holds the version-tag vault as JSON, or as a base64 cipher
/// package of that JSON when `encrypted` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "entry")]
    pub payload: String,
    pub encrypted: bool,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A vault together with the key it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub vault: Vault,
}

/// Render `record` as one line of transport text.
///
/// The record's signature must verify under `signing`, and the payload may
/// not contain the field separator or a line break.
pub fn serialize(record: &Record, signing: &SigningKey<'_>) -> Result<String> {
    record.vault.verify(signing, &record.key)?;

    let payload = &record.vault.payload;
    if payload.contains(RECORD_SEPARATOR) || payload.contains(['\n', '\r']) {
        return Err(CryptStoreError::MalformedInput(
            "payload cannot be written as a single record line".into(),
        ));
    }

    let fields = [
        record.vault.signature.clone(),
        format_timestamp(&record.vault.timestamp),
        record.key.namespace().to_string(),
        record.key.kind().to_string(),
        record.key.identifier().to_string(),
        payload.clone(),
    ];
    Ok(fields.join(RECORD_SEPARATOR))
}

/// Parse transport lines back into records, verifying every signature.
///
/// Stops at the first line that is malformed or fails verification.
pub fn deserialize<S: AsRef<str>>(signing: &SigningKey<'_>, texts: &[S]) -> Result<Vec<Record>> {
    texts
        .iter()
        .map(|text| deserialize_one(signing, text.as_ref()))
        .collect()
}

fn deserialize_one(signing: &SigningKey<'_>, text: &str) -> Result<Record> {
    let fields: Vec<&str> = text.split(RECORD_SEPARATOR).collect();
    if fields.len() != RECORD_FIELDS {
        return Err(CryptStoreError::MalformedInput(format!(
            "expected {RECORD_FIELDS} fields, found {}",
            fields.len()
        )));
    }

    let kind: KeyKind = fields[3].parse()?;
    let key = Key::parse(fields[2], fields[4], kind)?;
    let vault = Vault {
        timestamp: parse_timestamp(fields[1])?,
        payload: fields[5].to_string(),
        signature: fields[0].to_string(),
    };
    vault.verify(signing, &key)?;

    Ok(Record { key, vault })
}
