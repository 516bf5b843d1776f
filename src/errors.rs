use std::fmt;

use thiserror::Error;

/// Which role a key plays in a cryptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Encryption,
    Integrity,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Encryption => f.write_str("encryption"),
            KeyRole::Integrity => f.write_str("integrity"),
        }
    }
}

/// All errors that can occur in CryptStore.
#[derive(Debug, Error)]
pub enum CryptStoreError {
    // --- Key validation ---
    #[error("{role} key too short: need at least {min} bytes, got {actual}")]
    KeyTooShort {
        role: KeyRole,
        min: usize,
        actual: usize,
    },

    #[error("unsupported {role} key length {len}: use 16, 24 or 32 bytes")]
    UnsupportedKeyLength { role: KeyRole, len: usize },

    #[error("using the same key for encryption and integrity is not allowed")]
    KeysMustDiffer,

    // --- Encryption input ---
    #[error("message too large: {len} bytes exceeds the limit of {max}")]
    MessageTooLarge { len: u64, max: u64 },

    #[error("additional data too large: {0} bytes exceeds the limit of 65535")]
    AdditionalDataTooLarge(usize),

    #[error("randomness source unavailable: {0}")]
    RandomnessUnavailable(String),

    // --- Decryption input ---
    #[error("cipher text is invalid")]
    CipherTextInvalid,

    #[error("cipher text is too short")]
    CipherTextTooShort,

    #[error("empty input")]
    EmptyInput,

    #[error("invalid padding")]
    PaddingInvalid,

    // --- Integrity ---
    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("data integrity compromised")]
    IntegrityCompromised,

    #[error("HMAC error: {0}")]
    HmacError(String),

    // --- Store ---
    #[error("key '{0}' already exists")]
    KeyAlreadyExists(String),

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("no entries stored for '{0}'")]
    EntryEmpty(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("{}", mode_mismatch_message(.encrypted))]
    EncryptionModeMismatch { encrypted: bool },

    #[error("timestamps match but payloads do not")]
    ConflictingTimestamp,

    #[error("record is older than the stored one")]
    RecordIsOlder,

    #[error("data in invalid state: {0}")]
    InvalidState(String),

    // --- Keyfile / config ---
    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

fn mode_mismatch_message(encrypted: &bool) -> &'static str {
    if *encrypted {
        "this key is encrypted but was called without an encryption key"
    } else {
        "this key is not encrypted but was called with an encryption key"
    }
}

/// Convenience type alias for CryptStore results.
pub type Result<T> = std::result::Result<T, CryptStoreError>;
