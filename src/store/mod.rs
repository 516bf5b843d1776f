//! Append-only, per-key record store.
//!
//! This module provides:
//! - `Key`, `KeyKind` and `Identifier` (`key`)
//! - Signed `Vault`s, `Meta` entries and the `Record` transport codec (`record`)
//! - The `Persistence` collaborator and its directory-backed `FileStore` (`persist`)
//! - `StoreManager`, which drives register/insert/get/delete/keys/import (`manager`)

pub mod key;
pub mod manager;
pub mod persist;
pub mod record;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{CryptStoreError, Result};

pub use key::{Identifier, Key, KeyKind};
pub use manager::{Appended, StoreManager, StoreOptions};
pub use persist::{FileStore, Persistence};
pub use record::{deserialize, serialize, Meta, Record, SigningKey, Vault};

/// Separator between the fields of a record's transport text.
pub const RECORD_SEPARATOR: &str = " ::: ";

/// Format a timestamp as RFC 3339 in UTC with nanosecond precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC 3339 timestamp (any offset) into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CryptStoreError::MalformedInput(format!("invalid timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_utc_with_nanoseconds() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-02T03:04:05.000000000Z");
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let ts = parse_timestamp("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn garbage_timestamp_is_malformed() {
        assert!(matches!(
            parse_timestamp("not a time"),
            Err(CryptStoreError::MalformedInput(_))
        ));
    }
}
