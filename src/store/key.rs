//! Store keys: a namespace plus a typed identifier.
//!
//! The identifier is a sum type, so its kind is carried by the variant
//! rather than rediscovered at runtime.  Ordering compares the namespace
//! first, then the kind, then the identifier with the kind's own order
//! (lexical, numeric or chronological).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{format_timestamp, parse_timestamp, RECORD_SEPARATOR};
use crate::errors::{CryptStoreError, Result};

/// Separator between the parts of a key's canonical text form.
pub(crate) const KEY_TEXT_SEPARATOR: &str = "$$$";

/// The shape of a key's identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum KeyKind {
    /// Untyped raw identifier.
    None,
    String,
    Integer,
    Timestamp,
}

impl KeyKind {
    /// Name used in file names and the transport text format.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::None => "None",
            KeyKind::String => "String",
            KeyKind::Integer => "Integer",
            KeyKind::Timestamp => "Timestamp",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyKind {
    type Err = CryptStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "None" => Ok(KeyKind::None),
            "String" => Ok(KeyKind::String),
            "Integer" => Ok(KeyKind::Integer),
            "Timestamp" => Ok(KeyKind::Timestamp),
            other => Err(CryptStoreError::MalformedInput(format!(
                "unknown key kind '{other}'"
            ))),
        }
    }
}

/// A key's identifier; the variant is the kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identifier {
    /// Raw text whose kind was not declared.
    Raw(String),
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
}

impl Identifier {
    pub fn kind(&self) -> KeyKind {
        match self {
            Identifier::Raw(_) => KeyKind::None,
            Identifier::Text(_) => KeyKind::String,
            Identifier::Integer(_) => KeyKind::Integer,
            Identifier::Timestamp(_) => KeyKind::Timestamp,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Raw(s) | Identifier::Text(s) => f.write_str(s),
            Identifier::Integer(n) => write!(f, "{n}"),
            Identifier::Timestamp(ts) => f.write_str(&format_timestamp(ts)),
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Text(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::Text(s)
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self {
        Identifier::Integer(n)
    }
}

impl From<DateTime<Utc>> for Identifier {
    fn from(ts: DateTime<Utc>) -> Self {
        Identifier::Timestamp(ts)
    }
}

/// A namespaced store key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    namespace: String,
    identifier: Identifier,
}

impl Key {
    /// Build a key from a typed identifier; the kind follows the value.
    pub fn new(namespace: impl Into<String>, identifier: impl Into<Identifier>) -> Result<Self> {
        let key = Self {
            namespace: namespace.into(),
            identifier: identifier.into(),
        };
        key.validate()?;
        Ok(key)
    }

    /// Build a key from text, parsing it according to `kind`.
    ///
    /// `KeyKind::None` keeps the text as an untyped raw identifier.
    pub fn parse(namespace: impl Into<String>, raw: &str, kind: KeyKind) -> Result<Self> {
        let identifier = match kind {
            KeyKind::None => Identifier::Raw(raw.to_string()),
            KeyKind::String => Identifier::Text(raw.to_string()),
            KeyKind::Integer => Identifier::Integer(raw.parse().map_err(|e| {
                CryptStoreError::MalformedInput(format!("'{raw}' is not an integer: {e}"))
            })?),
            KeyKind::Timestamp => Identifier::Timestamp(parse_timestamp(raw)?),
        };
        Self::new(namespace, identifier)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn kind(&self) -> KeyKind {
        self.identifier.kind()
    }

    fn validate(&self) -> Result<()> {
        let ns = &self.namespace;
        if ns.contains('$') || ns.contains(FIELD_JOIN) || has_reserved(ns) {
            return Err(CryptStoreError::MalformedInput(format!(
                "namespace '{ns}' contains reserved characters"
            )));
        }

        let id = self.identifier.to_string();
        if id.is_empty() {
            return Err(CryptStoreError::MalformedInput(
                "identifier cannot be empty".into(),
            ));
        }
        if has_reserved(&id) {
            return Err(CryptStoreError::MalformedInput(format!(
                "identifier '{id}' contains reserved characters"
            )));
        }
        Ok(())
    }
}

/// Path separators, line breaks and the record separator are never allowed.
/// Join used between the fields of a vault's signing text.
pub(crate) const FIELD_JOIN: &str = ", ";

fn has_reserved(s: &str) -> bool {
    s.contains(['/', '\\', '\n', '\r', '\0']) || s.contains(RECORD_SEPARATOR)
}

/// Canonical text form `namespace$$$Kind$$$identifier`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_TEXT_SEPARATOR}{}{KEY_TEXT_SEPARATOR}{}",
            self.namespace,
            self.kind(),
            self.identifier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn typed_constructor_infers_kind() {
        assert_eq!(Key::new("ns", "abc").unwrap().kind(), KeyKind::String);
        assert_eq!(Key::new("ns", 42i64).unwrap().kind(), KeyKind::Integer);
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Key::new("ns", ts).unwrap().kind(), KeyKind::Timestamp);
    }

    #[test]
    fn parse_respects_kind() {
        let k = Key::parse("ns", "17", KeyKind::Integer).unwrap();
        assert_eq!(k.identifier(), &Identifier::Integer(17));

        let k = Key::parse("ns", "17", KeyKind::None).unwrap();
        assert_eq!(k.identifier(), &Identifier::Raw("17".into()));

        let k = Key::parse("ns", "2024-01-01T00:00:00Z", KeyKind::Timestamp).unwrap();
        assert_eq!(
            k.identifier(),
            &Identifier::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn parse_rejects_bad_integer_and_timestamp() {
        assert!(Key::parse("ns", "abc", KeyKind::Integer).is_err());
        assert!(Key::parse("ns", "yesterday", KeyKind::Timestamp).is_err());
    }

    #[test]
    fn rejects_reserved_characters() {
        assert!(Key::new("a$b", "id").is_err());
        assert!(Key::new("ns", "a/b").is_err());
        assert!(Key::new("ns", "line\nbreak").is_err());
        assert!(Key::new("ns", "x ::: y").is_err());
        assert!(Key::new("ns", "").is_err());
    }

    #[test]
    fn namespace_cannot_contain_field_join() {
        assert!(Key::new("a, b", "c").is_err());
        assert!(Key::new("a,b", "c").is_ok());
        assert!(Key::new("a", "b, c").is_ok());
    }

    #[test]
    fn empty_namespace_is_allowed() {
        assert!(Key::new("", "id").is_ok());
    }

    #[test]
    fn ordering_is_kind_specific() {
        let mut keys = vec![
            Key::new("b", "a").unwrap(),
            Key::new("a", 10i64).unwrap(),
            Key::new("a", 9i64).unwrap(),
            Key::new("a", "zeta").unwrap(),
            Key::new("a", "alpha").unwrap(),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.identifier().to_string()).collect();
        assert_eq!(rendered, vec!["alpha", "zeta", "9", "10", "a"]);
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in [
            KeyKind::None,
            KeyKind::String,
            KeyKind::Integer,
            KeyKind::Timestamp,
        ] {
            assert_eq!(kind.as_str().parse::<KeyKind>().unwrap(), kind);
        }
        assert!("Float".parse::<KeyKind>().is_err());
    }

    #[test]
    fn display_is_canonical() {
        let k = Key::new("ns", 5i64).unwrap();
        assert_eq!(k.to_string(), "ns$$$Integer$$$5");
    }
}
