//! Record identifiers.
//!
//! # ULID ベースの ID
//! The store assigns a ULID to every record on insert. ULIDs sort by creation
//! time and can be generated without coordination, which keeps the in-memory
//! and file-backed stores free of counters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of a stored record.
///
/// Displays as `rec-<ULID>`; [`FromStr`] accepts both that form and a bare ULID.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Ulid);

impl RecordId {
    pub const PREFIX: &'static str = "rec-";

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RecordId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for RecordId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(Self::PREFIX).unwrap_or(s);
        Ulid::from_string(raw).map(Self)
    }
}

/// A record reference as accepted by `reset_records`: either a native id or
/// its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Id(RecordId),
    Raw(String),
}

impl RecordKey {
    /// Resolves the key to an id. Strings that do not parse resolve to `None`
    /// and therefore match no record.
    pub fn resolve(&self) -> Option<RecordId> {
        match self {
            RecordKey::Id(id) => Some(*id),
            RecordKey::Raw(raw) => raw.parse().ok(),
        }
    }
}

impl From<RecordId> for RecordKey {
    fn from(id: RecordId) -> Self {
        RecordKey::Id(id)
    }
}

impl From<&RecordId> for RecordKey {
    fn from(id: &RecordId) -> Self {
        RecordKey::Id(*id)
    }
}

impl From<String> for RecordKey {
    fn from(raw: String) -> Self {
        RecordKey::Raw(raw)
    }
}

impl From<&str> for RecordKey {
    fn from(raw: &str) -> Self {
        RecordKey::Raw(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix_and_parses_back() {
        let id = RecordId::from_ulid(Ulid::new());
        let shown = id.to_string();
        assert!(shown.starts_with("rec-"));
        assert_eq!(shown.parse::<RecordId>().unwrap(), id);
    }

    #[test]
    fn bare_ulid_string_parses() {
        let ulid = Ulid::new();
        let id: RecordId = ulid.to_string().parse().unwrap();
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn record_key_resolution() {
        let id = RecordId::from_ulid(Ulid::new());
        assert_eq!(RecordKey::from(id).resolve(), Some(id));
        assert_eq!(RecordKey::from(id.to_string()).resolve(), Some(id));
        assert_eq!(RecordKey::from("not-an-id").resolve(), None);
    }

    #[test]
    fn serializes_as_plain_ulid_string() {
        let id = RecordId::from_ulid(Ulid::new());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
