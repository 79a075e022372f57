//! Session identifier type.
//!
//! Generated identifiers use TypeID format: `sess_01h455vb4pex5vsknk084sn02q`.
//! Client-supplied identifiers are accepted as long as they are safe to use
//! as a single directory name, since every session owns
//! `<workspace_root>/<session_id>`.

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a session identifier.
const MAX_LEN: usize = 128;

/// A validated session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

/// Error returned when attempting to create an invalid session ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidSessionId {
    /// The identifier was empty
    Empty,
    /// The identifier exceeded the maximum length
    TooLong {
        /// The actual length
        len: usize,
    },
    /// The identifier contained a character outside `[A-Za-z0-9_-]`
    InvalidCharacter {
        /// The offending character
        ch: char,
    },
}

impl fmt::Display for InvalidSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "session ID cannot be empty"),
            Self::TooLong { len } => {
                write!(f, "session ID is {len} characters; maximum is {MAX_LEN}")
            }
            Self::InvalidCharacter { ch } => write!(
                f,
                "session ID contains invalid character '{ch}'; use only letters, digits, '_' and '-'"
            ),
        }
    }
}

impl std::error::Error for InvalidSessionId {}

impl SessionId {
    /// The TypeID prefix for generated session identifiers.
    pub const PREFIX: &'static str = "sess";

    /// Creates a new session ID with a fresh UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>().to_string())
    }

    /// Parses and validates a client-supplied session ID.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionId` if the string is empty, too long, or
    /// contains characters that are not path-safe.
    pub fn parse(s: &str) -> Result<Self, InvalidSessionId> {
        if s.is_empty() {
            return Err(InvalidSessionId::Empty);
        }
        if s.len() > MAX_LEN {
            return Err(InvalidSessionId::TooLong { len: s.len() });
        }
        if let Some(ch) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(InvalidSessionId::InvalidCharacter { ch });
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_prefixed_id() {
        let id = SessionId::new();
        assert!(id.as_str().starts_with("sess_"));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn generated_id_parses_back() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn parse_accepts_uuid_style_ids() {
        let id = SessionId::parse("3f2b8c1e-9a4d-4e7b-8f00-123456789abc").unwrap();
        assert_eq!(id.to_string(), "3f2b8c1e-9a4d-4e7b-8f00-123456789abc");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(SessionId::parse(""), Err(InvalidSessionId::Empty));
    }

    #[test]
    fn parse_rejects_path_traversal() {
        assert_eq!(
            SessionId::parse("../etc"),
            Err(InvalidSessionId::InvalidCharacter { ch: '.' })
        );
        assert!(SessionId::parse("a/b").is_err());
    }

    #[test]
    fn parse_rejects_overlong_ids() {
        let long = "a".repeat(MAX_LEN + 1);
        assert_eq!(
            SessionId::parse(&long),
            Err(InvalidSessionId::TooLong { len: MAX_LEN + 1 })
        );
    }

    #[test]
    fn serde_roundtrip_validates() {
        let id = SessionId::parse("abc_123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc_123\"");
        let bad: Result<SessionId, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}
