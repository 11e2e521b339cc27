//! Collaboration identifiers.
//!
//! A collaboration is named by a UUID. The raw 16 bytes double as the salt
//! for key derivation, so two collaborations sharing a secret never share
//! keys.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollaborationId(Uuid);

impl CollaborationId {
    /// Creates a random collaboration ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a collaboration ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the 16 raw bytes of the UUID.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parses a collaboration ID from its hyphenated textual form.
    ///
    /// Surrounding whitespace is ignored. Anything that is not a well-formed
    /// UUID, including the empty string, is rejected.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let trimmed = s.trim();
        // uuid also accepts simple/braced/urn forms; collaboration ids are
        // always written hyphenated.
        if trimmed.len() != 36 {
            return Err(Error::InvalidCollaborationId(s.to_string()));
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| Error::InvalidCollaborationId(s.to_string()))
    }
}

impl Default for CollaborationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CollaborationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for CollaborationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CollaborationId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CollaborationId> for String {
    fn from(id: CollaborationId) -> Self {
        id.to_string()
    }
}
