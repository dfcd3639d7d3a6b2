//! Conversation identifiers.
//!
//! Identifiers cross the local/remote boundary constantly: they are storage
//! keys, queue payload fields, and URL path segments. Everything here keeps
//! them in one canonical shape — a lowercase hyphenated UUID string — so a
//! cached value always compares equal to a freshly received one.
//!
//! Two constructors reflect the two trust levels:
//!
//! - [`ConversationId::parse`] enforces the canonical grammar and fails loudly.
//! - [`ConversationId::from_raw`] only normalizes; it is for values arriving
//!   from loosely-typed edges (cached JSON, UI state). Such ids are validated
//!   again at the queue and storage boundaries via [`ConversationId::is_valid`].
//!
//! Messages composed before their conversation exists server-side carry the
//! placeholder id `"new"`, which never passes validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

/// Placeholder marker for a conversation that has not been created remotely.
const PLACEHOLDER: &str = "new";

/// A conversation identifier in canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Parse and validate an identifier against the canonical grammar:
    /// 36 characters, hyphen-grouped hexadecimal. The result is normalized
    /// to lowercase.
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if is_canonical_uuid(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ChatError::InvalidId {
                raw: raw.to_string(),
            })
        }
    }

    /// Normalize without validating. Used at trust boundaries where an
    /// identifier may still be the placeholder or junk from a stale cache;
    /// callers must check [`is_valid`](Self::is_valid) before persisting or
    /// transmitting it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_ascii_lowercase())
    }

    /// The placeholder id for messages whose conversation does not exist yet.
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER.to_string())
    }

    /// Generate a fresh random identifier (client-side temporary use).
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Whether this id satisfies the canonical grammar. The placeholder is
    /// never valid.
    pub fn is_valid(&self) -> bool {
        is_canonical_uuid(&self.0)
    }

    /// Whether this is the placeholder id.
    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ChatError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// Canonical form check: hyphenated lowercase only, no braces, no simple
/// (un-hyphenated) form. Version and variant nibbles are deliberately not
/// constrained; the remote store issues ids of more than one version and
/// rejecting a real id loses user data, while accepting a malformed one
/// merely 404s.
fn is_canonical_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    s.char_indices().all(|(i, c)| match i {
        8 | 13 | 18 | 23 => c == '-',
        _ => c.is_ascii_hexdigit() && !c.is_ascii_uppercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_uuid() {
        let id = ConversationId::parse("11111111-1111-1111-8111-111111111111").unwrap();
        assert!(id.is_valid());
        assert_eq!(id.as_str(), "11111111-1111-1111-8111-111111111111");
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id = ConversationId::parse("11111111-1111-4111-A111-111111111111").unwrap();
        assert_eq!(id.as_str(), "11111111-1111-4111-a111-111111111111");
    }

    #[test]
    fn test_parse_rejects_junk() {
        assert!(ConversationId::parse("not-a-uuid").is_err());
        assert!(ConversationId::parse("").is_err());
        // Right characters, wrong grouping.
        assert!(ConversationId::parse("111111111111-1111-1111-111111111111").is_err());
        // Simple (un-hyphenated) form is not canonical.
        assert!(ConversationId::parse("11111111111111111111111111111111").is_err());
        // Non-hex character.
        assert!(ConversationId::parse("g1111111-1111-1111-1111-111111111111").is_err());
    }

    #[test]
    fn test_all_ones_id_is_accepted() {
        let id = ConversationId::parse("11111111-1111-1111-1111-111111111111").unwrap();
        assert!(id.is_valid());
    }

    #[test]
    fn test_placeholder_is_never_valid() {
        let id = ConversationId::placeholder();
        assert!(id.is_placeholder());
        assert!(!id.is_valid());
    }

    #[test]
    fn test_from_raw_defers_validation() {
        let id = ConversationId::from_raw("Garbage");
        assert_eq!(id.as_str(), "garbage");
        assert!(!id.is_valid());
    }

    #[test]
    fn test_random_is_valid() {
        assert!(ConversationId::random().is_valid());
    }

    #[test]
    fn test_serde_round_trip_is_transparent() {
        let id = ConversationId::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        let back: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
