//! Typed identifiers for users and rooms.
//!
//! Ids are assigned by the document store when a document is created and
//! are opaque to the client. They wrap the raw string so a room id can
//! never be passed where a user id is expected. `short()` is for log and
//! UI display only, never a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user identifier (the `Users/{id}` document id).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// A room identifier (the `Rooms/{id}` document id).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a store-assigned id.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters, for human display only.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }

            /// Parse a stored value; an empty string means "absent".
            pub fn from_stored(value: &str) -> Option<Self> {
                if value.is_empty() {
                    None
                } else {
                    Some(Self(value.to_string()))
                }
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<$T> for String {
            fn from(id: $T) -> String {
                id.0
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $T {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(UserId, "UserId");
impl_typed_id!(RoomId, "RoomId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_truncates_long_ids() {
        let id = RoomId::new("0192f1c2a4b37c5d8e9f");
        assert_eq!(id.short(), "0192f1c2");
        assert_eq!(format!("{id:?}"), "RoomId(0192f1c2)");
    }

    #[test]
    fn test_short_keeps_short_ids() {
        let id = UserId::new("u1");
        assert_eq!(id.short(), "u1");
    }

    #[test]
    fn test_from_stored_empty_is_none() {
        assert_eq!(UserId::from_stored(""), None);
        assert_eq!(UserId::from_stored("abc"), Some(UserId::new("abc")));
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = UserId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let parsed: UserId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_compare_with_str() {
        assert!(RoomId::new("r1") == *"r1");
    }
}
