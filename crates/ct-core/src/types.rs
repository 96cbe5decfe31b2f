//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown category name.
    #[error("invalid category: {value}")]
    InvalidCategory { value: String },

    /// Phase thresholds out of order.
    #[error("phase thresholds must satisfy green >= yellow >= red >= white, got {rules}")]
    UnorderedThresholds { rules: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated agenda item identifier.
    ///
    /// Item IDs are opaque, non-blank strings. Timer instances and snapshots
    /// are keyed by them, so uniqueness within a meeting is the caller's job.
    ItemId, "item ID"
);

/// Identifier of a personal sub-timer within one parent timer.
///
/// Allocated sequentially by the owning set and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubTimerId(pub u32);

impl fmt::Display for SubTimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_rejects_empty() {
        assert!(ItemId::new("").is_err());
        assert!(ItemId::new("   ").is_err());
        assert!(ItemId::new("item-1").is_ok());
    }

    #[test]
    fn item_id_serde_roundtrip() {
        let id = ItemId::new("item-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"item-123\"");
        let parsed: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn item_id_serde_rejects_empty() {
        let result: Result<ItemId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn item_id_as_ref() {
        let id = ItemId::new("speech-2").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "speech-2");
    }

    #[test]
    fn sub_timer_id_is_transparent_in_json() {
        let json = serde_json::to_string(&SubTimerId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
