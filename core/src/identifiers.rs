//! Strongly typed identifiers for queues, partitions and consumers.
//!
//! All three are plain strings on the wire. The newtypes exist so a
//! partition id cannot be passed where a consumer id is expected.
//!
//! # Validation
//!
//! - `FromStr::from_str()`: validates input (rejects empty strings)
//! - `From::from()` and `new()`: no validation (trusted, application-controlled input)
//!
//! # Examples
//!
//! ```
//! use openmessaging_core::identifiers::{ConsumerId, PartitionId};
//!
//! let partition = PartitionId::new("0");
//! assert_eq!(partition.as_str(), "0");
//!
//! let parsed: ConsumerId = "billing-1".parse().unwrap();
//! assert_eq!(parsed, ConsumerId::new("billing-1"));
//!
//! assert!("".parse::<ConsumerId>().is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an empty identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind}: {reason}")]
pub struct ParseIdError {
    kind: &'static str,
    reason: String,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", $kind, " from a string.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[doc = concat!("Get the ", $kind, " as a string slice.")]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[doc = concat!("Convert the ", $kind, " into its inner `String`.")]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    return Err(ParseIdError {
                        kind: $kind,
                        reason: "cannot be empty".to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Name of a queue, the messaging resource a consumer is bound to.
    QueueName,
    "queue name"
);

string_id!(
    /// Identifier of one partition within a queue.
    ///
    /// Partition ids are only unique inside their queue.
    PartitionId,
    "partition id"
);

string_id!(
    /// Unique identifier of a consumer instance.
    ConsumerId,
    "consumer id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty() {
        let err = "".parse::<PartitionId>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid partition id: cannot be empty");
    }

    #[test]
    fn ids_order_lexicographically() {
        let mut ids = vec![ConsumerId::new("b"), ConsumerId::new("a"), ConsumerId::new("c")];
        ids.sort();
        assert_eq!(
            ids,
            vec![ConsumerId::new("a"), ConsumerId::new("b"), ConsumerId::new("c")]
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&QueueName::new("orders")).unwrap();
        assert_eq!(json, "\"orders\"");
    }
}
