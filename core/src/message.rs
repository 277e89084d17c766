//! Messages returned by partition iterators.
//!
//! A message carries three parts:
//!
//! - **headers**: system properties set by the driver when the message is
//!   stored (id, partition, offset, timestamps; see [`crate::property_keys::message`])
//! - **properties**: user properties set by the producer
//! - **body**: opaque bytes
//!
//! Typed bodies are encoded with `bincode`, the same compact binary format
//! used elsewhere in the workspace.
//!
//! # Example
//!
//! ```
//! use openmessaging_core::message::Message;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct OrderPlaced { order_id: String, total_cents: u64 }
//!
//! let event = OrderPlaced { order_id: "o-1".into(), total_cents: 1250 };
//! let message = Message::from_value(&event).unwrap();
//! let decoded: OrderPlaced = message.decode().unwrap();
//! assert_eq!(decoded, event);
//! ```

use crate::error::{OmsError, Result};
use crate::identifiers::PartitionId;
use crate::key_value::KeyValue;
use crate::property_keys::message as headers;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

/// A single message stored in a partition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    headers: KeyValue,
    properties: KeyValue,
    body: Vec<u8>,
}

impl Message {
    /// Create a message with the given body and no properties.
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: KeyValue::new(),
            properties: KeyValue::new(),
            body: body.into(),
        }
    }

    /// Create a message whose body is the bincode encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::Serialization`] if the value cannot be encoded.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let body = bincode::serialize(value).map_err(|e| OmsError::Serialization(e.to_string()))?;
        Ok(Self::new(body))
    }

    /// Decode the body from bincode into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::Serialization`] if the body is not a valid encoding of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        bincode::deserialize(&self.body).map_err(|e| OmsError::Serialization(e.to_string()))
    }

    /// Replace the user properties.
    #[must_use]
    pub fn with_properties(mut self, properties: KeyValue) -> Self {
        self.properties = properties;
        self
    }

    /// Add a single user property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.properties.put(key, value);
        self
    }

    /// Set the producer-side creation time.
    #[must_use]
    pub fn born_at(mut self, at: DateTime<Utc>) -> Self {
        self.headers
            .put(headers::BORN_TIMESTAMP, at.timestamp_millis());
        self
    }

    /// Stamp the system headers a driver assigns on store.
    ///
    /// A born timestamp already set by the producer is kept; otherwise it
    /// defaults to the store time.
    pub fn stamp(
        &mut self,
        message_id: &str,
        partition: &PartitionId,
        offset: u64,
        stored_at: DateTime<Utc>,
    ) {
        let millis = stored_at.timestamp_millis();
        self.headers
            .put(headers::MESSAGE_ID, message_id)
            .put(headers::PARTITION, partition)
            .put(headers::OFFSET, offset)
            .put(headers::STORE_TIMESTAMP, millis);
        if !self.headers.contains_key(headers::BORN_TIMESTAMP) {
            self.headers.put(headers::BORN_TIMESTAMP, millis);
        }
    }

    /// System headers.
    #[must_use]
    pub const fn headers(&self) -> &KeyValue {
        &self.headers
    }

    /// User properties.
    #[must_use]
    pub const fn properties(&self) -> &KeyValue {
        &self.properties
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the message, returning the body.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Driver-assigned message id, once stored.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get_string(headers::MESSAGE_ID)
    }

    /// Partition the message was stored in.
    #[must_use]
    pub fn partition(&self) -> Option<PartitionId> {
        self.headers.get_string(headers::PARTITION).map(PartitionId::new)
    }

    /// Offset within the partition.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.headers
            .get_string(headers::OFFSET)
            .and_then(|raw| raw.parse().ok())
    }

    /// Time the message was stored.
    #[must_use]
    pub fn store_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp(headers::STORE_TIMESTAMP)
    }

    /// Producer-side creation time.
    #[must_use]
    pub fn born_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp(headers::BORN_TIMESTAMP)
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let millis = self.headers.get_long(key).ok().flatten()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message {{ id: {}, offset: {}, size: {} bytes }}",
            self.message_id().unwrap_or("-"),
            self.offset().map_or_else(|| "-".to_string(), |o| o.to_string()),
            self.body.len()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stamp_sets_system_headers() {
        let stored_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut message = Message::new(b"payload".to_vec());
        message.stamp("m-1", &PartitionId::new("3"), 42, stored_at);

        assert_eq!(message.message_id(), Some("m-1"));
        assert_eq!(message.partition(), Some(PartitionId::new("3")));
        assert_eq!(message.offset(), Some(42));
        assert_eq!(message.store_timestamp(), Some(stored_at));
        assert_eq!(message.born_timestamp(), Some(stored_at));
    }

    #[test]
    fn stamp_keeps_producer_born_timestamp() {
        let born = Utc.timestamp_millis_opt(1_000).unwrap();
        let stored = Utc.timestamp_millis_opt(2_000).unwrap();
        let mut message = Message::new(Vec::new()).born_at(born);
        message.stamp("m-2", &PartitionId::new("0"), 0, stored);

        assert_eq!(message.born_timestamp(), Some(born));
        assert_eq!(message.store_timestamp(), Some(stored));
    }

    #[test]
    fn decode_rejects_foreign_body() {
        let message = Message::new(vec![1]);
        let err = message.decode::<String>().unwrap_err();
        assert!(matches!(err, OmsError::Serialization(_)));
    }

    #[test]
    fn display_before_store() {
        let message = Message::new(vec![0; 5]).with_property("k", "v");
        assert_eq!(message.to_string(), "Message { id: -, offset: -, size: 5 bytes }");
        assert_eq!(message.properties().get_string("k"), Some("v"));
    }
}
