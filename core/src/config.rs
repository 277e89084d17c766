//! Typed consumer configuration.
//!
//! Configuration travels as a [`KeyValue`] bag through the contract. This
//! module is the typed view of the standard keys: parse a bag with
//! [`ConsumerConfig::from_properties`], write one with
//! [`ConsumerConfig::to_properties`], or load defaults from the environment
//! with [`ConsumerConfig::from_env`].

use crate::error::{OmsError, Result};
use crate::identifiers::ConsumerId;
use crate::key_value::KeyValue;
use crate::property_keys::{
    AUTO_OFFSET_RESET, CONSUMER_ID, DEFAULT_OPERATION_TIMEOUT_MS, OPERATION_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Where an iterator starts when its consumer has no committed offset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoOffsetReset {
    /// Start from the earliest retained message.
    #[default]
    Earliest,
    /// Start after the last stored message (only new messages).
    Latest,
}

impl AutoOffsetReset {
    /// The property value for this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for AutoOffsetReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoOffsetReset {
    type Err = OmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(OmsError::invalid_property(
                AUTO_OFFSET_RESET,
                format!("expected 'earliest' or 'latest', got '{other}'"),
            )),
        }
    }
}

/// Typed view of a consumer's standard properties.
///
/// # Example
///
/// ```
/// use openmessaging_core::config::{AutoOffsetReset, ConsumerConfig};
/// use std::time::Duration;
///
/// let config = ConsumerConfig::default()
///     .with_operation_timeout(Duration::from_millis(250))
///     .with_auto_offset_reset(AutoOffsetReset::Latest);
///
/// let props = config.to_properties();
/// assert_eq!(props.get_string("OPERATION_TIMEOUT"), Some("250"));
/// assert_eq!(ConsumerConfig::from_properties(&props).unwrap(), config);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Explicit consumer id; drivers generate one when `None`.
    pub consumer_id: Option<ConsumerId>,
    /// Timeout for blocking operations (default: 3 seconds).
    pub operation_timeout: Duration,
    /// Start position without a committed offset (default: earliest).
    pub auto_offset_reset: AutoOffsetReset,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            consumer_id: None,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            auto_offset_reset: AutoOffsetReset::default(),
        }
    }
}

impl ConsumerConfig {
    /// Set the consumer id.
    #[must_use]
    pub fn with_consumer_id(mut self, consumer_id: impl Into<ConsumerId>) -> Self {
        self.consumer_id = Some(consumer_id.into());
        self
    }

    /// Set the operation timeout.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the auto offset reset policy.
    #[must_use]
    pub const fn with_auto_offset_reset(mut self, policy: AutoOffsetReset) -> Self {
        self.auto_offset_reset = policy;
        self
    }

    /// Parse the standard keys of a property bag; absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::InvalidProperty`] for a malformed timeout,
    /// offset reset policy or empty consumer id.
    pub fn from_properties(properties: &KeyValue) -> Result<Self> {
        let defaults = Self::default();

        let consumer_id = properties
            .get_string(CONSUMER_ID)
            .map(|raw| {
                raw.parse::<ConsumerId>()
                    .map_err(|e| OmsError::invalid_property(CONSUMER_ID, e.to_string()))
            })
            .transpose()?;

        let operation_timeout = match properties.get_long(OPERATION_TIMEOUT)? {
            Some(millis) => u64::try_from(millis)
                .map(Duration::from_millis)
                .map_err(|_| {
                    OmsError::invalid_property(
                        OPERATION_TIMEOUT,
                        format!("must not be negative, got {millis}"),
                    )
                })?,
            None => defaults.operation_timeout,
        };

        let auto_offset_reset = properties
            .get_string(AUTO_OFFSET_RESET)
            .map(str::parse)
            .transpose()?
            .unwrap_or(defaults.auto_offset_reset);

        Ok(Self {
            consumer_id,
            operation_timeout,
            auto_offset_reset,
        })
    }

    /// Write the standard keys into a new property bag.
    #[must_use]
    pub fn to_properties(&self) -> KeyValue {
        let mut properties = KeyValue::new();
        self.apply_to(&mut properties);
        properties
    }

    /// Write the standard keys into `properties`, replacing existing values.
    pub fn apply_to(&self, properties: &mut KeyValue) {
        if let Some(consumer_id) = &self.consumer_id {
            properties.put(CONSUMER_ID, consumer_id);
        }
        properties
            .put(OPERATION_TIMEOUT, self.operation_timeout.as_millis())
            .put(AUTO_OFFSET_RESET, self.auto_offset_reset);
    }

    /// Load configuration from environment variables.
    ///
    /// - `OMS_CONSUMER_ID`: consumer id (default: generated by the driver)
    /// - `OMS_OPERATION_TIMEOUT_MS`: operation timeout (default: 3000)
    /// - `OMS_AUTO_OFFSET_RESET`: `earliest` or `latest` (default: earliest)
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            consumer_id: lookup("OMS_CONSUMER_ID").and_then(|s| s.parse().ok()),
            operation_timeout: lookup("OMS_OPERATION_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.operation_timeout, Duration::from_millis),
            auto_offset_reset: lookup("OMS_AUTO_OFFSET_RESET")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.auto_offset_reset),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_properties_give_defaults() {
        let config = ConsumerConfig::from_properties(&KeyValue::new()).unwrap();
        assert_eq!(config, ConsumerConfig::default());
        assert_eq!(config.operation_timeout, Duration::from_secs(3));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let props = KeyValue::new().with(OPERATION_TIMEOUT, -5);
        let err = ConsumerConfig::from_properties(&props).unwrap_err();
        assert!(matches!(err, OmsError::InvalidProperty { ref key, .. } if key == OPERATION_TIMEOUT));
    }

    #[test]
    fn unknown_offset_policy_is_rejected() {
        let props = KeyValue::new().with(AUTO_OFFSET_RESET, "middle");
        assert!(ConsumerConfig::from_properties(&props).is_err());
    }

    #[test]
    fn offset_policy_is_case_insensitive() {
        let props = KeyValue::new().with(AUTO_OFFSET_RESET, "LATEST");
        let config = ConsumerConfig::from_properties(&props).unwrap();
        assert_eq!(config.auto_offset_reset, AutoOffsetReset::Latest);
    }

    #[test]
    fn lookup_reads_variables_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OMS_CONSUMER_ID", "tail-1"),
            ("OMS_OPERATION_TIMEOUT_MS", "not-a-number"),
            ("OMS_AUTO_OFFSET_RESET", "latest"),
        ]);
        let config = ConsumerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.consumer_id, Some(ConsumerId::new("tail-1")));
        assert_eq!(config.operation_timeout, Duration::from_secs(3));
        assert_eq!(config.auto_offset_reset, AutoOffsetReset::Latest);
    }

    #[test]
    fn apply_to_keeps_unrelated_keys() {
        let mut props = KeyValue::new().with("REGION", "eu");
        ConsumerConfig::default().with_consumer_id("c-1").apply_to(&mut props);
        assert_eq!(props.get_string("REGION"), Some("eu"));
        assert_eq!(props.get_string(CONSUMER_ID), Some("c-1"));
    }
}
