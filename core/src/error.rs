//! Error types shared by every OpenMessaging operation.
//!
//! The contract carries a single error enum so that trait objects
//! (`Box<dyn PartitionIterator>`, `Arc<dyn ResourceManager>`) can be used
//! without generic error parameters.

use crate::identifiers::{ConsumerId, PartitionId, QueueName};
use crate::lifecycle::LifecycleState;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during consumer, iterator and resource operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OmsError {
    /// The queue does not exist (or was deleted).
    #[error("Unknown queue: {0}")]
    UnknownQueue(QueueName),

    /// A queue with this name already exists.
    #[error("Queue already exists: {0}")]
    QueueAlreadyExists(QueueName),

    /// The partition is not a member of the queue.
    #[error("Unknown partition '{partition}' in queue '{queue}'")]
    UnknownPartition {
        /// The queue that was searched
        queue: QueueName,
        /// The partition that was requested
        partition: PartitionId,
    },

    /// No consumer with this id is known to the resource manager.
    #[error("Unknown consumer: {0}")]
    UnknownConsumer(ConsumerId),

    /// The operation requires a running service.
    #[error("Service is not running (state: {state})")]
    NotRunning {
        /// The state the service was in
        state: LifecycleState,
    },

    /// A lifecycle transition is not allowed from the current state.
    #[error("Cannot {operation} a service in state {state}")]
    InvalidState {
        /// The state the service was in
        state: LifecycleState,
        /// The rejected operation (e.g. "startup")
        operation: &'static str,
    },

    /// No result was available within the operation timeout.
    #[error("Operation timed out after {0:?}")]
    OperationTimeout(Duration),

    /// The requested offset lies outside the partition's retained range.
    #[error("Offset {offset} out of range for partition '{partition}' (valid: {first}..={end})")]
    OffsetOutOfRange {
        /// The partition being positioned
        partition: PartitionId,
        /// The requested offset
        offset: u64,
        /// Earliest retained offset
        first: u64,
        /// Offset of the next message to be appended
        end: u64,
    },

    /// A property value is missing, malformed or out of range.
    #[error("Invalid property '{key}': {reason}")]
    InvalidProperty {
        /// The offending key
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A message body could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for OpenMessaging operations.
pub type Result<T> = std::result::Result<T, OmsError>;

impl OmsError {
    /// Shorthand for [`OmsError::InvalidProperty`].
    pub fn invalid_property(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProperty {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors a caller may resolve by retrying later.
    ///
    /// Only timeouts qualify: every other variant describes a topology,
    /// lifecycle or input problem that a retry will not change.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::OperationTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_partition_names_queue_and_partition() {
        let err = OmsError::UnknownPartition {
            queue: QueueName::new("orders"),
            partition: PartitionId::new("7"),
        };
        let message = err.to_string();
        assert!(message.contains("orders"));
        assert!(message.contains("'7'"));
    }

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(OmsError::OperationTimeout(Duration::from_millis(10)).is_retryable());
        assert!(!OmsError::UnknownQueue(QueueName::new("q")).is_retryable());
        assert!(
            !OmsError::NotRunning {
                state: LifecycleState::Stopped
            }
            .is_retryable()
        );
    }
}
