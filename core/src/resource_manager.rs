//! Administration of queues and consumer configuration.
//!
//! The resource manager is the only way to change the live configuration
//! of a consumer. Property snapshots handed out by consumers are detached
//! copies; writing to them has no effect.

use crate::error::Result;
use crate::identifiers::{ConsumerId, QueueName};
use crate::key_value::KeyValue;
use std::future::Future;
use std::pin::Pin;

/// Queue and consumer administration.
///
/// # Dyn Compatibility
///
/// Uses `Pin<Box<dyn Future>>` returns so it can be shared as
/// `Arc<dyn ResourceManager>`.
pub trait ResourceManager: Send + Sync {
    /// Create a queue with `partition_count` partitions.
    ///
    /// # Errors
    ///
    /// - `QueueAlreadyExists` if the name is taken
    /// - `InvalidProperty` if `partition_count` is zero
    fn create_queue(
        &self,
        queue: &QueueName,
        partition_count: u32,
        properties: KeyValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Append `count` new partitions to an existing queue.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQueue` if the queue does not exist.
    fn add_partitions(
        &self,
        queue: &QueueName,
        count: u32,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Delete a queue and all of its messages.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQueue` if the queue does not exist.
    fn delete_queue(&self, queue: &QueueName)
    -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Names of all queues, sorted.
    ///
    /// # Errors
    ///
    /// Drivers may fail if the backing service is unreachable.
    fn list_queues(&self) -> Pin<Box<dyn Future<Output = Result<Vec<QueueName>>> + Send + '_>>;

    /// Snapshot of a queue's properties.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQueue` if the queue does not exist.
    fn queue_properties(
        &self,
        queue: &QueueName,
    ) -> Pin<Box<dyn Future<Output = Result<KeyValue>> + Send + '_>>;

    /// Replace the live configuration of a consumer.
    ///
    /// The consumer's `CONSUMER_ID` cannot be changed and is kept even if
    /// `properties` omits or overrides it.
    ///
    /// # Errors
    ///
    /// - `UnknownConsumer` if no consumer with this id exists
    /// - `InvalidProperty` if a standard property is malformed
    fn set_consumer_properties(
        &self,
        consumer: &ConsumerId,
        properties: KeyValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Snapshot of a consumer's live configuration.
    ///
    /// # Errors
    ///
    /// Returns `UnknownConsumer` if no consumer with this id exists.
    fn consumer_properties(
        &self,
        consumer: &ConsumerId,
    ) -> Pin<Box<dyn Future<Output = Result<KeyValue>> + Send + '_>>;
}
