//! The streaming consumer contract.
//!
//! A queue is divided into partitions. A [`StreamingConsumer`] is one
//! consumer's handle over those partitions: it reports the queue topology
//! and its own configuration, and creates a [`PartitionIterator`] per
//! partition to read messages like an iterator.
//!
//! Starting and stopping is a separate capability, [`ServiceLifecycle`].
//! Drivers implement both; code that needs both bounds can use
//! [`LifecycleStreamingConsumer`].
//!
//! # Example
//!
//! ```ignore
//! use openmessaging_core::consumer::LifecycleStreamingConsumer;
//!
//! async fn tail_all(consumer: &dyn LifecycleStreamingConsumer) -> Result<(), OmsError> {
//!     consumer.startup().await?;
//!     for partition in consumer.partitions().await? {
//!         let mut iterator = consumer.partition_iterator(&partition).await?;
//!         while iterator.has_next().await? {
//!             let message = iterator.next().await?;
//!             println!("{partition}: {message}");
//!         }
//!         iterator.commit().await?;
//!     }
//!     consumer.shutdown().await
//! }
//! ```
//!
//! [`PartitionIterator`]: crate::iterator::PartitionIterator

use crate::error::Result;
use crate::identifiers::{ConsumerId, PartitionId, QueueName};
use crate::iterator::BoxPartitionIterator;
use crate::key_value::KeyValue;
use crate::lifecycle::ServiceLifecycle;
use std::future::Future;
use std::pin::Pin;

/// A consumer's view of the partitions of one queue.
///
/// # Snapshots
///
/// Every query returns an owned, point-in-time value. In particular
/// `properties()` is never a live view: mutate a consumer's configuration
/// through `ResourceManager::set_consumer_properties` instead.
///
/// # Thread Safety
///
/// Handles are `Send + Sync`; the query methods may be called from many
/// tasks at once. Iterators are confined to one task (see
/// [`crate::iterator`]).
///
/// # Dyn Compatibility
///
/// Async operations return `Pin<Box<dyn Future>>` so that consumers can be
/// used as `Arc<dyn StreamingConsumer>`.
pub trait StreamingConsumer: Send + Sync {
    /// The queue this consumer is bound to.
    fn queue(&self) -> &QueueName;

    /// Snapshot of this consumer's properties.
    ///
    /// Always contains [`CONSUMER_ID`](crate::property_keys::CONSUMER_ID) and
    /// [`OPERATION_TIMEOUT`](crate::property_keys::OPERATION_TIMEOUT).
    /// Changes to the returned value are not reflected in the consumer.
    fn properties(&self) -> KeyValue;

    /// All partitions of the queue, in creation order.
    ///
    /// # Errors
    ///
    /// - [`OmsError::NotRunning`](crate::error::OmsError::NotRunning) unless started
    /// - [`OmsError::UnknownQueue`](crate::error::OmsError::UnknownQueue) if the queue was deleted
    fn partitions(&self) -> Pin<Box<dyn Future<Output = Result<Vec<PartitionId>>> + Send + '_>>;

    /// All running consumers of the queue, sorted by id.
    ///
    /// # Errors
    ///
    /// - [`OmsError::NotRunning`](crate::error::OmsError::NotRunning) unless started
    /// - [`OmsError::UnknownQueue`](crate::error::OmsError::UnknownQueue) if the queue was deleted
    fn consumers(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ConsumerId>>> + Send + '_>>;

    /// Create an iterator over `partition` using this consumer's properties.
    ///
    /// # Errors
    ///
    /// - [`OmsError::NotRunning`](crate::error::OmsError::NotRunning) unless started
    /// - [`OmsError::UnknownPartition`](crate::error::OmsError::UnknownPartition) if
    ///   `partition` is not in `partitions()`
    fn partition_iterator(
        &self,
        partition: &PartitionId,
    ) -> Pin<Box<dyn Future<Output = Result<BoxPartitionIterator>> + Send + '_>> {
        self.partition_iterator_with(partition, KeyValue::new())
    }

    /// Create an iterator over `partition` with preset properties.
    ///
    /// `properties` overlay the consumer's properties for this iterator
    /// only; the consumer and its other iterators are unaffected.
    ///
    /// # Errors
    ///
    /// Same as [`partition_iterator`](Self::partition_iterator), plus
    /// [`OmsError::InvalidProperty`](crate::error::OmsError::InvalidProperty) for a
    /// malformed override.
    fn partition_iterator_with(
        &self,
        partition: &PartitionId,
        properties: KeyValue,
    ) -> Pin<Box<dyn Future<Output = Result<BoxPartitionIterator>> + Send + '_>>;
}

/// A streaming consumer together with its lifecycle.
///
/// Blanket-implemented for every type implementing both traits.
pub trait LifecycleStreamingConsumer: ServiceLifecycle + StreamingConsumer {}

impl<T: ServiceLifecycle + StreamingConsumer + ?Sized> LifecycleStreamingConsumer for T {}
