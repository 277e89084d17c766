//! # OpenMessaging Core
//!
//! Core traits and types for the OpenMessaging streaming consumer API.
//!
//! A queue is divided into partitions. A streaming consumer is a handle
//! over the partitions of one queue that can hand out an iterator per
//! partition. This crate defines that contract and nothing else: drivers
//! (such as `openmessaging-memory`) provide the implementations.
//!
//! ## Core Concepts
//!
//! - **[`StreamingConsumer`]**: topology queries and iterator factory
//! - **[`ServiceLifecycle`]**: start/stop capability, composed with the consumer
//! - **[`PartitionIterator`]**: bidirectional cursor over one partition
//! - **[`ResourceManager`]**: queue administration and live consumer configuration
//! - **[`KeyValue`]**: the property bag used for all configuration
//!
//! ## Example
//!
//! ```ignore
//! use openmessaging_core::prelude::*;
//!
//! async fn drain(consumer: &dyn LifecycleStreamingConsumer) -> Result<usize> {
//!     consumer.startup().await?;
//!     let mut read = 0;
//!     for partition in consumer.partitions().await? {
//!         let mut iterator = consumer.partition_iterator(&partition).await?;
//!         while iterator.has_next().await? {
//!             iterator.next().await?;
//!             read += 1;
//!         }
//!         iterator.commit().await?;
//!     }
//!     consumer.shutdown().await?;
//!     Ok(read)
//! }
//! ```
//!
//! [`StreamingConsumer`]: consumer::StreamingConsumer
//! [`ServiceLifecycle`]: lifecycle::ServiceLifecycle
//! [`PartitionIterator`]: iterator::PartitionIterator
//! [`ResourceManager`]: resource_manager::ResourceManager
//! [`KeyValue`]: key_value::KeyValue

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Clock abstraction for message timestamps.
pub mod clock;

/// Typed view of the standard consumer properties.
pub mod config;

/// The streaming consumer contract.
pub mod consumer;

/// Error taxonomy.
pub mod error;

/// Queue, partition and consumer identifiers.
pub mod identifiers;

/// Per-partition iterators.
pub mod iterator;

/// The property bag.
pub mod key_value;

/// Start/stop lifecycle.
pub mod lifecycle;

/// Messages and typed bodies.
pub mod message;

/// Standard property keys.
pub mod property_keys;

/// Queue and consumer administration.
pub mod resource_manager;

/// Everything needed to use a consumer, in one import.
pub mod prelude {
    pub use crate::config::{AutoOffsetReset, ConsumerConfig};
    pub use crate::consumer::{LifecycleStreamingConsumer, StreamingConsumer};
    pub use crate::error::{OmsError, Result};
    pub use crate::identifiers::{ConsumerId, PartitionId, QueueName};
    pub use crate::iterator::{BoxPartitionIterator, PartitionIterator, into_stream};
    pub use crate::key_value::KeyValue;
    pub use crate::lifecycle::{LifecycleState, ServiceLifecycle};
    pub use crate::message::Message;
    pub use crate::property_keys;
    pub use crate::resource_manager::ResourceManager;
}
