//! # OpenMessaging In-Memory Driver
//!
//! An in-process implementation of the `openmessaging-core` contract.
//! Queues, partition logs, committed offsets and consumer configuration
//! live in memory behind an [`InMemoryResourceManager`] handle.
//!
//! Useful for tests, demos and single-process pipelines; nothing survives
//! a restart.
//!
//! ## Example
//!
//! ```no_run
//! use openmessaging_core::prelude::*;
//! use openmessaging_memory::InMemoryResourceManager;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<()> {
//! let manager = InMemoryResourceManager::new();
//! let queue = QueueName::new("sensor-readings");
//! manager.create_queue(&queue, 4, KeyValue::new()).await?;
//!
//! let consumer = manager
//!     .streaming_consumer(&queue)
//!     .consumer_id("dashboard")
//!     .operation_timeout(Duration::from_millis(500))
//!     .build()?;
//! consumer.startup().await?;
//!
//! for partition in consumer.partitions().await? {
//!     let mut iterator = consumer.partition_iterator(&partition).await?;
//!     while iterator.has_next().await? {
//!         let message = iterator.next().await?;
//!         println!("{message}");
//!     }
//!     iterator.commit().await?;
//! }
//!
//! consumer.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod consumer;
mod iterator;
pub mod metrics;
mod partition_log;
mod resource_manager;
mod sync;

pub use consumer::{InMemoryStreamingConsumer, InMemoryStreamingConsumerBuilder};
pub use iterator::InMemoryPartitionIterator;
pub use resource_manager::InMemoryResourceManager;

/// Value of the `DRIVER_IMPL` property on consumers of this driver.
pub const DRIVER_NAME: &str = "memory";
