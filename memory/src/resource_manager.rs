//! Shared in-memory state and the [`ResourceManager`] implementation.

use crate::consumer::InMemoryStreamingConsumerBuilder;
use crate::metrics::QUEUE_MESSAGES_APPENDED;
use crate::partition_log::PartitionLog;
use crate::sync::{read, write};
use openmessaging_core::clock::{Clock, SystemClock};
use openmessaging_core::config::ConsumerConfig;
use openmessaging_core::error::{OmsError, Result};
use openmessaging_core::identifiers::{ConsumerId, PartitionId, QueueName};
use openmessaging_core::key_value::KeyValue;
use openmessaging_core::message::Message;
use openmessaging_core::property_keys::CONSUMER_ID;
use openmessaging_core::resource_manager::ResourceManager;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct QueueEntry {
    properties: KeyValue,
    partitions: Vec<Arc<PartitionLog>>,
    consumers: BTreeSet<ConsumerId>,
}

#[derive(Debug)]
struct ConsumerEntry {
    queue: QueueName,
    properties: KeyValue,
}

#[derive(Debug, Default)]
struct Registry {
    queues: BTreeMap<QueueName, QueueEntry>,
    consumers: HashMap<ConsumerId, ConsumerEntry>,
}

impl Registry {
    fn queue(&self, queue: &QueueName) -> Result<&QueueEntry> {
        self.queues
            .get(queue)
            .ok_or_else(|| OmsError::UnknownQueue(queue.clone()))
    }

    fn queue_mut(&mut self, queue: &QueueName) -> Result<&mut QueueEntry> {
        self.queues
            .get_mut(queue)
            .ok_or_else(|| OmsError::UnknownQueue(queue.clone()))
    }
}

/// In-process resource manager holding queues, partition logs and
/// consumer configuration.
///
/// Cloning is cheap and every clone shares the same state, so one handle
/// can be given to producers, consumers and administrators alike.
///
/// # Example
///
/// ```
/// use openmessaging_core::prelude::*;
/// use openmessaging_memory::InMemoryResourceManager;
///
/// # async fn example() -> Result<()> {
/// let manager = InMemoryResourceManager::new();
/// let queue = QueueName::new("orders");
/// manager.create_queue(&queue, 2, KeyValue::new()).await?;
///
/// manager.append(&queue, &PartitionId::new("0"), Message::new(b"hello".to_vec()))?;
///
/// let consumer = manager.streaming_consumer(&queue).consumer_id("billing").build()?;
/// consumer.startup().await?;
/// assert_eq!(consumer.partitions().await?.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryResourceManager {
    registry: Arc<RwLock<Registry>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for InMemoryResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryResourceManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryResourceManager {
    /// Create an empty resource manager that timestamps with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty resource manager using `clock` for store timestamps.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            clock,
        }
    }

    /// Start building a streaming consumer bound to `queue`.
    #[must_use]
    pub fn streaming_consumer(&self, queue: &QueueName) -> InMemoryStreamingConsumerBuilder {
        InMemoryStreamingConsumerBuilder::new(self.clone(), queue.clone())
    }

    /// Append a message to a partition, returning its offset.
    ///
    /// This is the producer side of the in-memory driver. Iterators blocked
    /// in `next()` on the partition are woken.
    ///
    /// # Errors
    ///
    /// - [`OmsError::UnknownQueue`] if the queue does not exist
    /// - [`OmsError::UnknownPartition`] if the partition does not exist
    pub fn append(
        &self,
        queue: &QueueName,
        partition: &PartitionId,
        message: Message,
    ) -> Result<u64> {
        let log = self.partition_log(queue, partition)?;
        let offset = log.append(message, self.clock.now())?;

        metrics::counter!(QUEUE_MESSAGES_APPENDED, "queue" => queue.to_string()).increment(1);
        tracing::trace!(
            queue = %queue,
            partition = %partition,
            offset = offset,
            "Message appended"
        );

        Ok(offset)
    }

    pub(crate) fn partition_log(
        &self,
        queue: &QueueName,
        partition: &PartitionId,
    ) -> Result<Arc<PartitionLog>> {
        let registry = read(&self.registry);
        registry
            .queue(queue)?
            .partitions
            .iter()
            .find(|log| log.partition() == partition)
            .cloned()
            .ok_or_else(|| OmsError::UnknownPartition {
                queue: queue.clone(),
                partition: partition.clone(),
            })
    }

    pub(crate) fn partition_ids(&self, queue: &QueueName) -> Result<Vec<PartitionId>> {
        let registry = read(&self.registry);
        Ok(registry
            .queue(queue)?
            .partitions
            .iter()
            .map(|log| log.partition().clone())
            .collect())
    }

    pub(crate) fn queue_consumers(&self, queue: &QueueName) -> Result<Vec<ConsumerId>> {
        let registry = read(&self.registry);
        Ok(registry.queue(queue)?.consumers.iter().cloned().collect())
    }

    pub(crate) fn register_consumer(
        &self,
        consumer: &ConsumerId,
        queue: &QueueName,
        properties: KeyValue,
    ) -> Result<()> {
        let mut registry = write(&self.registry);
        registry.queue(queue)?;
        if registry.consumers.contains_key(consumer) {
            return Err(OmsError::invalid_property(
                CONSUMER_ID,
                format!("consumer id '{consumer}' is already in use"),
            ));
        }
        registry.consumers.insert(
            consumer.clone(),
            ConsumerEntry {
                queue: queue.clone(),
                properties,
            },
        );
        Ok(())
    }

    /// Remove a consumer entirely, freeing its id.
    pub(crate) fn unregister_consumer(&self, consumer: &ConsumerId) {
        let mut registry = write(&self.registry);
        if let Some(entry) = registry.consumers.remove(consumer) {
            if let Some(queue) = registry.queues.get_mut(&entry.queue) {
                queue.consumers.remove(consumer);
            }
        }
    }

    pub(crate) fn attach_consumer(&self, consumer: &ConsumerId, queue: &QueueName) -> Result<()> {
        write(&self.registry)
            .queue_mut(queue)?
            .consumers
            .insert(consumer.clone());
        Ok(())
    }

    pub(crate) fn detach_consumer(&self, consumer: &ConsumerId, queue: &QueueName) {
        if let Some(entry) = write(&self.registry).queues.get_mut(queue) {
            entry.consumers.remove(consumer);
        }
    }

    pub(crate) fn consumer_properties_now(&self, consumer: &ConsumerId) -> Option<KeyValue> {
        read(&self.registry)
            .consumers
            .get(consumer)
            .map(|entry| entry.properties.clone())
    }

    fn create_queue_now(
        &self,
        queue: &QueueName,
        partition_count: u32,
        properties: KeyValue,
    ) -> Result<()> {
        if partition_count == 0 {
            return Err(OmsError::invalid_property(
                "partition_count",
                "a queue needs at least one partition",
            ));
        }

        let mut registry = write(&self.registry);
        if registry.queues.contains_key(queue) {
            return Err(OmsError::QueueAlreadyExists(queue.clone()));
        }

        let partitions = (0..partition_count)
            .map(|index| Arc::new(PartitionLog::new(queue.clone(), PartitionId::new(index.to_string()))))
            .collect();
        registry.queues.insert(
            queue.clone(),
            QueueEntry {
                properties,
                partitions,
                consumers: BTreeSet::new(),
            },
        );

        tracing::info!(queue = %queue, partitions = partition_count, "Queue created");
        Ok(())
    }

    fn add_partitions_now(&self, queue: &QueueName, count: u32) -> Result<()> {
        let mut registry = write(&self.registry);
        let entry = registry.queue_mut(queue)?;
        let start = entry.partitions.len();
        for index in start..start + count as usize {
            entry.partitions.push(Arc::new(PartitionLog::new(
                queue.clone(),
                PartitionId::new(index.to_string()),
            )));
        }

        tracing::info!(
            queue = %queue,
            added = count,
            partitions = entry.partitions.len(),
            "Partitions added"
        );
        Ok(())
    }

    fn delete_queue_now(&self, queue: &QueueName) -> Result<()> {
        let entry = write(&self.registry)
            .queues
            .remove(queue)
            .ok_or_else(|| OmsError::UnknownQueue(queue.clone()))?;
        for log in &entry.partitions {
            log.close();
        }

        tracing::info!(
            queue = %queue,
            attached_consumers = entry.consumers.len(),
            "Queue deleted"
        );
        Ok(())
    }

    fn set_consumer_properties_now(
        &self,
        consumer: &ConsumerId,
        mut properties: KeyValue,
    ) -> Result<()> {
        ConsumerConfig::from_properties(&properties)?.apply_to(&mut properties);
        properties.put(CONSUMER_ID, consumer);

        let mut registry = write(&self.registry);
        let entry = registry
            .consumers
            .get_mut(consumer)
            .ok_or_else(|| OmsError::UnknownConsumer(consumer.clone()))?;
        entry.properties = properties;

        tracing::debug!(consumer_id = %consumer, "Consumer properties replaced");
        Ok(())
    }
}

impl ResourceManager for InMemoryResourceManager {
    fn create_queue(
        &self,
        queue: &QueueName,
        partition_count: u32,
        properties: KeyValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let queue = queue.clone();
        Box::pin(async move { self.create_queue_now(&queue, partition_count, properties) })
    }

    fn add_partitions(
        &self,
        queue: &QueueName,
        count: u32,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let queue = queue.clone();
        Box::pin(async move { self.add_partitions_now(&queue, count) })
    }

    fn delete_queue(
        &self,
        queue: &QueueName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let queue = queue.clone();
        Box::pin(async move { self.delete_queue_now(&queue) })
    }

    fn list_queues(&self) -> Pin<Box<dyn Future<Output = Result<Vec<QueueName>>> + Send + '_>> {
        Box::pin(async move { Ok(read(&self.registry).queues.keys().cloned().collect()) })
    }

    fn queue_properties(
        &self,
        queue: &QueueName,
    ) -> Pin<Box<dyn Future<Output = Result<KeyValue>> + Send + '_>> {
        let queue = queue.clone();
        Box::pin(async move { Ok(read(&self.registry).queue(&queue)?.properties.clone()) })
    }

    fn set_consumer_properties(
        &self,
        consumer: &ConsumerId,
        properties: KeyValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let consumer = consumer.clone();
        Box::pin(async move { self.set_consumer_properties_now(&consumer, properties) })
    }

    fn consumer_properties(
        &self,
        consumer: &ConsumerId,
    ) -> Pin<Box<dyn Future<Output = Result<KeyValue>> + Send + '_>> {
        let consumer = consumer.clone();
        Box::pin(async move {
            self.consumer_properties_now(&consumer)
                .ok_or(OmsError::UnknownConsumer(consumer))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_queue_rejects_zero_partitions() {
        let manager = InMemoryResourceManager::new();
        let err = manager
            .create_queue(&QueueName::new("q"), 0, KeyValue::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OmsError::InvalidProperty { .. }));
    }

    #[tokio::test]
    async fn create_queue_rejects_duplicates() {
        let manager = InMemoryResourceManager::new();
        let queue = QueueName::new("q");
        manager.create_queue(&queue, 1, KeyValue::new()).await.unwrap();
        assert_eq!(
            manager.create_queue(&queue, 1, KeyValue::new()).await.unwrap_err(),
            OmsError::QueueAlreadyExists(queue)
        );
    }

    #[tokio::test]
    async fn partitions_are_numbered_in_creation_order() {
        let manager = InMemoryResourceManager::new();
        let queue = QueueName::new("q");
        manager.create_queue(&queue, 2, KeyValue::new()).await.unwrap();
        manager.add_partitions(&queue, 2).await.unwrap();

        let ids: Vec<String> = manager
            .partition_ids(&queue)
            .unwrap()
            .into_iter()
            .map(PartitionId::into_inner)
            .collect();
        assert_eq!(ids, vec!["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn append_to_unknown_partition_fails() {
        let manager = InMemoryResourceManager::new();
        let queue = QueueName::new("q");
        manager.create_queue(&queue, 1, KeyValue::new()).await.unwrap();

        let err = manager
            .append(&queue, &PartitionId::new("9"), Message::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, OmsError::UnknownPartition { .. }));
    }

    #[tokio::test]
    async fn delete_queue_removes_it_from_listing() {
        let manager = InMemoryResourceManager::new();
        let a = QueueName::new("a");
        let b = QueueName::new("b");
        manager.create_queue(&b, 1, KeyValue::new()).await.unwrap();
        manager.create_queue(&a, 1, KeyValue::new()).await.unwrap();
        assert_eq!(manager.list_queues().await.unwrap(), vec![a.clone(), b.clone()]);

        manager.delete_queue(&a).await.unwrap();
        assert_eq!(manager.list_queues().await.unwrap(), vec![b]);
        assert_eq!(
            manager.delete_queue(&a).await.unwrap_err(),
            OmsError::UnknownQueue(a)
        );
    }

    #[tokio::test]
    async fn queue_properties_are_snapshots() {
        let manager = InMemoryResourceManager::new();
        let queue = QueueName::new("q");
        manager
            .create_queue(&queue, 1, KeyValue::new().with("REGION", "eu"))
            .await
            .unwrap();

        let mut snapshot = manager.queue_properties(&queue).await.unwrap();
        snapshot.put("REGION", "us");
        assert_eq!(
            manager.queue_properties(&queue).await.unwrap().get_string("REGION"),
            Some("eu")
        );
    }

    #[tokio::test]
    async fn unknown_consumer_properties() {
        let manager = InMemoryResourceManager::new();
        let ghost = ConsumerId::new("ghost");
        assert_eq!(
            manager.consumer_properties(&ghost).await.unwrap_err(),
            OmsError::UnknownConsumer(ghost.clone())
        );
        assert_eq!(
            manager
                .set_consumer_properties(&ghost, KeyValue::new())
                .await
                .unwrap_err(),
            OmsError::UnknownConsumer(ghost)
        );
    }
}
