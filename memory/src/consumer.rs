//! In-memory streaming consumer and its builder.

use crate::DRIVER_NAME;
use crate::iterator::InMemoryPartitionIterator;
use crate::metrics::{CONSUMER_STARTED, CONSUMERS_RUNNING, ITERATOR_CREATED};
use crate::resource_manager::InMemoryResourceManager;
use openmessaging_core::config::{AutoOffsetReset, ConsumerConfig};
use openmessaging_core::consumer::StreamingConsumer;
use openmessaging_core::error::{OmsError, Result};
use openmessaging_core::identifiers::{ConsumerId, PartitionId, QueueName};
use openmessaging_core::iterator::BoxPartitionIterator;
use openmessaging_core::key_value::KeyValue;
use openmessaging_core::lifecycle::{LifecycleState, LifecycleTracker, ServiceLifecycle};
use openmessaging_core::property_keys::{
    AUTO_OFFSET_RESET, CONSUMER_ID, DRIVER_IMPL, OPERATION_TIMEOUT,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// State shared between a consumer and the iterators it created.
#[derive(Debug)]
pub(crate) struct ConsumerShared {
    id: ConsumerId,
    lifecycle: LifecycleTracker,
    stopped: Notify,
}

impl ConsumerShared {
    pub(crate) const fn id(&self) -> &ConsumerId {
        &self.id
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        self.lifecycle.ensure_running()
    }

    /// Notified once when the consumer stops.
    pub(crate) const fn stopped(&self) -> &Notify {
        &self.stopped
    }

    /// Stop the consumer, returning the state it was in if this call
    /// performed the transition.
    fn stop(&self) -> Option<LifecycleState> {
        let previous = self.lifecycle.state();
        if self.lifecycle.stop() {
            self.stopped.notify_waiters();
            Some(previous)
        } else {
            None
        }
    }
}

fn generate_consumer_id() -> ConsumerId {
    ConsumerId::new(format!("consumer-{:08x}", rand::random::<u32>()))
}

/// Builder for [`InMemoryStreamingConsumer`].
///
/// Obtained from [`InMemoryResourceManager::streaming_consumer`]. Every
/// setter writes a property; [`build`](Self::build) validates the result.
#[derive(Debug)]
pub struct InMemoryStreamingConsumerBuilder {
    manager: InMemoryResourceManager,
    queue: QueueName,
    properties: KeyValue,
}

impl InMemoryStreamingConsumerBuilder {
    pub(crate) const fn new(manager: InMemoryResourceManager, queue: QueueName) -> Self {
        Self {
            manager,
            queue,
            properties: KeyValue::new(),
        }
    }

    /// Set the consumer id (default: generated).
    #[must_use]
    pub fn consumer_id(mut self, consumer_id: impl Into<ConsumerId>) -> Self {
        let consumer_id: ConsumerId = consumer_id.into();
        self.properties.put(CONSUMER_ID, consumer_id);
        self
    }

    /// Set the timeout of blocking iterator reads (default: 3 seconds).
    #[must_use]
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.properties.put(OPERATION_TIMEOUT, timeout.as_millis());
        self
    }

    /// Set where iterators start without a committed offset (default: earliest).
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: AutoOffsetReset) -> Self {
        self.properties.put(AUTO_OFFSET_RESET, policy);
        self
    }

    /// Set a single property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.properties.put(key, value);
        self
    }

    /// Overlay a property bag; its values replace ones already set.
    #[must_use]
    pub fn properties(mut self, properties: &KeyValue) -> Self {
        self.properties.overlay(properties);
        self
    }

    /// Apply a typed configuration.
    #[must_use]
    pub fn config(mut self, config: &ConsumerConfig) -> Self {
        config.apply_to(&mut self.properties);
        self
    }

    /// Register the consumer with the resource manager.
    ///
    /// The consumer is created in the `Created` state; call
    /// [`startup`](ServiceLifecycle::startup) before using it.
    ///
    /// # Errors
    ///
    /// - [`OmsError::UnknownQueue`](openmessaging_core::error::OmsError::UnknownQueue)
    ///   if the queue does not exist
    /// - [`OmsError::InvalidProperty`](openmessaging_core::error::OmsError::InvalidProperty)
    ///   for malformed standard properties or a consumer id already in use
    pub fn build(self) -> Result<InMemoryStreamingConsumer> {
        let Self {
            manager,
            queue,
            mut properties,
        } = self;

        let config = ConsumerConfig::from_properties(&properties)?;
        config.apply_to(&mut properties);
        let id = config.consumer_id.unwrap_or_else(generate_consumer_id);
        properties
            .put(CONSUMER_ID, &id)
            .put(DRIVER_IMPL, DRIVER_NAME);

        manager.register_consumer(&id, &queue, properties.clone())?;

        tracing::debug!(
            consumer_id = %id,
            queue = %queue,
            properties = %properties,
            "Streaming consumer created"
        );

        Ok(InMemoryStreamingConsumer {
            manager,
            queue,
            shared: Arc::new(ConsumerShared {
                id,
                lifecycle: LifecycleTracker::new(),
                stopped: Notify::new(),
            }),
            initial_properties: properties,
        })
    }
}

/// Streaming consumer over one in-memory queue.
///
/// Its live properties are held by the resource manager, so a change made
/// through
/// [`ResourceManager::set_consumer_properties`](openmessaging_core::resource_manager::ResourceManager::set_consumer_properties)
/// shows up in the next [`properties`](StreamingConsumer::properties) call
/// and in iterators created afterwards.
///
/// Dropping the consumer shuts it down and frees its id.
#[derive(Debug)]
pub struct InMemoryStreamingConsumer {
    manager: InMemoryResourceManager,
    queue: QueueName,
    shared: Arc<ConsumerShared>,
    initial_properties: KeyValue,
}

impl InMemoryStreamingConsumer {
    /// The consumer's id.
    #[must_use]
    pub fn id(&self) -> &ConsumerId {
        self.shared.id()
    }

    fn create_iterator(
        &self,
        partition: &PartitionId,
        overrides: &KeyValue,
    ) -> Result<InMemoryPartitionIterator> {
        self.shared.ensure_running()?;
        let log = self.manager.partition_log(&self.queue, partition)?;
        log.ensure_open()?;

        let mut properties = self.properties().merged(overrides);
        properties.put(CONSUMER_ID, self.id());
        let config = ConsumerConfig::from_properties(&properties)?;

        let start = log.committed(self.id()).unwrap_or(match config.auto_offset_reset {
            AutoOffsetReset::Earliest => log.first_offset(),
            AutoOffsetReset::Latest => log.end_offset(),
        });

        metrics::counter!(ITERATOR_CREATED, "queue" => self.queue.to_string()).increment(1);
        tracing::debug!(
            consumer_id = %self.id(),
            queue = %self.queue,
            partition = %partition,
            offset = start,
            "Partition iterator created"
        );

        Ok(InMemoryPartitionIterator::new(
            Arc::clone(&self.shared),
            log,
            properties,
            config.operation_timeout,
            start,
        ))
    }

    /// Join the queue's consumer set once the lifecycle is `Running`.
    ///
    /// A shutdown that lands between `start` and the attach has already
    /// detached, so the state is checked again afterwards.
    fn attach_after_start(&self) -> Result<()> {
        self.manager.attach_consumer(self.id(), &self.queue)?;
        let state = self.shared.lifecycle.state();
        if state == LifecycleState::Running {
            return Ok(());
        }
        self.manager.detach_consumer(self.id(), &self.queue);
        Err(OmsError::InvalidState {
            state,
            operation: "startup",
        })
    }

    fn record_stop(&self, previous: LifecycleState) {
        if previous == LifecycleState::Running {
            metrics::gauge!(CONSUMERS_RUNNING).decrement(1.0);
        }
        tracing::info!(
            consumer_id = %self.id(),
            queue = %self.queue,
            previous_state = %previous,
            "Streaming consumer stopped"
        );
    }
}

impl ServiceLifecycle for InMemoryStreamingConsumer {
    fn startup(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.shared.lifecycle.start()? {
                return Ok(());
            }

            metrics::gauge!(CONSUMERS_RUNNING).increment(1.0);
            if let Err(e) = self.attach_after_start() {
                if let Some(previous) = self.shared.stop() {
                    self.record_stop(previous);
                }
                tracing::warn!(
                    consumer_id = %self.id(),
                    queue = %self.queue,
                    error = %e,
                    "Streaming consumer failed to start"
                );
                return Err(e);
            }

            metrics::counter!(CONSUMER_STARTED, "queue" => self.queue.to_string()).increment(1);
            tracing::info!(
                consumer_id = %self.id(),
                queue = %self.queue,
                "Streaming consumer started"
            );
            Ok(())
        })
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(previous) = self.shared.stop() {
                self.manager.detach_consumer(self.id(), &self.queue);
                self.record_stop(previous);
            }
            Ok(())
        })
    }

    fn state(&self) -> LifecycleState {
        self.shared.lifecycle.state()
    }
}

impl StreamingConsumer for InMemoryStreamingConsumer {
    fn queue(&self) -> &QueueName {
        &self.queue
    }

    fn properties(&self) -> KeyValue {
        self.manager
            .consumer_properties_now(self.id())
            .unwrap_or_else(|| self.initial_properties.clone())
    }

    fn partitions(&self) -> Pin<Box<dyn Future<Output = Result<Vec<PartitionId>>> + Send + '_>> {
        Box::pin(async move {
            self.shared.ensure_running()?;
            self.manager.partition_ids(&self.queue)
        })
    }

    fn consumers(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ConsumerId>>> + Send + '_>> {
        Box::pin(async move {
            self.shared.ensure_running()?;
            self.manager.queue_consumers(&self.queue)
        })
    }

    fn partition_iterator_with(
        &self,
        partition: &PartitionId,
        properties: KeyValue,
    ) -> Pin<Box<dyn Future<Output = Result<BoxPartitionIterator>> + Send + '_>> {
        let partition = partition.clone();
        Box::pin(async move {
            let iterator = self.create_iterator(&partition, &properties)?;
            Ok(Box::new(iterator) as BoxPartitionIterator)
        })
    }
}

impl Drop for InMemoryStreamingConsumer {
    fn drop(&mut self) {
        if let Some(previous) = self.shared.stop() {
            self.record_stop(previous);
        }
        self.manager.unregister_consumer(self.shared.id());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use openmessaging_core::resource_manager::ResourceManager;

    async fn manager_with_queue(name: &str) -> (InMemoryResourceManager, QueueName) {
        let manager = InMemoryResourceManager::new();
        let queue = QueueName::new(name);
        manager.create_queue(&queue, 2, KeyValue::new()).await.unwrap();
        (manager, queue)
    }

    #[tokio::test]
    async fn build_fails_for_unknown_queue() {
        let manager = InMemoryResourceManager::new();
        let err = manager
            .streaming_consumer(&QueueName::new("missing"))
            .build()
            .unwrap_err();
        assert_eq!(err, OmsError::UnknownQueue(QueueName::new("missing")));
    }

    #[tokio::test]
    async fn generated_ids_are_pinned_in_properties() {
        let (manager, queue) = manager_with_queue("q").await;
        let consumer = manager.streaming_consumer(&queue).build().unwrap();

        assert!(consumer.id().as_str().starts_with("consumer-"));
        let props = consumer.properties();
        assert_eq!(props.get_string(CONSUMER_ID), Some(consumer.id().as_str()));
        assert_eq!(props.get_string(DRIVER_IMPL), Some(DRIVER_NAME));
        assert_eq!(props.get_string(OPERATION_TIMEOUT), Some("3000"));
        assert_eq!(props.get_string(AUTO_OFFSET_RESET), Some("earliest"));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_until_dropped() {
        let (manager, queue) = manager_with_queue("q").await;
        let first = manager.streaming_consumer(&queue).consumer_id("c").build().unwrap();

        let err = manager
            .streaming_consumer(&queue)
            .consumer_id("c")
            .build()
            .unwrap_err();
        assert!(matches!(err, OmsError::InvalidProperty { ref key, .. } if key == CONSUMER_ID));

        drop(first);
        assert!(manager.streaming_consumer(&queue).consumer_id("c").build().is_ok());
    }

    #[tokio::test]
    async fn builder_validates_standard_properties() {
        let (manager, queue) = manager_with_queue("q").await;
        let err = manager
            .streaming_consumer(&queue)
            .property(OPERATION_TIMEOUT, "soon")
            .build()
            .unwrap_err();
        assert!(matches!(err, OmsError::InvalidProperty { .. }));
    }

    #[tokio::test]
    async fn config_and_setters_compose() {
        let (manager, queue) = manager_with_queue("q").await;
        let config = ConsumerConfig::default().with_auto_offset_reset(AutoOffsetReset::Latest);
        let consumer = manager
            .streaming_consumer(&queue)
            .config(&config)
            .operation_timeout(Duration::from_millis(50))
            .property("REGION", "eu")
            .build()
            .unwrap();

        let props = consumer.properties();
        assert_eq!(props.get_string(AUTO_OFFSET_RESET), Some("latest"));
        assert_eq!(props.get_string(OPERATION_TIMEOUT), Some("50"));
        assert_eq!(props.get_string("REGION"), Some("eu"));
    }

    #[tokio::test]
    async fn startup_fails_when_queue_was_deleted() {
        let (manager, queue) = manager_with_queue("q").await;
        let consumer = manager.streaming_consumer(&queue).build().unwrap();
        manager.delete_queue(&queue).await.unwrap();

        assert_eq!(
            consumer.startup().await.unwrap_err(),
            OmsError::UnknownQueue(queue)
        );
        assert_eq!(consumer.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_during_startup_leaves_consumer_detached() {
        let (manager, queue) = manager_with_queue("q").await;
        let consumer = manager.streaming_consumer(&queue).consumer_id("c").build().unwrap();

        // Shutdown wins the race after the lifecycle moved to Running
        // but before the consumer joined the queue.
        assert!(consumer.shared.lifecycle.start().unwrap());
        consumer.shutdown().await.unwrap();

        assert_eq!(
            consumer.attach_after_start().unwrap_err(),
            OmsError::InvalidState {
                state: LifecycleState::Stopped,
                operation: "startup",
            }
        );
        assert!(!manager
            .queue_consumers(&queue)
            .unwrap()
            .contains(&ConsumerId::new("c")));
    }
}
