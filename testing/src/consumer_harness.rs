//! Given-Then harness for streaming consumer tests.

#![allow(clippy::module_name_repetitions)] // ConsumerTestHarness is the natural name

use crate::helpers::{body_text, text_message};
use crate::mocks::{ManualClock, test_epoch};
use openmessaging_core::consumer::StreamingConsumer;
use openmessaging_core::error::Result;
use openmessaging_core::identifiers::{PartitionId, QueueName};
use openmessaging_core::key_value::KeyValue;
use openmessaging_core::lifecycle::ServiceLifecycle;
use openmessaging_core::resource_manager::ResourceManager;
use openmessaging_memory::{
    InMemoryResourceManager, InMemoryStreamingConsumer, InMemoryStreamingConsumerBuilder,
};
use std::sync::Arc;

/// Test harness over the in-memory driver providing a fluent testing API.
///
/// Messages appended through the harness get store timestamps one second
/// apart, starting at [`test_epoch`].
///
/// # Example
///
/// ```ignore
/// let mut harness = ConsumerTestHarness::new();
/// harness.given_queue("orders", 2).await?;
/// harness.given_messages("1", &["created", "paid"])?;
/// harness.given_running_consumer(|builder| builder.consumer_id("billing")).await?;
///
/// harness.then_reads("1", &["created", "paid"]).await?;
/// ```
pub struct ConsumerTestHarness {
    manager: InMemoryResourceManager,
    clock: Arc<ManualClock>,
    queue: QueueName,
    consumer: Option<InMemoryStreamingConsumer>,
}

impl Default for ConsumerTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerTestHarness {
    /// Create a harness with an empty resource manager and a manual clock.
    #[must_use]
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(test_epoch()));
        Self {
            manager: InMemoryResourceManager::with_clock(clock.clone()),
            clock,
            queue: QueueName::new("test-queue"),
            consumer: None,
        }
    }

    /// Create the queue every later step works on.
    ///
    /// # Errors
    ///
    /// Returns the resource manager's error if the queue cannot be created.
    pub async fn given_queue(&mut self, name: &str, partitions: u32) -> Result<&mut Self> {
        self.queue = QueueName::new(name);
        self.manager
            .create_queue(&self.queue, partitions, KeyValue::new())
            .await?;
        Ok(self)
    }

    /// Append text messages to a partition, advancing the clock one second
    /// after each.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQueue` or `UnknownPartition` from the driver.
    pub fn given_messages(&mut self, partition: &str, bodies: &[&str]) -> Result<&mut Self> {
        let partition = PartitionId::new(partition);
        for body in bodies {
            self.manager
                .append(&self.queue, &partition, text_message(body))?;
            self.clock.advance(chrono::Duration::seconds(1));
        }
        Ok(self)
    }

    /// Build and start a consumer on the queue.
    ///
    /// `configure` customises the builder, e.g. `|b| b.consumer_id("c1")`.
    ///
    /// # Errors
    ///
    /// Returns the builder's or startup's error.
    pub async fn given_running_consumer<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(InMemoryStreamingConsumerBuilder) -> InMemoryStreamingConsumerBuilder,
    {
        let consumer = configure(self.manager.streaming_consumer(&self.queue)).build()?;
        consumer.startup().await?;
        self.consumer = Some(consumer);
        Ok(self)
    }

    /// Assert the consumer sees exactly these partitions, in order.
    ///
    /// # Errors
    ///
    /// Returns the consumer's error if the query fails.
    ///
    /// # Panics
    ///
    /// Panics if no consumer was started or the partitions differ.
    pub async fn then_partitions(&self, expected: &[&str]) -> Result<&Self> {
        let partitions = self.consumer().partitions().await?;
        let actual: Vec<&str> = partitions.iter().map(PartitionId::as_str).collect();
        assert_eq!(actual, expected, "Unexpected partitions of '{}'", self.queue);
        Ok(self)
    }

    /// Assert a fresh iterator on `partition` reads exactly these bodies
    /// before running out of messages.
    ///
    /// # Errors
    ///
    /// Returns the consumer's or iterator's error.
    ///
    /// # Panics
    ///
    /// Panics if no consumer was started or the bodies differ.
    pub async fn then_reads(&self, partition: &str, expected: &[&str]) -> Result<&Self> {
        let mut iterator = self
            .consumer()
            .partition_iterator(&PartitionId::new(partition))
            .await?;

        let mut bodies = Vec::new();
        while iterator.has_next().await? {
            bodies.push(body_text(&iterator.next().await?));
        }
        assert_eq!(
            bodies, expected,
            "Unexpected messages on partition '{partition}' of '{}'",
            self.queue
        );
        Ok(self)
    }

    /// The consumer started by [`given_running_consumer`](Self::given_running_consumer).
    ///
    /// # Panics
    ///
    /// Panics if no consumer was started.
    #[must_use]
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn consumer(&self) -> &InMemoryStreamingConsumer {
        self.consumer
            .as_ref()
            .expect("Consumer must be started with given_running_consumer()")
    }

    /// Stop and drop the current consumer, if any.
    ///
    /// # Errors
    ///
    /// Returns the consumer's shutdown error.
    pub async fn stop_consumer(&mut self) -> Result<&mut Self> {
        if let Some(consumer) = self.consumer.take() {
            consumer.shutdown().await?;
        }
        Ok(self)
    }

    /// The shared resource manager.
    #[must_use]
    pub const fn manager(&self) -> &InMemoryResourceManager {
        &self.manager
    }

    /// The clock stamping appended messages.
    #[must_use]
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// The queue under test.
    #[must_use]
    pub const fn queue(&self) -> &QueueName {
        &self.queue
    }
}
