//! Cursor over one in-memory partition.

use crate::consumer::ConsumerShared;
use crate::metrics::{ITERATOR_COMMITS, ITERATOR_MESSAGES_READ, ITERATOR_TIMEOUTS};
use crate::partition_log::PartitionLog;
use chrono::{DateTime, Utc};
use openmessaging_core::error::{OmsError, Result};
use openmessaging_core::identifiers::PartitionId;
use openmessaging_core::iterator::PartitionIterator;
use openmessaging_core::key_value::KeyValue;
use openmessaging_core::message::Message;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Partition iterator of the in-memory driver.
///
/// Holds the partition log by `Arc`, so it keeps reading a partition's
/// messages without going back through the registry. It stops working as
/// soon as its consumer shuts down or the queue is deleted.
#[derive(Debug)]
pub struct InMemoryPartitionIterator {
    consumer: Arc<ConsumerShared>,
    log: Arc<PartitionLog>,
    properties: KeyValue,
    timeout: Duration,
    offset: u64,
}

impl InMemoryPartitionIterator {
    pub(crate) const fn new(
        consumer: Arc<ConsumerShared>,
        log: Arc<PartitionLog>,
        properties: KeyValue,
        timeout: Duration,
        offset: u64,
    ) -> Self {
        Self {
            consumer,
            log,
            properties,
            timeout,
            offset,
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        self.consumer.ensure_running()?;
        self.log.ensure_open()
    }

    fn out_of_range(&self, offset: u64) -> OmsError {
        OmsError::OffsetOutOfRange {
            partition: self.log.partition().clone(),
            offset,
            first: self.log.first_offset(),
            end: self.log.end_offset(),
        }
    }

    fn record_read(&self, message: &Message, offset: u64) {
        metrics::counter!(ITERATOR_MESSAGES_READ, "queue" => self.log.queue().to_string())
            .increment(1);
        tracing::trace!(
            consumer_id = %self.consumer.id(),
            partition = %self.log.partition(),
            offset = offset,
            size = message.body().len(),
            "Message read"
        );
    }

    /// Return the message at the cursor, waiting for an append or a
    /// shutdown while there is none.
    async fn wait_for_next(&mut self) -> Result<Message> {
        let log = Arc::clone(&self.log);
        let consumer = Arc::clone(&self.consumer);

        loop {
            // Register for wake-ups before looking, so an append between
            // the check and the wait is not missed.
            let appended = log.appended().notified();
            let stopped = consumer.stopped().notified();
            tokio::pin!(appended, stopped);
            appended.as_mut().enable();
            stopped.as_mut().enable();

            self.ensure_usable()?;
            if let Some(message) = log.get(self.offset) {
                let offset = self.offset;
                self.offset += 1;
                self.record_read(&message, offset);
                return Ok(message);
            }

            tokio::select! {
                () = appended => {}
                () = stopped => {}
            }
        }
    }
}

impl PartitionIterator for InMemoryPartitionIterator {
    fn properties(&self) -> KeyValue {
        self.properties.clone()
    }

    fn partition(&self) -> &PartitionId {
        self.log.partition()
    }

    fn current_offset(&self) -> u64 {
        self.offset
    }

    fn first_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            Ok(self.log.first_offset())
        })
    }

    fn end_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            Ok(self.log.end_offset())
        })
    }

    fn seek_by_offset(&mut self, offset: u64) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            if offset < self.log.first_offset() || offset > self.log.end_offset() {
                return Err(self.out_of_range(offset));
            }
            self.offset = offset;
            Ok(())
        })
    }

    fn seek_by_time(
        &mut self,
        timestamp: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            self.offset = self.log.offset_for_time(timestamp);
            Ok(self.offset)
        })
    }

    fn has_next(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            Ok(self.offset < self.log.end_offset())
        })
    }

    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>> {
        Box::pin(async move {
            let timeout = self.timeout;
            if let Ok(result) = tokio::time::timeout(timeout, self.wait_for_next()).await {
                return result;
            }

            metrics::counter!(ITERATOR_TIMEOUTS, "queue" => self.log.queue().to_string())
                .increment(1);
            tracing::debug!(
                consumer_id = %self.consumer.id(),
                partition = %self.log.partition(),
                offset = self.offset,
                timeout_ms = timeout.as_millis(),
                "No message before operation timeout"
            );
            Err(OmsError::OperationTimeout(timeout))
        })
    }

    fn has_previous(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            Ok(self.offset > self.log.first_offset())
        })
    }

    fn previous(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            if self.offset <= self.log.first_offset() {
                return Err(self.out_of_range(self.offset));
            }

            let offset = self.offset - 1;
            let message = self
                .log
                .get(offset)
                .ok_or_else(|| self.out_of_range(offset))?;
            self.offset = offset;
            self.record_read(&message, offset);
            Ok(message)
        })
    }

    fn commit(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_usable()?;
            self.log.commit(self.consumer.id(), self.offset);

            metrics::counter!(ITERATOR_COMMITS, "queue" => self.log.queue().to_string())
                .increment(1);
            tracing::debug!(
                consumer_id = %self.consumer.id(),
                partition = %self.log.partition(),
                offset = self.offset,
                "Offset committed"
            );
            Ok(())
        })
    }
}
