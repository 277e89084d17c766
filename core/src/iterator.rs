//! Per-partition consumption cursors.
//!
//! A [`PartitionIterator`] walks the messages of a single partition in
//! offset order. It can move forward (`next`) and backward (`previous`),
//! jump by offset or timestamp, and commit its position so that the next
//! iterator created by the same consumer resumes where this one stopped.
//!
//! # Offsets
//!
//! ```text
//!  first_offset                      end_offset
//!      │                                 │
//!      ▼                                 ▼
//!    ┌───┬───┬───┬───┬───┬───┬───┐
//!    │ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │ 6 │  ◀── next append gets `end_offset`
//!    └───┴───┴───┴───┴───┴───┴───┘
//!                  ▲
//!           current_offset: what `next()` returns
//! ```
//!
//! # Concurrency
//!
//! Cursor-moving methods take `&mut self`: an iterator is used by one task
//! at a time. Create one iterator per task instead of sharing.

use crate::error::{OmsError, Result};
use crate::identifiers::PartitionId;
use crate::key_value::KeyValue;
use crate::message::Message;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

/// Boxed iterator, as returned by `StreamingConsumer::partition_iterator`.
pub type BoxPartitionIterator = Box<dyn PartitionIterator>;

/// Stream of messages produced by [`into_stream`].
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// A cursor over the messages of one partition.
///
/// # Dyn Compatibility
///
/// Async operations return `Pin<Box<dyn Future>>` so iterators can be
/// handed out as [`BoxPartitionIterator`] by any driver.
pub trait PartitionIterator: Send + Sync {
    /// Snapshot of this iterator's properties.
    ///
    /// Contains the consumer's properties at creation time overlaid with
    /// the overrides passed to `partition_iterator_with`. Changes to the
    /// returned value do not affect the iterator.
    fn properties(&self) -> KeyValue;

    /// The partition this iterator is bound to.
    fn partition(&self) -> &PartitionId;

    /// Offset of the message the next call to `next()` returns.
    fn current_offset(&self) -> u64;

    /// Earliest retained offset of the partition.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] once the owning consumer stopped.
    fn first_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>>;

    /// Offset the next appended message will receive.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] once the owning consumer stopped.
    fn end_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>>;

    /// Move the cursor to `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::OffsetOutOfRange`] unless
    /// `first_offset <= offset <= end_offset`.
    fn seek_by_offset(&mut self, offset: u64)
    -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Move the cursor to the first message stored at or after `timestamp`,
    /// or to `end_offset` if there is none. Returns the new offset.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] once the owning consumer stopped.
    fn seek_by_time(
        &mut self,
        timestamp: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>>;

    /// Whether a message is available at the cursor right now.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] once the owning consumer stopped.
    fn has_next(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Return the message at the cursor and advance by one.
    ///
    /// Waits up to the iterator's `OPERATION_TIMEOUT` for a message to be
    /// appended when the cursor is at the end of the partition.
    ///
    /// # Errors
    ///
    /// - [`OmsError::OperationTimeout`] if nothing arrived in time
    /// - [`OmsError::NotRunning`] once the owning consumer stopped
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>>;

    /// Whether there is a message before the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] once the owning consumer stopped.
    fn has_previous(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Move the cursor back by one and return that message.
    ///
    /// A following `next()` returns the same message again.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::OffsetOutOfRange`] at the start of the partition.
    fn previous(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>>;

    /// Record the current offset as the consumer's position for this partition.
    ///
    /// # Errors
    ///
    /// Returns [`OmsError::NotRunning`] once the owning consumer stopped.
    fn commit(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

impl<I: PartitionIterator + ?Sized> PartitionIterator for Box<I> {
    fn properties(&self) -> KeyValue {
        (**self).properties()
    }

    fn partition(&self) -> &PartitionId {
        (**self).partition()
    }

    fn current_offset(&self) -> u64 {
        (**self).current_offset()
    }

    fn first_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        (**self).first_offset()
    }

    fn end_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        (**self).end_offset()
    }

    fn seek_by_offset(
        &mut self,
        offset: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        (**self).seek_by_offset(offset)
    }

    fn seek_by_time(
        &mut self,
        timestamp: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        (**self).seek_by_time(timestamp)
    }

    fn has_next(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        (**self).has_next()
    }

    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>> {
        (**self).next()
    }

    fn has_previous(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        (**self).has_previous()
    }

    fn previous(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>> {
        (**self).previous()
    }

    fn commit(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        (**self).commit()
    }
}

/// Turn an iterator into an endless stream of messages.
///
/// Timeouts are absorbed: the stream keeps waiting for new messages. Any
/// other error is yielded once and ends the stream, which is what happens
/// when the owning consumer shuts down.
///
/// ```ignore
/// use futures::StreamExt;
///
/// let iterator = consumer.partition_iterator(&partition).await?;
/// let mut messages = into_stream(iterator);
/// while let Some(message) = messages.next().await {
///     handle(message?);
/// }
/// ```
pub fn into_stream<I>(mut iterator: I) -> MessageStream
where
    I: PartitionIterator + 'static,
{
    Box::pin(async_stream::stream! {
        loop {
            match iterator.next().await {
                Ok(message) => yield Ok(message),
                Err(e) if e.is_retryable() => {}
                Err(e) => {
                    yield Err::<Message, OmsError>(e);
                    break;
                }
            }
        }
    })
}
