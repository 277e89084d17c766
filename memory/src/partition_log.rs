//! Append-only message log for one partition.

use crate::sync::{read, write};
use chrono::{DateTime, Utc};
use openmessaging_core::error::{OmsError, Result};
use openmessaging_core::identifiers::{ConsumerId, PartitionId, QueueName};
use openmessaging_core::message::Message;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Messages of one partition plus the committed offset of every consumer.
///
/// Offsets are dense and start at 0. Nothing is ever truncated, so the
/// first offset is always 0.
#[derive(Debug)]
pub(crate) struct PartitionLog {
    queue: QueueName,
    partition: PartitionId,
    messages: RwLock<Vec<Message>>,
    committed: RwLock<HashMap<ConsumerId, u64>>,
    appended: Notify,
    closed: AtomicBool,
}

impl PartitionLog {
    pub(crate) fn new(queue: QueueName, partition: PartitionId) -> Self {
        Self {
            queue,
            partition,
            messages: RwLock::new(Vec::new()),
            committed: RwLock::new(HashMap::new()),
            appended: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) const fn queue(&self) -> &QueueName {
        &self.queue
    }

    pub(crate) const fn partition(&self) -> &PartitionId {
        &self.partition
    }

    /// Store a message and wake every iterator waiting for it.
    pub(crate) fn append(&self, mut message: Message, stored_at: DateTime<Utc>) -> Result<u64> {
        self.ensure_open()?;
        let offset = {
            let mut messages = write(&self.messages);
            let offset = messages.len() as u64;
            let message_id = format!("{}:{}:{offset}", self.queue, self.partition);
            message.stamp(&message_id, &self.partition, offset, stored_at);
            messages.push(message);
            offset
        };
        self.appended.notify_waiters();
        Ok(offset)
    }

    pub(crate) fn get(&self, offset: u64) -> Option<Message> {
        let index = usize::try_from(offset).ok()?;
        read(&self.messages).get(index).cloned()
    }

    #[allow(clippy::unused_self)]
    pub(crate) const fn first_offset(&self) -> u64 {
        0
    }

    pub(crate) fn end_offset(&self) -> u64 {
        read(&self.messages).len() as u64
    }

    /// First offset whose store timestamp is at or after `timestamp`.
    pub(crate) fn offset_for_time(&self, timestamp: DateTime<Utc>) -> u64 {
        let messages = read(&self.messages);
        messages
            .iter()
            .position(|m| m.store_timestamp().is_some_and(|stored| stored >= timestamp))
            .unwrap_or(messages.len()) as u64
    }

    pub(crate) fn commit(&self, consumer: &ConsumerId, offset: u64) {
        write(&self.committed).insert(consumer.clone(), offset);
    }

    pub(crate) fn committed(&self, consumer: &ConsumerId) -> Option<u64> {
        read(&self.committed).get(consumer).copied()
    }

    /// Notified on every append and on close.
    pub(crate) const fn appended(&self) -> &Notify {
        &self.appended
    }

    /// Mark the log as deleted; pending and future reads fail.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.appended.notify_waiters();
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(OmsError::UnknownQueue(self.queue.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn log() -> PartitionLog {
        PartitionLog::new(QueueName::new("orders"), PartitionId::new("0"))
    }

    #[test]
    fn offsets_are_dense_from_zero() {
        let log = log();
        assert_eq!(log.append(Message::new(b"a".to_vec()), at(1)).unwrap(), 0);
        assert_eq!(log.append(Message::new(b"b".to_vec()), at(2)).unwrap(), 1);
        assert_eq!(log.end_offset(), 2);
        assert_eq!(log.get(1).unwrap().body(), b"b");
        assert_eq!(log.get(1).unwrap().message_id(), Some("orders:0:1"));
        assert!(log.get(2).is_none());
    }

    #[test]
    fn offset_for_time_finds_first_at_or_after() {
        let log = log();
        for millis in [10, 20, 30] {
            log.append(Message::new(Vec::new()), at(millis)).unwrap();
        }
        assert_eq!(log.offset_for_time(at(5)), 0);
        assert_eq!(log.offset_for_time(at(20)), 1);
        assert_eq!(log.offset_for_time(at(21)), 2);
        assert_eq!(log.offset_for_time(at(31)), 3);
    }

    #[test]
    fn commits_are_per_consumer() {
        let log = log();
        let a = ConsumerId::new("a");
        log.commit(&a, 4);
        assert_eq!(log.committed(&a), Some(4));
        assert_eq!(log.committed(&ConsumerId::new("b")), None);
    }

    #[test]
    fn closed_log_rejects_appends() {
        let log = log();
        log.close();
        assert_eq!(
            log.append(Message::new(Vec::new()), at(1)).unwrap_err(),
            OmsError::UnknownQueue(QueueName::new("orders"))
        );
    }
}
