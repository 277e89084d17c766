//! Tests for adapting partition iterators into streams.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use chrono::{DateTime, Utc};
use futures::StreamExt;
use openmessaging_core::prelude::*;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Iterator replaying a fixed script of `next()` results, then reporting
/// a stopped consumer.
struct ScriptedIterator {
    partition: PartitionId,
    script: VecDeque<Result<Message>>,
    offset: u64,
}

impl ScriptedIterator {
    fn new(script: Vec<Result<Message>>) -> Self {
        Self {
            partition: PartitionId::new("0"),
            script: script.into(),
            offset: 0,
        }
    }
}

impl PartitionIterator for ScriptedIterator {
    fn properties(&self) -> KeyValue {
        KeyValue::new().with(property_keys::CONSUMER_ID, "scripted")
    }

    fn partition(&self) -> &PartitionId {
        &self.partition
    }

    fn current_offset(&self) -> u64 {
        self.offset
    }

    fn first_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(async { Ok(0) })
    }

    fn end_offset(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(async move { Ok(self.offset) })
    }

    fn seek_by_offset(&mut self, offset: u64) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.offset = offset;
            Ok(())
        })
    }

    fn seek_by_time(
        &mut self,
        _timestamp: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(async move { Ok(self.offset) })
    }

    fn has_next(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async move { Ok(self.script.front().is_some_and(Result::is_ok)) })
    }

    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>> {
        Box::pin(async move {
            let result = self.script.pop_front().unwrap_or(Err(OmsError::NotRunning {
                state: LifecycleState::Stopped,
            }));
            if result.is_ok() {
                self.offset += 1;
            }
            result
        })
    }

    fn has_previous(&self) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async { Ok(false) })
    }

    fn previous(&mut self) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + '_>> {
        Box::pin(async move {
            Err(OmsError::OffsetOutOfRange {
                partition: self.partition.clone(),
                offset: self.offset,
                first: 0,
                end: self.offset,
            })
        })
    }

    fn commit(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

fn timeout() -> Result<Message> {
    Err(OmsError::OperationTimeout(Duration::from_millis(10)))
}

#[tokio::test]
async fn stream_skips_timeouts_and_ends_on_fatal_error() {
    let iterator = ScriptedIterator::new(vec![
        Ok(Message::new(b"a".to_vec())),
        timeout(),
        timeout(),
        Ok(Message::new(b"b".to_vec())),
    ]);

    let items: Vec<Result<Message>> = into_stream(iterator).collect().await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().body(), b"a");
    assert_eq!(items[1].as_ref().unwrap().body(), b"b");
    assert_eq!(
        items[2].as_ref().unwrap_err(),
        &OmsError::NotRunning {
            state: LifecycleState::Stopped
        }
    );
}

#[tokio::test]
async fn boxed_iterator_forwards_calls() {
    let mut iterator: BoxPartitionIterator =
        Box::new(ScriptedIterator::new(vec![Ok(Message::new(b"x".to_vec()))]));

    assert_eq!(iterator.partition(), &PartitionId::new("0"));
    assert!(iterator.has_next().await.unwrap());
    assert_eq!(iterator.next().await.unwrap().body(), b"x");
    assert_eq!(iterator.current_offset(), 1);
    assert!(matches!(
        iterator.previous().await.unwrap_err(),
        OmsError::OffsetOutOfRange { offset: 1, .. }
    ));
    assert_eq!(
        iterator.properties().get_string(property_keys::CONSUMER_ID),
        Some("scripted")
    );
}

#[test]
fn stream_of_boxed_iterator_outside_runtime() {
    let iterator: BoxPartitionIterator = Box::new(ScriptedIterator::new(vec![
        timeout(),
        Ok(Message::new(b"only".to_vec())),
    ]));

    let first = tokio_test::block_on(async { into_stream(iterator).next().await });
    assert_eq!(first.unwrap().unwrap().body(), b"only");
}
