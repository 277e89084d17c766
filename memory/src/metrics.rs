//! Metric names emitted by the in-memory driver.
//!
//! Metrics go through the `metrics` facade and are dropped unless the
//! application installs a recorder (for example a Prometheus exporter).

use metrics::{describe_counter, describe_gauge};

/// Consumers started.
pub const CONSUMER_STARTED: &str = "oms.consumer.started";

/// Consumers currently running.
pub const CONSUMERS_RUNNING: &str = "oms.consumer.running";

/// Partition iterators created.
pub const ITERATOR_CREATED: &str = "oms.iterator.created";

/// Messages returned by `next()` or `previous()`.
pub const ITERATOR_MESSAGES_READ: &str = "oms.iterator.messages_read";

/// Offsets committed by iterators.
pub const ITERATOR_COMMITS: &str = "oms.iterator.commits";

/// `next()` calls that timed out.
pub const ITERATOR_TIMEOUTS: &str = "oms.iterator.timeouts";

/// Messages appended to partitions.
pub const QUEUE_MESSAGES_APPENDED: &str = "oms.queue.messages_appended";

/// Register descriptions for every metric above.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(CONSUMER_STARTED, "Total number of streaming consumers started");
    describe_gauge!(CONSUMERS_RUNNING, "Number of streaming consumers currently running");
    describe_counter!(ITERATOR_CREATED, "Total number of partition iterators created");
    describe_counter!(
        ITERATOR_MESSAGES_READ,
        "Total number of messages read through partition iterators"
    );
    describe_counter!(ITERATOR_COMMITS, "Total number of committed iterator offsets");
    describe_counter!(
        ITERATOR_TIMEOUTS,
        "Total number of iterator reads that hit the operation timeout"
    );
    describe_counter!(
        QUEUE_MESSAGES_APPENDED,
        "Total number of messages appended to partitions"
    );
}
