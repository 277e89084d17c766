//! Standard property keys.
//!
//! Drivers may define additional keys; the ones here have the same meaning
//! for every driver.

/// Unique id of a consumer instance. Always present in a consumer's properties.
pub const CONSUMER_ID: &str = "CONSUMER_ID";

/// Default timeout, in milliseconds, for blocking operations such as
/// `PartitionIterator::next`.
pub const OPERATION_TIMEOUT: &str = "OPERATION_TIMEOUT";

/// Where an iterator starts when its consumer has no committed offset for
/// the partition: `earliest` or `latest`.
pub const AUTO_OFFSET_RESET: &str = "AUTO_OFFSET_RESET";

/// Comma-separated list of endpoints a network driver connects to.
pub const ACCESS_POINTS: &str = "ACCESS_POINTS";

/// Name of the driver implementation backing a consumer.
pub const DRIVER_IMPL: &str = "DRIVER_IMPL";

/// Region the resources live in.
pub const REGION: &str = "REGION";

/// Namespace the resources live in.
pub const NAMESPACE: &str = "NAMESPACE";

/// Message header keys set by the driver when a message is stored.
pub mod message {
    /// Driver-assigned unique message id.
    pub const MESSAGE_ID: &str = "MESSAGE_ID";

    /// Partition the message was stored in.
    pub const PARTITION: &str = "PARTITION";

    /// Offset of the message within its partition.
    pub const OFFSET: &str = "OFFSET";

    /// Producer-side creation time, milliseconds since the Unix epoch.
    pub const BORN_TIMESTAMP: &str = "BORN_TIMESTAMP";

    /// Time the message was stored, milliseconds since the Unix epoch.
    pub const STORE_TIMESTAMP: &str = "STORE_TIMESTAMP";
}

/// Default operation timeout, in milliseconds.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 3_000;
