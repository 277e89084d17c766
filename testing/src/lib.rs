//! # OpenMessaging Testing
//!
//! Testing utilities for code built on the OpenMessaging consumer API.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Message helpers and a test tracing initialiser
//! - [`ConsumerTestHarness`], a Given-Then API over the in-memory driver
//! - proptest strategies for property bags and topologies
//!
//! ## Example
//!
//! ```ignore
//! use openmessaging_testing::ConsumerTestHarness;
//!
//! #[tokio::test]
//! async fn reads_in_order() {
//!     let mut harness = ConsumerTestHarness::new();
//!     harness.given_queue("orders", 2).await.unwrap();
//!     harness.given_messages("0", &["a", "b"]).unwrap();
//!     harness.given_running_consumer(|b| b.consumer_id("reader")).await.unwrap();
//!
//!     harness.then_partitions(&["0", "1"]).await.unwrap();
//!     harness.then_reads("0", &["a", "b"]).await.unwrap();
//! }
//! ```

use chrono::{DateTime, Utc};
use openmessaging_core::clock::Clock;

mod consumer_harness;

pub use consumer_harness::ConsumerTestHarness;

/// Mock implementations of the clock.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use openmessaging_testing::mocks::FixedClock;
    /// use openmessaging_core::clock::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Lets tests give consecutive messages distinct store timestamps, which
    /// `seek_by_time` depends on.
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock reading `start`.
        #[must_use]
        pub const fn new(start: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(start),
            }
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// 2025-01-01 00:00:00 UTC, the starting time of the test clocks.
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::default() + chrono::Duration::seconds(1_735_689_600)
    }
}

/// Message and logging helpers.
pub mod helpers {
    use openmessaging_core::message::Message;

    /// A message whose body is `text` in UTF-8.
    #[must_use]
    pub fn text_message(text: &str) -> Message {
        Message::new(text.as_bytes().to_vec())
    }

    /// The body of `message` as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(message: &Message) -> String {
        String::from_utf8_lossy(message.body()).into_owned()
    }

    /// Install a `tracing` subscriber writing through the test harness.
    ///
    /// Filtered by `RUST_LOG`. Safe to call from every test; only the first
    /// call installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use openmessaging_core::key_value::KeyValue;
    use proptest::prelude::*;

    /// Upper-case property keys such as `REGION` or `MAX_BATCH`.
    pub fn arb_property_key() -> impl Strategy<Value = String> {
        "[A-Z][A-Z_]{0,11}"
    }

    /// Short printable property values, possibly empty.
    pub fn arb_property_value() -> impl Strategy<Value = String> {
        "[a-z0-9.-]{0,8}"
    }

    /// Property bags with up to eight entries.
    pub fn arb_key_value() -> impl Strategy<Value = KeyValue> {
        prop::collection::btree_map(arb_property_key(), arb_property_value(), 0..8)
            .prop_map(|entries| entries.into_iter().collect::<KeyValue>())
    }

    /// Partition counts small enough to enumerate in a test.
    pub fn arb_partition_count() -> impl Strategy<Value = u32> {
        1u32..8
    }

    /// Message bodies for one partition.
    pub fn arb_bodies() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,6}", 0..12)
    }
}

// Re-export commonly used items
pub use helpers::{body_text, init_test_tracing, text_message};
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn manual_clock_moves_on_demand() {
        let clock = ManualClock::new(test_epoch());
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance(chrono::Duration::milliseconds(250));
        assert_eq!(clock.now() - start, chrono::Duration::milliseconds(250));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn text_messages_round_trip_body() {
        assert_eq!(body_text(&text_message("hello")), "hello");
    }
}
