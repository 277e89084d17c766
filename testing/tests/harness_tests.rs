//! Tests for the consumer test harness

#![allow(clippy::unwrap_used)] // Tests can unwrap

use openmessaging_core::prelude::*;
use openmessaging_testing::properties::{arb_key_value, arb_partition_count};
use openmessaging_testing::{ConsumerTestHarness, init_test_tracing, test_epoch};
use proptest::prelude::*;

#[tokio::test]
async fn test_harness_reads_appended_messages() {
    init_test_tracing();
    let mut harness = ConsumerTestHarness::new();
    harness.given_queue("orders", 2).await.unwrap();
    harness.given_messages("0", &["created", "paid"]).unwrap();
    harness
        .given_running_consumer(|builder| builder.consumer_id("billing"))
        .await
        .unwrap();

    harness.then_partitions(&["0", "1"]).await.unwrap();
    harness.then_reads("0", &["created", "paid"]).await.unwrap();
    harness.then_reads("1", &[]).await.unwrap();
}

#[tokio::test]
async fn test_harness_spaces_store_timestamps() {
    let mut harness = ConsumerTestHarness::new();
    harness.given_queue("orders", 1).await.unwrap();
    harness.given_messages("0", &["a", "b"]).unwrap();
    harness.given_running_consumer(|builder| builder).await.unwrap();

    let mut iterator = harness
        .consumer()
        .partition_iterator(&PartitionId::new("0"))
        .await
        .unwrap();
    let first = iterator.next().await.unwrap();
    let second = iterator.next().await.unwrap();

    assert_eq!(first.store_timestamp(), Some(test_epoch()));
    assert_eq!(
        second.store_timestamp(),
        Some(test_epoch() + chrono::Duration::seconds(1))
    );
}

#[tokio::test]
async fn test_harness_stop_consumer() {
    let mut harness = ConsumerTestHarness::new();
    harness.given_queue("orders", 1).await.unwrap();
    harness.given_running_consumer(|builder| builder.consumer_id("c")).await.unwrap();

    harness.stop_consumer().await.unwrap();

    let ghost = ConsumerId::new("c");
    assert_eq!(
        harness.manager().consumer_properties(&ghost).await.unwrap_err(),
        OmsError::UnknownConsumer(ghost)
    );
}

#[test]
#[should_panic(expected = "Consumer must be started")]
fn test_harness_without_consumer_panics() {
    let harness = ConsumerTestHarness::new();
    let _ = harness.consumer();
}

proptest! {
    #[test]
    fn generated_bags_survive_properties_round_trip(bag in arb_key_value()) {
        let rebuilt: KeyValue = bag.iter().collect();
        prop_assert_eq!(rebuilt, bag);
    }

    #[test]
    fn partition_ids_follow_creation_order(count in arb_partition_count()) {
        let ids = tokio_test::block_on(async {
            let mut harness = ConsumerTestHarness::new();
            harness.given_queue("q", count).await.unwrap();
            harness.given_running_consumer(|builder| builder).await.unwrap();
            harness.consumer().partitions().await.unwrap()
        });

        let expected: Vec<PartitionId> =
            (0..count).map(|index| PartitionId::new(index.to_string())).collect();
        prop_assert_eq!(ids, expected);
    }
}
