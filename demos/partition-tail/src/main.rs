//! Partition tail demo
//!
//! Publishes sensor readings to an in-memory queue and tails every
//! partition concurrently with one streaming consumer, then replays a
//! partition as a `Stream` with a second consumer.
//!
//! # Running the Example
//!
//! ```bash
//! RUST_LOG=info,openmessaging_memory=debug cargo run -p partition-tail
//! ```
//!
//! Consumer settings come from `OMS_CONSUMER_ID`, `OMS_OPERATION_TIMEOUT_MS`
//! and `OMS_AUTO_OFFSET_RESET`.

use futures::StreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use openmessaging_core::prelude::*;
use openmessaging_memory::{InMemoryResourceManager, metrics::describe_metrics};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PARTITIONS: u32 = 3;
const READINGS_PER_PARTITION: u32 = 4;

#[derive(Debug, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    celsius: f64,
}

/// Append readings round-robin across the partitions, a little apart.
async fn produce(manager: InMemoryResourceManager, queue: QueueName) -> Result<()> {
    let total = PARTITIONS * READINGS_PER_PARTITION;
    for index in 0..total {
        let partition = PartitionId::new((index % PARTITIONS).to_string());
        let reading = Reading {
            sensor: format!("sensor-{partition}"),
            celsius: 0.5f64.mul_add(f64::from(index), 18.0),
        };
        let message = Message::from_value(&reading)?.with_property("UNIT", "celsius");
        manager.append(&queue, &partition, message)?;
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    tracing::info!(messages = total, "Producer finished");
    Ok(())
}

/// Read `count` messages from one partition, then commit.
async fn tail(mut iterator: BoxPartitionIterator, count: u32) -> Result<(PartitionId, u32)> {
    let mut read = 0;
    while read < count {
        match iterator.next().await {
            Ok(message) => {
                let reading: Reading = message.decode()?;
                tracing::info!(
                    partition = %iterator.partition(),
                    offset = message.offset(),
                    sensor = %reading.sensor,
                    celsius = reading.celsius,
                    "Reading received"
                );
                read += 1;
            }
            Err(e) if e.is_retryable() => {
                tracing::debug!(partition = %iterator.partition(), "Still waiting");
            }
            Err(e) => return Err(e),
        }
    }
    iterator.commit().await?;
    Ok((iterator.partition().clone(), read))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,partition_tail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();

    let config = ConsumerConfig::from_env();
    tracing::info!(?config, "Consumer configuration loaded");

    let manager = InMemoryResourceManager::new();
    let queue = QueueName::new("sensor-readings");
    manager
        .create_queue(&queue, PARTITIONS, KeyValue::new().with(property_keys::REGION, "eu-west"))
        .await?;

    let consumer = manager.streaming_consumer(&queue).config(&config).build()?;
    consumer.startup().await?;
    println!(
        "Consumer properties: {}",
        serde_json::to_string_pretty(&consumer.properties())?
    );

    let mut tails = Vec::new();
    for partition in consumer.partitions().await? {
        let iterator = consumer.partition_iterator(&partition).await?;
        tails.push(tokio::spawn(tail(iterator, READINGS_PER_PARTITION)));
    }
    let producer = tokio::spawn(produce(manager.clone(), queue.clone()));
    for handle in tails {
        let (partition, read) = handle.await??;
        println!("Partition {partition}: {read} readings, committed");
    }
    producer.await??;

    // Replay one partition from the start as a stream with a second consumer.
    let replay = manager
        .streaming_consumer(&queue)
        .consumer_id("replay")
        .auto_offset_reset(AutoOffsetReset::Earliest)
        .operation_timeout(Duration::from_millis(200))
        .build()?;
    replay.startup().await?;
    let iterator = replay
        .partition_iterator_with(
            &PartitionId::new("0"),
            KeyValue::new().with("PURPOSE", "replay"),
        )
        .await?;
    let replayed: Vec<Message> = into_stream(iterator)
        .take(READINGS_PER_PARTITION as usize)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_>>()?;
    println!("Replayed {} readings from partition 0", replayed.len());

    println!("Consumers on {queue}: {:?}", consumer.consumers().await?);

    replay.shutdown().await?;
    consumer.shutdown().await?;

    println!("\n{}", metrics.render());
    Ok(())
}
