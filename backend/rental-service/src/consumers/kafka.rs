//! Kafka binding for the consumption pipeline
//!
//! Records are pulled into batches (size or time bound, whichever comes
//! first), resolved by the pipeline, and only then committed. Auto-commit is
//! off: a batch interrupted by shutdown is never acknowledged and gets
//! re-delivered after restart.

use super::envelope::RawRecord;
use super::pipeline::ConsumptionPipeline;
use crate::config::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{Offset, TopicPartitionList};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Consumer of the rented/returned book topics
pub struct BookEventsConsumer {
    consumer: StreamConsumer,
    pipeline: Arc<ConsumptionPipeline>,
    batch_size: usize,
    batch_timeout: Duration,
}

impl BookEventsConsumer {
    /// Create the consumer and subscribe it to the pipeline's topics.
    pub fn register(
        config: &KafkaConfig,
        pipeline: Arc<ConsumptionPipeline>,
    ) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "30000")
            .set("max.poll.interval.ms", "300000")
            .create()?;

        let topics = pipeline.routes().topics();
        consumer.subscribe(&topics)?;
        info!(
            "Created Kafka consumer for topics {:?} with group '{}'",
            topics, config.group_id
        );

        Ok(Self {
            consumer,
            pipeline,
            batch_size: config.batch_size.max(1),
            batch_timeout: config.batch_timeout,
        })
    }

    /// Consume until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.batch_size,
            batch_timeout_ms = self.batch_timeout.as_millis() as u64,
            "Starting book events consumer"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let batch = tokio::select! {
                _ = shutdown.changed() => break,
                batch = self.collect_batch() => batch,
            };

            let offsets = next_offsets(&batch);
            let report = self.pipeline.process_batch(batch).await;

            // Every outcome is terminal (applied or dead-lettered), so the batch
            // is acknowledged either way.
            if let Err(e) = self.commit(&offsets) {
                warn!(batch_id = %report.batch_id, "Failed to commit Kafka offsets: {}", e);
            }
        }

        info!("Book events consumer stopped");
    }

    /// Wait for the first record, then keep filling until the batch is full or
    /// the batch window closes.
    async fn collect_batch(&self) -> Vec<RawRecord> {
        let mut batch = Vec::with_capacity(self.batch_size);

        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    batch.push(RawRecord::from_message(&message));
                    break;
                }
                Err(e) => {
                    error!("Kafka consumer error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        let deadline = Instant::now() + self.batch_timeout;
        while batch.len() < self.batch_size {
            match tokio::time::timeout_at(deadline, self.consumer.recv()).await {
                Ok(Ok(message)) => batch.push(RawRecord::from_message(&message)),
                Ok(Err(e)) => {
                    error!("Kafka consumer error while filling batch: {}", e);
                    break;
                }
                Err(_) => break,
            }
        }

        batch
    }

    fn commit(&self, offsets: &BTreeMap<(String, i32), i64>) -> Result<(), KafkaError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for ((topic, partition), next) in offsets {
            tpl.add_partition_offset(topic, *partition, Offset::Offset(*next))?;
        }
        self.consumer.commit(&tpl, CommitMode::Async)
    }
}

/// Offset to commit per (topic, partition): one past the highest seen.
fn next_offsets(batch: &[RawRecord]) -> BTreeMap<(String, i32), i64> {
    let mut offsets = BTreeMap::new();
    for record in batch {
        let next = record.offset + 1;
        offsets
            .entry((record.topic.clone(), record.partition))
            .and_modify(|current: &mut i64| *current = (*current).max(next))
            .or_insert(next);
    }
    offsets
}
