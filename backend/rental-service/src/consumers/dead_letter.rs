//! Dead-letter forwarding
//!
//! Records that still fail after the batch retry budget is spent are copied,
//! payload untouched, to a secondary topic. Origin coordinates and the failure
//! message travel as headers. A failed publish is reported once and never
//! retried.

use super::envelope::RawRecord;
use crate::config::DeadLetterConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use rdkafka::error::KafkaError;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub const HEADER_ORIGIN_TOPIC: &str = "x-origin-topic";
pub const HEADER_ORIGIN_PARTITION: &str = "x-origin-partition";
pub const HEADER_ORIGIN_OFFSET: &str = "x-origin-offset";
pub const HEADER_EXCEPTION_MESSAGE: &str = "x-exception-message";

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Forward the original record. `reason` describes the last failure.
    async fn send(&self, record: &RawRecord, reason: &str) -> Result<(), PublishError>;
}

/// Kafka-backed sink
pub struct KafkaDeadLetterSink {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaDeadLetterSink {
    pub fn new(brokers: &str, config: &DeadLetterConfig) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", config.timeout.as_millis().to_string())
            .set("acks", "all")
            .create()?;

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            timeout: config.timeout,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterSink {
    async fn send(&self, record: &RawRecord, reason: &str) -> Result<(), PublishError> {
        let partition = record.partition.to_string();
        let offset = record.offset.to_string();

        let headers = OwnedHeaders::new()
            .insert(Header {
                key: HEADER_ORIGIN_TOPIC,
                value: Some(record.topic.as_bytes()),
            })
            .insert(Header {
                key: HEADER_ORIGIN_PARTITION,
                value: Some(partition.as_bytes()),
            })
            .insert(Header {
                key: HEADER_ORIGIN_OFFSET,
                value: Some(offset.as_bytes()),
            })
            .insert(Header {
                key: HEADER_EXCEPTION_MESSAGE,
                value: Some(reason.as_bytes()),
            });

        let mut message: FutureRecord<'_, str, [u8]> =
            FutureRecord::to(&self.topic).headers(headers);
        if let Some(key) = record.key.as_deref() {
            message = message.key(key);
        }
        if let Some(payload) = record.payload.as_deref() {
            message = message.payload(payload);
        }

        info!(
            topic = %self.topic,
            origin_topic = %record.topic,
            origin_partition = record.partition,
            origin_offset = record.offset,
            "Sending failed record to dead-letter topic"
        );

        match self.producer.send(message, self.timeout).await {
            Ok((partition, offset)) => {
                debug!(
                    topic = %self.topic,
                    partition = partition,
                    offset = offset,
                    "Dead-letter record delivered"
                );
                Ok(())
            }
            Err((e, _)) => {
                error!(
                    error = %e,
                    topic = %self.topic,
                    origin_topic = %record.topic,
                    origin_offset = record.offset,
                    "Failed to publish record to dead-letter topic"
                );
                Err(PublishError::Failed {
                    topic: self.topic.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Sink that keeps forwarded records in memory
#[derive(Default)]
pub struct InMemoryDeadLetterSink {
    records: Mutex<Vec<(RawRecord, String)>>,
    reject: bool,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every publish fails
    pub fn rejecting() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub async fn records(&self) -> Vec<(RawRecord, String)> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn send(&self, record: &RawRecord, reason: &str) -> Result<(), PublishError> {
        if self.reject {
            return Err(PublishError::Closed);
        }
        self.records
            .lock()
            .await
            .push((record.clone(), reason.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink_keeps_payload() {
        let sink = InMemoryDeadLetterSink::new();
        let record = RawRecord::new("rented-books", 0, 5, b"{broken").with_key("111");

        sink.send(&record, "invalid JSON").await.unwrap();

        let stored = sink.records().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, record);
        assert_eq!(stored[0].1, "invalid JSON");
    }

    #[tokio::test]
    async fn test_rejecting_sink_reports_failure() {
        let sink = InMemoryDeadLetterSink::rejecting();
        let record = RawRecord::new("rented-books", 0, 5, b"{}");

        assert!(matches!(
            sink.send(&record, "boom").await,
            Err(PublishError::Closed)
        ));
        assert!(sink.records().await.is_empty());
    }

    #[test]
    fn test_kafka_sink_uses_configured_topic() {
        let config = DeadLetterConfig {
            topic: "rented-books-dlt".to_string(),
            timeout: Duration::from_millis(100),
        };

        let sink = KafkaDeadLetterSink::new("localhost:9092", &config).unwrap();
        assert_eq!(sink.topic(), "rented-books-dlt");
    }
}
