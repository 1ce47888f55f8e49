use super::dead_letter::DeadLetterSink;
use super::envelope::Delivery;
use super::pipeline::BatchState;
use crate::error::ProcessingError;
use crate::metrics;
use resilience::{with_retry, RetryConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Terminal state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every admitted record reached the store
    Applied { attempts: u32, applied: usize },
    /// Retries exhausted; each admitted record was handed to the dead-letter sink
    DeadLettered {
        attempts: u32,
        published: usize,
        publish_failures: usize,
    },
}

impl BatchOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            BatchOutcome::Applied { attempts, .. } | BatchOutcome::DeadLettered { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Bounded batch retry with dead-letter fallback
pub struct ErrorPolicy {
    retry: RetryConfig,
    sink: Arc<dyn DeadLetterSink>,
}

impl ErrorPolicy {
    pub fn new(retry: RetryConfig, sink: Arc<dyn DeadLetterSink>) -> Self {
        Self { retry, sink }
    }

    /// Run `process` over the batch, retrying the whole batch up to the
    /// configured bound. Never fails: an exhausted batch is dead-lettered
    /// record by record and reported as handled.
    pub async fn execute<F, Fut>(
        &self,
        batch_id: Uuid,
        batch: &[Delivery],
        mut process: F,
    ) -> BatchOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<usize, ProcessingError>>,
    {
        let max_attempts = self.retry.max_attempts();
        let result = with_retry(&self.retry, |attempt| {
            if attempt > 1 {
                metrics::record_batch_retry();
                warn!(
                    batch_id = %batch_id,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    records = batch.len(),
                    state = %BatchState::Retried,
                    "Retrying failed batch"
                );
            }

            let run = process();
            async move {
                let result = run.await;
                if let Err(e) = &result {
                    warn!(
                        batch_id = %batch_id,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %e,
                        state = %BatchState::Failed,
                        "Batch attempt failed"
                    );
                }
                result
            }
        })
        .await;

        match result {
            Ok((applied, attempts)) => BatchOutcome::Applied { attempts, applied },
            Err(exhausted) => {
                let attempts = exhausted.attempts();
                let last_error = exhausted.into_last_error();
                error!(
                    batch_id = %batch_id,
                    attempts = attempts,
                    records = batch.len(),
                    error = %last_error,
                    "Batch failed after retries, routing records to dead-letter topic"
                );

                let (published, publish_failures) =
                    self.dead_letter(batch_id, batch, &last_error.to_string()).await;

                BatchOutcome::DeadLettered {
                    attempts,
                    published,
                    publish_failures,
                }
            }
        }
    }

    async fn dead_letter(&self, batch_id: Uuid, batch: &[Delivery], reason: &str) -> (usize, usize) {
        let mut published = 0;
        let mut failed = 0;

        for delivery in batch {
            match self.sink.send(&delivery.raw, reason).await {
                Ok(()) => {
                    published += 1;
                    metrics::record_dead_lettered(true);
                }
                Err(e) => {
                    failed += 1;
                    metrics::record_dead_lettered(false);
                    error!(
                        batch_id = %batch_id,
                        topic = %delivery.raw.topic,
                        partition = delivery.raw.partition,
                        offset = delivery.raw.offset,
                        error = %e,
                        "Record dropped: dead-letter publish failed"
                    );
                }
            }
        }

        info!(
            batch_id = %batch_id,
            published = published,
            failed = failed,
            "Dead-letter routing finished"
        );
        (published, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::dead_letter::InMemoryDeadLetterSink;
    use crate::consumers::envelope::{RawRecord, TopicRoutes};
    use crate::error::StoreError;
    use std::fmt;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the `state` field of every event
    #[derive(Clone, Default)]
    struct StateRecorder(Arc<std::sync::Mutex<Vec<String>>>);

    struct StateField(Option<String>);

    impl Visit for StateField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "state" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for StateRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = StateField(None);
            event.record(&mut visitor);
            if let Some(state) = visitor.0 {
                self.0.lock().unwrap().push(state);
            }
        }
    }

    fn batch() -> Vec<Delivery> {
        let routes = TopicRoutes::new("rented-books", "returned-books");
        (0..3)
            .map(|offset| {
                routes.decode(RawRecord::new(
                    "rented-books",
                    0,
                    offset,
                    format!(
                        r#"{{"isbn":"{}","category":"FANTASY","borrower":"Alice"}}"#,
                        offset
                    )
                    .as_bytes(),
                ))
            })
            .collect()
    }

    fn policy(sink: Arc<InMemoryDeadLetterSink>) -> ErrorPolicy {
        ErrorPolicy::new(RetryConfig::fixed(1, Duration::from_millis(5)), sink)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let batch = batch();

        let outcome = policy(sink.clone())
            .execute(Uuid::new_v4(), &batch, || async { Ok(3) })
            .await;

        assert_eq!(outcome, BatchOutcome::Applied { attempts: 1, applied: 3 });
        assert!(sink.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_on_retry() {
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let calls = AtomicU32::new(0);
        let batch = batch();

        let outcome = policy(sink.clone())
            .execute(Uuid::new_v4(), &batch, || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(ProcessingError::Store(StoreError::Unavailable("blip".into())))
                    } else {
                        Ok(3)
                    }
                }
            })
            .await;

        assert_eq!(outcome, BatchOutcome::Applied { attempts: 2, applied: 3 });
        assert!(sink.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistent_failure_retries_once_then_dead_letters() {
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let calls = AtomicU32::new(0);
        let batch = batch();

        let outcome = policy(sink.clone())
            .execute(Uuid::new_v4(), &batch, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProcessingError::Store(StoreError::Unavailable("down".into()))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            outcome,
            BatchOutcome::DeadLettered {
                attempts: 2,
                published: 3,
                publish_failures: 0
            }
        );

        let forwarded = sink.records().await;
        assert_eq!(forwarded.len(), 3);
        for (delivery, (raw, reason)) in batch.iter().zip(forwarded.iter()) {
            assert_eq!(&delivery.raw, raw);
            assert!(reason.contains("down"));
        }
    }

    #[tokio::test]
    async fn test_publish_failures_are_counted_not_raised() {
        let sink = Arc::new(InMemoryDeadLetterSink::rejecting());
        let batch = batch();

        let outcome = policy(sink)
            .execute(Uuid::new_v4(), &batch, || async {
                Err(ProcessingError::Store(StoreError::Unavailable("down".into())))
            })
            .await;

        assert_eq!(
            outcome,
            BatchOutcome::DeadLettered {
                attempts: 2,
                published: 0,
                publish_failures: 3
            }
        );
    }

    #[tokio::test]
    async fn test_failed_and_retried_states_are_logged() {
        let recorder = StateRecorder::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(recorder.clone()),
        );
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let batch = batch();

        policy(sink)
            .execute(Uuid::new_v4(), &batch, || async {
                Err(ProcessingError::Store(StoreError::Unavailable("down".into())))
            })
            .await;

        let states = recorder.0.lock().unwrap().clone();
        assert_eq!(states, vec!["failed", "retried", "failed"]);
    }
}
