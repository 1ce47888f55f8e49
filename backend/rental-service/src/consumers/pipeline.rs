use super::dead_letter::DeadLetterSink;
use super::envelope::{Delivery, RawRecord, TopicRoutes};
use super::error_policy::{BatchOutcome, ErrorPolicy};
use super::filter::RecordFilter;
use super::reconcile::ReconciliationEngine;
use crate::config::PipelineConfig;
use crate::error::ProcessingError;
use crate::metrics;
use crate::repository::BookStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle of a batch, logged at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Received,
    Filtered,
    Applied,
    Failed,
    Retried,
    DeadLettered,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Received => write!(f, "received"),
            BatchState::Filtered => write!(f, "filtered"),
            BatchState::Applied => write!(f, "applied"),
            BatchState::Failed => write!(f, "failed"),
            BatchState::Retried => write!(f, "retried"),
            BatchState::DeadLettered => write!(f, "dead_lettered"),
        }
    }
}

/// Summary of one `process_batch` call
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub received: usize,
    pub filtered_out: usize,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    /// States the batch passed through, in order
    pub fn states(&self) -> Vec<BatchState> {
        let mut states = vec![BatchState::Received, BatchState::Filtered];
        match self.outcome {
            BatchOutcome::Applied { attempts, .. } => {
                if attempts > 1 {
                    states.extend([BatchState::Failed, BatchState::Retried]);
                }
                states.push(BatchState::Applied);
            }
            BatchOutcome::DeadLettered { attempts, .. } => {
                states.push(BatchState::Failed);
                if attempts > 1 {
                    states.push(BatchState::Retried);
                }
                states.push(BatchState::DeadLettered);
            }
        }
        states
    }

    pub fn final_state(&self) -> BatchState {
        match self.outcome {
            BatchOutcome::Applied { .. } => BatchState::Applied,
            BatchOutcome::DeadLettered { .. } => BatchState::DeadLettered,
        }
    }
}

/// Filter → reconcile → error policy, one batch at a time.
///
/// Holds no state between batches; the transport owns delivery and offsets.
pub struct ConsumptionPipeline {
    routes: TopicRoutes,
    filter: RecordFilter,
    engine: ReconciliationEngine,
    policy: ErrorPolicy,
}

impl ConsumptionPipeline {
    pub fn new(
        routes: TopicRoutes,
        filter: RecordFilter,
        engine: ReconciliationEngine,
        policy: ErrorPolicy,
    ) -> Self {
        Self {
            routes,
            filter,
            engine,
            policy,
        }
    }

    /// Wire a pipeline from configuration and its two collaborators
    pub fn from_config(
        config: &PipelineConfig,
        routes: TopicRoutes,
        store: Arc<dyn BookStore>,
        sink: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self::new(
            routes,
            RecordFilter::from_config(config),
            ReconciliationEngine::new(store),
            ErrorPolicy::new(config.retry_config(), sink),
        )
    }

    pub fn routes(&self) -> &TopicRoutes {
        &self.routes
    }

    pub async fn process_batch(&self, records: Vec<RawRecord>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let received = records.len();
        metrics::record_received(received);
        debug!(batch_id = %batch_id, records = received, state = %BatchState::Received, "Batch received");

        let admitted: Vec<Delivery> = records
            .into_iter()
            .map(|raw| self.routes.decode(raw))
            .filter(|delivery| self.filter.admits(delivery))
            .collect();
        let filtered_out = received - admitted.len();
        metrics::record_filtered(filtered_out);
        debug!(
            batch_id = %batch_id,
            admitted = admitted.len(),
            filtered_out = filtered_out,
            state = %BatchState::Filtered,
            "Batch filtered"
        );

        let outcome = if admitted.is_empty() {
            BatchOutcome::Applied {
                attempts: 0,
                applied: 0,
            }
        } else {
            let deliveries = admitted.as_slice();
            self.policy
                .execute(batch_id, deliveries, move || self.apply_all(deliveries))
                .await
        };

        if let BatchOutcome::Applied { applied, .. } = outcome {
            metrics::record_applied(applied);
        }

        let report = BatchReport {
            batch_id,
            received,
            filtered_out,
            outcome,
        };
        info!(
            batch_id = %batch_id,
            received = received,
            filtered_out = filtered_out,
            attempts = outcome.attempts(),
            state = %report.final_state(),
            "Batch resolved"
        );
        report
    }

    async fn apply_all(&self, deliveries: &[Delivery]) -> Result<usize, ProcessingError> {
        for delivery in deliveries {
            self.engine.apply(delivery).await?;
        }
        Ok(deliveries.len())
    }
}
