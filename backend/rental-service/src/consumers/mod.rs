//! Book event consumption
//!
//! ```text
//! Kafka batch → TopicRoutes::decode → RecordFilter → ErrorPolicy(ReconciliationEngine)
//!                                                         ↓ (retries exhausted)
//!                                                   DeadLetterSink
//! ```

pub mod dead_letter;
pub mod envelope;
pub mod error_policy;
pub mod filter;
pub mod kafka;
pub mod pipeline;
pub mod reconcile;

pub use dead_letter::{DeadLetterSink, InMemoryDeadLetterSink, KafkaDeadLetterSink};
pub use envelope::{BookEvent, Delivery, RawRecord, TopicRoutes};
pub use error_policy::{BatchOutcome, ErrorPolicy};
pub use filter::RecordFilter;
pub use kafka::BookEventsConsumer;
pub use pipeline::{BatchReport, BatchState, ConsumptionPipeline};
pub use reconcile::{ReconciliationEngine, RentalOutcome, ReturnOutcome};
