pub mod config;
pub mod consumers;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod repository;
pub mod services;

pub use consumers::{BookEventsConsumer, ConsumptionPipeline};
pub use domain::{BookDto, BookRecord, RentalEvent, ReturnEvent};
pub use repository::{BookStore, InMemoryBookStore, PgBookStore};
