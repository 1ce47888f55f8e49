pub mod models;

pub use models::{BookDto, BookRecord, RentalEvent, ReturnEvent};
