use super::envelope::{BookEvent, Delivery};
use crate::domain::{RentalEvent, ReturnEvent};
use crate::error::{ProcessingError, StoreError};
use crate::repository::BookStore;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalOutcome {
    Created,
    /// Borrower reassigned on an existing record
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    Removed,
    /// No record for the ISBN; either never rented or already removed
    NotTracked,
}

/// Applies book events to the store.
///
/// Every call re-reads current state, so duplicate or replayed deliveries
/// converge to the same result.
#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn BookStore>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn apply_rental(&self, event: &RentalEvent) -> Result<RentalOutcome, StoreError> {
        match self.store.find_by_isbn(&event.isbn).await? {
            Some(mut existing) => {
                let previous = existing.borrower.take();
                existing.borrower = event.borrower.clone();
                self.store.save(&existing).await?;

                info!(
                    isbn = %event.isbn,
                    borrower = event.borrower.as_deref().unwrap_or("<none>"),
                    previous_borrower = previous.as_deref().unwrap_or("<none>"),
                    "Updated borrower of rented book"
                );
                Ok(RentalOutcome::Updated)
            }
            None => {
                self.store.save(&event.to_record()).await?;

                info!(
                    isbn = %event.isbn,
                    borrower = event.borrower.as_deref().unwrap_or("<none>"),
                    category = event.category.as_deref().unwrap_or("<none>"),
                    "Stored newly rented book"
                );
                Ok(RentalOutcome::Created)
            }
        }
    }

    pub async fn apply_return(&self, event: &ReturnEvent) -> Result<ReturnOutcome, StoreError> {
        self.remove(&event.isbn).await
    }

    /// Delete the record for `isbn` if present. Absence is logged, not an error.
    pub async fn remove(&self, isbn: &str) -> Result<ReturnOutcome, StoreError> {
        info!(isbn = %isbn, "Attempting to remove returned book");

        match self.store.find_by_isbn(isbn).await? {
            Some(existing) => {
                self.store.delete(&existing).await?;
                info!(isbn = %isbn, "Removed returned book");
                Ok(ReturnOutcome::Removed)
            }
            None => {
                warn!(isbn = %isbn, "Book not found in store, nothing to remove");
                Ok(ReturnOutcome::NotTracked)
            }
        }
    }

    /// Apply one delivery; malformed records fail here.
    pub async fn apply(&self, delivery: &Delivery) -> Result<(), ProcessingError> {
        match &delivery.event {
            BookEvent::Rented(event) => {
                info!(
                    isbn = %event.isbn,
                    borrower = event.borrower.as_deref().unwrap_or("<none>"),
                    "Received rented book event"
                );
                self.apply_rental(event).await?;
            }
            BookEvent::Returned(event) => {
                info!(isbn = %event.isbn, "Received returned book event");
                self.apply_return(event).await?;
            }
            BookEvent::Undecodable { reason } | BookEvent::Invalid { reason, .. } => {
                return Err(ProcessingError::Deserialization {
                    topic: delivery.raw.topic.clone(),
                    partition: delivery.raw.partition,
                    offset: delivery.raw.offset,
                    reason: reason.clone(),
                });
            }
        }
        Ok(())
    }
}
