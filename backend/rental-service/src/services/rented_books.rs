use crate::consumers::{ReconciliationEngine, ReturnOutcome};
use crate::domain::BookDto;
use crate::error::{ServiceError, ServiceResult};
use crate::repository::BookStore;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Read/delete entry points used by the HTTP layer
#[derive(Clone)]
pub struct RentedBookService {
    store: Arc<dyn BookStore>,
    engine: ReconciliationEngine,
}

impl RentedBookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            engine: ReconciliationEngine::new(store.clone()),
            store,
        }
    }

    /// One page of currently rented books in store order. `page` is zero-based.
    pub async fn list_rented(&self, page: u32, size: u32) -> ServiceResult<Vec<BookDto>> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ServiceError::InvalidInput(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let offset = u64::from(page) * u64::from(size);
        let records = self.store.scan_page(offset, size).await?;
        Ok(records.into_iter().map(BookDto::from).collect())
    }

    /// Remove a rental; removing an unknown ISBN is a no-op.
    pub async fn remove_by_isbn(&self, isbn: &str) -> ServiceResult<()> {
        let isbn = isbn.trim();
        if isbn.is_empty() {
            return Err(ServiceError::InvalidInput("isbn must not be empty".to_string()));
        }

        if self.engine.remove(isbn).await? == ReturnOutcome::Removed {
            info!(isbn = %isbn, "Rental removed on request");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookRecord;
    use crate::repository::InMemoryBookStore;

    async fn seeded(count: usize) -> (Arc<InMemoryBookStore>, RentedBookService) {
        let store = Arc::new(InMemoryBookStore::new());
        for i in 0..count {
            store
                .save(&BookRecord {
                    isbn: format!("{:03}", i),
                    title: None,
                    author: None,
                    category: Some("FANTASY".to_string()),
                    borrower: Some(format!("reader-{}", i)),
                })
                .await
                .unwrap();
        }
        (store.clone(), RentedBookService::new(store))
    }

    #[tokio::test]
    async fn test_list_rented_pages_through_store() {
        let (_, service) = seeded(5).await;

        let first = service.list_rented(0, 2).await.unwrap();
        let last = service.list_rented(2, 2).await.unwrap();
        let beyond = service.list_rented(3, 2).await.unwrap();

        assert_eq!(
            first.iter().map(|b| b.isbn.as_str()).collect::<Vec<_>>(),
            vec!["000", "001"]
        );
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].isbn, "004");
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_list_rented_rejects_bad_size() {
        let (_, service) = seeded(1).await;

        assert!(matches!(
            service.list_rented(0, 0).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.list_rented(0, MAX_PAGE_SIZE + 1).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, service) = seeded(1).await;

        service.remove_by_isbn("000").await.unwrap();
        service.remove_by_isbn("000").await.unwrap();
        service.remove_by_isbn("never-rented").await.unwrap();

        assert!(store.is_empty().await);
    }
}
