pub mod memory;
pub mod postgres;

use crate::domain::BookRecord;
use crate::error::StoreError;
use async_trait::async_trait;

pub use memory::InMemoryBookStore;
pub use postgres::PgBookStore;

/// Current-state store of rented books, keyed by ISBN.
///
/// Implementations own persistence only; idempotency is enforced by callers
/// re-reading state with `find_by_isbn` before every mutation.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Look up a record by ISBN
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, StoreError>;

    /// Insert or overwrite the record stored under `record.isbn`
    async fn save(&self, record: &BookRecord) -> Result<(), StoreError>;

    /// Remove the record stored under `record.isbn`
    async fn delete(&self, record: &BookRecord) -> Result<(), StoreError>;

    /// Page through records in the store's natural (ISBN) order
    async fn scan_page(&self, offset: u64, limit: u32) -> Result<Vec<BookRecord>, StoreError>;
}
