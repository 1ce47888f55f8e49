use super::BookStore;
use crate::domain::BookRecord;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Process-local store ordered by ISBN. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryBookStore {
    records: RwLock<BTreeMap<String, BookRecord>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, StoreError> {
        Ok(self.records.read().await.get(isbn).cloned())
    }

    async fn save(&self, record: &BookRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.isbn.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, record: &BookRecord) -> Result<(), StoreError> {
        self.records.write().await.remove(&record.isbn);
        Ok(())
    }

    async fn scan_page(&self, offset: u64, limit: u32) -> Result<Vec<BookRecord>, StoreError> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(self
            .records
            .read()
            .await
            .values()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(isbn: &str) -> BookRecord {
        BookRecord {
            isbn: isbn.to_string(),
            title: None,
            author: None,
            category: Some("FANTASY".to_string()),
            borrower: Some("Alice".to_string()),
        }
    }

    #[tokio::test]
    async fn test_scan_page_is_ordered_by_isbn() {
        let store = InMemoryBookStore::new();
        for isbn in ["333", "111", "222"] {
            store.save(&record(isbn)).await.unwrap();
        }

        let first = store.scan_page(0, 2).await.unwrap();
        let second = store.scan_page(2, 2).await.unwrap();

        assert_eq!(
            first.iter().map(|r| r.isbn.as_str()).collect::<Vec<_>>(),
            vec!["111", "222"]
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].isbn, "333");
        assert!(store.scan_page(10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let store = InMemoryBookStore::new();
        store.delete(&record("999")).await.unwrap();
        assert!(store.is_empty().await);
    }
}
