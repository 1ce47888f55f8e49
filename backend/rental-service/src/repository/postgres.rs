use super::BookStore;
use crate::domain::BookRecord;
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// PostgreSQL-backed store (`rented_books` table)
#[derive(Clone)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<BookRecord>, StoreError> {
        let record = sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT isbn, title, author, category, borrower
            FROM rented_books
            WHERE isbn = $1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn save(&self, record: &BookRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rented_books (isbn, title, author, category, borrower, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (isbn) DO UPDATE
            SET title = EXCLUDED.title,
                author = EXCLUDED.author,
                category = EXCLUDED.category,
                borrower = EXCLUDED.borrower,
                updated_at = NOW()
            "#,
        )
        .bind(&record.isbn)
        .bind(&record.title)
        .bind(&record.author)
        .bind(&record.category)
        .bind(&record.borrower)
        .execute(&self.pool)
        .await?;

        debug!(isbn = %record.isbn, "Book row upserted");
        Ok(())
    }

    async fn delete(&self, record: &BookRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM rented_books
            WHERE isbn = $1
            "#,
        )
        .bind(&record.isbn)
        .execute(&self.pool)
        .await?;

        debug!(
            isbn = %record.isbn,
            rows = result.rows_affected(),
            "Book row deleted"
        );
        Ok(())
    }

    async fn scan_page(&self, offset: u64, limit: u32) -> Result<Vec<BookRecord>, StoreError> {
        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::Unavailable(format!("offset {} out of range", offset)))?;

        let records = sqlx::query_as::<_, BookRecord>(
            r#"
            SELECT isbn, title, author, category, borrower
            FROM rented_books
            ORDER BY isbn ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
