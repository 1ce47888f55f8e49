use serde::{Deserialize, Serialize};

/// A book that is currently rented out, keyed by ISBN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookRecord {
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    /// `None` means the book is not lent to anyone
    pub borrower: Option<String>,
}

/// Inbound "book rented" event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalEvent {
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    /// Stored as delivered; a rental may arrive without one
    pub borrower: Option<String>,
}

impl RentalEvent {
    pub fn new(
        isbn: impl Into<String>,
        category: impl Into<String>,
        borrower: impl Into<String>,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: None,
            author: None,
            category: Some(category.into()),
            borrower: Some(borrower.into()),
        }
    }

    /// Build the record inserted on the first rental of an ISBN.
    pub fn to_record(&self) -> BookRecord {
        BookRecord {
            isbn: self.isbn.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            borrower: self.borrower.clone(),
        }
    }
}

/// Inbound "book returned" event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnEvent {
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
}

impl ReturnEvent {
    pub fn new(isbn: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            title: None,
            author: None,
            category: Some(category.into()),
        }
    }
}

/// JSON shape returned by `GET /book`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDto {
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub borrower: Option<String>,
}

impl From<BookRecord> for BookDto {
    fn from(record: BookRecord) -> Self {
        Self {
            isbn: record.isbn,
            title: record.title,
            author: record.author,
            category: record.category,
            borrower: record.borrower,
        }
    }
}
