use crate::domain::{RentalEvent, ReturnEvent};
use rdkafka::message::Message;
use serde::Deserialize;

/// Owned copy of a delivered message. The payload is kept byte-for-byte so it
/// can be forwarded to the dead-letter topic unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Option<Vec<u8>>,
}

impl RawRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: &[u8]) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: Some(payload.to_vec()),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn from_message<M: Message>(message: &M) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .map(|key| String::from_utf8_lossy(key).into_owned()),
            payload: message.payload().map(|payload| payload.to_vec()),
        }
    }
}

/// Wire format shared by both topics
#[derive(Debug, Deserialize)]
struct BookPayload {
    isbn: Option<String>,
    title: Option<String>,
    author: Option<String>,
    category: Option<String>,
    borrower: Option<String>,
}

/// Parsed form of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookEvent {
    Rented(RentalEvent),
    Returned(ReturnEvent),
    /// Payload missing or not JSON; no category can be trusted
    Undecodable { reason: String },
    /// JSON decoded but unusable as an event
    Invalid {
        category: Option<String>,
        reason: String,
    },
}

impl BookEvent {
    pub fn category(&self) -> Option<&str> {
        match self {
            BookEvent::Rented(event) => event.category.as_deref(),
            BookEvent::Returned(event) => event.category.as_deref(),
            BookEvent::Invalid { category, .. } => category.as_deref(),
            BookEvent::Undecodable { .. } => None,
        }
    }

    pub fn isbn(&self) -> Option<&str> {
        match self {
            BookEvent::Rented(event) => Some(&event.isbn),
            BookEvent::Returned(event) => Some(&event.isbn),
            BookEvent::Invalid { .. } | BookEvent::Undecodable { .. } => None,
        }
    }
}

/// A record together with its parsed event
#[derive(Debug, Clone)]
pub struct Delivery {
    pub raw: RawRecord,
    pub event: BookEvent,
}

/// Maps topics to event kinds
#[derive(Debug, Clone)]
pub struct TopicRoutes {
    pub rented: String,
    pub returned: String,
}

impl TopicRoutes {
    pub fn new(rented: impl Into<String>, returned: impl Into<String>) -> Self {
        Self {
            rented: rented.into(),
            returned: returned.into(),
        }
    }

    pub fn topics(&self) -> [&str; 2] {
        [self.rented.as_str(), self.returned.as_str()]
    }

    pub fn decode(&self, raw: RawRecord) -> Delivery {
        let event = self.parse(&raw);
        Delivery { raw, event }
    }

    fn parse(&self, raw: &RawRecord) -> BookEvent {
        let undecodable = |reason: String| BookEvent::Undecodable { reason };

        let payload = match raw.payload.as_deref() {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return undecodable("empty payload".to_string()),
        };

        let book: BookPayload = match serde_json::from_slice(payload) {
            Ok(book) => book,
            Err(e) => return undecodable(format!("invalid JSON: {}", e)),
        };

        let isbn = match book.isbn.as_deref().map(str::trim) {
            Some(isbn) if !isbn.is_empty() => isbn.to_string(),
            _ => {
                return BookEvent::Invalid {
                    category: book.category,
                    reason: "missing isbn".to_string(),
                }
            }
        };

        if raw.topic == self.rented {
            BookEvent::Rented(RentalEvent {
                isbn,
                title: book.title,
                author: book.author,
                category: book.category,
                borrower: book.borrower,
            })
        } else if raw.topic == self.returned {
            BookEvent::Returned(ReturnEvent {
                isbn,
                title: book.title,
                author: book.author,
                category: book.category,
            })
        } else {
            BookEvent::Invalid {
                category: book.category,
                reason: format!("unexpected topic '{}'", raw.topic),
            }
        }
    }
}
