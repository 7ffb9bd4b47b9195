//! Book resource of the lending library API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Resource;
use crate::cache::ResourceCache;

/// Book identifier (server-assigned UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for BookId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A book as served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Copies held by the library.
    pub amount: i32,
}

/// Create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub name: String,
    pub amount: i32,
}

impl CreateBook {
    pub fn new(name: impl Into<String>, amount: i32) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

impl Resource for Book {
    type Id = BookId;
    type Input = CreateBook;
    const KIND: &'static str = "book";
    const PATH: &'static str = "/api/book";
}

/// Observable cache over the book API.
pub type BookCache = ResourceCache<Book>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips_through_display() {
        let id = BookId::new(Uuid::new_v4());
        let parsed: BookId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_id_rejected() {
        assert!("not-a-uuid".parse::<BookId>().is_err());
    }

    #[test]
    fn book_deserializes_from_api_shape() {
        let json = r#"{"id":"6f1c2d9e-2b7a-4c53-9a59-2f3f3e1b8d10","title":"Edda","amount":2}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.title, "Edda");
        assert_eq!(book.amount, 2);
        assert_eq!(
            book.id.to_string(),
            "6f1c2d9e-2b7a-4c53-9a59-2f3f3e1b8d10"
        );
    }

    #[test]
    fn create_payload_shape() {
        let value = serde_json::to_value(CreateBook::new("X", 3)).unwrap();
        assert_eq!(value, serde_json::json!({"name": "X", "amount": 3}));
    }
}
