//! Resource types and cache keys.

use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A remote entity type served under one REST collection.
///
/// ```rust
/// # use muninn::Resource;
/// # use serde::{Deserialize, Serialize};
/// #[derive(Debug, Clone, Deserialize)]
/// struct Shelf {
///     id: u32,
///     label: String,
/// }
///
/// #[derive(Serialize)]
/// struct NewShelf {
///     label: String,
/// }
///
/// impl Resource for Shelf {
///     type Id = u32;
///     type Input = NewShelf;
///     const KIND: &'static str = "shelf";
///     const PATH: &'static str = "/api/shelf";
/// }
/// ```
pub trait Resource: Clone + DeserializeOwned + Send + Sync + 'static {
    /// Identity of one instance; the cache key for by-id lookups.
    type Id: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Payload for create and update requests.
    type Input: Serialize + Send + Sync + 'static;

    /// Short label used in logs and metrics (e.g. `"book"`).
    const KIND: &'static str;

    /// Collection path relative to the transport base URL (e.g. `"/api/book"`).
    const PATH: &'static str;
}

/// Selects one resource instance or the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey<Id> {
    /// All resources of the type.
    Collection,
    /// One resource instance.
    Item(Id),
}

impl<Id> ResourceKey<Id> {
    pub fn is_collection(&self) -> bool {
        matches!(self, ResourceKey::Collection)
    }

    pub fn id(&self) -> Option<&Id> {
        match self {
            ResourceKey::Collection => None,
            ResourceKey::Item(id) => Some(id),
        }
    }
}

impl<Id: fmt::Display> fmt::Display for ResourceKey<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Collection => f.write_str("*"),
            ResourceKey::Item(id) => id.fmt(f),
        }
    }
}
