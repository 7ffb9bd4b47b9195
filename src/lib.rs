//! Muninn - observable, auto-refreshing cache for REST resources
//!
//! This crate exposes remote resources as observable values. Each cached
//! key is backed by one entry that re-fetches on a fixed interval while it
//! has subscribers, can be refreshed on demand, and is dropped from the
//! cache as soon as its last subscriber leaves.
//!
//! Observers receive in-flight-or-settled [`Pending`] handles rather than
//! payloads: awaiting one yields the fetch outcome, failures included. The
//! cache never retries and never falls back to a previous value; the next
//! refresh is the only recovery.
//!
//! # Example
//!
//! ```rust,no_run
//! use muninn::{BookCache, CacheConfig, RestTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let transport = RestTransport::new("http://localhost:8080")?;
//!     let books = BookCache::new(Arc::new(transport), CacheConfig::default())?;
//!
//!     let shelf = books.collection();
//!     let _subscription = shelf.subscribe(|pending| {
//!         tokio::spawn(async move {
//!             match pending.await {
//!                 Ok(books) => println!("{} books", books.len()),
//!                 Err(e) => eprintln!("refresh failed: {e}"),
//!             }
//!         });
//!     });
//!
//!     // Force a refresh visible to every subscriber.
//!     shelf.update();
//!     Ok(())
//! }
//! ```

pub mod book;
pub mod cache;
pub mod config;
pub mod error;
pub mod observable;
pub mod resource;
pub mod telemetry;
pub mod transport;

// Re-export main types at crate root
pub use book::{Book, BookCache, BookId, CreateBook};
pub use cache::{CacheConfig, ResourceCache};
pub use config::Config;
pub use error::{MuninnError, Result};
pub use observable::{
    DEFAULT_REFRESH_INTERVAL, FetchOrigin, Observable, ObservableStream, Pending, RefreshPolicy,
    Subscription,
};
pub use resource::{Resource, ResourceKey};
pub use transport::{ResourceTransport, RestTransport};

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
