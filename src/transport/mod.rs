//! Transport collaborator: fetch, create, update and delete resources.
//!
//! The cache only needs "given a key, asynchronously produce a value or
//! fail". [`ResourceTransport`] is that capability, one method per request
//! shape. [`RestTransport`] is the default JSON-over-HTTP implementation;
//! tests and alternative backends implement the trait directly.
//!
//! Transports never retry. A failed call is handed to observers as a failed
//! [`Pending`](crate::Pending) and the next refresh is the only recovery.

pub mod rest;

pub use rest::RestTransport;

use async_trait::async_trait;

use crate::{Resource, Result};

/// Asynchronous access to one resource type.
#[async_trait]
pub trait ResourceTransport<R: Resource>: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch every resource in the collection.
    async fn list(&self) -> Result<Vec<R>>;

    /// Fetch one resource.
    async fn get(&self, id: &R::Id) -> Result<R>;

    /// Create a resource; the server assigns its identity.
    async fn create(&self, input: &R::Input) -> Result<R>;

    /// Replace the fields of an existing resource.
    async fn update(&self, id: &R::Id, input: &R::Input) -> Result<R>;

    /// Delete a resource.
    async fn delete(&self, id: &R::Id) -> Result<()>;
}
