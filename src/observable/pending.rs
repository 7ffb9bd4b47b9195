//! In-flight-or-settled fetch results.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::{MuninnError, Result};

/// Why an entry issued a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOrigin {
    /// The fetch issued when the entry was created.
    Initial,
    /// A periodic refresh.
    Tick,
    /// An explicit [`Observable::update()`](super::Observable::update).
    Manual,
}

impl FetchOrigin {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOrigin::Initial => "initial",
            FetchOrigin::Tick => "tick",
            FetchOrigin::Manual => "manual",
        }
    }
}

/// A fetch that is either still running or already settled.
///
/// This is the value observers receive: the handle itself, never the
/// resolved payload. Awaiting it yields the fetch outcome; every clone
/// resolves to the same outcome. The fetch runs on its own tokio task, so
/// it makes progress (and completes) whether or not anyone awaits it.
///
/// `generation` orders the handles assigned by one entry: a larger
/// generation was assigned later and supersedes every smaller one,
/// regardless of which fetch finished first.
pub struct Pending<T> {
    inner: Shared<BoxFuture<'static, Result<T>>>,
    generation: u64,
    origin: FetchOrigin,
}

impl<T> Pending<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start `fut` on the current tokio runtime and wrap it.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub(crate) fn spawn<Fut>(fut: Fut, generation: u64, origin: FetchOrigin) -> Self
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let inner = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(MuninnError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared();

        Self {
            inner,
            generation,
            origin,
        }
    }

    /// The settled outcome, if the fetch has completed and been observed
    /// by some poll of this handle (or a clone of it).
    pub fn peek(&self) -> Option<&Result<T>> {
        self.inner.peek()
    }

    /// Whether the outcome is already available through [`peek()`](Self::peek).
    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }
}

impl<T> Pending<T> {
    /// Assignment order within the issuing entry, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// What triggered this fetch.
    pub fn origin(&self) -> FetchOrigin {
        self.origin
    }
}

impl<T> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            generation: self.generation,
            origin: self.origin,
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("generation", &self.generation)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl<T> Future for Pending<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}
