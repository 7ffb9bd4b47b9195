//! Stream adapter over a subscription.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{Pending, Subscription};

pin_project! {
    /// Every handle an [`Observable`](super::Observable) assigns, as a stream.
    ///
    /// Created by [`Observable::stream()`](super::Observable::stream). Holds
    /// the subscription: dropping the stream unsubscribes. The stream never
    /// ends on its own.
    pub struct ObservableStream<T> {
        #[pin]
        inner: UnboundedReceiverStream<Pending<T>>,
        subscription: Subscription,
    }
}

impl<T> ObservableStream<T> {
    pub(super) fn new(rx: UnboundedReceiver<Pending<T>>, subscription: Subscription) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(rx),
            subscription,
        }
    }

    /// The subscription backing this stream.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl<T> Stream for ObservableStream<T> {
    type Item = Pending<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}
