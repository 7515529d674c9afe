//! Change-feed primitives shared by [`Backend`] implementations.

use std::{
    collections::HashMap,
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

#[cfg(doc)]
use super::Backend;

/// Fan-out hub delivering published values to every live [`Subscription`].
#[derive(Debug)]
pub struct Hub<T> {
    /// Registered subscribers.
    inner: Arc<Mutex<Subscribers<T>>>,
}

impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Hub<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Subscribers {
                next_id: 0,
                senders: HashMap::new(),
            })),
        }
    }
}

/// Subscribers registered in a [`Hub`].
#[derive(Debug)]
struct Subscribers<T> {
    /// ID to assign to the next subscriber.
    next_id: u64,

    /// Senders of the subscribers, keyed by their IDs.
    senders: HashMap<u64, mpsc::UnboundedSender<T>>,
}

impl<T: Send + 'static> Hub<T> {
    /// Opens a new [`Subscription`] receiving all the values published to
    /// this [`Hub`] from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut subs =
                self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = subs.next_id;
            subs.next_id += 1;
            _ = subs.senders.insert(id, tx);
            id
        };

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(rx, move || {
            if let Some(inner) = inner.upgrade() {
                _ = inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .senders
                    .remove(&id);
            }
        })
    }

    /// Returns the number of currently live [`Subscription`]s.
    #[must_use]
    pub fn subscribers(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }
}

impl<T: Clone> Hub<T> {
    /// Delivers the provided `value` to every live [`Subscription`].
    pub fn publish(&self, value: &T) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .retain(|_, tx| tx.send(value.clone()).is_ok());
    }
}

/// Cancelable [`Stream`] of values delivered by a [`Backend`].
///
/// Once canceled (or dropped), no more values are delivered and the resources
/// held on the [`Backend`] side are released.
pub struct Subscription<T> {
    /// Receiver of the delivered values.
    rx: mpsc::UnboundedReceiver<T>,

    /// Releases the [`Backend`] side of this [`Subscription`].
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("canceled", &self.on_cancel.is_none())
            .finish_non_exhaustive()
    }
}

impl<T> Subscription<T> {
    /// Creates a new [`Subscription`] out of the provided receiver, invoking
    /// the `on_cancel` callback once it's canceled.
    pub fn new(
        rx: mpsc::UnboundedReceiver<T>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Cancels this [`Subscription`].
    pub fn cancel(mut self) {
        self.release();
    }

    /// Releases the [`Backend`] side of this [`Subscription`], if not yet.
    fn release(&mut self) {
        self.rx.close();
        if let Some(cancel) = self.on_cancel.take() {
            cancel();
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod spec {
    use futures::StreamExt as _;

    use super::Hub;

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let hub = Hub::<u8>::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(&1);

        assert_eq!(a.next().await, Some(1));
        assert_eq!(b.next().await, Some(1));
    }

    #[tokio::test]
    async fn cancel_detaches_subscriber() {
        let hub = Hub::<u8>::default();
        let a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscribers(), 2);

        a.cancel();
        assert_eq!(hub.subscribers(), 1);

        hub.publish(&2);
        assert_eq!(b.next().await, Some(2));

        drop(b);
        assert_eq!(hub.subscribers(), 0);
    }

    #[tokio::test]
    async fn values_published_before_subscribing_are_not_delivered() {
        let hub = Hub::<u8>::default();
        hub.publish(&1);

        let mut sub = hub.subscribe();
        hub.publish(&2);

        assert_eq!(sub.next().await, Some(2));
    }
}
