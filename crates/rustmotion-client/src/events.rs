//! Subscriptions to unsolicited gateway traffic.
//!
//! Each subscriber owns an unbounded channel. Publishing clones the value to
//! every live subscriber in arrival order; subscribers that have gone away
//! are pruned on the next publish.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;

/// A decoded message together with the address it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification<T> {
    pub source: SocketAddr,
    pub message: T,
}

#[derive(Debug)]
struct Registry<T> {
    next_id: u64,
    senders: Vec<(u64, mpsc::UnboundedSender<T>)>,
}

#[derive(Debug)]
pub(crate) struct Subscribers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                senders: Vec::new(),
            })),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    pub(crate) fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.senders.push((id, tx));
        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `value` to every subscriber, returning how many received it.
    pub(crate) fn publish(&self, value: T) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry
            .senders
            .retain(|(_, tx)| tx.send(value.clone()).is_ok());
        registry.senders.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }
}

/// Receiving end of a subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::UnboundedReceiver<T>,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    /// Waits for the next value. Returns `None` once the client is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns a value that has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .senders
                .retain(|(id, _)| *id != self.id);
        }
    }
}
