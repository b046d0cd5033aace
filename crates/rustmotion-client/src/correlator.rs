//! Pairing of inbound acknowledgements with outstanding requests.
//!
//! At most one waiter exists per [`WaitHandle`]. Registering a second waiter
//! for an occupied handle fails the first with
//! [`ClientError::Superseded`] before the new one is stored. Every waiter
//! carries a ticket so that a stale [`Registration`] can never remove the
//! entry of the request that replaced it.

use crate::ClientError;
use rustmotion_core::message::Acknowledgement;
use rustmotion_core::WaitHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

pub(crate) type Reply = Result<Acknowledgement, ClientError>;

#[derive(Debug)]
struct Waiter {
    ticket: u64,
    tx: oneshot::Sender<Reply>,
}

#[derive(Debug, Default)]
pub(crate) struct Correlator {
    pending: Mutex<HashMap<WaitHandle, Waiter>>,
    next_ticket: AtomicU64,
}

impl Correlator {
    fn lock(&self) -> MutexGuard<'_, HashMap<WaitHandle, Waiter>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, handle: WaitHandle) -> Registration<'_> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let mut pending = self.lock();
        if let Some(previous) = pending.remove(&handle) {
            log::debug!("superseding outstanding request for {handle}");
            let _ = previous
                .tx
                .send(Err(ClientError::Superseded(handle.clone())));
        }
        pending.insert(handle.clone(), Waiter { ticket, tx });
        Registration {
            correlator: self,
            handle,
            ticket,
            rx,
        }
    }

    /// Hands `ack` to the waiter for its handle. Gives the ack back when
    /// nobody is waiting for it.
    pub(crate) fn resolve(&self, ack: Acknowledgement) -> Result<(), Acknowledgement> {
        let handle = ack.wait_handle();
        // Sent under the lock so an expiring waiter either sees the entry or
        // finds the reply already queued.
        let mut pending = self.lock();
        match pending.remove(&handle) {
            Some(waiter) => match waiter.tx.send(Ok(ack)) {
                Err(Ok(ack)) => Err(ack),
                _ => Ok(()),
            },
            None => Err(ack),
        }
    }

    /// Rejects every outstanding request, returning how many were pending.
    pub(crate) fn fail_all(&self, error: impl Fn() -> ClientError) -> usize {
        let mut pending = self.lock();
        let count = pending.len();
        for (_, waiter) in pending.drain() {
            let _ = waiter.tx.send(Err(error()));
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn remove_own(&self, handle: &WaitHandle, ticket: u64) {
        let mut pending = self.lock();
        if pending.get(handle).is_some_and(|w| w.ticket == ticket) {
            pending.remove(handle);
        }
    }
}

/// A registered waiter. Dropping it withdraws the waiter if it is still the
/// current one for its handle.
#[derive(Debug)]
pub(crate) struct Registration<'a> {
    correlator: &'a Correlator,
    handle: WaitHandle,
    ticket: u64,
    rx: oneshot::Receiver<Reply>,
}

impl Registration<'_> {
    pub(crate) fn handle(&self) -> &WaitHandle {
        &self.handle
    }

    pub(crate) fn receiver(&mut self) -> &mut oneshot::Receiver<Reply> {
        &mut self.rx
    }

    /// Withdraws the waiter after its last deadline passed, returning a
    /// reply that raced in just before withdrawal.
    pub(crate) fn expire(&mut self) -> Option<Reply> {
        self.correlator.remove_own(&self.handle, self.ticket);
        self.rx.try_recv().ok()
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.correlator.remove_own(&self.handle, self.ticket);
    }
}
