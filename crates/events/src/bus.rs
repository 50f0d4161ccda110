//! Event publishing/subscription abstraction (mechanics only).
//!
//! Delivery is at-least-once and broadcast: every subscription receives a copy
//! of each published message. Consumers must be idempotent. The bus carries no
//! persistence; the directory store is the source of truth and events only
//! announce that it changed.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to a bus.
///
/// Intended for a single consuming thread. Ordering follows publication order
/// for a single publisher; nothing is promised across concurrent publishers.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic pub/sub bus.
///
/// `publish` may fail (closed transport, poisoned lock); callers decide whether
/// that failure matters. For directory writes it does not: the write already
/// happened and cache entries still expire on their own.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
