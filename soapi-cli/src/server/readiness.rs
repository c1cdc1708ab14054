//! One-shot readiness latch
//!
//! The playback server fires the latch once its serving resource is bound;
//! the remote controller waits on it before sending the trigger. Built on a
//! `watch` channel: the state is checked before parking, so a waiter that
//! arrives after the transition returns immediately instead of missing it.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use tokio::sync::watch;

/// Latch state. Leaves `NotReady` at most once and never returns to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    Ready(SocketAddr),
    Failed(String),
}

/// Owning side of the latch, held by the playback server
///
/// Dropping the signal without firing it releases all waiters with a start
/// failure.
#[derive(Debug)]
pub struct ReadinessSignal {
    tx: watch::Sender<Readiness>,
}

impl ReadinessSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Readiness::NotReady);
        Self { tx }
    }

    /// Mark ready; returns false if the latch already left `NotReady`
    pub fn fire(&self, addr: SocketAddr) -> bool {
        self.transition(Readiness::Ready(addr))
    }

    /// Mark failed; returns false if the latch already left `NotReady`
    pub fn fail(&self, cause: impl Into<String>) -> bool {
        self.transition(Readiness::Failed(cause.into()))
    }

    fn transition(&self, next: Readiness) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == Readiness::NotReady {
                *current = next;
                true
            } else {
                false
            }
        })
    }

    pub fn current(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    /// New waiter handle; may be created before or after the transition
    pub fn waiter(&self) -> ReadinessWaiter {
        ReadinessWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of the latch; cheap to clone, one per interested task
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    rx: watch::Receiver<Readiness>,
}

impl ReadinessWaiter {
    pub fn current(&self) -> Readiness {
        self.rx.borrow().clone()
    }

    /// Block until the server is ready (its bound address) or failed to start
    pub async fn wait(&self) -> Result<SocketAddr> {
        let mut rx = self.rx.clone();
        let outcome = rx
            .wait_for(|r| *r != Readiness::NotReady)
            .await
            .map(|r| r.clone());

        match outcome {
            Ok(Readiness::Ready(addr)) => Ok(addr),
            Ok(Readiness::Failed(cause)) => Err(Error::ServerStart(cause)),
            Ok(Readiness::NotReady) => Err(Error::Internal("readiness wait returned early".to_string())),
            Err(_) => Err(Error::ServerStart(
                "server was dropped before it became ready".to_string(),
            )),
        }
    }
}
