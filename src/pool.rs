//! Bounded session pool: caps how many concurrent catalog sessions a
//! server hands out to inbound requests, while background tasks and
//! session-copy-for-handoff bypass the cap entirely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ServerParams;
use crate::error::StoreError;

/// A held session slot. Dropping it releases the slot back to the
/// pool — `close()` is just an explicit, idempotent drop.
pub struct Session {
    _permit: Option<OwnedSemaphorePermit>,
    closed: AtomicBool,
}

impl Session {
    fn bounded(permit: OwnedSemaphorePermit) -> Self {
        Session {
            _permit: Some(permit),
            closed: AtomicBool::new(false),
        }
    }

    fn unbounded() -> Self {
        Session {
            _permit: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Releases the slot. Safe to call more than once.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A cheaply-`Clone`-able handle onto the bounded slot pool, the way
/// an application context holds a shared connection pool.
#[derive(Clone)]
pub struct SessionPool {
    semaphore: Arc<Semaphore>,
    max_wait: std::time::Duration,
}

impl SessionPool {
    pub fn new(params: &ServerParams) -> Self {
        SessionPool {
            semaphore: Arc::new(Semaphore::new(params.max_sessions as usize)),
            max_wait: params.max_wait(),
        }
    }

    /// Acquires a session, counting against `maxSessions`. Blocks up to
    /// `maxWait` under pressure, then fails with `TooManySessions`.
    pub async fn request_store(&self) -> Result<Arc<Session>, StoreError> {
        let acquire = self.semaphore.clone().acquire_owned();
        match tokio::time::timeout(self.max_wait, acquire).await {
            Ok(Ok(permit)) => Ok(Arc::new(Session::bounded(permit))),
            Ok(Err(_)) => Err(StoreError::Fatal(anyhow::anyhow!("session pool semaphore closed"))),
            Err(_) => Err(StoreError::TooManySessions),
        }
    }

    /// A session that does not count against `maxSessions` — for
    /// background tasks (`go`) and for deriving an independent handle
    /// from one already held (`copy`).
    pub fn store(&self) -> Arc<Session> {
        Arc::new(Session::unbounded())
    }

    pub fn copy(&self, _held: &Session) -> Arc<Session> {
        self.store()
    }
}
