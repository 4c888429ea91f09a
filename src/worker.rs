//! Background tasks bound to the pool's lifetime: fire-and-forget
//! work plus the periodic blob GC sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::blob::BlobStore;
use crate::catalog::Catalog;
use crate::config::ServerParams;
use crate::pool::SessionPool;

/// Tracks every task spawned through `go()`, so shutdown can wait for
/// them to finish draining rather than abandoning them mid-flight. The
/// GC loop is the one task that never finishes on its own, so it's
/// given a `CancellationToken` it checks on every tick; `shutdown`
/// cancels it before awaiting the handle.
pub struct Worker {
    pool: SessionPool,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    stop: CancellationToken,
    gc_spawned: AtomicBool,
}

impl Worker {
    pub fn new(pool: SessionPool) -> Self {
        Worker {
            pool,
            tasks: std::sync::Mutex::new(Vec::new()),
            stop: CancellationToken::new(),
            gc_spawned: AtomicBool::new(false),
        }
    }

    /// Schedules `fut` to run with its own unbounded session, tracked
    /// so `shutdown` can await it.
    pub fn go<F>(&self, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let _session = self.pool.store();
        let handle = tokio::spawn(fut);
        self.tasks.lock().unwrap().push(handle);
    }

    /// Signals every background loop to stop, then waits for every
    /// task spawned via `go` (the GC loop included) to actually exit.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock().unwrap());
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Spawns the periodic blob GC loop: every `gcInterval`, sweeps
    /// unowned/unreferenced blobs and multipart uploads older than
    /// `gcCutoff`. A no-op on every call after the first — one loop
    /// per worker.
    pub fn spawn_blob_gc(self: &Arc<Self>, catalog: Arc<Catalog>, blobs: Arc<dyn BlobStore>, params: &ServerParams) {
        if self.gc_spawned.swap(true, Ordering::SeqCst) {
            return;
        }

        let interval = params.gc_interval();
        let cutoff_duration = params.gc_cutoff();
        let worker = self.clone();
        let stop = self.stop.clone();

        worker.go(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let cutoff = Utc::now() - chrono::Duration::from_std(cutoff_duration).unwrap_or(chrono::Duration::zero());
                        let live = catalog.referenced_blob_hashes().await;
                        blobs.delete_unreferenced(cutoff, &|hash| live.contains(hash)).await;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn go_runs_the_task_and_shutdown_waits_for_it() {
        let pool = SessionPool::new(&ServerParams::default());
        let worker = Worker::new(pool);
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        worker.go(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });
        worker.shutdown().await;

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn blob_gc_sweeps_unreferenced_blobs_past_cutoff() {
        let catalog = Arc::new(Catalog::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        blobs.put_content(b"orphan", &crate::blob::sha384_hex(b"orphan"), 6).await.unwrap();

        let mut params = ServerParams::default();
        params.gc_interval_secs = 1;
        params.gc_cutoff_secs = 0;

        let worker = Arc::new(Worker::new(SessionPool::new(&params)));
        worker.spawn_blob_gc(catalog, blobs.clone(), &params);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(blobs
            .open(&crate::blob::BlobHandle(crate::blob::sha384_hex(b"orphan")))
            .await
            .is_err());
    }
}
