use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::rpc::RemoteWorker;

/// `PoolInner` keeps its own sender, so the idle channel stays open for as
/// long as a pool handle exists. `Closed` lets `acquire` report the
/// channel-closed case instead of panicking on it.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("idle worker pool closed")]
    Closed,
}

/// Receiving end of evicted workers, for whoever manages worker health.
pub type EvictedWorkers = mpsc::UnboundedReceiver<RemoteWorker>;

/// Workers that are currently free to take an operation.
///
/// A worker taken by `acquire` is out of the pool until it is handed back
/// through `release` or given up through `evict`.
#[derive(Clone)]
pub struct IdleWorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    idle_sender: mpsc::UnboundedSender<RemoteWorker>,
    idle: Mutex<mpsc::UnboundedReceiver<RemoteWorker>>,
    evicted: mpsc::UnboundedSender<RemoteWorker>,
}

impl IdleWorkerPool {
    pub fn new<I>(workers: I) -> (Self, EvictedWorkers)
    where
        I: IntoIterator<Item = RemoteWorker>,
    {
        let (idle_sender, idle) = mpsc::unbounded_channel();
        let (evicted, evicted_receiver) = mpsc::unbounded_channel();
        for worker in workers {
            log::info!("Registered {}", worker);
            // the receiver is alive right here
            let _ = idle_sender.send(worker);
        }
        let pool = IdleWorkerPool {
            inner: Arc::new(PoolInner { idle_sender, idle: Mutex::new(idle), evicted }),
        };
        (pool, evicted_receiver)
    }

    /// Waits until some worker is idle and takes it.
    pub async fn acquire(&self) -> Result<RemoteWorker, PoolError> {
        let mut idle = self.inner.idle.lock().await;
        idle.recv().await.ok_or(PoolError::Closed)
    }

    pub fn try_acquire(&self) -> Option<RemoteWorker> {
        let mut idle = self.inner.idle.try_lock().ok()?;
        idle.try_recv().ok()
    }

    pub fn release(&self, worker: RemoteWorker) {
        log::debug!("{} is idle", worker);
        if let Err(mpsc::error::SendError(worker)) = self.inner.idle_sender.send(worker) {
            log::error!("Cannot return {} to a closed pool", worker);
        }
    }

    /// Removes the worker for the rest of the run. Never blocks.
    pub fn evict(&self, worker: RemoteWorker) {
        log::warn!("Evicting {}", worker);
        if let Err(mpsc::error::SendError(worker)) = self.inner.evicted.send(worker) {
            log::warn!("Nobody is collecting evicted workers, dropping {}", worker);
        }
    }
}
