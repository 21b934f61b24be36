use tokio::sync::mpsc;

use super::{
    operation::{MapOperation, ReduceOperation},
    outstanding::WorkToken,
    pool::IdleWorkerPool,
    rpc::{Procedure, RemoteWorker, RpcError},
};

/// A failed map operation waiting to be dispatched again. It keeps the token
/// of its unit of work, so the phase stays open until a retry succeeds.
#[derive(Debug)]
pub struct PendingMap {
    pub operation: MapOperation,
    pub work: WorkToken,
}

pub type RetrySender = mpsc::UnboundedSender<PendingMap>;

#[derive(Debug)]
pub struct ReduceFailure {
    pub operation: ReduceOperation,
    pub worker: i64,
    pub error: RpcError,
}

pub type FailureSender = mpsc::UnboundedSender<ReduceFailure>;

/// Runs one remote invocation per operation and settles the worker afterwards.
#[derive(Clone)]
pub struct Dispatcher {
    pool: IdleWorkerPool,
}

impl Dispatcher {
    pub fn new(pool: IdleWorkerPool) -> Self {
        Dispatcher { pool }
    }

    pub async fn run_map(&self, worker: RemoteWorker, operation: MapOperation, work: WorkToken, retry: RetrySender) {
        log::info!("Running Map '{}' file '{}' on {}", operation.id, operation.file_path, worker);

        match worker.call(Procedure::RunMap, (&operation).into()).await {
            Ok(()) => {
                log::debug!("Map '{}' done on {}", operation.id, worker);
                self.pool.release(worker);
                drop(work);
            }
            Err(err) => {
                log::warn!("Map {} failed on {}. Error: {}", operation.id, worker, err);
                if let Err(mpsc::error::SendError(pending)) = retry.send(PendingMap { operation, work }) {
                    // only reachable once the phase is shutting down
                    log::error!("Retry queue closed, dropping map {}", pending.operation.id);
                }
                self.pool.evict(worker);
            }
        }
    }

    pub async fn run_reduce(
        &self,
        worker: RemoteWorker,
        operation: ReduceOperation,
        work: WorkToken,
        failures: FailureSender,
    ) {
        log::info!("Running Reduce '{}' file '{}' on {}", operation.id, operation.file_path, worker);

        let worker_id = worker.id();
        let result = worker.call(Procedure::RunReduce, (&operation).into()).await;
        if let Err(error) = result {
            log::error!("{} failed for reduce {} on {}. Error: {}", Procedure::RunReduce, operation.id, worker, error);
            if let Err(mpsc::error::SendError(failure)) = failures.send(ReduceFailure { operation, worker: worker_id, error }) {
                log::error!("Failure report closed, dropping failure of reduce {}", failure.operation.id);
            }
        }
        // back in the pool before the unit is terminal
        self.pool.release(worker);
        drop(work);
    }
}
