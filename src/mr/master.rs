use std::path::PathBuf;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use super::{
    dispatch::{Dispatcher, PendingMap, ReduceFailure, RetrySender},
    fanout::{fan_reduce_file_paths, REDUCE_PATH},
    operation::{MapOperation, OperationIds, ReduceOperation},
    outstanding::Outstanding,
    pool::{IdleWorkerPool, PoolError},
};

/// A job as handed over by the splitter.
pub struct Task<S> {
    pub input_file_paths: S,
    pub num_reduce_jobs: usize,
}

impl Task<ReceiverStream<String>> {
    pub fn from_receiver(input_file_paths: mpsc::Receiver<String>, num_reduce_jobs: usize) -> Self {
        Task { input_file_paths: ReceiverStream::new(input_file_paths), num_reduce_jobs }
    }
}

#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub reduce_dir: PathBuf,
}

impl Default for MasterConfig {
    fn default() -> Self {
        MasterConfig { reduce_dir: PathBuf::from(REDUCE_PATH) }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapReport {
    pub operations: usize,
    pub retries: usize,
}

#[derive(Debug, Default)]
pub struct ReduceReport {
    pub operations: usize,
    pub failed: Vec<ReduceFailure>,
}

#[derive(Debug)]
pub struct JobReport {
    pub map: MapReport,
    pub reduce: ReduceReport,
}

impl JobReport {
    pub fn is_clean(&self) -> bool {
        self.reduce.failed.is_empty()
    }
}

pub struct Master {
    pool: IdleWorkerPool,
    dispatcher: Dispatcher,
    config: MasterConfig,
    map_ids: OperationIds,
    reduce_ids: OperationIds,
}

impl Master {
    pub fn new(pool: IdleWorkerPool, config: MasterConfig) -> Self {
        Master {
            dispatcher: Dispatcher::new(pool.clone()),
            pool,
            config,
            map_ids: OperationIds::new(),
            reduce_ids: OperationIds::new(),
        }
    }

    pub async fn run<S>(&mut self, task: Task<S>) -> Result<JobReport, anyhow::Error>
    where
        S: Stream<Item = String> + Unpin,
    {
        let map = self.schedule_maps(task.input_file_paths).await?;
        let reduce = self.schedule_reduces(task.num_reduce_jobs).await?;
        if !reduce.failed.is_empty() {
            log::warn!("{} of {} reduce operations failed", reduce.failed.len(), reduce.operations);
        }
        Ok(JobReport { map, reduce })
    }

    /// Runs a map operation for every input path. Blocks on an empty pool and
    /// returns once the input is exhausted and every operation, retries
    /// included, has succeeded.
    pub async fn schedule_maps<S>(&mut self, mut input_file_paths: S) -> Result<MapReport, anyhow::Error>
    where
        S: Stream<Item = String> + Unpin,
    {
        log::info!("Running map operations");

        let outstanding = Outstanding::new();
        let (retry_sender, retry_receiver) = mpsc::unbounded_channel();
        let (stop_sender, stop_receiver) = oneshot::channel();
        let retry_loop = tokio::spawn(retry_maps(
            self.pool.clone(),
            self.dispatcher.clone(),
            retry_sender.clone(),
            retry_receiver,
            stop_receiver,
        ));

        let mut operations = 0;
        while let Some(file_path) = input_file_paths.next().await {
            let operation = MapOperation { id: self.map_ids.next_id(), file_path };
            let worker = self.pool.acquire().await?;
            let work = outstanding.begin();
            let dispatcher = self.dispatcher.clone();
            let retry = retry_sender.clone();
            tokio::spawn(async move { dispatcher.run_map(worker, operation, work, retry).await });
            operations += 1;
        }
        drop(retry_sender);

        log::debug!("Map input exhausted, waiting on {} outstanding operations", outstanding.count());
        outstanding.drained().await;
        let _ = stop_sender.send(());
        let retries = retry_loop.await??;

        log::info!("Map Completed: {} operations, {} retries", operations, retries);
        Ok(MapReport { operations, retries })
    }

    /// Runs one reduce operation per partition. Failures are not retried.
    pub async fn schedule_reduces(&mut self, num_reduce_jobs: usize) -> Result<ReduceReport, anyhow::Error> {
        log::info!("Running reduce operations");

        let outstanding = Outstanding::new();
        let (failure_sender, mut failure_receiver) = mpsc::unbounded_channel();
        let mut reduce_file_paths = Box::pin(fan_reduce_file_paths(num_reduce_jobs, self.config.reduce_dir.clone()));

        let mut operations = 0;
        while let Some(file_path) = reduce_file_paths.next().await {
            let operation = ReduceOperation { id: self.reduce_ids.next_id(), file_path };
            let worker = self.pool.acquire().await?;
            let work = outstanding.begin();
            let dispatcher = self.dispatcher.clone();
            let failures = failure_sender.clone();
            tokio::spawn(async move { dispatcher.run_reduce(worker, operation, work, failures).await });
            operations += 1;
        }

        outstanding.drained().await;
        // every failure is sent before its unit is terminal
        let mut failed = Vec::new();
        while let Ok(failure) = failure_receiver.try_recv() {
            failed.push(failure);
        }

        log::info!("Reduce Completed: {} operations, {} failed", operations, failed.len());
        Ok(ReduceReport { operations, failed })
    }
}

async fn retry_maps(
    pool: IdleWorkerPool,
    dispatcher: Dispatcher,
    retry_sender: RetrySender,
    mut retry_receiver: mpsc::UnboundedReceiver<PendingMap>,
    mut stop: oneshot::Receiver<()>,
) -> Result<usize, PoolError> {
    let mut retries = 0;
    loop {
        let PendingMap { operation, work } = tokio::select! {
            biased;
            _ = &mut stop => break,
            pending = retry_receiver.recv() => match pending {
                Some(pending) => pending,
                None => break,
            },
        };
        let worker = pool.acquire().await?;
        log::info!("Retrying map operation {}", operation.id);
        retries += 1;
        let dispatcher = dispatcher.clone();
        let retry = retry_sender.clone();
        tokio::spawn(async move { dispatcher.run_map(worker, operation, work, retry).await });
    }
    Ok(retries)
}
