use std::path::PathBuf;

use clap::Parser;
use mrmaster::mr::{self, fanout::REDUCE_PATH, IdleWorkerPool, Master, MasterConfig, RemoteWorker, Task};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "mrmaster")]
struct Args {
    /// Worker endpoint, `host:port`, `http://host:port` or `unix:/path`. Repeatable.
    #[arg(short, long = "worker", required = true)]
    workers: Vec<String>,
    #[arg(short = 'r', long, default_value_t = 8)]
    reduce_jobs: usize,
    #[arg(long, default_value = REDUCE_PATH)]
    reduce_dir: PathBuf,
    input_files: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let workers = args
        .workers
        .iter()
        .enumerate()
        .map(|(id, addr)| RemoteWorker::connect_lazy(id as i64, addr))
        .collect::<Result<Vec<_>, _>>()?;
    let (pool, mut evicted) = IdleWorkerPool::new(workers);

    let health = tokio::spawn(async move {
        while let Some(worker) = evicted.recv().await {
            log::warn!("{} failed and was removed from the pool", worker);
        }
    });

    let (input, input_receiver) = mpsc::channel(16);
    let input_files = args.input_files;
    let splitter = tokio::spawn(async move {
        for file in input_files {
            if input.send(file).await.is_err() {
                break;
            }
        }
    });

    let mut master = Master::new(pool, MasterConfig { reduce_dir: args.reduce_dir });
    let report = master.run(Task::from_receiver(input_receiver, args.reduce_jobs)).await?;
    splitter.await?;

    for mr::ReduceFailure { operation, worker, error } in &report.reduce.failed {
        log::error!("Reduce output '{}' is incomplete (worker#{}: {})", operation.file_path, worker, error);
    }
    log::info!(
        "Job finished: {} map operations ({} retries), {} reduce operations",
        report.map.operations,
        report.map.retries,
        report.reduce.operations
    );

    // closes the eviction channel once the last pool handle is gone
    drop(master);
    health.await?;
    Ok(())
}
