pub mod rpc;
pub mod operation;
pub mod outstanding;
pub mod pool;
pub mod fanout;
pub mod dispatch;
pub mod master;

#[cfg(test)]
pub(crate) mod fake;

pub use dispatch::ReduceFailure;
pub use master::{JobReport, MapReport, Master, MasterConfig, ReduceReport, Task};
pub use pool::{EvictedWorkers, IdleWorkerPool};
pub use rpc::RemoteWorker;
