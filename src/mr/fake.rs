//! In-process workers for tests. Failures are scripted per file path or per
//! worker, and every call is recorded.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tonic::async_trait;

use super::rpc::{proto, Procedure, RemoteWorker, RpcError, WorkerClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub worker: i64,
    pub procedure: Procedure,
    pub id: i64,
    pub file_path: String,
    pub ok: bool,
}

#[derive(Default)]
struct ClusterState {
    calls: Mutex<Vec<Call>>,
    file_failures: Mutex<HashMap<String, usize>>,
    failing_workers: Mutex<HashSet<i64>>,
    overlaps: AtomicUsize,
}

pub(crate) struct FakeCluster {
    pub workers: Vec<RemoteWorker>,
    state: Arc<ClusterState>,
}

struct FakeClient {
    id: i64,
    busy: AtomicBool,
    delay: Duration,
    state: Arc<ClusterState>,
}

impl FakeCluster {
    pub fn new(n: usize) -> Self {
        FakeCluster::with_delay(n, Duration::from_millis(5))
    }

    pub fn with_delay(n: usize, delay: Duration) -> Self {
        let state = Arc::new(ClusterState::default());
        let workers = (0..n as i64)
            .map(|id| {
                let client = FakeClient {
                    id,
                    busy: AtomicBool::new(false),
                    delay,
                    state: state.clone(),
                };
                RemoteWorker::new(id, format!("fake:{}", id), Arc::new(client))
            })
            .collect();
        FakeCluster { workers, state }
    }

    /// The next `times` attempts on `file_path` fail, whichever worker runs them.
    pub fn fail_file(&self, file_path: &str, times: usize) {
        self.state.file_failures.lock().unwrap().insert(file_path.to_string(), times);
    }

    pub fn fail_worker(&self, id: i64) {
        self.state.failing_workers.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Number of calls that started on a worker already running another call.
    pub fn overlaps(&self) -> usize {
        self.state.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerClient for FakeClient {
    async fn call(&self, procedure: Procedure, args: proto::RunArgs) -> Result<(), RpcError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.state.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(self.delay).await;

        let fail = {
            let mut file_failures = self.state.file_failures.lock().unwrap();
            let by_file = match file_failures.get_mut(&args.file_path) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            };
            by_file || self.state.failing_workers.lock().unwrap().contains(&self.id)
        };
        self.state.calls.lock().unwrap().push(Call {
            worker: self.id,
            procedure,
            id: args.id,
            file_path: args.file_path.clone(),
            ok: !fail,
        });
        self.busy.store(false, Ordering::SeqCst);

        if fail {
            Err(tonic::Status::unavailable(format!("{} failed on fake worker {}", procedure, self.id)).into())
        } else {
            Ok(())
        }
    }
}
