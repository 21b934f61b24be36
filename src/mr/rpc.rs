use std::{fmt, sync::Arc};

use tokio::net::UnixStream;
use tonic::{
    async_trait,
    transport::{Channel, Endpoint, Uri},
};
use tower::service_fn;

pub mod proto {
    tonic::include_proto!("mr");
}

use proto::worker_client::WorkerClient as WorkerRpcClient;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("rpc failed: {0}")]
    Status(#[from] tonic::Status),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("invalid worker endpoint '{0}'")]
    InvalidEndpoint(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    RunMap,
    RunReduce,
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::RunMap => f.write_str("Worker.RunMap"),
            Procedure::RunReduce => f.write_str("Worker.RunReduce"),
        }
    }
}

/// A channel able to invoke procedures on one remote worker.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn call(&self, procedure: Procedure, args: proto::RunArgs) -> Result<(), RpcError>;
}

#[derive(Clone)]
pub struct GrpcWorkerClient {
    inner: WorkerRpcClient<Channel>,
}

impl GrpcWorkerClient {
    /// Accepts `http://host:port`, `host:port` or `unix:/path/to/sock`.
    /// Nothing is dialed until the first call.
    pub fn connect_lazy(addr: &str) -> Result<Self, RpcError> {
        let channel = if let Some(sock_path) = addr.strip_prefix("unix:") {
            if sock_path.is_empty() {
                return Err(RpcError::InvalidEndpoint(addr.to_string()));
            }
            let sock_path = sock_path.to_string();
            // the uri is ignored by the connector
            Endpoint::from_static("http://[::1]:50051")
                .connect_with_connector_lazy(service_fn(move |_: Uri| {
                    let sock_path = sock_path.clone();
                    async move {
                        let stream = UnixStream::connect(sock_path).await?;
                        Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(stream))
                    }
                }))
        } else {
            let uri = if addr.contains("://") {
                addr.to_string()
            } else {
                format!("http://{}", addr)
            };
            Endpoint::from_shared(uri)
                .map_err(|_| RpcError::InvalidEndpoint(addr.to_string()))?
                .connect_lazy()
        };
        Ok(GrpcWorkerClient { inner: WorkerRpcClient::new(channel) })
    }
}

#[async_trait]
impl WorkerClient for GrpcWorkerClient {
    async fn call(&self, procedure: Procedure, args: proto::RunArgs) -> Result<(), RpcError> {
        let mut client = self.inner.clone();
        match procedure {
            Procedure::RunMap => client.run_map(args).await?,
            Procedure::RunReduce => client.run_reduce(args).await?,
        };
        Ok(())
    }
}

/// Handle to a worker process. Cloning shares the underlying client.
#[derive(Clone)]
pub struct RemoteWorker {
    id: i64,
    addr: String,
    client: Arc<dyn WorkerClient>,
}

impl RemoteWorker {
    pub fn new(id: i64, addr: impl Into<String>, client: Arc<dyn WorkerClient>) -> Self {
        RemoteWorker { id, addr: addr.into(), client }
    }

    pub fn connect_lazy(id: i64, addr: &str) -> Result<Self, RpcError> {
        let client = GrpcWorkerClient::connect_lazy(addr)?;
        Ok(RemoteWorker::new(id, addr, Arc::new(client)))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub async fn call(&self, procedure: Procedure, args: proto::RunArgs) -> Result<(), RpcError> {
        self.client.call(procedure, args).await
    }
}

impl fmt::Display for RemoteWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}({})", self.id, self.addr)
    }
}

impl fmt::Debug for RemoteWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteWorker")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .finish()
    }
}
