use super::rpc::proto;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOperation {
    pub id: i64,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceOperation {
    pub id: i64,
    pub file_path: String,
}

impl From<&MapOperation> for proto::RunArgs {
    fn from(op: &MapOperation) -> Self {
        proto::RunArgs { id: op.id, file_path: op.file_path.clone() }
    }
}

impl From<&ReduceOperation> for proto::RunArgs {
    fn from(op: &ReduceOperation) -> Self {
        proto::RunArgs { id: op.id, file_path: op.file_path.clone() }
    }
}

/// Id sequence owned by a single phase scheduler.
#[derive(Debug, Default)]
pub struct OperationIds {
    next: i64,
}

impl OperationIds {
    pub fn new() -> Self {
        OperationIds::default()
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}
