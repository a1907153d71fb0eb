use thiserror::Error;

/// Failures of a collective operation.
///
/// Every variant is fatal for the whole group: once one rank sees a
/// transport error, all other ranks blocked in (or later entering) a
/// collective observe `Aborted`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("process group aborted: {reason}")]
    Aborted { reason: String },
    #[error("collective mismatch: rank {rank} called {got} while rank 0 called {expected}")]
    CollectiveMismatch {
        rank: usize,
        expected: String,
        got: String,
    },
    #[error("rank {rank} is the root but supplied no send buffer")]
    MissingRootBuffer { rank: usize },
    #[error("rank {rank} moved {got} elements, table expects {expected}")]
    CountMismatch {
        rank: usize,
        expected: usize,
        got: usize,
    },
    #[error("displacement table describes {table} ranks, group has {group}")]
    TableSize { table: usize, group: usize },
    #[error("root rank {root} out of range for group of {size}")]
    InvalidRoot { root: usize, size: usize },
    #[error("{elements} elements exceed the transport's count range")]
    CountOverflow { elements: usize },
    #[error("failed to allocate transfer buffer of {elements} elements")]
    Allocation { elements: usize },
}

#[derive(Error, Debug)]
pub enum DistError {
    #[error("invalid group: rank {rank} with size {size}")]
    InvalidGroup { rank: usize, size: usize },
    #[error("displacement table does not tile the {n}x{n} buffer: {detail}")]
    TableMismatch { n: usize, detail: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("coordinator finished without an assembled result")]
    MissingResult,
    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },
    #[error("failed to spawn worker thread for rank {rank}: {source}")]
    Spawn {
        rank: usize,
        source: std::io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("tensor error: {0}")]
    Tensor(#[from] dm_tensor::TensorError),
}

impl DistError {
    /// True if this error only reports that another rank brought the group
    /// down, rather than being the root cause itself.
    pub fn is_abort(&self) -> bool {
        matches!(self, DistError::Transport(TransportError::Aborted { .. }))
    }
}

pub type Result<T> = std::result::Result<T, DistError>;
