use thiserror::Error;

/// Errors surfaced by engine construction, planning, and lifecycle.
///
/// Contract violations by user callbacks (an out-of-range partitioner
/// result, for example) are never represented here: they are logged and
/// the offending element is dropped, so one bad element can't fail an
/// otherwise-healthy task.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("dataset {dataset_id}: invalid partition count {count}")]
    InvalidPartitionCount { dataset_id: u64, count: i64 },

    #[error("dataset {dataset_id}: failed to allocate output partitions")]
    AllocationFailed { dataset_id: u64 },

    #[error("submitted work after the worker pool was shut down")]
    PoolShutDown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
