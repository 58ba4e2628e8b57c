use std::collections::TryReserveError;

/// Broad classification of a [`WalkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request or the variable description is inconsistent.
    InvalidArgument,
    /// A scratch structure could not be allocated.
    OutOfMemory,
    /// The chunk source failed to produce a chunk.
    ChunkFetch,
}

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("chunk length is zero for dimension {dim}")]
    ZeroChunkLength { dim: usize },

    #[error("stride is zero for dimension {dim}")]
    ZeroStride { dim: usize },

    #[error("{what} has rank {actual}, expected {expected}")]
    RankMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("rank {rank} exceeds the maximum of {max} dimensions")]
    TooManyDimensions { rank: usize, max: usize },

    #[error("position {last} out of range for dimension {dim} of length {dim_len}")]
    OutOfBounds { dim: usize, last: u64, dim_len: u64 },

    #[error("memory buffer holds {actual} bytes, transfer needs {required}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("chunk {indices:?} holds {actual} bytes, expected {expected}")]
    ChunkSize {
        indices: Vec<u64>,
        expected: usize,
        actual: usize,
    },

    #[error("fill value holds {actual} bytes, expected one element of {expected}")]
    FillValueSize { expected: usize, actual: usize },

    #[error("buffer element is {actual} bytes, variable element is {expected}")]
    ElementSize { expected: usize, actual: usize },

    #[error("index arithmetic overflow")]
    Overflow,

    #[error("out of memory")]
    OutOfMemory(#[from] TryReserveError),

    #[error("failed to fetch chunk {indices:?}")]
    ChunkFetch {
        indices: Vec<u64>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl WalkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalkError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            WalkError::ChunkFetch { .. } => ErrorKind::ChunkFetch,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

pub type Result<T, E = WalkError> = std::result::Result<T, E>;
