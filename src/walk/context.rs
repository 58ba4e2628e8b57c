//! Per-call state of a slice transfer.

use crate::config::{VarDesc, WalkConfig};
use crate::walk::chunking::SliceProjections;
use crate::walk::source::ChunkSource;

/// The caller's buffer, and with it the direction of the transfer.
#[derive(Debug)]
pub enum Memory<'a> {
    /// Read from chunks into this buffer.
    Read(&'a mut [u8]),
    /// Write this buffer into chunks.
    Write(&'a [u8]),
}

impl Memory<'_> {
    pub fn is_read(&self) -> bool {
        matches!(self, Memory::Read(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Memory::Read(buf) => buf.len(),
            Memory::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a transfer did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Chunks fetched and walked.
    pub chunks_visited: u64,
    /// Of those, chunks the source created for this request.
    pub chunks_created: u64,
    /// Chunk coordinates in the touched ranges that contribute no element.
    pub chunks_skipped: u64,
    /// Elements copied.
    pub elements: u64,
    /// The request was served by the whole-chunk fast path.
    pub whole_chunk: bool,
}

/// Everything one read or write call needs.
///
/// Built fresh for every call and dropped at its end, which releases the
/// projections and the fill chunk on every exit path.
pub struct TransferContext<'a, S: ChunkSource> {
    pub(crate) dim_lens: &'a [u64],
    pub(crate) chunk_lens: &'a [u64],
    pub(crate) element_size: usize,
    pub(crate) swap: bool,
    pub(crate) fill_value: Option<&'a [u8]>,
    pub(crate) config: WalkConfig,
    pub(crate) source: &'a mut S,
    pub(crate) memory: Memory<'a>,
    /// One entry per dimension, filled by the transfer.
    pub(crate) projections: Vec<SliceProjections>,
    /// Element count of the request along each dimension.
    pub(crate) memory_shape: Vec<u64>,
    pub(crate) chunk_nbytes: usize,
    /// Replicated fill value, built on the first created chunk.
    pub(crate) fill_chunk: Option<Vec<u8>>,
    pub(crate) summary: TransferSummary,
}

impl<'a, S: ChunkSource> TransferContext<'a, S> {
    pub fn new(var: &'a VarDesc, config: WalkConfig, source: &'a mut S, memory: Memory<'a>) -> Self {
        Self {
            dim_lens: &var.dim_lens,
            chunk_lens: &var.chunk_lens,
            element_size: var.element_size(),
            swap: var.swaps_elements(),
            fill_value: var.fill_value.as_deref(),
            config,
            source,
            memory,
            projections: Vec::new(),
            memory_shape: Vec::new(),
            chunk_nbytes: 0,
            fill_chunk: None,
            summary: TransferSummary::default(),
        }
    }

    pub fn rank(&self) -> usize {
        self.dim_lens.len()
    }

    /// Projections computed by the last transfer.
    pub fn projections(&self) -> &[SliceProjections] {
        &self.projections
    }

    /// Element count of the last request along each dimension.
    pub fn memory_shape(&self) -> &[u64] {
        &self.memory_shape
    }

    pub fn summary(&self) -> TransferSummary {
        self.summary
    }
}
