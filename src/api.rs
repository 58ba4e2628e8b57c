use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{VarDesc, WalkConfig};
use crate::error::{Result, WalkError};
use crate::walk::chunking::Slice;
use crate::walk::context::{Memory, TransferContext, TransferSummary};
use crate::walk::source::ChunkSource;
use crate::walk::transfer::touched_chunks;

pub use crate::walk::cache::MemoryChunkStore;
pub use crate::walk::source::Chunk;

/// A hyperslab request: per dimension, the first index, the number of
/// elements and the step between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperslab {
    pub start: Vec<u64>,
    pub count: Vec<u64>,
    pub stride: Vec<u64>,
}

impl Hyperslab {
    pub fn new(start: Vec<u64>, count: Vec<u64>, stride: Vec<u64>) -> Self {
        Self {
            start,
            count,
            stride,
        }
    }

    /// Unit stride in every dimension.
    pub fn contiguous(start: Vec<u64>, count: Vec<u64>) -> Self {
        let stride = vec![1; start.len()];
        Self::new(start, count, stride)
    }

    /// The whole variable.
    pub fn all(var: &VarDesc) -> Self {
        Self::contiguous(vec![0; var.rank()], var.dim_lens.clone())
    }

    /// The empty request of a scalar variable.
    pub fn scalar() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.start.len()
    }

    /// Number of elements selected.
    pub fn num_elements(&self) -> Option<u64> {
        crate::include::walk_include::checked_product(&self.count)
    }

    /// Build one [`Slice`] per dimension of `var`, with `stop` clamped to
    /// the dimension length. Fails if a selected position lies outside.
    pub fn to_slices(&self, var: &VarDesc) -> Result<Vec<Slice>> {
        let rank = var.rank();
        for (what, len) in [
            ("start", self.start.len()),
            ("count", self.count.len()),
            ("stride", self.stride.len()),
        ] {
            if len != rank {
                return Err(WalkError::RankMismatch {
                    what,
                    expected: rank,
                    actual: len,
                });
            }
        }

        let mut slices = Vec::new();
        slices.try_reserve_exact(rank)?;
        for (dim, &dim_len) in var.dim_lens.iter().enumerate() {
            if self.stride[dim] == 0 {
                return Err(WalkError::ZeroStride { dim });
            }
            let slice = Slice::from_count(self.start[dim], self.count[dim], self.stride[dim], dim_len)
                .ok_or(WalkError::Overflow)?;
            if let Some(last) = slice.last() {
                if last >= dim_len {
                    return Err(WalkError::OutOfBounds { dim, last, dim_len });
                }
            }
            slices.push(slice.clamped(dim_len));
        }
        Ok(slices)
    }
}

/// Move the elements of `hyperslab` between the chunks of `var` and
/// `memory`. The direction is given by the [`Memory`] variant.
pub fn transfer_slice<S: ChunkSource>(
    source: &mut S,
    var: &VarDesc,
    config: WalkConfig,
    hyperslab: &Hyperslab,
    memory: Memory<'_>,
) -> Result<TransferSummary> {
    var.validate()?;
    let slices = hyperslab.to_slices(var)?;
    let mut ctx = TransferContext::new(var, config, source, memory);
    ctx.transfer(&slices)
}

/// Read `hyperslab` into `out`, packed in row-major order.
pub fn read_slice<S: ChunkSource>(
    source: &mut S,
    var: &VarDesc,
    config: WalkConfig,
    hyperslab: &Hyperslab,
    out: &mut [u8],
) -> Result<TransferSummary> {
    transfer_slice(source, var, config, hyperslab, Memory::Read(out))
}

/// Write `data`, packed in row-major order, into `hyperslab`.
pub fn write_slice<S: ChunkSource>(
    source: &mut S,
    var: &VarDesc,
    config: WalkConfig,
    hyperslab: &Hyperslab,
    data: &[u8],
) -> Result<TransferSummary> {
    transfer_slice(source, var, config, hyperslab, Memory::Write(data))
}

fn check_element_size<T>(var: &VarDesc) -> Result<()> {
    let actual = std::mem::size_of::<T>();
    if actual != var.element_size() {
        return Err(WalkError::ElementSize {
            expected: var.element_size(),
            actual,
        });
    }
    Ok(())
}

/// [`read_slice`] into a typed buffer.
pub fn read_slice_as<S: ChunkSource, T: bytemuck::Pod>(
    source: &mut S,
    var: &VarDesc,
    config: WalkConfig,
    hyperslab: &Hyperslab,
    out: &mut [T],
) -> Result<TransferSummary> {
    check_element_size::<T>(var)?;
    read_slice(source, var, config, hyperslab, bytemuck::cast_slice_mut(out))
}

/// [`write_slice`] from a typed buffer.
pub fn write_slice_as<S: ChunkSource, T: bytemuck::Pod>(
    source: &mut S,
    var: &VarDesc,
    config: WalkConfig,
    hyperslab: &Hyperslab,
    data: &[T],
) -> Result<TransferSummary> {
    check_element_size::<T>(var)?;
    write_slice(source, var, config, hyperslab, bytemuck::cast_slice(data))
}

/// Chunk coordinates, in row-major order, holding at least one element of
/// `hyperslab`.
pub fn slice_chunk_indices(var: &VarDesc, hyperslab: &Hyperslab) -> Result<Vec<Vec<u64>>> {
    var.validate()?;
    let slices = hyperslab.to_slices(var)?;
    let chunks = touched_chunks(&var.dim_lens, &var.chunk_lens, &slices)?;
    debug!(count = chunks.len(), "chunks touched by hyperslab");
    Ok(chunks)
}

/// Size in bytes of one chunk of `var`.
pub fn chunk_nbytes(var: &VarDesc) -> Result<usize> {
    crate::include::walk_include::checked_product(&var.chunk_lens)
        .and_then(|n| n.checked_mul(var.element_size() as u64))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(WalkError::Overflow)
}
