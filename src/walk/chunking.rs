//! Projection of hyperslab slices onto chunks.
//!
//! For each dimension a [`Slice`] is mapped to the range of chunk indices it
//! intersects ([`ChunkRange`]), and for each of those chunks to a
//! [`Projection`]: the part of the slice that falls inside the chunk, in
//! chunk-local coordinates, together with the matching run of positions in
//! the caller's memory.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalkError};
use crate::include::walk_include::{ceil_div, floor_div};

/// One dimension of a hyperslab request.
///
/// `stop` is exclusive. `len` is the extent of the index space the slice
/// lives in and is used when linearizing positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slice {
    pub start: u64,
    pub stop: u64,
    pub stride: u64,
    pub len: u64,
}

impl Slice {
    pub fn new(start: u64, stop: u64, stride: u64, len: u64) -> Self {
        Self {
            start,
            stop,
            stride,
            len,
        }
    }

    /// Build a slice from a `(start, count, stride)` triple, the way callers
    /// express hyperslabs. `stop = start + count * stride`.
    pub fn from_count(start: u64, count: u64, stride: u64, len: u64) -> Option<Self> {
        let stop = count.checked_mul(stride)?.checked_add(start)?;
        Some(Self::new(start, stop, stride, len))
    }

    /// Number of positions the slice selects.
    pub fn count(&self) -> u64 {
        ceil_div(self.stop.saturating_sub(self.start), self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Last position the slice selects, if any.
    pub fn last(&self) -> Option<u64> {
        match self.count() {
            0 => None,
            n => Some(self.start + (n - 1) * self.stride),
        }
    }

    /// The same selection with `stop` pulled in to `dim_len`.
    ///
    /// Selects the same positions whenever the last one lies inside the
    /// dimension.
    pub fn clamped(&self, dim_len: u64) -> Self {
        Self {
            stop: self.stop.min(dim_len),
            ..*self
        }
    }

    /// Selected positions in increasing order.
    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.count()).map(move |k| self.start + k * self.stride)
    }
}

/// Half-open range of chunk indices touched along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkRange {
    pub start: u64,
    pub stop: u64,
}

impl ChunkRange {
    /// Number of chunks in the range.
    pub fn count(&self) -> u64 {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Compute the chunk indices a slice intersects.
pub fn compute_chunk_range(slice: &Slice, chunk_len: u64) -> Option<ChunkRange> {
    if chunk_len == 0 {
        return None;
    }
    Some(ChunkRange {
        start: floor_div(slice.start, chunk_len),
        stop: ceil_div(slice.stop, chunk_len),
    })
}

/// Compute the chunk range of every dimension.
pub fn compute_chunk_ranges(slices: &[Slice], chunk_lens: &[u64]) -> Result<Vec<ChunkRange>> {
    if slices.len() != chunk_lens.len() {
        return Err(WalkError::RankMismatch {
            what: "chunk lengths",
            expected: slices.len(),
            actual: chunk_lens.len(),
        });
    }
    slices
        .iter()
        .zip(chunk_lens)
        .enumerate()
        .map(|(dim, (slice, &chunk_len))| {
            compute_chunk_range(slice, chunk_len).ok_or(WalkError::ZeroChunkLength { dim })
        })
        .collect()
}

/// The contribution of one chunk to one dimension of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Which chunk along the dimension.
    pub chunk_index: u64,
    /// Absolute position of the chunk's first element.
    pub chunk_offset: u64,
    /// End of usable data in this chunk: the chunk end, the dimension length
    /// or the slice stop, whichever comes first.
    pub limit: u64,
    /// First absolute position touched in this chunk.
    pub first: u64,
    /// `first + stride * io_count - 1`: the position just before the next
    /// touched one, which is where the next chunk picks up the stride phase.
    pub last: u64,
    /// Number of positions touched.
    pub io_count: u64,
    /// Position of the first touched element in the output sequence.
    pub io_pos: u64,
    /// Touched positions in chunk-local coordinates.
    pub chunk_slice: Slice,
    /// Matching run `[io_pos, io_pos + io_count)` in the output sequence.
    pub mem_slice: Slice,
}

impl Projection {
    /// Project `slice` onto chunk `chunk_index`.
    ///
    /// `n` is the position of the chunk within the dimension's chunk range and
    /// `prior` the projection built for position `n - 1`. The stride phase is
    /// carried over from `prior`; without it the phase is derived from the
    /// slice start.
    pub fn build(
        dim_len: u64,
        chunk_len: u64,
        chunk_index: u64,
        slice: &Slice,
        n: u64,
        prior: Option<&Projection>,
    ) -> Projection {
        let stride = slice.stride;
        let chunk_offset = chunk_len * chunk_index;
        let limit = (chunk_offset + chunk_len).min(dim_len).min(slice.stop);

        let first = match prior {
            Some(prior) if n > 0 => prior.last + 1,
            _ if n == 0 || chunk_offset <= slice.start => slice.start,
            _ => slice.start + ceil_div(chunk_offset - slice.start, stride) * stride,
        };

        let io_count = ceil_div(limit.saturating_sub(first), stride);
        let last = (first + stride * io_count).saturating_sub(1);

        let local_stop = if slice.stop > limit {
            limit.saturating_sub(chunk_offset)
        } else {
            first.saturating_sub(chunk_offset) + stride * io_count
        };
        // A chunk skipped by a wide stride selects nothing.
        let local_start = first.saturating_sub(chunk_offset).min(local_stop);

        let io_pos = if n == 0 {
            0
        } else {
            ceil_div(chunk_offset - slice.start, stride)
        };

        Projection {
            chunk_index,
            chunk_offset,
            limit,
            first,
            last,
            io_count,
            io_pos,
            chunk_slice: Slice::new(local_start, local_stop, stride, chunk_len),
            mem_slice: Slice::new(io_pos, io_pos + io_count, 1, slice.count()),
        }
    }

    /// Whether this chunk contributes no elements.
    pub fn is_empty(&self) -> bool {
        self.io_count == 0
    }

    /// Absolute positions touched in this chunk.
    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        self.chunk_slice.positions().map(move |p| p + self.chunk_offset)
    }
}

/// All projections of one dimension's slice, ordered by chunk index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceProjections {
    pub dim: usize,
    pub range: ChunkRange,
    pub projections: Vec<Projection>,
}

impl SliceProjections {
    /// Project `slice` onto every chunk of `range`.
    pub fn build(
        dim: usize,
        slice: &Slice,
        range: ChunkRange,
        dim_len: u64,
        chunk_len: u64,
    ) -> Result<Self> {
        let count = usize::try_from(range.count()).map_err(|_| WalkError::Overflow)?;
        let mut projections: Vec<Projection> = Vec::new();
        projections.try_reserve_exact(count)?;

        for (n, chunk_index) in (range.start..range.stop).enumerate() {
            let projection = Projection::build(
                dim_len,
                chunk_len,
                chunk_index,
                slice,
                n as u64,
                projections.last(),
            );
            projections.push(projection);
        }

        Ok(Self {
            dim,
            range,
            projections,
        })
    }

    /// Total number of output elements along this dimension.
    pub fn io_count(&self) -> u64 {
        self.projections.iter().map(|p| p.io_count).sum()
    }

    /// Projection for an absolute chunk index inside the range.
    pub fn projection_for(&self, chunk_index: u64) -> Option<&Projection> {
        let n = chunk_index.checked_sub(self.range.start)?;
        self.projections.get(usize::try_from(n).ok()?)
    }
}

/// Build the [`SliceProjections`] of every dimension.
pub fn compute_all_slice_projections(
    slices: &[Slice],
    dim_lens: &[u64],
    chunk_lens: &[u64],
) -> Result<Vec<SliceProjections>> {
    if dim_lens.len() != slices.len() {
        return Err(WalkError::RankMismatch {
            what: "dimension lengths",
            expected: slices.len(),
            actual: dim_lens.len(),
        });
    }
    // Chunks past the end of a dimension hold nothing.
    let slices: Vec<Slice> = slices
        .iter()
        .zip(dim_lens)
        .map(|(slice, &dim_len)| slice.clamped(dim_len))
        .collect();
    let ranges = compute_chunk_ranges(&slices, chunk_lens)?;

    let mut all = Vec::new();
    all.try_reserve_exact(slices.len())?;
    for (dim, slice) in slices.iter().enumerate() {
        if slice.stride == 0 {
            return Err(WalkError::ZeroStride { dim });
        }
        all.push(SliceProjections::build(
            dim,
            slice,
            ranges[dim],
            dim_lens[dim],
            chunk_lens[dim],
        )?);
    }
    Ok(all)
}
