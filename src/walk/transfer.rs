//! The transfer engine.
//!
//! Three odometers drive a transfer. The chunk odometer walks every chunk
//! coordinate in the cross product of the per-dimension chunk ranges. For
//! each coordinate the matching projections are gathered into a chunk-local
//! odometer and a memory odometer; both enumerate the same number of
//! elements per dimension, so they advance in lockstep while elements are
//! copied between the chunk buffer and the caller's buffer.
//!
//! Copies land in the caller's buffer as each chunk is walked. A failure
//! part way through leaves earlier chunks' elements in place.

use tracing::{debug, trace};

use crate::error::{Result, WalkError};
use crate::include::walk_include::{ceil_div, checked_product};
use crate::walk::chunking::{compute_all_slice_projections, Slice, SliceProjections};
use crate::walk::context::{Memory, TransferContext, TransferSummary};
use crate::walk::fill::{create_fill_chunk, fill_chunk};
use crate::walk::odometer::Odometer;
use crate::walk::source::ChunkSource;
use crate::walk::swap::swap_copy;

/// Compute the projections of every dimension and an odometer over all
/// touched chunk coordinates.
pub fn project_slices(
    dim_lens: &[u64],
    chunk_lens: &[u64],
    slices: &[Slice],
) -> Result<(Vec<SliceProjections>, Odometer)> {
    let all = compute_all_slice_projections(slices, dim_lens, chunk_lens)?;

    let rank = slices.len();
    let mut start = Vec::with_capacity(rank);
    let mut stop = Vec::with_capacity(rank);
    let mut extent = Vec::with_capacity(rank);
    for (slp, (&dim_len, &chunk_len)) in all.iter().zip(dim_lens.iter().zip(chunk_lens)) {
        debug_assert_eq!(slp.range.count(), slp.projections.len() as u64);
        start.push(slp.range.start);
        stop.push(slp.range.stop);
        extent.push(ceil_div(dim_len, chunk_len).max(1));
    }
    let stride = vec![1; rank];
    let odom = Odometer::new(&start, &stop, &stride, &extent);
    Ok((all, odom))
}

/// Chunk coordinates, in row-major order, that contribute at least one
/// element to the request.
pub fn touched_chunks(
    dim_lens: &[u64],
    chunk_lens: &[u64],
    slices: &[Slice],
) -> Result<Vec<Vec<u64>>> {
    if slices.is_empty() {
        return Ok(vec![vec![0]]);
    }
    if slices.iter().any(Slice::is_empty) {
        return Ok(Vec::new());
    }
    let (all, mut odom) = project_slices(dim_lens, chunk_lens, slices)?;
    let mut chunks = Vec::new();
    while odom.more() {
        let indices = odom.indices();
        let contributes = all.iter().zip(indices).all(|(slp, &index)| {
            slp.projection_for(index)
                .is_some_and(|p| !p.is_empty())
        });
        if contributes {
            chunks.push(indices.to_vec());
        }
        odom.advance();
    }
    Ok(chunks)
}

/// Whether the request is exactly one whole chunk.
fn is_whole_chunk(slices: &[Slice], chunk_lens: &[u64]) -> bool {
    slices.iter().zip(chunk_lens).all(|(s, &c)| {
        s.stride == 1 && s.start % c == 0 && s.stop - s.start == c
    })
}

impl<S: ChunkSource> TransferContext<'_, S> {
    /// Move the elements selected by `slices` between the chunks and the
    /// caller's buffer. One slice per dimension.
    pub fn transfer(&mut self, slices: &[Slice]) -> Result<TransferSummary> {
        self.summary = TransferSummary::default();
        let rank = self.rank();
        if slices.len() != rank {
            return Err(WalkError::RankMismatch {
                what: "slices",
                expected: rank,
                actual: slices.len(),
            });
        }
        if self.chunk_lens.len() != rank {
            return Err(WalkError::RankMismatch {
                what: "chunk lengths",
                expected: rank,
                actual: self.chunk_lens.len(),
            });
        }

        debug!(
            rank,
            read = self.memory.is_read(),
            swap = self.swap,
            ?slices,
            "transfer slice"
        );

        if rank == 0 {
            return self.transfer_scalar();
        }

        self.check_request(slices)?;
        if slices.iter().any(Slice::is_empty) {
            debug!("empty request");
            return Ok(self.summary);
        }

        let (projections, chunk_odom) = project_slices(self.dim_lens, self.chunk_lens, slices)?;
        self.memory_shape = projections.iter().map(SliceProjections::io_count).collect();
        self.projections = projections;
        debug_assert!(self
            .memory_shape
            .iter()
            .zip(slices)
            .all(|(&n, s)| n == s.count()));

        if self.config.whole_chunk_fastpath && is_whole_chunk(slices, self.chunk_lens) {
            let indices: Vec<u64> = slices
                .iter()
                .zip(self.chunk_lens)
                .map(|(s, &c)| s.start / c)
                .collect();
            self.transfer_whole_chunk(&indices)?;
        } else {
            self.walk_chunks(chunk_odom)?;
        }

        debug!(summary = ?self.summary, "transfer done");
        Ok(self.summary)
    }

    /// Validate the request against the variable and size the buffers.
    fn check_request(&mut self, slices: &[Slice]) -> Result<()> {
        for (dim, (slice, (&dim_len, &chunk_len))) in slices
            .iter()
            .zip(self.dim_lens.iter().zip(self.chunk_lens))
            .enumerate()
        {
            if chunk_len == 0 {
                return Err(WalkError::ZeroChunkLength { dim });
            }
            if slice.stride == 0 {
                return Err(WalkError::ZeroStride { dim });
            }
            if let Some(last) = slice.last() {
                if last >= dim_len {
                    return Err(WalkError::OutOfBounds { dim, last, dim_len });
                }
            }
        }

        self.chunk_nbytes = byte_size(checked_product(self.chunk_lens), self.element_size)?;
        let counts: Vec<u64> = slices.iter().map(Slice::count).collect();
        let required = byte_size(checked_product(&counts), self.element_size)?;
        if self.memory.len() < required {
            return Err(WalkError::BufferTooSmall {
                required,
                actual: self.memory.len(),
            });
        }
        Ok(())
    }

    fn walk_chunks(&mut self, mut chunk_odom: Odometer) -> Result<()> {
        let rank = self.rank();
        let mut chunk_slices = Vec::with_capacity(rank);
        let mut mem_slices = Vec::with_capacity(rank);

        while chunk_odom.more() {
            let indices = chunk_odom.indices();

            chunk_slices.clear();
            mem_slices.clear();
            for (slp, &index) in self.projections.iter().zip(indices) {
                match slp.projection_for(index) {
                    Some(p) if !p.is_empty() => {
                        chunk_slices.push(p.chunk_slice);
                        mem_slices.push(p.mem_slice);
                    }
                    _ => break,
                }
            }
            if chunk_slices.len() < rank {
                trace!(chunk = ?indices, "no elements in chunk");
                self.summary.chunks_skipped += 1;
                chunk_odom.advance();
                continue;
            }
            trace!(chunk = ?indices, ?chunk_slices, ?mem_slices, "walking chunk");

            let chunk = self
                .source
                .fetch_chunk(indices)
                .map_err(|e| WalkError::ChunkFetch {
                    indices: indices.to_vec(),
                    source: Box::new(e),
                })?;
            if chunk.data.len() != self.chunk_nbytes {
                return Err(WalkError::ChunkSize {
                    indices: indices.to_vec(),
                    expected: self.chunk_nbytes,
                    actual: chunk.data.len(),
                });
            }
            if chunk.created {
                let pattern = fill_pattern(
                    &mut self.fill_chunk,
                    self.chunk_nbytes,
                    self.element_size,
                    self.fill_value,
                    self.swap,
                )?;
                fill_chunk(chunk.data, pattern);
                self.summary.chunks_created += 1;
            }

            let mut slp_odom = Odometer::from_slices(&chunk_slices);
            let mut mem_odom = Odometer::from_slices(&mem_slices);
            self.summary.elements += walk_elements(
                &mut slp_odom,
                &mut mem_odom,
                chunk.data,
                &mut self.memory,
                self.element_size,
                self.swap,
                self.config.coalesce_runs,
            );
            self.summary.chunks_visited += 1;

            chunk_odom.advance();
        }
        Ok(())
    }

    /// The request covers exactly the chunk at `indices`: move it as one block.
    fn transfer_whole_chunk(&mut self, indices: &[u64]) -> Result<()> {
        trace!(chunk = ?indices, "whole chunk");
        let chunk = self
            .source
            .fetch_chunk(indices)
            .map_err(|e| WalkError::ChunkFetch {
                indices: indices.to_vec(),
                source: Box::new(e),
            })?;
        if chunk.data.len() != self.chunk_nbytes {
            return Err(WalkError::ChunkSize {
                indices: indices.to_vec(),
                expected: self.chunk_nbytes,
                actual: chunk.data.len(),
            });
        }
        if chunk.created {
            let pattern = fill_pattern(
                &mut self.fill_chunk,
                self.chunk_nbytes,
                self.element_size,
                self.fill_value,
                self.swap,
            )?;
            fill_chunk(chunk.data, pattern);
            self.summary.chunks_created += 1;
        }
        copy_run(
            &mut self.memory,
            chunk.data,
            0,
            0,
            self.chunk_nbytes,
            self.element_size,
            self.swap,
        );
        self.summary.chunks_visited = 1;
        self.summary.elements = (self.chunk_nbytes / self.element_size.max(1)) as u64;
        self.summary.whole_chunk = true;
        Ok(())
    }

    /// A rank-0 variable holds one element in chunk `[0]`.
    fn transfer_scalar(&mut self) -> Result<TransferSummary> {
        self.chunk_nbytes = self.element_size;
        if self.memory.len() < self.element_size {
            return Err(WalkError::BufferTooSmall {
                required: self.element_size,
                actual: self.memory.len(),
            });
        }
        self.transfer_whole_chunk(&[0])?;
        self.summary.whole_chunk = false;
        debug!(summary = ?self.summary, "scalar transfer done");
        Ok(self.summary)
    }
}

fn byte_size(elements: Option<u64>, element_size: usize) -> Result<usize> {
    elements
        .and_then(|n| n.checked_mul(element_size as u64))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(WalkError::Overflow)
}

/// The replicated fill chunk, built on first use.
fn fill_pattern<'f>(
    cache: &'f mut Option<Vec<u8>>,
    chunk_nbytes: usize,
    element_size: usize,
    fill_value: Option<&[u8]>,
    swap: bool,
) -> Result<&'f [u8]> {
    if cache.is_none() {
        *cache = Some(create_fill_chunk(chunk_nbytes, element_size, fill_value, swap)?);
    }
    Ok(cache.get_or_insert_with(Vec::new).as_slice())
}

/// Walk one chunk, returning the number of elements copied.
fn walk_elements(
    slp_odom: &mut Odometer,
    mem_odom: &mut Odometer,
    chunk: &mut [u8],
    memory: &mut Memory<'_>,
    element_size: usize,
    swap: bool,
    coalesce_runs: bool,
) -> u64 {
    let runs = coalesce_runs && slp_odom.stride().last() == Some(&1);
    let mut copied = 0;
    while slp_odom.more() {
        debug_assert!(mem_odom.more());
        let n = if runs { slp_odom.avail() } else { 1 };
        let chunk_pos = slp_odom.linear_offset() as usize * element_size;
        let mem_pos = mem_odom.linear_offset() as usize * element_size;
        copy_run(
            memory,
            chunk,
            mem_pos,
            chunk_pos,
            n as usize * element_size,
            element_size,
            swap,
        );
        copied += n;
        if runs {
            slp_odom.advance_run();
            mem_odom.advance_run();
        } else {
            slp_odom.advance();
            mem_odom.advance();
        }
    }
    debug_assert!(!mem_odom.more());
    copied
}

/// Copy `nbytes` between the chunk and the caller's buffer in the direction
/// of the transfer, swapping the copied elements at the destination.
fn copy_run(
    memory: &mut Memory<'_>,
    chunk: &mut [u8],
    mem_pos: usize,
    chunk_pos: usize,
    nbytes: usize,
    element_size: usize,
    swap: bool,
) {
    let (dest, src): (&mut [u8], &[u8]) = match memory {
        Memory::Read(buf) => (
            &mut buf[mem_pos..mem_pos + nbytes],
            &chunk[chunk_pos..chunk_pos + nbytes],
        ),
        Memory::Write(buf) => (
            &mut chunk[chunk_pos..chunk_pos + nbytes],
            &buf[mem_pos..mem_pos + nbytes],
        ),
    };
    if swap {
        swap_copy(dest, src, element_size);
    } else {
        dest.copy_from_slice(src);
    }
}
