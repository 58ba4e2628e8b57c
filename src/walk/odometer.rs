//! Bounded multidimensional counter.
//!
//! An [`Odometer`] enumerates every coordinate of a rectangular index space
//! described per dimension by `start`, `stop` (exclusive) and `stride`, in
//! row-major order: the last dimension turns fastest. Dimension 0 is the
//! termination dimension; once it passes its stop the odometer is exhausted
//! and stays that way.

use crate::include::walk_include::{ceil_div, multidim_to_unidim};
use crate::walk::chunking::Slice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Odometer {
    start: Vec<u64>,
    stop: Vec<u64>,
    stride: Vec<u64>,
    extent: Vec<u64>,
    index: Vec<u64>,
    /// Some dimension other than 0 has nothing to enumerate.
    empty: bool,
}

impl Odometer {
    /// Create an odometer positioned at `start`.
    ///
    /// All vectors must have the same length and every stride and extent must
    /// be non-zero; nothing else is checked.
    pub fn new(start: &[u64], stop: &[u64], stride: &[u64], extent: &[u64]) -> Self {
        debug_assert!(
            start.len() == stop.len() && stop.len() == stride.len() && stride.len() == extent.len()
        );
        let empty = start.iter().zip(stop).skip(1).any(|(a, b)| a >= b);
        Self {
            start: start.to_vec(),
            stop: stop.to_vec(),
            stride: stride.to_vec(),
            extent: extent.to_vec(),
            index: start.to_vec(),
            empty,
        }
    }

    /// Create an odometer walking a set of slices, one per dimension. Each
    /// slice's `len` is the extent used for linearization.
    pub fn from_slices(slices: &[Slice]) -> Self {
        let start: Vec<u64> = slices.iter().map(|s| s.start).collect();
        let stop: Vec<u64> = slices.iter().map(|s| s.stop).collect();
        let stride: Vec<u64> = slices.iter().map(|s| s.stride).collect();
        let extent: Vec<u64> = slices.iter().map(|s| s.len).collect();
        Self::new(&start, &stop, &stride, &extent)
    }

    pub fn rank(&self) -> usize {
        self.index.len()
    }

    /// Whether the current index is a valid coordinate.
    ///
    /// A rank-0 odometer has no termination dimension and is always exhausted.
    pub fn more(&self) -> bool {
        if self.empty {
            return false;
        }
        match (self.index.first(), self.stop.first()) {
            (Some(index), Some(stop)) => index < stop,
            _ => false,
        }
    }

    /// Step to the next coordinate in row-major order.
    pub fn advance(&mut self) {
        for i in (0..self.rank()).rev() {
            self.index[i] += self.stride[i];
            if self.index[i] < self.stop[i] {
                return;
            }
            if i == 0 {
                // Terminal: dimension 0 stays at or past its stop.
                return;
            }
            self.index[i] = self.start[i];
        }
    }

    /// Current coordinate.
    pub fn indices(&self) -> &[u64] {
        &self.index
    }

    /// Row-major linear position of the current coordinate.
    pub fn linear_offset(&self) -> u64 {
        multidim_to_unidim(&self.index, &self.extent)
    }

    /// Number of positions left along the last dimension, the current one
    /// included.
    pub fn avail(&self) -> u64 {
        match self.rank() {
            0 => 0,
            r => {
                let last = r - 1;
                let remaining = self.stop[last].saturating_sub(self.index[last]);
                ceil_div(remaining, self.stride[last])
            }
        }
    }

    /// Skip the rest of the current run along the last dimension and carry
    /// into the next one, as if [`advance`](Self::advance) had been called
    /// [`avail`](Self::avail) times.
    pub fn advance_run(&mut self) {
        let avail = self.avail();
        if avail > 1 {
            let last = self.rank() - 1;
            self.index[last] += self.stride[last] * (avail - 1);
        }
        self.advance();
    }

    pub fn start(&self) -> &[u64] {
        &self.start
    }

    pub fn stop(&self) -> &[u64] {
        &self.stop
    }

    pub fn stride(&self) -> &[u64] {
        &self.stride
    }

    pub fn extent(&self) -> &[u64] {
        &self.extent
    }
}
