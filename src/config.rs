use serde::{Deserialize, Serialize};

use crate::error::{Result, WalkError};
use crate::include::walk_include::{ElementType, Endianness, WALK_MAX_DIM, WALK_NO_OPTIMIZE_ENV};

/// Tuning switches for the transfer engine.
///
/// The defaults enable every optimization; each one only changes how bytes
/// are moved, never which bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Copy a request that covers exactly one whole chunk as a single block.
    pub whole_chunk_fastpath: bool,
    /// Copy contiguous runs along the innermost dimension as single blocks.
    pub coalesce_runs: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            whole_chunk_fastpath: true,
            coalesce_runs: true,
        }
    }
}

impl WalkConfig {
    /// Element-by-element walking only.
    pub fn disabled() -> Self {
        Self {
            whole_chunk_fastpath: false,
            coalesce_runs: false,
        }
    }

    /// Defaults, or [`disabled`](Self::disabled) when `CHUNKWALK_NO_OPTIMIZE`
    /// is set.
    pub fn from_env() -> Self {
        match std::env::var_os(WALK_NO_OPTIMIZE_ENV) {
            Some(_) => Self::disabled(),
            None => Self::default(),
        }
    }
}

/// Shape, chunking and element layout of a chunked variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDesc {
    /// Current length of each dimension.
    pub dim_lens: Vec<u64>,
    /// Chunk length of each dimension.
    pub chunk_lens: Vec<u64>,
    pub element_type: ElementType,
    /// Stored bytes are in the opposite order from the in-memory values.
    #[serde(default)]
    pub swap: bool,
    /// One element, in memory byte order, used for never-written chunks.
    /// Zero when absent.
    #[serde(default)]
    pub fill_value: Option<Vec<u8>>,
}

impl VarDesc {
    pub fn new(dim_lens: Vec<u64>, chunk_lens: Vec<u64>, element_type: ElementType) -> Self {
        Self {
            dim_lens,
            chunk_lens,
            element_type,
            swap: false,
            fill_value: None,
        }
    }

    /// Describe a variable from its netCDF type code and element size.
    /// Codes outside the atomic types are user-defined and treated as opaque.
    pub fn from_type_code(
        dim_lens: Vec<u64>,
        chunk_lens: Vec<u64>,
        type_code: i32,
        element_size: usize,
    ) -> Result<Self> {
        let element_type = match ElementType::from_type_code(type_code) {
            Some(t) if t.size() != element_size => {
                return Err(WalkError::ElementSize {
                    expected: t.size(),
                    actual: element_size,
                });
            }
            Some(t) => t,
            None => ElementType::Opaque(element_size),
        };
        Ok(Self::new(dim_lens, chunk_lens, element_type))
    }

    /// A rank-0 variable.
    pub fn scalar(element_type: ElementType) -> Self {
        Self::new(Vec::new(), Vec::new(), element_type)
    }

    pub fn with_fill_value(mut self, fill_value: impl Into<Vec<u8>>) -> Self {
        self.fill_value = Some(fill_value.into());
        self
    }

    pub fn with_swap(mut self, swap: bool) -> Self {
        self.swap = swap;
        self
    }

    /// Derive the swap flag from the storage and memory byte orders.
    pub fn with_endianness(self, storage: Endianness, memory: Endianness) -> Self {
        self.with_swap(Endianness::swap_required(storage, memory))
    }

    /// Swap when the storage byte order differs from this machine's.
    pub fn with_storage_endianness(self, storage: Endianness) -> Self {
        self.with_endianness(storage, Endianness::native())
    }

    pub fn rank(&self) -> usize {
        self.dim_lens.len()
    }

    pub fn element_size(&self) -> usize {
        self.element_type.size()
    }

    /// Whether transfers byte-swap elements. Opaque elements have no byte
    /// order and are copied as they are.
    pub fn swaps_elements(&self) -> bool {
        self.swap && self.element_type.is_atomic()
    }

    /// Number of chunks along each dimension.
    pub fn chunk_counts(&self) -> Vec<u64> {
        self.dim_lens
            .iter()
            .zip(&self.chunk_lens)
            .map(|(&d, &c)| if c == 0 { 0 } else { d.div_ceil(c) })
            .collect()
    }

    /// Check the description is usable: matching ranks, non-zero chunk
    /// lengths and a fill value of exactly one element.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_lens.len() != self.dim_lens.len() {
            return Err(WalkError::RankMismatch {
                what: "chunk lengths",
                expected: self.dim_lens.len(),
                actual: self.chunk_lens.len(),
            });
        }
        if self.rank() > WALK_MAX_DIM {
            return Err(WalkError::TooManyDimensions {
                rank: self.rank(),
                max: WALK_MAX_DIM,
            });
        }
        if let Some(dim) = self.chunk_lens.iter().position(|&c| c == 0) {
            return Err(WalkError::ZeroChunkLength { dim });
        }
        if let Some(fill) = &self.fill_value {
            if fill.len() != self.element_size() {
                return Err(WalkError::FillValueSize {
                    expected: self.element_size(),
                    actual: fill.len(),
                });
            }
        }
        Ok(())
    }
}
