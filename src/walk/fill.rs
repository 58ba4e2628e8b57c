//! Fill-value handling for chunks that have never been written.

use crate::error::{Result, WalkError};
use crate::walk::swap::swap_elements;

/// Build a chunk of `chunk_nbytes` bytes holding `fill_value` replicated, or
/// zeros when there is no fill value.
///
/// `fill_value` is one element in memory byte order; when `swap` is set it is
/// converted to storage byte order before replication.
pub fn create_fill_chunk(
    chunk_nbytes: usize,
    element_size: usize,
    fill_value: Option<&[u8]>,
    swap: bool,
) -> Result<Vec<u8>> {
    let mut chunk = Vec::new();
    chunk.try_reserve_exact(chunk_nbytes)?;
    match fill_value {
        None => chunk.resize(chunk_nbytes, 0),
        Some(value) => {
            if value.len() != element_size {
                return Err(WalkError::FillValueSize {
                    expected: element_size,
                    actual: value.len(),
                });
            }
            let mut element = value.to_vec();
            if swap {
                swap_elements(&mut element, element_size);
            }
            if element.iter().all(|&b| b == 0) {
                chunk.resize(chunk_nbytes, 0);
            } else {
                while chunk.len() + element_size <= chunk_nbytes {
                    chunk.extend_from_slice(&element);
                }
                chunk.resize(chunk_nbytes, 0);
            }
        }
    }
    Ok(chunk)
}

/// Overwrite a freshly created chunk with the fill pattern. Both buffers
/// are one chunk long.
pub fn fill_chunk(chunk: &mut [u8], fill_chunk: &[u8]) {
    chunk.copy_from_slice(fill_chunk);
}
