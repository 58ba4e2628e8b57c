//! In-memory chunk store.
//!
//! Keeps every chunk in a map keyed by its chunk key (`"0.1.2"`). Chunks
//! are created zeroed on first fetch and reported as created, which lets the
//! engine substitute the fill value. Useful on its own for small arrays and
//! as the reference [`ChunkSource`] in tests.

use std::collections::HashMap;
use std::convert::Infallible;

use tracing::trace;

use crate::include::walk_include::chunk_key;
use crate::walk::source::{Chunk, ChunkSource};

#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    chunk_nbytes: usize,
    chunks: HashMap<String, Vec<u8>>,
    fetches: usize,
}

impl MemoryChunkStore {
    /// Create an empty store whose chunks are `chunk_nbytes` bytes long.
    pub fn new(chunk_nbytes: usize) -> Self {
        Self {
            chunk_nbytes,
            chunks: HashMap::new(),
            fetches: 0,
        }
    }

    /// Size of one chunk in bytes.
    pub fn chunk_nbytes(&self) -> usize {
        self.chunk_nbytes
    }

    /// Number of fetches served so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Number of chunks that exist.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Raw bytes of a chunk, if it has been created.
    pub fn get(&self, indices: &[u64]) -> Option<&[u8]> {
        self.chunks.get(&chunk_key(indices)).map(Vec::as_slice)
    }

    /// Store a chunk's bytes directly, replacing any previous contents.
    pub fn insert(&mut self, indices: &[u64], data: Vec<u8>) {
        self.chunks.insert(chunk_key(indices), data);
    }

    pub fn remove(&mut self, indices: &[u64]) -> Option<Vec<u8>> {
        self.chunks.remove(&chunk_key(indices))
    }

    /// Keys of all existing chunks, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.chunks.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ChunkSource for MemoryChunkStore {
    type Error = Infallible;

    fn fetch_chunk(&mut self, indices: &[u64]) -> Result<Chunk<'_>, Self::Error> {
        self.fetches += 1;
        let key = chunk_key(indices);
        let chunk_nbytes = self.chunk_nbytes;
        let mut created = false;
        let data = self.chunks.entry(key).or_insert_with_key(|key| {
            trace!(key = %key, "creating chunk");
            created = true;
            vec![0u8; chunk_nbytes]
        });
        Ok(Chunk {
            data: data.as_mut_slice(),
            created,
        })
    }
}
