//! The chunk-fetch capability the transfer engine is generic over.

/// A chunk buffer handed out by a [`ChunkSource`].
///
/// `data` holds `Π chunk_lens * element_size` bytes in row-major order and
/// stays owned by the source; the engine only borrows it for one chunk walk.
#[derive(Debug)]
pub struct Chunk<'a> {
    pub data: &'a mut [u8],
    /// The source allocated this chunk for the request; its contents are
    /// meaningless and will be overwritten with the fill value.
    pub created: bool,
}

impl<'a> Chunk<'a> {
    pub fn existing(data: &'a mut [u8]) -> Self {
        Self {
            data,
            created: false,
        }
    }

    pub fn created(data: &'a mut [u8]) -> Self {
        Self {
            data,
            created: true,
        }
    }
}

/// Supplies chunk buffers by chunk coordinate.
///
/// This is the boundary to the chunk cache and storage backend. Any blocking
/// I/O happens inside `fetch_chunk`; the engine performs no retries.
pub trait ChunkSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Return the buffer of the chunk at `indices`, creating it if it does
    /// not exist yet.
    fn fetch_chunk(&mut self, indices: &[u64]) -> Result<Chunk<'_>, Self::Error>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    type Error = S::Error;

    fn fetch_chunk(&mut self, indices: &[u64]) -> Result<Chunk<'_>, Self::Error> {
        (**self).fetch_chunk(indices)
    }
}
