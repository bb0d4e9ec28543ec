//! Chunk geometry helpers
//!
//! The container stores compressed end offsets only; everything about the
//! original-side chunk grid is derived from [`CHUNK_SIZE`] and the
//! original length, which the host keeps alongside the container. These
//! helpers are what a host cache needs to size output buffers and map a
//! byte offset to the chunk holding it.

use crate::CHUNK_SIZE;

/// Number of chunks an input of `inplen` bytes compresses into.
pub const fn total_chunks(inplen: usize) -> usize {
    inplen.div_ceil(CHUNK_SIZE)
}

/// Original-byte size of chunk `chunk` for an input of `inplen` bytes.
///
/// Every chunk is [`CHUNK_SIZE`] bytes except the last, which holds the
/// remainder. Returns 0 when `chunk` is past the end.
pub const fn chunk_len(inplen: usize, chunk: usize) -> usize {
    let start = chunk * CHUNK_SIZE;
    if start >= inplen {
        return 0;
    }
    let left = inplen - start;
    if left < CHUNK_SIZE {
        left
    } else {
        CHUNK_SIZE
    }
}

/// Index of the chunk containing original-byte `offset`.
pub const fn to_chunk(offset: usize) -> usize {
    offset / CHUNK_SIZE
}

/// Position of original-byte `offset` within its chunk.
pub const fn to_chunk_offset(offset: usize) -> usize {
    offset % CHUNK_SIZE
}
