//! Chunked streaming compression with random-access decompression
//!
//! `coldpack` compresses a byte buffer into a self-describing container
//! whose internal structure permits decompressing any fixed-size window
//! of the original independently of the rest. It is intended as a storage
//! layer for cold data (e.g. the source text of already-parsed files)
//! where the host wants to cut resident memory but only pay per-chunk
//! decompression cost on access.
//!
//! The container records per-chunk compressed end offsets behind the
//! payload, so a chunk can be decoded with a fresh codec context:
//!
//! ```text
//! header | codec payload | zero padding | u32 offset table
//! ```
//!
//! Two codecs are supported: raw DEFLATE with full-flush chunk boundaries
//! and Zstandard with one frame per chunk. The choice is recorded in the
//! container header.
//!
//! ## Example
//!
//! ```
//! use coldpack::{compress_buffer, decompress, CompressionAlgorithm};
//!
//! let data = b"the quick brown fox jumps over the lazy dog".repeat(100);
//! let container = compress_buffer(&data, CompressionAlgorithm::Zstd, 0).unwrap();
//!
//! let mut restored = vec![0u8; data.len()];
//! decompress(&container, &mut restored).unwrap();
//! assert_eq!(restored, data);
//! ```

pub mod chunk;
mod codec;
pub mod compress;
pub mod decompress;
pub mod error;
pub mod header;

pub use chunk::{chunk_len, to_chunk, to_chunk_offset, total_chunks};
pub use compress::{compress_buffer, CompressStatus, Compressor};
pub use decompress::{decompress, decompress_chunk};
pub use error::{Error, Result};
pub use header::{CompressedDataHeader, HEADER_SIZE};

/// Original-byte size of every chunk except the last one.
///
/// Fixed for the life of a container: the offset table carries no chunk
/// sizes, so decompression derives them from this constant and the
/// original length.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Maximum number of original bytes fed to the codec per
/// [`Compressor::compress_more`] call. Bounds per-call latency for
/// callers that interleave compression with other work.
pub const MAX_INPUT_SIZE: usize = 16 * 1024;

/// Compression algorithms a container can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// Raw DEFLATE stream with full-flush chunk boundaries
    Zlib = 0,
    /// Zstandard, one frame per chunk
    Zstd = 1,
}

impl CompressionAlgorithm {
    /// Parse the algorithm tag from its header byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Zlib),
            1 => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Get the byte representation stored in the header
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}
