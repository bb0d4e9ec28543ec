//! Error types for container compression and decompression

use thiserror::Error;

/// Result type for coldpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Container error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error reported by a codec
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is empty or too large for the 32-bit container layout
    #[error("unsupported input length: {0} bytes (must be 1..=u32::MAX)")]
    UnsupportedInputLength(u64),

    /// Compression level outside the codec's accepted range
    #[error("unsupported compression level {level} for {algorithm:?}")]
    UnsupportedLevel {
        algorithm: crate::CompressionAlgorithm,
        level: u8,
    },

    /// Codec reported a stream error while compressing
    #[error("codec error: {0}")]
    Codec(String),

    /// Operation called out of order on the compressor
    #[error("compressor is not ready: {0}")]
    NotReady(&'static str),

    /// `finish` was handed a buffer of the wrong size
    #[error("output buffer size mismatch: expected {expected} bytes, got {actual}")]
    OutputBufferSize { expected: usize, actual: usize },

    /// Container shorter than its header or declared payload
    #[error("truncated container: expected at least {expected} bytes, got {actual}")]
    TruncatedContainer { expected: usize, actual: usize },

    /// Unknown algorithm tag in the container header
    #[error("unknown compression algorithm: {0:#04x}")]
    UnknownAlgorithm(u8),

    /// Chunk index beyond the offset table
    #[error("chunk index {index} out of range ({chunks} chunks)")]
    ChunkOutOfRange { index: usize, chunks: usize },

    /// Offset table entries are not strictly increasing within the payload
    #[error("corrupt chunk offset table")]
    CorruptOffsetTable,

    /// Codec failed to decode the payload
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Decoded output does not match the expected original length
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
