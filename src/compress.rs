//! Chunked compression state machine
//!
//! [`Compressor`] feeds input into a codec while enforcing chunk
//! boundaries at fixed original-byte offsets, and records the compressed
//! end offset of every chunk. The caller owns the output buffer and grows
//! it on demand: [`Compressor::compress_more`] writes behind the bytes
//! already produced and returns [`CompressStatus::MoreOutput`] when the
//! buffer is exhausted, with all cursors kept for the next call. After
//! [`CompressStatus::Done`], [`Compressor::finish`] seals the container
//! by writing the header, padding and offset table.
//!
//! Containers are never observable in a partial state: until `finish`
//! runs, the buffer holds payload bytes only.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Cursor;
use tracing::{debug, trace};

use crate::codec::{Codec, PushMode, PushState};
use crate::header::{align_up, CompressedDataHeader, HEADER_SIZE};
use crate::{CompressionAlgorithm, Error, Result, CHUNK_SIZE, MAX_INPUT_SIZE};

/// Outcome of a single [`Compressor::compress_more`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input remains; call again
    Continue,
    /// The output buffer is full. Provide a larger buffer containing the
    /// bytes written so far (see [`Compressor::bytes_written`]) and call
    /// again.
    MoreOutput,
    /// All input is compressed; the container can be sealed with
    /// [`Compressor::finish`]
    Done,
}

/// Incremental chunked compressor over a borrowed input buffer.
///
/// Lifecycle: [`new`](Self::new) → [`init`](Self::init) → repeated
/// [`compress_more`](Self::compress_more) until [`CompressStatus::Done`]
/// → [`finish`](Self::finish). The codec context is created by `init` and
/// released on drop regardless of how far the stream got.
pub struct Compressor<'a> {
    inp: &'a [u8],
    algorithm: CompressionAlgorithm,
    level: u8,
    codec: Option<Codec>,
    /// Original bytes consumed so far
    consumed: usize,
    /// Payload bytes produced so far, header reservation included
    outbytes: usize,
    /// Original bytes fed into the current chunk
    current_chunk: usize,
    /// Exclusive end offset of every completed chunk
    chunk_offsets: Vec<u32>,
    done: bool,
}

impl<'a> Compressor<'a> {
    /// Set up a compressor over `inp`. No allocation happens here; the
    /// codec context is created by [`init`](Self::init).
    ///
    /// `level` 0 selects the codec default (best speed for ZLIB, 3 for
    /// ZSTD); otherwise it is passed through and recorded in the header.
    pub fn new(inp: &'a [u8], algorithm: CompressionAlgorithm, level: u8) -> Self {
        Self {
            inp,
            algorithm,
            level,
            codec: None,
            consumed: 0,
            // Reserve space for the header; payload starts behind it.
            outbytes: HEADER_SIZE,
            current_chunk: 0,
            chunk_offsets: Vec::new(),
            done: false,
        }
    }

    /// Create the codec context.
    ///
    /// Fails when the input is empty or too large for the 32-bit
    /// container layout, or when the codec rejects the level.
    pub fn init(&mut self) -> Result<()> {
        if self.inp.is_empty() || self.inp.len() as u64 > u64::from(u32::MAX) {
            return Err(Error::UnsupportedInputLength(self.inp.len() as u64));
        }
        self.codec = Some(Codec::new(self.algorithm, self.level)?);
        debug!(
            algorithm = ?self.algorithm,
            level = self.level,
            inplen = self.inp.len(),
            "compressor initialized"
        );
        Ok(())
    }

    /// Payload bytes produced so far, header reservation included.
    ///
    /// After [`CompressStatus::MoreOutput`], the first `bytes_written`
    /// bytes of the output buffer are the valid prefix the caller must
    /// carry over into the larger buffer.
    pub fn bytes_written(&self) -> usize {
        self.outbytes
    }

    /// Advance the stream, processing at most [`MAX_INPUT_SIZE`] original
    /// bytes.
    ///
    /// `dest` is the whole output buffer; this call writes at
    /// `dest[bytes_written()..]`. Passing a larger buffer (with the
    /// previous prefix copied in) after [`CompressStatus::MoreOutput`]
    /// resumes exactly where the stream stopped.
    pub fn compress_more(&mut self, dest: &mut [u8]) -> Result<CompressStatus> {
        let codec = self
            .codec
            .as_mut()
            .ok_or(Error::NotReady("init was not called"))?;
        if self.done {
            return Ok(CompressStatus::Done);
        }
        if dest.len() <= self.outbytes {
            return Ok(CompressStatus::MoreOutput);
        }

        let left = self.inp.len() - self.consumed;
        let mut this_push = left.min(MAX_INPUT_SIZE);
        let mut flush = false;
        debug_assert!(self.current_chunk <= CHUNK_SIZE);
        if self.current_chunk + this_push >= CHUNK_SIZE {
            // Clamp so no chunk grows past CHUNK_SIZE original bytes.
            this_push = CHUNK_SIZE - self.current_chunk;
            flush = true;
        }
        let done = this_push == left;

        // End of input terminates the stream; a mere chunk boundary gets
        // a flush. End wins when both coincide.
        let mode = if done {
            PushMode::End
        } else if flush {
            PushMode::FlushChunk
        } else {
            PushMode::Continue
        };

        let input = &self.inp[self.consumed..self.consumed + this_push];
        let push = codec.push(input, &mut dest[self.outbytes..], mode)?;
        self.outbytes += push.produced;
        self.consumed += push.consumed;
        self.current_chunk += push.consumed;
        debug_assert!(self.current_chunk <= CHUNK_SIZE);

        trace!(
            consumed = self.consumed,
            outbytes = self.outbytes,
            ?mode,
            state = ?push.state,
            "compress_more step"
        );

        if push.state == PushState::NeedOutput {
            return Ok(CompressStatus::MoreOutput);
        }

        if done || self.current_chunk == CHUNK_SIZE {
            debug_assert!(done || flush);
            let end = u32::try_from(self.outbytes)
                .map_err(|_| Error::Codec("compressed payload exceeds u32 range".into()))?;
            self.chunk_offsets.push(end);
            self.current_chunk = 0;
        }

        if done {
            debug_assert_eq!(push.state, PushState::StreamEnd);
            debug_assert_eq!(
                self.chunk_offsets.len(),
                crate::chunk::total_chunks(self.inp.len())
            );
            self.done = true;
            Ok(CompressStatus::Done)
        } else {
            Ok(CompressStatus::Continue)
        }
    }

    /// Exact container size [`finish`](Self::finish) requires. Only
    /// meaningful after [`CompressStatus::Done`].
    pub fn total_bytes_needed(&self) -> usize {
        align_up(self.outbytes) + 4 * self.chunk_offsets.len()
    }

    /// Seal the container: write the header, zero the padding and write
    /// the offset table. `dest` must hold the payload produced by
    /// [`compress_more`](Self::compress_more) and be exactly
    /// [`total_bytes_needed`](Self::total_bytes_needed) bytes long.
    pub fn finish(&self, dest: &mut [u8]) -> Result<()> {
        if !self.done {
            return Err(Error::NotReady("stream is not finished"));
        }
        let expected = self.total_bytes_needed();
        if dest.len() != expected {
            return Err(Error::OutputBufferSize {
                expected,
                actual: dest.len(),
            });
        }

        let header = CompressedDataHeader {
            compressed_bytes: self.outbytes as u32,
            algorithm: self.algorithm,
            level: self.level,
        };
        header.write(dest)?;

        // The enclosing cache hashes the raw container, so the padding
        // must be deterministic.
        let aligned = align_up(self.outbytes);
        dest[self.outbytes..aligned].fill(0);

        let mut cursor = Cursor::new(&mut dest[aligned..]);
        for &offset in &self.chunk_offsets {
            cursor.write_u32::<LittleEndian>(offset)?;
        }

        debug!(
            inplen = self.inp.len(),
            container = dest.len(),
            chunks = self.chunk_offsets.len(),
            "container sealed"
        );
        Ok(())
    }
}

/// Compress `inp` into a freshly allocated container, driving the
/// grow-buffer protocol internally.
pub fn compress_buffer(
    inp: &[u8],
    algorithm: CompressionAlgorithm,
    level: u8,
) -> Result<Vec<u8>> {
    let mut compressor = Compressor::new(inp, algorithm, level);
    compressor.init()?;

    // Start below the input size; incompressible data grows the buffer.
    let mut dest = vec![0u8; (HEADER_SIZE + inp.len() / 2).max(HEADER_SIZE + 64)];
    loop {
        match compressor.compress_more(&mut dest)? {
            CompressStatus::Continue => {}
            CompressStatus::MoreOutput => {
                let grown = dest.len() * 2;
                dest.resize(grown, 0);
            }
            CompressStatus::Done => break,
        }
    }

    dest.resize(compressor.total_bytes_needed(), 0);
    compressor.finish(&mut dest)?;
    Ok(dest)
}
