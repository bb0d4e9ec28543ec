//! Container decompression
//!
//! Two stateless entry points: [`decompress`] recovers the whole original
//! buffer, [`decompress_chunk`] recovers one chunk in isolation. Both are
//! pure with respect to their inputs and may run concurrently on distinct
//! buffers; every call uses a fresh codec context scoped to the call.
//!
//! The container does not record the original length. The host keeps it
//! alongside the container and sizes `out` accordingly (whole length for
//! [`decompress`], [`crate::chunk_len`] for [`decompress_chunk`]).

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, trace};

use crate::header::{CompressedDataHeader, OffsetTable, HEADER_SIZE};
use crate::{CompressionAlgorithm, Error, Result, CHUNK_SIZE};

/// Decompress a whole container into `out`, which must be exactly the
/// original length.
pub fn decompress(inp: &[u8], out: &mut [u8]) -> Result<()> {
    let header = CompressedDataHeader::parse(inp)?;
    let compressed_bytes = header.compressed_bytes as usize;
    if inp.len() < compressed_bytes {
        return Err(Error::TruncatedContainer {
            expected: compressed_bytes,
            actual: inp.len(),
        });
    }

    debug!(
        algorithm = ?header.algorithm,
        payload = compressed_bytes - HEADER_SIZE,
        outlen = out.len(),
        "decompressing container"
    );

    let payload = &inp[HEADER_SIZE..compressed_bytes];
    match header.algorithm {
        // One continuous raw deflate stream; the full-flush chunk
        // boundaries inside it are transparent to the inflater.
        CompressionAlgorithm::Zlib => inflate_raw(payload, out, true),
        // A sequence of complete frames, one per chunk.
        CompressionAlgorithm::Zstd => decompress_zstd(payload, out),
    }
}

/// Decompress chunk `chunk` of a container into `out`, which must be
/// exactly the chunk's original length ([`CHUNK_SIZE`] except for the
/// last chunk).
pub fn decompress_chunk(inp: &[u8], chunk: usize, out: &mut [u8]) -> Result<()> {
    debug_assert!(out.len() <= CHUNK_SIZE);

    let header = CompressedDataHeader::parse(inp)?;
    let compressed_bytes = header.compressed_bytes as usize;
    let table = OffsetTable::parse(inp, &header)?;

    let start = if chunk == 0 {
        HEADER_SIZE
    } else {
        table.end_offset(chunk - 1)? as usize
    };
    let end = table.end_offset(chunk)? as usize;
    if start < HEADER_SIZE || start >= end || end > compressed_bytes {
        return Err(Error::CorruptOffsetTable);
    }

    // The stream terminator lives in the chunk that ends the payload.
    let last = end == compressed_bytes;

    trace!(
        chunk,
        start,
        end,
        last,
        algorithm = ?header.algorithm,
        "decompressing chunk"
    );

    let data = &inp[start..end];
    match header.algorithm {
        CompressionAlgorithm::Zlib => inflate_raw(data, out, last),
        CompressionAlgorithm::Zstd => decompress_zstd(data, out),
    }
}

/// Inflate a raw deflate slice with a fresh context, draining both
/// windows. `last` marks data containing the stream terminator.
fn inflate_raw(data: &[u8], out: &mut [u8], last: bool) -> Result<()> {
    let mut inflater = Decompress::new(false);
    let flush = if last {
        FlushDecompress::Finish
    } else {
        FlushDecompress::None
    };

    let mut in_pos = 0;
    let mut out_pos = 0;
    loop {
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let status = inflater
            .decompress(&data[in_pos..], &mut out[out_pos..], flush)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
        let consumed = (inflater.total_in() - before_in) as usize;
        let produced = (inflater.total_out() - before_out) as usize;
        in_pos += consumed;
        out_pos += produced;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if !last && in_pos == data.len() {
                    break;
                }
                if consumed == 0 && produced == 0 {
                    return Err(Error::DecompressionFailed(
                        "raw deflate stream stalled before completion".into(),
                    ));
                }
            }
        }
    }

    if in_pos != data.len() {
        return Err(Error::DecompressionFailed(format!(
            "{} compressed bytes left undecoded",
            data.len() - in_pos
        )));
    }
    if out_pos != out.len() {
        return Err(Error::SizeMismatch {
            expected: out.len(),
            actual: out_pos,
        });
    }
    Ok(())
}

/// One-shot Zstandard decode; `data` is one or more complete frames.
fn decompress_zstd(data: &[u8], out: &mut [u8]) -> Result<()> {
    let mut decompressor = zstd::bulk::Decompressor::new()?;
    let written = decompressor
        .decompress_to_buffer(data, out)
        .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
    if written != out.len() {
        return Err(Error::SizeMismatch {
            expected: out.len(),
            actual: written,
        });
    }
    Ok(())
}
