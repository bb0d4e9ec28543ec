//! Uniform streaming interface over the two payload codecs
//!
//! Both codecs are driven push-style: the caller hands an input window,
//! an output window and a mode, and gets back how far both sides
//! advanced. Raw DEFLATE keeps one stream for the whole payload and marks
//! chunk boundaries with a full flush, so a fresh inflater can pick up at
//! the next byte. Zstandard ends the frame at every chunk boundary, so
//! each chunk is a complete frame and one-shot decodable.

use flate2::{Compress, Compression, FlushCompress, Status};
use zstd::stream::raw::{Encoder as ZstdEncoder, InBuffer, Operation, OutBuffer};

use crate::{CompressionAlgorithm, Error, Result};

/// What the state machine wants from the codec for this push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushMode {
    /// Keep feeding the current chunk
    Continue,
    /// Terminate the current chunk at an independently decodable boundary
    FlushChunk,
    /// Terminate the chunk and the whole stream
    End,
}

/// Codec-side progress of a single push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushState {
    /// Progress was made and the codec can take more input
    Working,
    /// The output window is exhausted; grow it and push again
    NeedOutput,
    /// The stream is fully terminated (only in [`PushMode::End`])
    StreamEnd,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Push {
    /// Input bytes consumed by this push
    pub consumed: usize,
    /// Output bytes produced by this push
    pub produced: usize,
    pub state: PushState,
}

pub(crate) enum Codec {
    Zlib(Compress),
    Zstd(Box<ZstdEncoder<'static>>),
}

impl Codec {
    /// Create a codec context for `algorithm` at `level` (0 = default).
    pub fn new(algorithm: CompressionAlgorithm, level: u8) -> Result<Self> {
        match algorithm {
            CompressionAlgorithm::Zlib => {
                let compression = match level {
                    0 => Compression::fast(),
                    1..=9 => Compression::new(u32::from(level)),
                    _ => return Err(Error::UnsupportedLevel { algorithm, level }),
                };
                // false = raw deflate, required for chunked decompression
                Ok(Self::Zlib(Compress::new(compression, false)))
            }
            CompressionAlgorithm::Zstd => {
                let zstd_level = if level == 0 { 3 } else { i32::from(level) };
                if !zstd::compression_level_range().contains(&zstd_level) {
                    return Err(Error::UnsupportedLevel { algorithm, level });
                }
                let encoder = ZstdEncoder::new(zstd_level)?;
                Ok(Self::Zstd(Box::new(encoder)))
            }
        }
    }

    /// Advance the stream: consume a prefix of `input`, produce a prefix
    /// of `output`.
    pub fn push(&mut self, input: &[u8], output: &mut [u8], mode: PushMode) -> Result<Push> {
        match self {
            Self::Zlib(compress) => push_zlib(compress, input, output, mode),
            Self::Zstd(encoder) => push_zstd(encoder, input, output, mode),
        }
    }
}

fn push_zlib(
    compress: &mut Compress,
    input: &[u8],
    output: &mut [u8],
    mode: PushMode,
) -> Result<Push> {
    let flush = match mode {
        PushMode::Continue => FlushCompress::None,
        // Full flush resets the dictionary so a fresh inflater can decode
        // the next chunk in isolation.
        PushMode::FlushChunk => FlushCompress::Full,
        PushMode::End => FlushCompress::Finish,
    };

    let before_in = compress.total_in();
    let before_out = compress.total_out();
    let status = compress
        .compress(input, output, flush)
        .map_err(|e| Error::Codec(e.to_string()))?;
    let consumed = (compress.total_in() - before_in) as usize;
    let produced = (compress.total_out() - before_out) as usize;

    let state = match status {
        Status::StreamEnd => PushState::StreamEnd,
        Status::BufError => PushState::NeedOutput,
        Status::Ok => {
            if produced == output.len() || mode == PushMode::End {
                // Either the window is saturated, or finish stopped short
                // of stream end; both mean the codec has bytes left to
                // emit.
                PushState::NeedOutput
            } else {
                PushState::Working
            }
        }
    };

    Ok(Push {
        consumed,
        produced,
        state,
    })
}

fn push_zstd(
    encoder: &mut ZstdEncoder<'static>,
    input: &[u8],
    output: &mut [u8],
    mode: PushMode,
) -> Result<Push> {
    let out_capacity = output.len();
    let mut in_buf = InBuffer::around(input);
    let mut out_buf = OutBuffer::around(output);

    if !in_buf.src.is_empty() {
        encoder
            .run(&mut in_buf, &mut out_buf)
            .map_err(|e| Error::Codec(e.to_string()))?;
    }

    let state = if in_buf.pos < in_buf.src.len() {
        // The codec stopped taking input, which only happens when the
        // output window filled up.
        PushState::NeedOutput
    } else {
        match mode {
            PushMode::Continue => {
                if out_buf.pos() == out_capacity {
                    PushState::NeedOutput
                } else {
                    PushState::Working
                }
            }
            PushMode::FlushChunk | PushMode::End => {
                // End the frame; the context starts the next frame on the
                // following push.
                let remaining = encoder
                    .finish(&mut out_buf, true)
                    .map_err(|e| Error::Codec(e.to_string()))?;
                if remaining > 0 {
                    PushState::NeedOutput
                } else if mode == PushMode::End {
                    PushState::StreamEnd
                } else {
                    PushState::Working
                }
            }
        }
    };

    Ok(Push {
        consumed: in_buf.pos,
        produced: out_buf.pos(),
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Decompress, FlushDecompress};

    const SAMPLE: &[u8] = b"coldpack codec adapter sample data, repeated enough to compress";

    fn sample(repeat: usize) -> Vec<u8> {
        SAMPLE.repeat(repeat)
    }

    #[test]
    fn test_zlib_end_round_trip() {
        let data = sample(32);
        let mut codec = Codec::new(CompressionAlgorithm::Zlib, 0).unwrap();
        let mut out = vec![0u8; data.len() + 64];

        let push = codec.push(&data, &mut out, PushMode::End).unwrap();
        assert_eq!(push.state, PushState::StreamEnd);
        assert_eq!(push.consumed, data.len());

        let mut restored = vec![0u8; data.len()];
        let mut inflater = Decompress::new(false);
        let status = inflater
            .decompress(&out[..push.produced], &mut restored, FlushDecompress::Finish)
            .unwrap();
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(restored, data);
    }

    #[test]
    fn test_zlib_full_flush_makes_chunks_independent() {
        let first = sample(16);
        let second = sample(24);
        let mut codec = Codec::new(CompressionAlgorithm::Zlib, 6).unwrap();
        let mut out = vec![0u8; first.len() + second.len() + 128];

        let flush_push = codec.push(&first, &mut out, PushMode::FlushChunk).unwrap();
        assert_eq!(flush_push.state, PushState::Working);
        assert_eq!(flush_push.consumed, first.len());
        let boundary = flush_push.produced;

        let end_push = codec
            .push(&second, &mut out[boundary..], PushMode::End)
            .unwrap();
        assert_eq!(end_push.state, PushState::StreamEnd);

        // Each piece decodes with a fresh raw inflater.
        let mut restored = vec![0u8; first.len()];
        let mut inflater = Decompress::new(false);
        inflater
            .decompress(&out[..boundary], &mut restored, FlushDecompress::None)
            .unwrap();
        assert_eq!(restored, first);

        let mut restored = vec![0u8; second.len()];
        let mut inflater = Decompress::new(false);
        let status = inflater
            .decompress(
                &out[boundary..boundary + end_push.produced],
                &mut restored,
                FlushDecompress::Finish,
            )
            .unwrap();
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(restored, second);
    }

    #[test]
    fn test_zlib_need_output_on_tiny_window() {
        let data = sample(64);
        let mut codec = Codec::new(CompressionAlgorithm::Zlib, 0).unwrap();
        let mut out = [0u8; 1];

        let push = codec.push(&data, &mut out, PushMode::End).unwrap();
        assert_eq!(push.state, PushState::NeedOutput);
        assert!(push.consumed <= data.len());
    }

    #[test]
    fn test_zstd_chunks_are_complete_frames() {
        let first = sample(16);
        let second = sample(24);
        let mut codec = Codec::new(CompressionAlgorithm::Zstd, 0).unwrap();
        let mut out = vec![0u8; first.len() + second.len() + 256];

        let flush_push = codec.push(&first, &mut out, PushMode::FlushChunk).unwrap();
        assert_eq!(flush_push.state, PushState::Working);
        let boundary = flush_push.produced;

        let end_push = codec
            .push(&second, &mut out[boundary..], PushMode::End)
            .unwrap();
        assert_eq!(end_push.state, PushState::StreamEnd);

        let mut decompressor = zstd::bulk::Decompressor::new().unwrap();

        let mut restored = vec![0u8; first.len()];
        let written = decompressor
            .decompress_to_buffer(&out[..boundary], &mut restored[..])
            .unwrap();
        assert_eq!(written, first.len());
        assert_eq!(restored, first);

        let mut restored = vec![0u8; second.len()];
        let written = decompressor
            .decompress_to_buffer(
                &out[boundary..boundary + end_push.produced],
                &mut restored[..],
            )
            .unwrap();
        assert_eq!(written, second.len());
        assert_eq!(restored, second);
    }

    #[test]
    fn test_zstd_end_resumes_after_need_output() {
        let data = sample(64);
        let mut codec = Codec::new(CompressionAlgorithm::Zstd, 0).unwrap();

        let mut compressed = Vec::new();
        let mut window = [0u8; 7];
        let mut consumed = 0;
        loop {
            let push = codec
                .push(&data[consumed..], &mut window, PushMode::End)
                .unwrap();
            consumed += push.consumed;
            compressed.extend_from_slice(&window[..push.produced]);
            match push.state {
                PushState::StreamEnd => break,
                PushState::NeedOutput | PushState::Working => {}
            }
        }
        assert_eq!(consumed, data.len());

        let mut restored = vec![0u8; data.len()];
        let written = zstd::bulk::Decompressor::new()
            .unwrap()
            .decompress_to_buffer(&compressed[..], &mut restored[..])
            .unwrap();
        assert_eq!(written, data.len());
        assert_eq!(restored, data);
    }

    #[test]
    fn test_level_validation() {
        assert!(Codec::new(CompressionAlgorithm::Zlib, 9).is_ok());
        assert!(matches!(
            Codec::new(CompressionAlgorithm::Zlib, 10),
            Err(Error::UnsupportedLevel { .. })
        ));
        assert!(Codec::new(CompressionAlgorithm::Zstd, 22).is_ok());
        assert!(matches!(
            Codec::new(CompressionAlgorithm::Zstd, 23),
            Err(Error::UnsupportedLevel { .. })
        ));
    }
}
