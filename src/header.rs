//! Container header and layout math
//!
//! A container is laid out as `header | codec payload | zero padding |
//! offset table`, all little-endian. The header is a fixed 8-byte prefix
//! and the offset table is an array of `u32` exclusive-end offsets placed
//! at the next 4-byte boundary after the payload. The padding bytes are
//! required to be zero: the enclosing cache hashes the raw container, so
//! they must be deterministic.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::{CompressionAlgorithm, Error, Result};

/// Size of the fixed container prefix in bytes
pub const HEADER_SIZE: usize = 8;

/// Fixed prefix written at offset 0 of every container.
///
/// Layout (little-endian, 8 bytes total):
///
/// ```text
/// +0  u32  compressed_bytes   size of header + codec payload
/// +4  u8   algorithm          0 = ZLIB, 1 = ZSTD
/// +5  u8   level              requested level, 0 = codec default
/// +6  u16  reserved           zero
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedDataHeader {
    /// Total size of the payload region, header included. The padding and
    /// the offset table behind it are not counted.
    pub compressed_bytes: u32,
    /// Codec the payload was produced with
    pub algorithm: CompressionAlgorithm,
    /// Compression level recorded at compression time (0 = default)
    pub level: u8,
}

impl CompressedDataHeader {
    /// Parse the header from the front of a container buffer.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::TruncatedContainer {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = Cursor::new(buf);
        let compressed_bytes = cursor.read_u32::<LittleEndian>()?;
        let algorithm_byte = cursor.read_u8()?;
        let algorithm = CompressionAlgorithm::from_byte(algorithm_byte)
            .ok_or(Error::UnknownAlgorithm(algorithm_byte))?;
        let level = cursor.read_u8()?;
        // Reserved bytes are zeroed on write but not enforced on read.

        if (compressed_bytes as usize) < HEADER_SIZE {
            return Err(Error::TruncatedContainer {
                expected: HEADER_SIZE,
                actual: compressed_bytes as usize,
            });
        }

        Ok(Self {
            compressed_bytes,
            algorithm,
            level,
        })
    }

    /// Write the header into the front of `buf`.
    pub fn write(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::OutputBufferSize {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = Cursor::new(buf);
        cursor.write_u32::<LittleEndian>(self.compressed_bytes)?;
        cursor.write_u8(self.algorithm.as_byte())?;
        cursor.write_u8(self.level)?;
        cursor.write_u16::<LittleEndian>(0)?;
        Ok(())
    }

    /// Byte position of the offset table in this container
    pub fn offset_table_pos(&self) -> usize {
        align_up(self.compressed_bytes as usize)
    }
}

/// Round `n` up to the offset table's 4-byte alignment
pub const fn align_up(n: usize) -> usize {
    (n + 3) & !3
}

/// View over a container's chunk offset table.
///
/// Entry `i` is the exclusive end of chunk `i`'s compressed bytes,
/// measured from the start of the container; chunk `i` starts where chunk
/// `i - 1` ended, and chunk 0 starts right behind the header.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTable<'a> {
    entries: &'a [u8],
}

impl<'a> OffsetTable<'a> {
    /// Locate the offset table inside a container buffer.
    pub fn parse(container: &'a [u8], header: &CompressedDataHeader) -> Result<Self> {
        let pos = header.offset_table_pos();
        // At least one entry must fit behind the aligned payload.
        if container.len() < pos + 4 {
            return Err(Error::TruncatedContainer {
                expected: pos + 4,
                actual: container.len(),
            });
        }
        Ok(Self {
            entries: &container[pos..],
        })
    }

    /// Number of chunk entries
    pub fn len(&self) -> usize {
        self.entries.len() / 4
    }

    /// True when the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive end offset of chunk `chunk`, from container start.
    pub fn end_offset(&self, chunk: usize) -> Result<u32> {
        if chunk >= self.len() {
            return Err(Error::ChunkOutOfRange {
                index: chunk,
                chunks: self.len(),
            });
        }
        let mut cursor = Cursor::new(&self.entries[chunk * 4..]);
        Ok(cursor.read_u32::<LittleEndian>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = CompressedDataHeader {
            compressed_bytes: 0x0102_0304,
            algorithm: CompressionAlgorithm::Zstd,
            level: 19,
        };

        let mut buf = [0xFFu8; HEADER_SIZE];
        header.write(&mut buf).unwrap();
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 1, 19, 0, 0]);

        let parsed = CompressedDataHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        let err = CompressedDataHeader::parse(&[0u8; 7]).unwrap_err();
        assert!(
            matches!(
                err,
                Error::TruncatedContainer {
                    expected: 8,
                    actual: 7
                }
            ),
            "actual error: {err:?}",
        );
    }

    #[test]
    fn test_parse_rejects_unknown_algorithm() {
        let buf = [16, 0, 0, 0, 0xFF, 0, 0, 0];
        let err = CompressedDataHeader::parse(&buf).unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm(0xFF)));
    }

    #[test]
    fn test_parse_rejects_undersized_payload() {
        // compressed_bytes smaller than the header itself
        let buf = [4, 0, 0, 0, 0, 0, 0, 0];
        let err = CompressedDataHeader::parse(&buf).unwrap_err();
        assert!(matches!(err, Error::TruncatedContainer { .. }));
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 4);
        assert_eq!(align_up(4), 4);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(9), 12);
        assert_eq!(align_up(11), 12);
    }

    #[test]
    fn test_offset_table() {
        // header (8) + 3 payload bytes, aligned to 12, then two entries
        let mut container = vec![0u8; 20];
        let header = CompressedDataHeader {
            compressed_bytes: 11,
            algorithm: CompressionAlgorithm::Zlib,
            level: 0,
        };
        header.write(&mut container).unwrap();
        container[12..16].copy_from_slice(&9u32.to_le_bytes());
        container[16..20].copy_from_slice(&11u32.to_le_bytes());

        let table = OffsetTable::parse(&container, &header).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.end_offset(0).unwrap(), 9);
        assert_eq!(table.end_offset(1).unwrap(), 11);

        let err = table.end_offset(2).unwrap_err();
        assert!(
            matches!(
                err,
                Error::ChunkOutOfRange {
                    index: 2,
                    chunks: 2
                }
            ),
            "actual error: {err:?}",
        );
    }

    #[test]
    fn test_offset_table_requires_one_entry() {
        let mut container = vec![0u8; 12];
        let header = CompressedDataHeader {
            compressed_bytes: 11,
            algorithm: CompressionAlgorithm::Zlib,
            level: 0,
        };
        header.write(&mut container).unwrap();

        // Aligned payload end is 12; no room for a table entry.
        let err = OffsetTable::parse(&container, &header).unwrap_err();
        assert!(matches!(err, Error::TruncatedContainer { .. }));
    }
}
