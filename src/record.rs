// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! On-disk record shapes (spec §6.1) and their encode/decode helpers.
//!
//! ```text
//! index record, height h = height(seq):
//!   offset 0..h*16-1          back pointers, level 0 first
//!                             each 16 bytes = i64 tag, u64 offset
//!   offset h*16..h*16+7       u64 payloadOffset
//!   offset h*16+8..h*16+11    i32 seq
//!   offset h*16+12..h*16+19   i64 tag
//!
//! content record:
//!   u32 len; len bytes of payload
//! ```
//!
//! The last 12 bytes of an index record are the "header suffix" (`seq`
//! then `tag`); back pointers always reference a target's header suffix
//! position, never its start.

use crate::coding::{read_i32_be, read_i64_be, read_u64_be, write_i32_be, write_i64_be, write_u64_be};
use std::io::{Read, Write};

/// Width in bytes of one back pointer (`i64` tag + `u64` offset).
pub const BACK_POINTER_LEN: u64 = 16;

/// Width in bytes of the header suffix (`i32` seq + `i64` tag).
pub const HEADER_SUFFIX_LEN: u64 = 12;

/// Total on-disk size of an index record with the given height.
#[must_use]
pub fn record_len(height: u32) -> u64 {
    u64::from(height) * BACK_POINTER_LEN + HEADER_SUFFIX_LEN + 8
}

/// A single back pointer: the target record's tag and the byte offset of
/// the target's header suffix in the index file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackPointer {
    /// The tag of the record the pointer targets.
    pub tag: i64,
    /// The index-file offset of the target's header suffix.
    pub offset: u64,
}

impl BackPointer {
    pub(crate) fn encode<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_i64_be(writer, self.tag)?;
        write_u64_be(writer, self.offset)?;
        Ok(())
    }

    pub(crate) fn decode<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let tag = read_i64_be(reader)?;
        let offset = read_u64_be(reader)?;
        Ok(Self { tag, offset })
    }
}

/// An index record as it's written to disk (spec §3 "Index record").
pub struct IndexRecord<'a> {
    /// Back pointers, level 0 first.
    pub back_pointers: &'a [BackPointer],
    /// Byte offset in the content file of this blob's length-prefixed payload.
    pub payload_offset: u64,
    /// 1-origin sequence number.
    pub seq: u32,
    /// The blob's tag.
    pub tag: i64,
}

impl<'a> IndexRecord<'a> {
    /// Encodes the full record (back pointers, then `payloadOffset`, `seq`,
    /// `tag`) into `writer`, in append order.
    pub fn encode<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for back_pointer in self.back_pointers {
            back_pointer.encode(writer)?;
        }
        write_u64_be(writer, self.payload_offset)?;
        write_i32_be(writer, self.seq as i32)?;
        write_i64_be(writer, self.tag)?;
        Ok(())
    }
}

/// The decoded 12-byte header suffix of an index record (spec §3 "header
/// suffix"): `seq` then `tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderSuffix {
    /// 1-origin sequence number.
    pub seq: u32,
    /// The blob's tag.
    pub tag: i64,
}

impl HeaderSuffix {
    pub(crate) fn decode<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let seq = read_i32_be(reader)? as u32;
        let tag = read_i64_be(reader)?;
        Ok(Self { seq, tag })
    }
}

/// Writes a content record: a `u32` length prefix followed by `payload`.
pub fn write_content_record<W: Write>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
    crate::coding::write_u32_be(writer, payload.len() as u32)?;
    writer.write_all(payload)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_len_matches_spec_formula() {
        // height h => h*16 + 20 bytes.
        assert_eq!(record_len(0), 20);
        assert_eq!(record_len(1), 36);
        assert_eq!(record_len(3), 68);
    }

    #[test]
    fn index_record_roundtrip() {
        let back_pointers = [
            BackPointer { tag: 5, offset: 12 },
            BackPointer { tag: 3, offset: 0 },
        ];
        let record = IndexRecord {
            back_pointers: &back_pointers,
            payload_offset: 1024,
            seq: 4,
            tag: 7,
        };

        let mut buf = Vec::new();
        record.encode(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, record_len(2));

        let mut cursor = std::io::Cursor::new(&buf[..]);
        let bp0 = BackPointer::decode(&mut cursor).unwrap();
        let bp1 = BackPointer::decode(&mut cursor).unwrap();
        assert_eq!(bp0, back_pointers[0]);
        assert_eq!(bp1, back_pointers[1]);

        let payload_offset = read_u64_be(&mut cursor).unwrap();
        assert_eq!(payload_offset, 1024);

        let header = HeaderSuffix::decode(&mut cursor).unwrap();
        assert_eq!(header.seq, 4);
        assert_eq!(header.tag, 7);
    }
}
