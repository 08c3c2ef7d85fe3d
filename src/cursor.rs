// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The index-file cursor used by [`crate::Reader`]'s skip-list descent
//! (spec §4.5 "Cursor").
//!
//! A cursor is seated on the byte offset of some record's header suffix; it
//! caches that 12-byte suffix so repeated `seq()`/`tag()`/`height()` calls
//! don't re-read the file, and offers the two things the descent loop needs:
//! reading the record's back pointers, and resolving the record's `Blob`.

use crate::{
    error::{Error, Result},
    height,
    record::{BackPointer, HeaderSuffix, BACK_POINTER_LEN, HEADER_SUFFIX_LEN},
    Blob,
};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
};

/// Reads exactly `len` bytes starting at `offset` from `file`.
///
/// Grounded on the teacher's `file::read_exact` (`src/file.rs`): same
/// "seek, read the exact count, error on short read" contract, minus the
/// `unsafe` uninitialized-buffer builder this crate forbids (spec §A:
/// `#![forbid(unsafe_code)]`).
fn read_exact_at(file: &mut File, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// A position in the index file, with its header suffix cached.
pub(crate) struct Cursor {
    /// Byte offset of this record's header suffix.
    pos: u64,
    suffix: HeaderSuffix,
}

impl Cursor {
    /// Seats a cursor at `pos` and reads its header suffix.
    pub(crate) fn at(index_file: &mut File, pos: u64) -> Result<Self> {
        let buf = read_exact_at(index_file, pos, HEADER_SUFFIX_LEN as usize)?;
        let suffix = HeaderSuffix::decode(&mut &buf[..])?;
        Ok(Self { pos, suffix })
    }

    /// Seats a cursor on the last record of a non-empty index file.
    pub(crate) fn at_tail(index_file: &mut File, index_len: u64) -> Result<Self> {
        debug_assert!(index_len >= HEADER_SUFFIX_LEN, "caller must check for an empty index");
        Self::at(index_file, index_len - HEADER_SUFFIX_LEN)
    }

    /// The index-file offset of this record's header suffix.
    pub(crate) fn pos(&self) -> u64 {
        self.pos
    }

    /// This record's 1-origin sequence number.
    pub(crate) fn seq(&self) -> u32 {
        self.suffix.seq
    }

    /// This record's tag.
    pub(crate) fn tag(&self) -> i64 {
        self.suffix.tag
    }

    /// Number of back pointers this record stores.
    pub(crate) fn height(&self) -> u32 {
        height::height(u64::from(self.suffix.seq))
    }

    /// Reads this record's back pointers, level 0 first.
    pub(crate) fn back_pointers(&self, index_file: &mut File) -> Result<Vec<BackPointer>> {
        let h = self.height();
        if h == 0 {
            return Ok(Vec::new());
        }

        let span = u64::from(h) * BACK_POINTER_LEN;
        // Back pointers sit before this record's payloadOffset field (8
        // bytes), which itself sits right before the header suffix at `pos`.
        let start = self.pos.checked_sub(span + 8).ok_or_else(|| {
            let msg = format!(
                "record at {} claims height {h} but there isn't room for its back pointers",
                self.pos
            );
            log::error!("corrupt-index: {msg}");
            Error::CorruptIndex(msg)
        })?;

        let buf = read_exact_at(index_file, start, span as usize)?;
        let mut reader = &buf[..];
        (0..h)
            .map(|_| BackPointer::decode(&mut reader).map_err(Error::from))
            .collect()
    }

    /// Resolves this record's `Blob` by reading `payloadOffset` and then the
    /// content record it points at.
    pub(crate) fn blob(&self, index_file: &mut File, content_file: &mut File) -> Result<Blob> {
        // payloadOffset is always the 8 bytes immediately before the header
        // suffix, regardless of height.
        let offset_pos = self.pos.checked_sub(8).ok_or_else(|| {
            let msg = format!(
                "record at {} has no room for its payloadOffset field",
                self.pos
            );
            log::error!("corrupt-index: {msg}");
            Error::CorruptIndex(msg)
        })?;

        let buf = read_exact_at(index_file, offset_pos, 8)?;
        let payload_offset = crate::coding::read_u64_be(&mut &buf[..])?;

        content_file.seek(SeekFrom::Start(payload_offset))?;
        let len = crate::coding::read_u32_be(content_file)?;

        let content_len = content_file.metadata()?.len();
        if payload_offset.saturating_add(4).saturating_add(u64::from(len)) > content_len {
            let msg = format!(
                "content record at {payload_offset} claims length {len}, \
                 which runs past the content file's length of {content_len}"
            );
            log::error!("corrupt-index: {msg}");
            return Err(Error::CorruptIndex(msg));
        }

        let mut payload = vec![0u8; len as usize];
        content_file.read_exact(&mut payload)?;

        Ok(Blob::new(self.suffix.tag, payload))
    }

    /// Advances the cursor to the next record's header suffix, using the
    /// fixed-size forward skip from spec §4.5 "Range": `HEADER_SUFFIX_LEN +
    /// backPtrs(h'*16) + payloadOffset(8)` bytes beyond this record's header
    /// suffix, where `h'` is the *next* record's height.
    pub(crate) fn advance(self, index_file: &mut File) -> Result<Option<Self>> {
        let next_seq = u64::from(self.suffix.seq) + 1;
        let next_h = height::height(next_seq);
        // From this header suffix: HEADER_SUFFIX_LEN bytes to the next
        // record's start, then next_h back pointers and an 8-byte
        // payloadOffset to reach the next header suffix.
        let next_pos =
            self.pos + HEADER_SUFFIX_LEN + u64::from(next_h) * BACK_POINTER_LEN + 8;

        let index_len = index_file.metadata()?.len();
        if next_pos + HEADER_SUFFIX_LEN > index_len {
            return Ok(None);
        }

        Ok(Some(Self::at(index_file, next_pos)?))
    }
}
