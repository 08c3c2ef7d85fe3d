// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The append-only writer (spec §4.4).
//!
//! Mirrors the teacher's section-writer idiom in
//! `vlog/blob_file/writer.rs` (`sfa::Writer::start(name)` finishes the
//! previous section when a new one starts): here, calling [`Writer::write_next`]
//! again, or [`Writer::close`], commits whatever blob is still pending.

use crate::{
    count::CountingWriter,
    error::{Error, Result},
    height,
    path::index_path,
    record::{BackPointer, HEADER_SUFFIX_LEN, IndexRecord, write_content_record},
    lock_registry,
};
use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

/// Number of skip-list levels tracked in the writer's back-pointer state.
///
/// 64 covers every possible `trailing_zeros(seq)` for a `u32` sequence
/// number with headroom to spare; spec §3 calls for `back[0..31]` sized to
/// the sequence counter's width, so this is deliberately generous rather
/// than tight.
const MAX_LEVELS: usize = 64;

/// Tunable knobs for a [`Writer`] session (`SPEC_FULL.md` §D).
///
/// `spec.md` itself is silent on durability beyond the commit-order
/// guarantee (§9 "Crash semantics: not specified"), so the default leaves
/// fsync off.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriterOptions {
    /// Whether each commit additionally calls `sync_all()` on both files
    /// before releasing the write lock.
    pub fsync: bool,
}

struct PendingBlob {
    tag: i64,
    payload: Vec<u8>,
}

/// Per-level back-pointer state the writer carries between commits (spec §3
/// "Writer state").
struct BackPointerState {
    /// `back[i]`: index-file position of the most recent record with
    /// height ≥ `i + 1`.
    pos: [u64; MAX_LEVELS],
    /// `backTag[i]`: that record's tag.
    tag: [i64; MAX_LEVELS],
}

impl BackPointerState {
    fn new() -> Self {
        Self {
            pos: [0; MAX_LEVELS],
            tag: [0; MAX_LEVELS],
        }
    }

    fn pointers_for(&self, height: u32) -> Vec<BackPointer> {
        (0..height as usize)
            .map(|i| BackPointer {
                tag: self.tag[i],
                offset: self.pos[i],
            })
            .collect()
    }

    fn update(&mut self, update_height: u32, new_pos: u64, tag: i64) {
        for i in 0..update_height as usize {
            self.pos[i] = new_pos;
            self.tag[i] = tag;
        }
    }
}

/// Appends blobs to a store in monotonically non-decreasing tag order
/// (spec §4.4).
pub struct Writer {
    content: CountingWriter<BufWriter<File>>,
    index: BufWriter<File>,
    lock: Arc<RwLock<()>>,
    options: WriterOptions,

    seq: u32,
    last_tag: Option<i64>,
    back: BackPointerState,
    pending: Option<PendingBlob>,

    content_path: PathBuf,
    index_path: PathBuf,
}

impl Writer {
    /// Opens (creating or truncating) the content and index files at `path`
    /// and starts a new append session.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, WriterOptions::default())
    }

    /// As [`Writer::open`], with explicit [`WriterOptions`].
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        let content_path = path.as_ref().to_path_buf();
        let index_path = index_path(&content_path);

        let content_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&content_path)?;

        let index_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&index_path)?;

        let lock = lock_registry::get_or_create(&content_path);

        Ok(Self {
            content: CountingWriter::new(BufWriter::new(content_file), 0),
            index: BufWriter::new(index_file),
            lock,
            options,

            seq: 1,
            last_tag: None,
            back: BackPointerState::new(),
            pending: None,

            content_path,
            index_path,
        })
    }

    /// Number of records committed so far in this session.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from(self.seq) - 1
    }

    /// Whether no record has been committed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begins a new blob with the given `tag`.
    ///
    /// If a previous blob is still pending, it is committed first. Returns
    /// `Err(Error::TagOrderViolation)` if `tag` is smaller than the last tag
    /// written in this session; the previously pending blob (if any) is
    /// still committed in that case, but no new blob is opened and writer
    /// state otherwise remains unchanged.
    pub fn write_next(&mut self, tag: i64) -> Result<BlobSink<'_>> {
        self.commit_pending()?;

        if let Some(last_tag) = self.last_tag {
            if tag < last_tag {
                log::warn!(
                    "tag-order-violation: attempted to write tag {tag}, but last written tag was {last_tag}"
                );
                return Err(Error::TagOrderViolation {
                    last: last_tag,
                    attempted: tag,
                });
            }
        }

        self.pending = Some(PendingBlob {
            tag,
            payload: Vec::new(),
        });

        Ok(BlobSink { writer: self })
    }

    /// Commits the pending blob (if any), then closes both files.
    pub fn close(&mut self) -> Result<()> {
        self.commit_pending()?;
        self.index.flush()?;
        self.content.flush()?;
        if self.options.fsync {
            self.index.get_ref().sync_all()?;
            self.content.inner_mut().get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Closes and removes both files.
    pub fn delete(mut self) -> Result<()> {
        self.index.flush()?;
        self.content.flush()?;

        let content_path = self.content_path.clone();
        let index_path = self.index_path.clone();
        drop(self);

        fs::remove_file(&content_path)?;
        fs::remove_file(&index_path)?;
        Ok(())
    }

    /// Commits whatever blob is currently pending, under the write lock
    /// (spec §4.4 "Commit algorithm").
    fn commit_pending(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        #[expect(clippy::unwrap_used, reason = "write lock is never poisoned by a panic while held")]
        let _guard = self.lock.write().unwrap();

        // Payload goes to the content file *before* the index record, per
        // the §3 invariant ("payload is written first during the commit
        // step and the index record second") rather than the surface order
        // of the numbered steps in spec §4.4: a record only becomes visible
        // to readers once its header suffix lands in the index file, so the
        // payload it points at must already be fully on disk by then.
        let offset = self.content.count();
        write_content_record(&mut self.content, &pending.payload)?;
        self.content.flush()?;
        if self.options.fsync {
            self.content.inner_mut().get_ref().sync_all()?;
        }

        let h = height::height(u64::from(self.seq));
        let back_pointers = self.back.pointers_for(h);

        let record = IndexRecord {
            back_pointers: &back_pointers,
            payload_offset: offset,
            seq: self.seq,
            tag: pending.tag,
        };
        record.encode(&mut self.index)?;
        self.index.flush()?;
        if self.options.fsync {
            self.index.get_ref().sync_all()?;
        }

        let index_len = self.index.get_ref().metadata()?.len();
        let new_pos = index_len - HEADER_SUFFIX_LEN;

        let update_height = height::update_height(u64::from(self.seq));
        self.back.update(update_height, new_pos, pending.tag);

        self.seq += 1;
        self.last_tag = Some(pending.tag);

        Ok(())
    }
}

/// The byte sink returned by [`Writer::write_next`].
///
/// Bytes written here accumulate into the writer's pending buffer; the blob
/// becomes visible to readers only once it is committed, either explicitly
/// via [`BlobSink::finish`] or implicitly by the next `write_next`/`close`
/// call.
pub struct BlobSink<'a> {
    writer: &'a mut Writer,
}

impl BlobSink<'_> {
    /// Commits this blob now, making it visible to readers.
    pub fn finish(self) -> Result<()> {
        let Self { writer } = self;
        writer.commit_pending()
    }
}

impl Write for BlobSink<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        #[expect(clippy::expect_used, reason = "a BlobSink only exists while its blob is pending")]
        let pending = self.writer.pending.as_mut().expect("pending blob must exist while its sink is alive");
        pending.payload.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
