// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The concurrent reader (spec §4.5): skip-list descent from the index
//! file's tail, exact/floor/ceil search, and range iteration.
//!
//! File-open pattern (read-only handles, tolerate a missing/empty index)
//! is grounded on `vlog/blob_file/reader.rs`'s `Reader::new` taking
//! borrowed file handles rather than owning a whole store.

use crate::{
    blob::{Blob, SeekPolicy},
    cursor::Cursor,
    error::{Error, Result},
    lock_registry,
    path::index_path,
};
use std::{
    fs::{File, OpenOptions},
    path::Path,
    sync::{Arc, RwLock},
};

/// Tunable knobs for a [`Reader`] (`SPEC_FULL.md` §D).
///
/// Currently empty; kept as a forward-compatible entry point the way the
/// teacher keeps a dedicated config struct per concern rather than growing
/// one flat options bag later.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReaderOptions {}

/// A read-only handle onto a store, supporting concurrent point and range
/// lookups by tag (spec §4.5).
pub struct Reader {
    index_file: File,
    content_file: File,
    lock: Arc<RwLock<()>>,
}

impl Reader {
    /// Opens the two files making up the store at `path`, read-only.
    ///
    /// Fails if the content file cannot be opened; a missing or empty
    /// index file is treated as an empty store (spec §4.5).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// As [`Reader::open`], with explicit [`ReaderOptions`].
    pub fn open_with_options<P: AsRef<Path>>(path: P, _options: ReaderOptions) -> Result<Self> {
        let content_path = path.as_ref().to_path_buf();
        let index_path = index_path(&content_path);

        let content_file = OpenOptions::new().read(true).open(&content_path)?;
        let index_file = match OpenOptions::new().read(true).open(&index_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // No writer has ever committed a record; treat as an empty
                // index rather than failing (spec §4.5: "the index may be
                // empty").
                File::create(&index_path)?;
                OpenOptions::new().read(true).open(&index_path)?
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let lock = lock_registry::get_or_create(&content_path);

        Ok(Self {
            index_file,
            content_file,
            lock,
        })
    }

    /// Exact match: the blob whose tag equals `tag`, if any.
    pub fn at(&mut self, tag: i64) -> Result<Option<Blob>> {
        self.resolve(tag, SeekPolicy::Match)
    }

    /// The blob with the largest tag ≤ `tag`, if any.
    pub fn floor(&mut self, tag: i64) -> Result<Option<Blob>> {
        self.resolve(tag, SeekPolicy::Floor)
    }

    /// The blob with the smallest tag ≥ `tag`, if any.
    pub fn ceil(&mut self, tag: i64) -> Result<Option<Blob>> {
        self.resolve(tag, SeekPolicy::Ceil)
    }

    /// All blobs whose tag lies in `[start, end)`, in ascending tag order.
    pub fn range(&mut self, start: i64, end: i64) -> Result<RangeIter<'_>> {
        let cursor = self
            .locate(start, SeekPolicy::Ceil)?
            .filter(|cursor| cursor.tag() < end);

        Ok(RangeIter {
            index_file: &mut self.index_file,
            content_file: &mut self.content_file,
            lock: Arc::clone(&self.lock),
            cursor,
            end,
            pending_error: None,
        })
    }

    /// Number of committed records in the store.
    pub fn len(&mut self) -> Result<u64> {
        #[expect(clippy::unwrap_used, reason = "read lock is never poisoned by a panic while held")]
        let _guard = self.lock.read().unwrap();

        let index_len = self.index_file.metadata()?.len();
        if index_len == 0 {
            return Ok(0);
        }

        let cursor = Cursor::at_tail(&mut self.index_file, index_len)?;
        Ok(u64::from(cursor.seq()))
    }

    /// Whether the store holds no committed records.
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Releases the underlying file handles.
    ///
    /// Equivalent to dropping the `Reader`; offered explicitly to mirror
    /// spec.md's programmatic surface (§6.2).
    pub fn close(self) {}

    fn resolve(&mut self, tag: i64, policy: SeekPolicy) -> Result<Option<Blob>> {
        let Some(cursor) = self.locate(tag, policy)? else {
            return Ok(None);
        };

        #[expect(clippy::unwrap_used, reason = "read lock is never poisoned by a panic while held")]
        let _guard = self.lock.read().unwrap();
        Ok(Some(cursor.blob(&mut self.index_file, &mut self.content_file)?))
    }

    /// The skip-list descent from spec §4.5 "Skip-list descent (core
    /// algorithm)". Locates the cursor a search should resolve its blob
    /// from, without reading the blob itself, so [`Reader::range`] can keep
    /// walking forward from the same position.
    fn locate(&mut self, tag: i64, policy: SeekPolicy) -> Result<Option<Cursor>> {
        #[expect(clippy::unwrap_used, reason = "read lock is never poisoned by a panic while held")]
        let _guard = self.lock.read().unwrap();

        let index_len = self.index_file.metadata()?.len();
        if index_len == 0 {
            return Ok(None);
        }

        let mut cursor = Cursor::at_tail(&mut self.index_file, index_len)?;

        loop {
            let t = cursor.tag();
            log::trace!(
                "skiplog descent: seq={} tag={t} height={} query={tag} policy={policy:?}",
                cursor.seq(),
                cursor.height(),
            );

            if t < tag {
                return match policy {
                    SeekPolicy::Floor => Ok(Some(cursor)),
                    SeekPolicy::Match | SeekPolicy::Ceil => Ok(None),
                };
            }

            if t == tag {
                return Ok(Some(cursor));
            }

            // t > tag: scan back pointers from the highest level down for
            // the highest one whose target tag is still >= tag.
            let back_pointers = cursor.back_pointers(&mut self.index_file)?;
            let jump = back_pointers
                .iter()
                .enumerate()
                .rev()
                .find(|(_, bp)| bp.tag >= tag);

            if let Some((_, bp)) = jump {
                cursor = Cursor::at(&mut self.index_file, bp.offset)?;
                continue;
            }

            // All back pointers (if any) are < tag: the query lies
            // strictly between the lowest back pointer and `cursor`.
            return match policy {
                SeekPolicy::Match => Ok(None),
                SeekPolicy::Ceil => Ok(Some(cursor)),
                SeekPolicy::Floor => match back_pointers.first() {
                    Some(bp0) => Ok(Some(Cursor::at(&mut self.index_file, bp0.offset)?)),
                    None => Ok(None),
                },
            };
        }
    }
}

/// Lazy forward iterator over `[start, end)`, returned by [`Reader::range`].
///
/// Yields `Result<Blob>` rather than materializing a `Vec`, so a long range
/// doesn't have to be read eagerly and an I/O or corruption error partway
/// through surfaces on the item where it happened rather than aborting the
/// whole scan silently (`SPEC_FULL.md` §I).
pub struct RangeIter<'a> {
    index_file: &'a mut File,
    content_file: &'a mut File,
    lock: Arc<RwLock<()>>,
    cursor: Option<Cursor>,
    end: i64,
    pending_error: Option<Error>,
}

impl Iterator for RangeIter<'_> {
    type Item = Result<Blob>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }

        let cursor = self.cursor.take()?;
        if cursor.tag() >= self.end {
            return None;
        }

        #[expect(clippy::unwrap_used, reason = "read lock is never poisoned by a panic while held")]
        let _guard = self.lock.read().unwrap();

        let blob = match cursor.blob(self.index_file, self.content_file) {
            Ok(blob) => blob,
            Err(e) => return Some(Err(e)),
        };

        match cursor.advance(self.index_file) {
            Ok(next) => self.cursor = next,
            Err(e) => self.pending_error = Some(e),
        }

        Some(Ok(blob))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::writer::Writer;
    use std::io::Write;

    fn seeded_store(tags: &[i64]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");

        let mut writer = Writer::open(&path).unwrap();
        for (i, tag) in tags.iter().enumerate() {
            let payload = "x".repeat(i + 1);
            writer.write_next(*tag).unwrap().write_all(payload.as_bytes()).unwrap();
        }
        writer.close().unwrap();

        (dir, path)
    }

    #[test]
    fn empty_store_returns_none_and_empty_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        Writer::open(&path).unwrap().close().unwrap();

        let mut reader = Reader::open(&path).unwrap();
        assert_eq!(reader.at(0).unwrap(), None);
        assert_eq!(reader.floor(i64::MAX).unwrap(), None);
        assert_eq!(reader.ceil(i64::MIN).unwrap(), None);
        assert!(reader.is_empty().unwrap());
        assert_eq!(reader.range(i64::MIN, i64::MAX).unwrap().count(), 0);
    }

    #[test]
    fn sparse_sequence_scenario() {
        let tags: Vec<i64> = (1..=19).step_by(2).collect();
        let (_dir, path) = seeded_store(&tags);

        let mut reader = Reader::open(&path).unwrap();

        let blob = reader.at(5).unwrap().unwrap();
        assert_eq!(blob.tag(), 5);
        assert_eq!(blob.payload(), b"xxx");

        assert_eq!(reader.at(4).unwrap(), None);

        let floor = reader.floor(6).unwrap().unwrap();
        assert_eq!(floor.tag(), 5);
        assert_eq!(floor.payload(), b"xxx");

        let ceil = reader.ceil(4).unwrap().unwrap();
        assert_eq!(ceil.tag(), 5);
        assert_eq!(ceil.payload(), b"xxx");
    }

    #[test]
    fn range_scenario() {
        let tags: Vec<i64> = (1..=19).step_by(2).collect();
        let (_dir, path) = seeded_store(&tags);

        let mut reader = Reader::open(&path).unwrap();

        assert_eq!(reader.range(0, 1).unwrap().count(), 0);

        let got: Vec<_> = reader
            .range(0, 3)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].tag(), 1);
        assert_eq!(got[0].payload(), b"x");

        let got: Vec<_> = reader
            .range(3, 6)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let tags: Vec<i64> = got.iter().map(Blob::tag).collect();
        assert_eq!(tags, vec![3, 5]);

        assert_eq!(reader.range(99, i32::MAX as i64).unwrap().count(), 0);
    }

    #[test]
    fn duplicate_tags() {
        let (_dir, path) = seeded_store(&[42, 42, 42]);

        let mut reader = Reader::open(&path).unwrap();
        assert_eq!(reader.at(42).unwrap().unwrap().tag(), 42);

        let got: Vec<_> = reader
            .range(42, 43)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(got.len(), 3);
        assert!(got.iter().all(|b| b.tag() == 42));
    }

    #[test]
    fn boundary_tags_are_searchable() {
        let (_dir, path) = seeded_store(&[i64::MIN, i64::MAX]);

        let mut reader = Reader::open(&path).unwrap();
        assert_eq!(reader.at(i64::MIN).unwrap().unwrap().tag(), i64::MIN);
        assert_eq!(reader.at(i64::MAX).unwrap().unwrap().tag(), i64::MAX);
    }

    #[test]
    fn exercises_every_skip_level() {
        let tags: Vec<i64> = (1..=64).collect();
        let (_dir, path) = seeded_store(&tags);

        let mut reader = Reader::open(&path).unwrap();
        for power in 0..=6u32 {
            let s = 1i64 << power;
            assert_eq!(reader.at(s).unwrap().unwrap().tag(), s);
        }
    }

    #[test]
    fn truncated_content_file_surfaces_as_corrupt_index() {
        let (_dir, path) = seeded_store(&[1, 2, 3]);

        // Truncate the content file out from under the index so the last
        // committed record's payload no longer fits, without touching the
        // index file itself.
        let content_file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        let short_len = content_file.metadata().unwrap().len() - 1;
        content_file.set_len(short_len).unwrap();
        drop(content_file);

        let mut reader = Reader::open(&path).unwrap();
        let err = reader.at(3).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));

        let err = reader.range(1, 4).unwrap().collect::<Result<Vec<_>>>().unwrap_err();
        assert!(matches!(err, Error::CorruptIndex(_)));
    }
}
