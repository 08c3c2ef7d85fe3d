// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An append-only, tag-indexed blob store with sub-linear random access by
//! tag.
//!
//! A [`Writer`] appends blobs in monotonically non-decreasing tag order to
//! a pair of files; one or more [`Reader`]s concurrently search by tag and
//! retrieve the original payload. The indexing structure is a
//! skip-list-like arrangement of back pointers embedded directly in the
//! index file, giving `O(log N)` seeks without an in-memory catalogue and
//! without ever rewriting earlier records.
//!
//! ##### NOTE
//!
//! > This crate has no in-place update or delete of individual blobs, no
//! > secondary indexes, and no ordering besides tag. Tags need not be
//! > unique; a point lookup on a duplicated tag returns an unspecified one
//! > of the matches.
//!
//! # Example usage
//!
//! ```
//! use skiplog::{Reader, Writer};
//! use std::io::Write;
//! #
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("store");
//!
//! let mut writer = Writer::open(&path)?;
//! writer.write_next(1)?.write_all(b"hello")?;
//! writer.write_next(2)?.write_all(b"world")?;
//! writer.close()?;
//!
//! let mut reader = Reader::open(&path)?;
//! let blob = reader.at(1)?.expect("tag 1 was written");
//! assert_eq!(blob.payload(), b"hello");
//!
//! for blob in reader.range(1, 3)? {
//!     let blob = blob?;
//!     println!("{}: {} bytes", blob.tag(), blob.payload().len());
//! }
//! #
//! # Ok::<(), skiplog::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

mod blob;
mod coding;
mod count;
mod cursor;
mod error;
mod height;
mod lock_registry;
mod path;
mod record;
mod reader;
mod writer;

pub use {
    blob::{Blob, SeekPolicy},
    error::{Error, Result},
    reader::{Reader, ReaderOptions, RangeIter},
    writer::{BlobSink, Writer, WriterOptions},
};
