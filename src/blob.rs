// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The blob value type and the seek policy used by [`crate::Reader`]'s
//! search family (spec §4.6, §4.5).

/// An immutable tagged byte sequence, the unit of storage (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// The blob's tag.
    pub tag: i64,

    /// The blob's payload bytes.
    pub payload: Vec<u8>,
}

impl Blob {
    /// Constructs a blob from its tag and payload.
    #[must_use]
    pub fn new(tag: i64, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    /// The blob's tag.
    #[must_use]
    pub fn tag(&self) -> i64 {
        self.tag
    }

    /// The blob's payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// The three search modes of [`crate::Reader`]'s seek family (spec §4.5).
///
/// `at`/`floor`/`ceil` are thin public wrappers over one internal
/// `seek(tag, policy)`, since spec.md frames MATCH/FLOOR/CEIL as one search
/// family with a policy parameter rather than three unrelated algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekPolicy {
    /// Exact match: the tag must equal the query exactly.
    Match,
    /// The blob with the largest tag less than or equal to the query.
    Floor,
    /// The blob with the smallest tag greater than or equal to the query.
    Ceil,
}
