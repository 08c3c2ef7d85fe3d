// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Represents errors that can occur in a store.
#[derive(Debug)]
pub enum Error {
    /// I/O error.
    Io(std::io::Error),

    /// `writeNext` was called with a tag smaller than the last tag
    /// successfully written in this writer session.
    TagOrderViolation {
        /// The last tag written in this session.
        last: i64,
        /// The tag that was rejected.
        attempted: i64,
    },

    /// An offset or length read from the index file is outside the file,
    /// or implies a negative size.
    CorruptIndex(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TagOrderViolation { last, attempted } => write!(
                f,
                "tag-order-violation: attempted to write tag {attempted}, \
                 but last written tag was {last}"
            ),
            Self::CorruptIndex(msg) => write!(f, "corrupt-index: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::TagOrderViolation { .. } | Self::CorruptIndex(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Store result.
pub type Result<T> = std::result::Result<T, Error>;
