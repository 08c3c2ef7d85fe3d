// Copyright (c) 2024-present, skiplog contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Big-endian fixed-width integer pack/unpack, the only numeric codec this
//! store needs (spec §4.1).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Writes a big-endian `i64`.
pub fn write_i64_be<W: Write>(writer: &mut W, value: i64) -> std::io::Result<()> {
    writer.write_i64::<BigEndian>(value)
}

/// Reads a big-endian `i64`.
pub fn read_i64_be<R: Read>(reader: &mut R) -> std::io::Result<i64> {
    reader.read_i64::<BigEndian>()
}

/// Writes a big-endian `i32`.
pub fn write_i32_be<W: Write>(writer: &mut W, value: i32) -> std::io::Result<()> {
    writer.write_i32::<BigEndian>(value)
}

/// Reads a big-endian `i32`.
pub fn read_i32_be<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    reader.read_i32::<BigEndian>()
}

/// Writes a big-endian `u32`, used for the content record's length prefix.
pub fn write_u32_be<W: Write>(writer: &mut W, value: u32) -> std::io::Result<()> {
    writer.write_u32::<BigEndian>(value)
}

/// Reads a big-endian `u32`.
pub fn read_u32_be<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    reader.read_u32::<BigEndian>()
}

/// Writes a big-endian `u64`, used for index-file byte offsets.
pub fn write_u64_be<W: Write>(writer: &mut W, value: u64) -> std::io::Result<()> {
    writer.write_u64::<BigEndian>(value)
}

/// Reads a big-endian `u64`.
pub fn read_u64_be<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    reader.read_u64::<BigEndian>()
}
