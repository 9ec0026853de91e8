// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Random-access byte stream with independent read and write cursors.
//!
//! The stream owns (or borrows) a byte buffer and decodes fixed-width
//! primitives according to a [`ByteOrder`] strategy. Reading is available on
//! any `AsRef<[u8]>` backing store (a memory map, a slice, a vector); writing
//! needs a growable `Vec<u8>`.
//!
//! # Example
//!
//! ```
//! use c3dcodec::encoding::{ByteOrder, ByteStream};
//!
//! let mut out = ByteStream::writer(ByteOrder::IeeeBigEndian);
//! out.write_i16(-2);
//! out.write_f32(1.5);
//!
//! let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeBigEndian);
//! assert_eq!(input.read_i16()?, -2);
//! assert_eq!(input.read_f32()?, 1.5);
//! # Ok::<(), c3dcodec::encoding::StreamError>(())
//! ```

use std::io::ErrorKind;

use super::byte_order::ByteOrder;

/// Failure states of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Not enough bytes left for the requested primitive.
    #[error("end of resource: requested {requested} bytes at position {position}, {available} available")]
    EndOfResource {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Cursor position when the error occurred
        position: u64,
    },

    /// Operation on the resource failed.
    #[error("read failure: {0}")]
    ReadFailure(String),

    /// The resource is no longer in a consistent state.
    #[error("loss of integrity: {0}")]
    IntegrityFailure(String),
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::UnexpectedEof => StreamError::EndOfResource {
                requested: 0,
                available: 0,
                position: 0,
            },
            ErrorKind::InvalidData => {
                StreamError::IntegrityFailure("Loss of integrity of the filestream".to_string())
            }
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                StreamError::ReadFailure("Invalid file path".to_string())
            }
            _ => StreamError::ReadFailure(
                "Internal logic operation error on the stream".to_string(),
            ),
        }
    }
}

/// Reference point of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Start of the resource
    Begin,
    /// Current cursor position
    Current,
    /// End of the resource
    End,
}

type StreamResult<T> = std::result::Result<T, StreamError>;

/// Byte-order aware stream over a byte buffer.
#[derive(Debug, Clone)]
pub struct ByteStream<B = Vec<u8>> {
    data: B,
    order: ByteOrder,
    read_pos: usize,
    write_pos: usize,
}

impl<B: AsRef<[u8]>> ByteStream<B> {
    /// Create a stream over `data` with both cursors at the start.
    pub fn new(data: B, order: ByteOrder) -> Self {
        Self {
            data,
            order,
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Current byte-order strategy.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Switch the byte-order strategy; cursors are unaffected.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Total size of the resource in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    /// Whether the resource holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the read cursor.
    #[inline]
    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// Bytes left after the read cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.read_pos)
    }

    /// Move the read cursor and return its new position.
    pub fn seek_read(&mut self, offset: i64, origin: SeekOrigin) -> StreamResult<usize> {
        self.read_pos = resolve_seek(self.read_pos, self.len(), offset, origin)
            .ok_or_else(|| StreamError::ReadFailure("seek before start of resource".to_string()))?;
        Ok(self.read_pos)
    }

    /// Borrow the next `n` bytes and advance the read cursor.
    pub fn read_bytes(&mut self, n: usize) -> StreamResult<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(StreamError::EndOfResource {
                requested: n,
                available,
                position: self.read_pos as u64,
            });
        }
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.data.as_ref()[start..start + n])
    }

    /// Advance the read cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> StreamResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> StreamResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> StreamResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> StreamResult<u16> {
        let order = self.order;
        Ok(order.decode_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> StreamResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> StreamResult<u32> {
        let order = self.order;
        Ok(order.decode_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> StreamResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> StreamResult<u64> {
        let order = self.order;
        Ok(order.decode_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> StreamResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> StreamResult<f32> {
        let order = self.order;
        Ok(order.decode_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> StreamResult<f64> {
        let order = self.order;
        Ok(order.decode_f64(self.read_bytes(8)?))
    }

    /// Read a fixed-length string of `n` bytes.
    ///
    /// Bytes are mapped one-to-one onto Latin-1 characters so that any
    /// content written back produces the same bytes.
    pub fn read_string(&mut self, n: usize) -> StreamResult<String> {
        Ok(self.read_bytes(n)?.iter().map(|&b| char::from(b)).collect())
    }

    pub fn read_i8s(&mut self, n: usize) -> StreamResult<Vec<i8>> {
        Ok(self.read_bytes(n)?.iter().map(|&b| b as i8).collect())
    }

    pub fn read_i16s(&mut self, n: usize) -> StreamResult<Vec<i16>> {
        (0..n).map(|_| self.read_i16()).collect()
    }

    pub fn read_f32s(&mut self, n: usize) -> StreamResult<Vec<f32>> {
        (0..n).map(|_| self.read_f32()).collect()
    }

    /// Borrow the whole backing buffer.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl ByteStream<Vec<u8>> {
    /// Create an empty, growable stream for writing.
    pub fn writer(order: ByteOrder) -> Self {
        Self::new(Vec::new(), order)
    }

    /// Position of the write cursor.
    #[inline]
    pub fn write_position(&self) -> usize {
        self.write_pos
    }

    /// Move the write cursor and return its new position.
    ///
    /// Seeking past the end is allowed; the gap is zero-filled on the next
    /// write.
    pub fn seek_write(&mut self, offset: i64, origin: SeekOrigin) -> StreamResult<usize> {
        self.write_pos = resolve_seek(self.write_pos, self.len(), offset, origin).ok_or_else(
            || StreamError::IntegrityFailure("seek before start of resource".to_string()),
        )?;
        Ok(self.write_pos)
    }

    /// Write raw bytes at the write cursor, growing the buffer as needed.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.write_pos + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.write_pos..end].copy_from_slice(bytes);
        self.write_pos = end;
    }

    /// Write `count` copies of `byte`.
    pub fn fill(&mut self, byte: u8, count: usize) {
        self.write_bytes(&vec![byte; count]);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        let mut buf = [0u8; 2];
        self.order.encode_u16(&mut buf, v);
        self.write_bytes(&buf);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_u16(v as u16);
    }

    pub fn write_u32(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        self.order.encode_u32(&mut buf, v);
        self.write_bytes(&buf);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    pub fn write_u64(&mut self, v: u64) {
        let mut buf = [0u8; 8];
        self.order.encode_u64(&mut buf, v);
        self.write_bytes(&buf);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_u64(v as u64);
    }

    pub fn write_f32(&mut self, v: f32) {
        let mut buf = [0u8; 4];
        self.order.encode_f32(&mut buf, v);
        self.write_bytes(&buf);
    }

    pub fn write_f64(&mut self, v: f64) {
        let mut buf = [0u8; 8];
        self.order.encode_f64(&mut buf, v);
        self.write_bytes(&buf);
    }

    /// Write `s` into exactly `width` bytes, space padded or truncated.
    ///
    /// Characters outside Latin-1 are written as `?`.
    pub fn write_string(&mut self, s: &str, width: usize) {
        let mut bytes: Vec<u8> = s
            .chars()
            .take(width)
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        bytes.resize(width, b' ');
        self.write_bytes(&bytes);
    }

    /// Consume the stream and return the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

fn resolve_seek(current: usize, len: usize, offset: i64, origin: SeekOrigin) -> Option<usize> {
    let base = match origin {
        SeekOrigin::Begin => 0i64,
        SeekOrigin::Current => current as i64,
        SeekOrigin::End => len as i64,
    };
    let target = base.checked_add(offset)?;
    usize::try_from(target).ok()
}
