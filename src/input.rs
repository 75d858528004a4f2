//! Byte sources for the decoder, abstracting how payloads are skipped.
//!
//! A slice can skip by moving a cursor, a seekable stream by a relative
//! seek, and a plain `Read` stream only by reading bytes through and
//! discarding them. Each source also accounts the bytes consumed so far,
//! which is what the readers report for non-seekable transports where no
//! stream position is available.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

mod private {
    // Only this crate can implement this trait. Other traits can inherit
    // from Sealed in order to prevent other crates from creating
    // implementations.
    pub trait Sealed {}
}

/// Chunk size for read-through skips on non-seekable streams.
const SKIP_CHUNK: usize = 8 * 1024;

/// A byte source the decoder can pull from.
pub trait Input: private::Sealed {
    /// Consume a single byte.
    fn take_byte(&mut self) -> Result<u8>;

    /// Fill `buf` exactly, or fail with `Truncated`.
    fn take_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Consume and discard `n` bytes without materializing them.
    fn skip_bytes(&mut self, n: u64) -> Result<()>;

    /// Bytes consumed from the source so far.
    fn position(&self) -> u64;
}

/// Input over a borrowed byte slice. Skips are cursor jumps.
pub struct Slice<'a> {
    data: &'a [u8],
    consumed: usize,
}

impl<'a> Slice<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Slice { data, consumed: 0 }
    }
}

impl<'a> private::Sealed for Slice<'a> {}

impl<'a> Input for Slice<'a> {
    fn take_byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.consumed).ok_or(Error::Truncated)?;
        self.consumed += 1;
        Ok(b)
    }

    fn take_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self
            .consumed
            .checked_add(buf.len())
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::Truncated)?;
        buf.copy_from_slice(&self.data[self.consumed..end]);
        self.consumed = end;
        Ok(())
    }

    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        let n = usize::try_from(n).map_err(|_| Error::Truncated)?;
        let end = self
            .consumed
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::Truncated)?;
        self.consumed = end;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.consumed as u64
    }
}

/// Input over any `Read`. Skips read through the data in bounded chunks.
pub struct Stream<R> {
    reader: R,
    consumed: u64,
}

impl<R: Read> Stream<R> {
    pub fn new(reader: R) -> Self {
        Stream {
            reader,
            consumed: 0,
        }
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Gets a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes this input, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> private::Sealed for Stream<R> {}

impl<R: Read> Input for Stream<R> {
    fn take_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.take_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn take_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        self.consumed += buf.len() as u64;
        Ok(())
    }

    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        let mut remaining = n;
        let mut buf = [0u8; SKIP_CHUNK];
        while remaining > 0 {
            let want = remaining.min(SKIP_CHUNK as u64) as usize;
            self.reader.read_exact(&mut buf[..want])?;
            self.consumed += want as u64;
            remaining -= want as u64;
        }
        Ok(())
    }

    fn position(&self) -> u64 {
        self.consumed
    }
}

/// Input over a seekable stream. Skips advance the cursor with a relative
/// seek instead of reading the bytes.
pub struct SeekableStream<R> {
    reader: R,
    consumed: u64,
}

impl<R: Read + Seek> SeekableStream<R> {
    pub fn new(reader: R) -> Self {
        SeekableStream {
            reader,
            consumed: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> private::Sealed for SeekableStream<R> {}

impl<R: Read + Seek> Input for SeekableStream<R> {
    fn take_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.take_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn take_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        self.consumed += buf.len() as u64;
        Ok(())
    }

    fn skip_bytes(&mut self, n: u64) -> Result<()> {
        let offset = i64::try_from(n)
            .map_err(|_| Error::invalid_argument(format!("skip of {} bytes is out of range", n)))?;
        self.reader.seek(SeekFrom::Current(offset))?;
        self.consumed += n;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.consumed
    }
}

/// Element count to byte count, guarding against overflow.
pub(crate) fn try_size(count: i32, width: usize) -> Result<u64> {
    let count = u64::try_from(count).map_err(|_| Error::negative_length("array", count))?;
    count
        .checked_mul(width as u64)
        .ok_or_else(|| Error::malformed(format!("array of {} elements is too large", count)))
}
