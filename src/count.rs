//! Byte accounting for sinks.
//!
//! Read-side accounting lives in [`crate::input::Input::position`]; this
//! module covers the write side. Rust's `Write` has no self-delegating
//! default methods, so a plain counter is exact: every byte passes through
//! `write` exactly once.

use std::io::Write;

/// Wraps a sink and reports how many bytes have been written through it.
pub struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        CountingWriter { inner, written: 0 }
    }

    /// Bytes written through this wrapper so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Gets a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Gets a mutable reference to the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consumes the wrapper, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
