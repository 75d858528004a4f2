//! The wire codec shared by the tree, pull and push paths: endian-aware
//! primitives, length-prefixed UTF-8 strings and the tag-type byte.

use std::convert::TryFrom;
use std::io::Write;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::input::Input;
use crate::Tag;

/// Maximum UTF-8 byte length of a wire string. The length prefix is stored
/// as an unsigned 16-bit value but validated as signed, so the sign bit is
/// never set on valid data.
pub(crate) const MAX_STRING_BYTES: usize = i16::MAX as usize;

/// Upper bound on a single bulk write, to keep per-call memory predictable
/// and interact well with buffered sinks.
const WRITE_CHUNK: usize = 4 * 1024 * 1024;

/// Wire byte order. NBT is big-endian by default; some variants of the
/// format use little-endian throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

macro_rules! read_prim {
    ($name:ident, $ty:ty, $method:ident) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.input.take_exact(&mut buf)?;
            Ok(match self.endian {
                Endian::Big => BigEndian::$method(&buf),
                Endian::Little => LittleEndian::$method(&buf),
            })
        }
    };
}

pub(crate) struct Decoder<I> {
    input: I,
    endian: Endian,
}

impl<I: Input> Decoder<I> {
    pub fn new(input: I, endian: Endian) -> Self {
        Decoder { input, endian }
    }

    /// Bytes consumed from the input so far.
    pub fn position(&self) -> u64 {
        self.input.position()
    }

    /// Consumes the decoder, returning the underlying input.
    pub fn into_inner(self) -> I {
        self.input
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.input.take_byte()
    }

    read_prim!(read_i16, i16, read_i16);
    read_prim!(read_i32, i32, read_i32);
    read_prim!(read_i64, i64, read_i64);
    read_prim!(read_f32, f32, read_f32);
    read_prim!(read_f64, f64, read_f64);

    pub fn read_tag(&mut self) -> Result<Tag> {
        let byte = self.read_u8()?;
        Tag::try_from(byte).map_err(|_| Error::invalid_tag(byte))
    }

    /// Read a length-prefixed string. The 16-bit length is interpreted as
    /// signed; a negative value is malformed, as is non-UTF-8 payload data.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i16()?;
        if len < 0 {
            return Err(Error::negative_length("string", len as i32));
        }
        let mut buf = vec![0u8; len as usize];
        self.input.take_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| {
            Error::malformed(format!(
                "non-utf8 string: {}",
                String::from_utf8_lossy(e.as_bytes())
            ))
        })
    }

    /// Consume `n` bytes without materializing them. Cursor arithmetic or a
    /// relative seek where the input supports it, a bounded read-through
    /// otherwise.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.input.skip_bytes(n)
    }

    pub fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.input.take_exact(buf)
    }
}

macro_rules! write_prim {
    ($name:ident, $ty:ty, $method:ident) => {
        pub fn $name(&mut self, v: $ty) -> Result<()> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            match self.endian {
                Endian::Big => BigEndian::$method(&mut buf, v),
                Endian::Little => LittleEndian::$method(&mut buf, v),
            }
            self.sink.write_all(&buf)?;
            Ok(())
        }
    };
}

pub(crate) struct Encoder<W> {
    sink: W,
    endian: Endian,
}

impl<W: Write> Encoder<W> {
    pub fn new(sink: W, endian: Endian) -> Self {
        Encoder { sink, endian }
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.sink.write_all(&[v])?;
        Ok(())
    }

    write_prim!(write_u16, u16, write_u16);
    write_prim!(write_i16, i16, write_i16);
    write_prim!(write_i32, i32, write_i32);
    write_prim!(write_i64, i64, write_i64);
    write_prim!(write_f32, f32, write_f32);
    write_prim!(write_f64, f64, write_f64);

    pub fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.write_u8(tag as u8)
    }

    /// Write a length-prefixed string. `&str` is already UTF-8, so no
    /// transcoding buffer is needed; long strings go through the bounded
    /// bulk path.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        if s.len() > MAX_STRING_BYTES {
            return Err(Error::invalid_argument(format!(
                "string of {} bytes exceeds the {}-byte wire limit",
                s.len(),
                MAX_STRING_BYTES
            )));
        }
        self.write_u16(s.len() as u16)?;
        self.write_bytes(s.as_bytes())
    }

    /// Bulk write in chunks bounded by an internal maximum.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(WRITE_CHUNK) {
            self.sink.write_all(chunk)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
