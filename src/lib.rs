//! nbtio reads, writes and streams data in the NBT binary format.
//!
//! The crate serves three styles of use:
//!
//! * An in-memory tag tree for the load → mutate → save workflow, see
//!   [`NbtTag`] and [`NbtFile`].
//! * A pull reader that walks a byte stream one tag at a time without
//!   materializing the tree, see [`NbtReader`].
//! * A push writer that emits a well-formed byte stream without building
//!   intermediate tree nodes, see [`NbtWriter`].
//!
//! All three share one wire codec: big-endian by default (little-endian
//! selectable), length-prefixed UTF-8 strings, length-prefixed arrays and
//! single-byte tag headers.
//!
//! # Quick example
//!
//! Load a compressed file, tweak a value, save it back:
//!
//! ```no_run
//! use nbtio::{NbtFile, NbtTag, Compression};
//!
//! # fn main() -> nbtio::error::Result<()> {
//! let file = NbtFile::load_from_file("level.dat")?;
//! file.root().put("LevelName", &NbtTag::string("world"))?;
//! file.save_to_file("level.dat", Compression::GZip)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Streaming
//!
//! [`NbtReader`] exposes a cursor over the stream. The reader only consumes
//! payload bytes on demand, so large subtrees can be skipped without being
//! allocated:
//!
//! ```no_run
//! use nbtio::NbtReader;
//!
//! # fn main() -> nbtio::error::Result<()> {
//! # let data: Vec<u8> = vec![];
//! let mut reader = NbtReader::from_bytes(&data);
//! while reader.read_to_following()? {
//!     if reader.tag_name().as_deref() == Some("Sections") {
//!         reader.skip()?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

mod codec;
mod config;
mod count;
mod file;
mod input;
mod reader;
mod tag;
mod tree;
mod writer;

pub use codec::Endian;
pub use config::{
    default_buffer_size, default_indent, set_default_buffer_size, set_default_indent,
};
pub use count::CountingWriter;
pub use file::{Compression, NbtFile};
pub use input::{Input, SeekableStream, Slice, Stream};
pub use reader::{FromTagValue, NbtReader, ReaderOptions, TagValue};
pub use tag::NbtTag;
pub use writer::NbtWriter;

#[cfg(test)]
mod test;

use error::Result;

use std::convert::TryFrom;

/// An NBT tag type. This is the wire discriminant only; it carries neither
/// the value nor the name of the data.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Marks the end of a Compound payload. Never a standalone tag.
    End = 0,
    /// Equivalent to u8.
    Byte = 1,
    /// Equivalent to i16.
    Short = 2,
    /// Equivalent to i32.
    Int = 3,
    /// Equivalent to i64.
    Long = 4,
    /// Equivalent to f32.
    Float = 5,
    /// Equivalent to f64.
    Double = 6,
    /// An array of Byte (u8).
    ByteArray = 7,
    /// A length-prefixed UTF-8 string.
    String = 8,
    /// An ordered sequence of unnamed tags sharing one element type.
    List = 9,
    /// A collection of named tags.
    Compound = 10,
    /// An array of Int (i32).
    IntArray = 11,
    /// An array of Long (i64).
    LongArray = 12,
}

// Crates exist to generate this code for us, but would add to our compile
// times. The tag values will very rarely change so writing it out saves a
// significant amount of compile time.
impl TryFrom<u8> for Tag {
    type Error = ();

    fn try_from(value: u8) -> std::result::Result<Self, ()> {
        use Tag::*;
        Ok(match value {
            0 => End,
            1 => Byte,
            2 => Short,
            3 => Int,
            4 => Long,
            5 => Float,
            6 => Double,
            7 => ByteArray,
            8 => String,
            9 => List,
            10 => Compound,
            11 => IntArray,
            12 => LongArray,
            13..=u8::MAX => return Err(()),
        })
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        tag as u8
    }
}

impl Tag {
    /// True for tags that carry a payload readable as a single native value:
    /// every type except `End`, `List` and `Compound`.
    pub fn is_value(self) -> bool {
        !matches!(self, Tag::End | Tag::List | Tag::Compound)
    }

    /// True for the two container types, `List` and `Compound`.
    pub fn is_container(self) -> bool {
        matches!(self, Tag::List | Tag::Compound)
    }
}

/// Read a tag tree from uncompressed NBT bytes. The root must be a Compound.
///
/// This is a convenience over [`NbtFile::load_from_bytes`] for the common
/// big-endian, uncompressed case.
pub fn from_bytes(data: &[u8]) -> Result<NbtTag> {
    let mut dec = codec::Decoder::new(input::Slice::new(data), Endian::Big);
    tree::read_root(&mut dec, None)
}

/// Serialize a tag tree to uncompressed big-endian NBT bytes. The tag must
/// be a Compound; its name is written as the root name (empty if unset).
pub fn to_bytes(tag: &NbtTag) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut enc = codec::Encoder::new(&mut out, Endian::Big);
    tree::write_root(&mut enc, tag)?;
    Ok(out)
}
