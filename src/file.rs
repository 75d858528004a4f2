//! Loading and saving whole documents, with transparent compression.
//!
//! An NBT file is a single root compound, optionally wrapped in GZip
//! (RFC 1952) or ZLib (RFC 1950) framing. The framing is recognized from
//! the first byte: `0x1F` for GZip, `0x78` for ZLib, `0x0A` (the compound
//! tag byte) for plain data. The ZLib path checks the trailing Adler-32 of
//! the uncompressed payload on read and computes it online on write.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use num_enum::TryFromPrimitive;

use crate::codec::{Decoder, Encoder, Endian};
use crate::config;
use crate::count::CountingWriter;
use crate::error::{Error, Result};
use crate::input::{Input, Slice, Stream};
use crate::tag::NbtTag;
use crate::tree;
use crate::Tag;

/// Compression framing around a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Raw NBT bytes.
    None,
    /// RFC 1952 GZip member.
    GZip,
    /// RFC 1950 ZLib stream with an Adler-32 footer.
    ZLib,
    /// Recognize the framing from the first byte. Reading only; saving
    /// with `AutoDetect` is an error.
    #[default]
    AutoDetect,
}

/// Leading byte of each supported framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum Magic {
    GZip = 0x1f,
    ZLib = 0x78,
    // an uncompressed document begins with the compound tag byte
    Plain = 0x0a,
}

fn detect(first: u8) -> Result<Compression> {
    match Magic::try_from(first) {
        Ok(Magic::GZip) => Ok(Compression::GZip),
        Ok(Magic::ZLib) => Ok(Compression::ZLib),
        Ok(Magic::Plain) => Ok(Compression::None),
        Err(_) => Err(Error::malformed(format!(
            "unrecognized leading byte 0x{:02X}: not gzip, zlib or a compound",
            first
        ))),
    }
}

/// A document: one root compound plus the settings it was loaded with.
///
/// `bytes_read` after a load reports uncompressed NBT bytes consumed,
/// which for plain framing equals the length of the consumed input
/// prefix.
pub struct NbtFile {
    root: NbtTag,
    compression: Compression,
    endian: Endian,
    buffer_size: usize,
    bytes_read: u64,
}

impl Default for NbtFile {
    fn default() -> Self {
        Self::new()
    }
}

impl NbtFile {
    /// An empty document: a root compound with the empty name.
    pub fn new() -> NbtFile {
        NbtFile {
            root: NbtTag::named_compound(""),
            compression: Compression::None,
            endian: Endian::Big,
            buffer_size: config::default_buffer_size(),
            bytes_read: 0,
        }
    }

    /// Wrap an existing detached compound as a document. The root keeps
    /// its name; an unset name becomes the empty root name.
    pub fn with_root(root: NbtTag) -> Result<NbtFile> {
        let mut file = NbtFile::new();
        file.set_root(root)?;
        Ok(file)
    }

    pub fn root(&self) -> &NbtTag {
        &self.root
    }

    pub fn set_root(&mut self, root: NbtTag) -> Result<()> {
        if root.kind() != Tag::Compound {
            return Err(Error::invalid_argument(format!(
                "file root must be a compound, got {:?}",
                root.kind()
            )));
        }
        if root.parent().is_some() {
            return Err(Error::invalid_argument(
                "file root must be detached from any container",
            ));
        }
        if root.name().is_none() {
            root.rename("")?;
        }
        self.root = root;
        Ok(())
    }

    /// Consumes the document, returning the root tag.
    pub fn into_root(self) -> NbtTag {
        self.root
    }

    /// Framing detected by the last load, or chosen at construction.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Byte order used by subsequent saves.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Buffer size snapshotted from the process-wide default at
    /// construction. Zero means unbuffered.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Override the buffer size for this instance only.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.buffer_size = size;
    }

    /// Uncompressed NBT bytes consumed by the last load.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Load with auto-detected framing and big-endian byte order.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<NbtFile> {
        Self::load_from_file_with(path, Compression::AutoDetect, Endian::Big, None)
    }

    pub fn load_from_file_with(
        path: impl AsRef<Path>,
        compression: Compression,
        endian: Endian,
        selector: Option<&dyn Fn(&NbtTag) -> bool>,
    ) -> Result<NbtFile> {
        let file = File::open(path)?;
        Self::load_from_reader_with(file, compression, endian, selector)
    }

    /// Load from an in-memory buffer with auto-detected framing.
    pub fn load_from_bytes(data: &[u8]) -> Result<NbtFile> {
        Self::load_from_bytes_with(data, Compression::AutoDetect, Endian::Big, None)
    }

    pub fn load_from_bytes_with(
        data: &[u8],
        compression: Compression,
        endian: Endian,
        selector: Option<&dyn Fn(&NbtTag) -> bool>,
    ) -> Result<NbtFile> {
        let compression = match compression {
            Compression::AutoDetect => detect(*data.first().ok_or(Error::Truncated)?)?,
            c => c,
        };
        let (root, bytes_read) = match compression {
            // uncompressed slices keep the cheap cursor-jump skip path
            Compression::None => read_tree(Slice::new(data), endian, selector)?,
            Compression::GZip => read_tree(Stream::new(GzDecoder::new(data)), endian, selector)?,
            Compression::ZLib => read_tree(Stream::new(ZlibDecoder::new(data)), endian, selector)?,
            Compression::AutoDetect => unreachable!(),
        };
        Ok(NbtFile {
            root,
            compression,
            endian,
            buffer_size: config::default_buffer_size(),
            bytes_read,
        })
    }

    /// Load from any reader with auto-detected framing.
    pub fn load_from_reader(reader: impl Read) -> Result<NbtFile> {
        Self::load_from_reader_with(reader, Compression::AutoDetect, Endian::Big, None)
    }

    /// Load from any reader. Auto-detection buffers the reader to peek at
    /// the leading byte; the buffer capacity comes from the process-wide
    /// default, with zero meaning the minimal lookahead only.
    pub fn load_from_reader_with(
        reader: impl Read,
        compression: Compression,
        endian: Endian,
        selector: Option<&dyn Fn(&NbtTag) -> bool>,
    ) -> Result<NbtFile> {
        let buffer_size = config::default_buffer_size();
        let mut buffered = BufReader::with_capacity(buffer_size.max(1), reader);
        let compression = match compression {
            Compression::AutoDetect => {
                let peeked = buffered.fill_buf()?;
                detect(*peeked.first().ok_or(Error::Truncated)?)?
            }
            c => c,
        };
        let (root, bytes_read) = match compression {
            Compression::None => read_tree(Stream::new(buffered), endian, selector)?,
            Compression::GZip => {
                read_tree(Stream::new(GzDecoder::new(buffered)), endian, selector)?
            }
            Compression::ZLib => {
                read_tree(Stream::new(ZlibDecoder::new(buffered)), endian, selector)?
            }
            Compression::AutoDetect => unreachable!(),
        };
        Ok(NbtFile {
            root,
            compression,
            endian,
            buffer_size,
            bytes_read,
        })
    }

    /// Save to a file, returning the bytes written (compressed size when
    /// framing applies).
    pub fn save_to_file(&self, path: impl AsRef<Path>, compression: Compression) -> Result<u64> {
        let file = File::create(path)?;
        if self.buffer_size == 0 {
            self.save_to_writer(file, compression)
        } else {
            let mut buffered = BufWriter::with_capacity(self.buffer_size, file);
            let written = self.save_to_writer(&mut buffered, compression)?;
            buffered.flush()?;
            Ok(written)
        }
    }

    /// Serialize into a fresh buffer.
    pub fn save_to_bytes(&self, compression: Compression) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.save_to_writer(&mut out, compression)?;
        Ok(out)
    }

    /// Save to any sink, returning the bytes written to it.
    pub fn save_to_writer(&self, sink: impl Write, compression: Compression) -> Result<u64> {
        let counting = CountingWriter::new(sink);
        match compression {
            Compression::AutoDetect => Err(Error::invalid_argument(
                "auto-detect is not a valid compression for saving",
            )),
            Compression::None => {
                let mut enc = Encoder::new(counting, self.endian);
                tree::write_root(&mut enc, &self.root)?;
                enc.flush()?;
                Ok(enc.into_inner().bytes_written())
            }
            Compression::GZip => {
                let gz = GzEncoder::new(counting, flate2::Compression::default());
                let mut enc = Encoder::new(gz, self.endian);
                tree::write_root(&mut enc, &self.root)?;
                let counting = enc.into_inner().finish()?;
                Ok(counting.bytes_written())
            }
            Compression::ZLib => {
                let zlib = ZlibEncoder::new(counting, flate2::Compression::default());
                let mut enc = Encoder::new(zlib, self.endian);
                tree::write_root(&mut enc, &self.root)?;
                let counting = enc.into_inner().finish()?;
                Ok(counting.bytes_written())
            }
        }
    }
}

fn read_tree<I: Input>(
    input: I,
    endian: Endian,
    selector: Option<&dyn Fn(&NbtTag) -> bool>,
) -> Result<(NbtTag, u64)> {
    let mut dec = Decoder::new(input, endian);
    let root = tree::read_root(&mut dec, selector)?;
    Ok((root, dec.position()))
}
