//! The push writer: emits a well-formed NBT byte stream without building
//! tree nodes.
//!
//! Construction establishes an implicit root compound with the given name
//! and writes its header immediately. Every emit call is gated by the
//! frame stack: compound context requires named tags, list context
//! requires unnamed tags of the declared element type and no more of them
//! than declared. [`NbtWriter::finish`] verifies every container was
//! closed; it emits no bytes of its own.
//!
//! The writer enforces structural rules only. In particular it does not
//! track name uniqueness inside compounds, so a caller can emit duplicate
//! names the tree model would reject; keeping names unique is the
//! caller's responsibility.

use std::io::{Read, Write};

use crate::codec::{Encoder, Endian};
use crate::count::CountingWriter;
use crate::error::{Error, Result};
use crate::tag::NbtTag;
use crate::tree;
use crate::Tag;

/// Default chunk size for streaming byte-array payloads from a reader.
const COPY_BUF: usize = 8 * 1024;

struct Frame {
    kind: Tag,
    /// List element type; unused for compound frames.
    elem: Tag,
    /// Declared list size; unused for compound frames.
    size: i32,
    /// List elements written so far.
    written: i32,
}

pub struct NbtWriter<W: Write> {
    enc: Encoder<CountingWriter<W>>,
    frames: Vec<Frame>,
    finished: bool,
}

impl<W: Write> NbtWriter<W> {
    /// Begin a document: writes the root compound header for `root_name`.
    /// The root is closed with [`end_compound`](Self::end_compound) like
    /// any other compound.
    pub fn new(sink: W, root_name: &str) -> Result<Self> {
        Self::with_endian(sink, root_name, Endian::Big)
    }

    pub fn with_endian(sink: W, root_name: &str, endian: Endian) -> Result<Self> {
        let mut enc = Encoder::new(CountingWriter::new(sink), endian);
        enc.write_tag(Tag::Compound)?;
        enc.write_string(root_name)?;
        Ok(NbtWriter {
            enc,
            frames: vec![Frame {
                kind: Tag::Compound,
                elem: Tag::End,
                size: 0,
                written: 0,
            }],
            finished: false,
        })
    }

    /// Bytes emitted to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.enc.get_ref().bytes_written()
    }

    /// Whether [`finish`](Self::finish) has verified and sealed the
    /// document.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consumes the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.enc.into_inner().into_inner()
    }

    pub fn write_byte(&mut self, name: Option<&str>, v: u8) -> Result<()> {
        self.begin_tag(name, Tag::Byte)?;
        self.enc.write_u8(v)
    }

    pub fn write_short(&mut self, name: Option<&str>, v: i16) -> Result<()> {
        self.begin_tag(name, Tag::Short)?;
        self.enc.write_i16(v)
    }

    pub fn write_int(&mut self, name: Option<&str>, v: i32) -> Result<()> {
        self.begin_tag(name, Tag::Int)?;
        self.enc.write_i32(v)
    }

    pub fn write_long(&mut self, name: Option<&str>, v: i64) -> Result<()> {
        self.begin_tag(name, Tag::Long)?;
        self.enc.write_i64(v)
    }

    pub fn write_float(&mut self, name: Option<&str>, v: f32) -> Result<()> {
        self.begin_tag(name, Tag::Float)?;
        self.enc.write_f32(v)
    }

    pub fn write_double(&mut self, name: Option<&str>, v: f64) -> Result<()> {
        self.begin_tag(name, Tag::Double)?;
        self.enc.write_f64(v)
    }

    pub fn write_string(&mut self, name: Option<&str>, v: &str) -> Result<()> {
        self.begin_tag(name, Tag::String)?;
        self.enc.write_string(v)
    }

    pub fn write_byte_array(&mut self, name: Option<&str>, data: &[u8]) -> Result<()> {
        self.begin_tag(name, Tag::ByteArray)?;
        self.enc.write_i32(array_len(data.len())?)?;
        self.enc.write_bytes(data)
    }

    /// Stream a byte-array payload of exactly `count` bytes out of
    /// `source`, using `buf` as the copy buffer (a bounded internal one
    /// if omitted). The source ending early is a truncation error.
    pub fn write_byte_array_from(
        &mut self,
        name: Option<&str>,
        source: &mut dyn Read,
        count: usize,
        buf: Option<&mut [u8]>,
    ) -> Result<()> {
        let mut own = [0u8; COPY_BUF];
        let buf = match buf {
            Some(b) if !b.is_empty() => b,
            Some(_) => {
                return Err(Error::invalid_argument("copy buffer must not be empty"))
            }
            None => &mut own[..],
        };
        self.begin_tag(name, Tag::ByteArray)?;
        self.enc.write_i32(array_len(count)?)?;
        let mut remaining = count;
        while remaining > 0 {
            let want = remaining.min(buf.len());
            source.read_exact(&mut buf[..want])?;
            self.enc.write_bytes(&buf[..want])?;
            remaining -= want;
        }
        Ok(())
    }

    pub fn write_int_array(&mut self, name: Option<&str>, data: &[i32]) -> Result<()> {
        self.begin_tag(name, Tag::IntArray)?;
        self.enc.write_i32(array_len(data.len())?)?;
        for v in data {
            self.enc.write_i32(*v)?;
        }
        Ok(())
    }

    pub fn write_long_array(&mut self, name: Option<&str>, data: &[i64]) -> Result<()> {
        self.begin_tag(name, Tag::LongArray)?;
        self.enc.write_i32(array_len(data.len())?)?;
        for v in data {
            self.enc.write_i64(*v)?;
        }
        Ok(())
    }

    pub fn begin_compound(&mut self, name: Option<&str>) -> Result<()> {
        self.begin_tag(name, Tag::Compound)?;
        self.frames.push(Frame {
            kind: Tag::Compound,
            elem: Tag::End,
            size: 0,
            written: 0,
        });
        Ok(())
    }

    /// Close the innermost compound, emitting its end marker. Closing the
    /// root compound seals the document.
    pub fn end_compound(&mut self) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.kind == Tag::Compound => {}
            Some(_) => return Err(Error::format("end_compound outside a compound")),
            None => return Err(Error::format("root compound is already closed")),
        }
        self.enc.write_tag(Tag::End)?;
        self.frames.pop();
        Ok(())
    }

    /// Open a list of exactly `size` elements of `element` type. Every
    /// element must be written before [`end_list`](Self::end_list).
    pub fn begin_list(&mut self, name: Option<&str>, element: Tag, size: i32) -> Result<()> {
        if size < 0 {
            return Err(Error::invalid_argument(format!(
                "list size must be non-negative, got {}",
                size
            )));
        }
        if element == Tag::End {
            return Err(Error::invalid_argument(
                "a list of end tags cannot be written",
            ));
        }
        self.begin_tag(name, Tag::List)?;
        self.enc.write_tag(element)?;
        self.enc.write_i32(size)?;
        self.frames.push(Frame {
            kind: Tag::List,
            elem: element,
            size,
            written: 0,
        });
        Ok(())
    }

    /// Close the innermost list. Fails unless exactly the declared number
    /// of elements was written; lists have no end marker on the wire.
    pub fn end_list(&mut self) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.kind == Tag::List => {
                if frame.written != frame.size {
                    return Err(Error::format(format!(
                        "not all list elements written: expected {}, written {}",
                        frame.size, frame.written
                    )));
                }
            }
            Some(_) => return Err(Error::format("end_list outside a list")),
            None => return Err(Error::format("root compound is already closed")),
        }
        self.frames.pop();
        Ok(())
    }

    /// Emit a whole tag tree in the current context: named when inside a
    /// compound (the tag must carry a name), unnamed when inside a list.
    pub fn write_tag(&mut self, tag: &NbtTag) -> Result<()> {
        let kind = tag.kind();
        let in_list = matches!(self.frames.last(), Some(f) if f.kind == Tag::List);
        if in_list {
            self.begin_tag(None, kind)?;
        } else {
            let name = tag.name().ok_or_else(|| {
                Error::format("cannot write an unnamed tag into a compound")
            })?;
            self.begin_tag(Some(&name), kind)?;
        }
        tree::write_payload(&mut self.enc, tag)
    }

    /// Verify that every compound and list has been closed. Emits no
    /// bytes; flushes the sink.
    pub fn finish(&mut self) -> Result<()> {
        if !self.frames.is_empty() {
            return Err(Error::format(format!(
                "cannot finish: {} unclosed compounds or lists remain",
                self.frames.len()
            )));
        }
        self.finished = true;
        self.enc.flush()
    }

    /// Gate every emit: validate the call against the innermost frame and
    /// write the tag header where compound context requires one.
    fn begin_tag(&mut self, name: Option<&str>, tag: Tag) -> Result<()> {
        let frame = match self.frames.last_mut() {
            Some(frame) => frame,
            None => return Err(Error::format("root compound is already closed")),
        };
        match frame.kind {
            Tag::List => {
                if name.is_some() {
                    return Err(Error::format("tags inside a list must be unnamed"));
                }
                if tag != frame.elem {
                    return Err(Error::format(format!(
                        "list of {:?} cannot hold a {:?} tag",
                        frame.elem, tag
                    )));
                }
                if frame.written >= frame.size {
                    return Err(Error::format(format!(
                        "list is full: all {} declared elements are written",
                        frame.size
                    )));
                }
                frame.written += 1;
                Ok(())
            }
            _ => {
                let name = name.ok_or_else(|| {
                    Error::format("tags inside a compound must be named")
                })?;
                self.enc.write_tag(tag)?;
                self.enc.write_string(name)
            }
        }
    }
}

fn array_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| Error::invalid_argument(format!("length {} exceeds the wire maximum", len)))
}
