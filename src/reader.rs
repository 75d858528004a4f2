//! The pull reader: a cursor-style state machine over an NBT byte stream.
//!
//! The reader walks the stream one tag at a time without materializing a
//! tree. At any moment it is positioned on a tag header; the payload of a
//! value tag is only consumed by [`NbtReader::read_value`], a skip, or the
//! next advance. A stack of frames tracks the open containers, so the
//! reader can report depth, parent information and list indices, and can
//! exit subtrees without decoding them.
//!
//! A format violation latches the reader into an error state: every
//! subsequent non-query operation fails until a new reader is constructed
//! over fresh input.

use std::io::{Read, Seek};

use crate::codec::{Decoder, Endian};
use crate::error::{Error, Result};
use crate::input::{try_size, Input, SeekableStream, Slice, Stream};
use crate::tag::NbtTag;
use crate::tree;
use crate::Tag;

/// Construction-time options for [`NbtReader`].
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Wire byte order.
    pub endian: Endian,
    /// When true (the default), compound end markers are hidden from the
    /// `read_to_*` operations. When false they surface as a `Tag::End`
    /// transition, giving symmetrical begin/end events.
    pub skip_end_tags: bool,
    /// Memoize `read_value` output so repeated reads at the same position
    /// return the cached value instead of failing.
    pub cache_tag_values: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            endian: Endian::Big,
            skip_end_tags: true,
            cache_tag_values: false,
        }
    }
}

/// A decoded payload, returned by [`NbtReader::read_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl TagValue {
    pub fn kind(&self) -> Tag {
        match self {
            TagValue::Byte(_) => Tag::Byte,
            TagValue::Short(_) => Tag::Short,
            TagValue::Int(_) => Tag::Int,
            TagValue::Long(_) => Tag::Long,
            TagValue::Float(_) => Tag::Float,
            TagValue::Double(_) => Tag::Double,
            TagValue::String(_) => Tag::String,
            TagValue::ByteArray(_) => Tag::ByteArray,
            TagValue::IntArray(_) => Tag::IntArray,
            TagValue::LongArray(_) => Tag::LongArray,
        }
    }
}

/// Conversion out of a [`TagValue`] with the same widening rules as the
/// tag model's `as_*` accessors.
pub trait FromTagValue: Sized {
    fn from_tag_value(value: &TagValue) -> Result<Self>;
}

impl FromTagValue for u8 {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(*v),
            v => Err(Error::type_mismatch(v.kind(), "byte")),
        }
    }
}

impl FromTagValue for i16 {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(*v as i16),
            TagValue::Short(v) => Ok(*v),
            v => Err(Error::type_mismatch(v.kind(), "short")),
        }
    }
}

impl FromTagValue for i32 {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(*v as i32),
            TagValue::Short(v) => Ok(*v as i32),
            TagValue::Int(v) => Ok(*v),
            v => Err(Error::type_mismatch(v.kind(), "int")),
        }
    }
}

impl FromTagValue for i64 {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(*v as i64),
            TagValue::Short(v) => Ok(*v as i64),
            TagValue::Int(v) => Ok(*v as i64),
            TagValue::Long(v) => Ok(*v),
            v => Err(Error::type_mismatch(v.kind(), "long")),
        }
    }
}

impl FromTagValue for f32 {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(*v as f32),
            TagValue::Short(v) => Ok(*v as f32),
            TagValue::Int(v) => Ok(*v as f32),
            TagValue::Long(v) => Ok(*v as f32),
            TagValue::Float(v) => Ok(*v),
            TagValue::Double(v) => Ok(*v as f32),
            v => Err(Error::type_mismatch(v.kind(), "float")),
        }
    }
}

impl FromTagValue for f64 {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(*v as f64),
            TagValue::Short(v) => Ok(*v as f64),
            TagValue::Int(v) => Ok(*v as f64),
            TagValue::Long(v) => Ok(*v as f64),
            TagValue::Float(v) => Ok(*v as f64),
            TagValue::Double(v) => Ok(*v),
            v => Err(Error::type_mismatch(v.kind(), "double")),
        }
    }
}

impl FromTagValue for String {
    fn from_tag_value(value: &TagValue) -> Result<Self> {
        match value {
            TagValue::Byte(v) => Ok(v.to_string()),
            TagValue::Short(v) => Ok(v.to_string()),
            TagValue::Int(v) => Ok(v.to_string()),
            TagValue::Long(v) => Ok(v.to_string()),
            TagValue::Float(v) => Ok(v.to_string()),
            TagValue::Double(v) => Ok(v.to_string()),
            TagValue::String(v) => Ok(v.clone()),
            v => Err(Error::type_mismatch(v.kind(), "string")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    AtStreamStart,
    AtTag,
    AtEndMarker,
    AtStreamEnd,
    Errored,
}

/// One open container.
struct Frame {
    kind: Tag,
    name: Option<String>,
    /// List element type; `Tag::End` and unused for compound frames.
    elem: Tag,
    /// Declared list length; 0 for compound frames.
    length: i32,
    /// Next list element index to produce.
    index: i32,
}

/// Everything observable about the tag the reader is positioned on.
struct Current {
    tag_type: Tag,
    list_type: Option<Tag>,
    name: Option<String>,
    length: i32,
    list_index: Option<i32>,
    start_offset: u64,
    consumed: bool,
}

impl Current {
    fn none() -> Current {
        Current {
            tag_type: Tag::End,
            list_type: None,
            name: None,
            length: 0,
            list_index: None,
            start_offset: 0,
            consumed: true,
        }
    }
}

pub struct NbtReader<I> {
    dec: Decoder<I>,
    opts: ReaderOptions,
    state: State,
    frames: Vec<Frame>,
    current: Current,
    tags_read: u64,
    root_name: Option<String>,
    cached: Option<TagValue>,
}

impl<'a> NbtReader<Slice<'a>> {
    /// Reader over an in-memory byte slice. Skips are cursor jumps.
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self::from_bytes_with(data, ReaderOptions::default())
    }

    pub fn from_bytes_with(data: &'a [u8], opts: ReaderOptions) -> Self {
        Self::with_input(Slice::new(data), opts)
    }
}

impl<R: Read> NbtReader<Stream<R>> {
    /// Reader over a non-seekable transport. Skips read through the data
    /// in bounded chunks.
    pub fn from_reader(reader: R) -> Self {
        Self::from_reader_with(reader, ReaderOptions::default())
    }

    pub fn from_reader_with(reader: R, opts: ReaderOptions) -> Self {
        Self::with_input(Stream::new(reader), opts)
    }
}

impl<R: Read + Seek> NbtReader<SeekableStream<R>> {
    /// Reader over a seekable transport. Array payloads are skipped with a
    /// relative seek instead of being read.
    pub fn from_seekable(reader: R) -> Self {
        Self::from_seekable_with(reader, ReaderOptions::default())
    }

    pub fn from_seekable_with(reader: R, opts: ReaderOptions) -> Self {
        Self::with_input(SeekableStream::new(reader), opts)
    }
}

/// Observable state. These never consume input and stay callable in every
/// state, including after an error.
impl<I: Input> NbtReader<I> {
    /// Type of the current tag; `Tag::End` when not positioned on one.
    pub fn tag_type(&self) -> Tag {
        self.current.tag_type
    }

    /// Element type of the current list tag.
    pub fn list_type(&self) -> Option<Tag> {
        self.current.list_type
    }

    pub fn tag_name(&self) -> Option<String> {
        self.current.name.clone()
    }

    /// Element count for list and array tags, 0 otherwise.
    pub fn tag_length(&self) -> i32 {
        self.current.length
    }

    pub fn has_length(&self) -> bool {
        matches!(
            self.current.tag_type,
            Tag::List | Tag::ByteArray | Tag::IntArray | Tag::LongArray
        ) && self.state == State::AtTag
    }

    /// Whether the current tag carries a readable payload.
    pub fn has_value(&self) -> bool {
        self.state == State::AtTag && self.current.tag_type.is_value()
    }

    pub fn has_name(&self) -> bool {
        self.current.name.is_some()
    }

    pub fn is_list(&self) -> bool {
        self.state == State::AtTag && self.current.tag_type == Tag::List
    }

    pub fn is_compound(&self) -> bool {
        self.state == State::AtTag && self.current.tag_type == Tag::Compound
    }

    /// Whether the current tag is an element of a list.
    pub fn is_list_element(&self) -> bool {
        self.current.list_index.is_some()
    }

    /// Index of the current tag within its parent list.
    pub fn list_index(&self) -> Option<i32> {
        self.current.list_index
    }

    pub fn parent_name(&self) -> Option<String> {
        self.frames.last().and_then(|f| f.name.clone())
    }

    pub fn parent_type(&self) -> Option<Tag> {
        self.frames.last().map(|f| f.kind)
    }

    /// Declared length of the parent list, 0 when the parent is a
    /// compound or there is no parent.
    pub fn parent_tag_length(&self) -> i32 {
        self.frames.last().map(|f| f.length).unwrap_or(0)
    }

    /// Nesting depth of the current tag. The root compound is depth 1;
    /// before the first advance and at stream end the depth is 0.
    pub fn depth(&self) -> usize {
        match self.state {
            State::AtStreamStart | State::AtStreamEnd | State::Errored => 0,
            State::AtTag | State::AtEndMarker => self.frames.len() + 1,
        }
    }

    /// Number of tag headers surfaced so far, the root included. End
    /// markers are not tags and are not counted.
    pub fn tags_read(&self) -> u64 {
        self.tags_read
    }

    /// Input bytes consumed before the current tag's header.
    pub fn tag_start_offset(&self) -> u64 {
        self.current.start_offset
    }

    pub fn root_name(&self) -> Option<String> {
        self.root_name.clone()
    }

    pub fn is_in_error_state(&self) -> bool {
        self.state == State::Errored
    }

    pub fn is_at_stream_end(&self) -> bool {
        self.state == State::AtStreamEnd
    }

    /// Total bytes consumed from the input so far. Meaningful on
    /// non-seekable transports where no stream position exists.
    pub fn bytes_read(&self) -> u64 {
        self.dec.position()
    }

    /// Consumes the reader, returning the underlying input.
    pub fn into_inner(self) -> I {
        self.dec.into_inner()
    }
}

impl<I: Input> NbtReader<I> {
    fn with_input(input: I, opts: ReaderOptions) -> Self {
        NbtReader {
            dec: Decoder::new(input, opts.endian),
            opts,
            state: State::AtStreamStart,
            frames: Vec::new(),
            current: Current::none(),
            tags_read: 0,
            root_name: None,
            cached: None,
        }
    }

    /// Advance to the next tag header in document order, descending into
    /// and ascending out of containers as needed. Returns false at stream
    /// end. The payload of a value tag is not consumed by positioning.
    pub fn read_to_following(&mut self) -> Result<bool> {
        let show_ends = !self.opts.skip_end_tags;
        self.advance(show_ends)
    }

    /// Repeat [`read_to_following`](Self::read_to_following) until a tag
    /// of the given name is the current tag, or the stream ends.
    pub fn read_to_following_named(&mut self, name: &str) -> Result<bool> {
        loop {
            if !self.read_to_following()? {
                return Ok(false);
            }
            if self.current.tag_type != Tag::End && self.current.name.as_deref() == Some(name) {
                return Ok(true);
            }
        }
    }

    /// Advance only among descendants of the current container. Stops
    /// with true on the first matching name, or with false when the
    /// container has been exited (the reader is then positioned on the
    /// container's successor).
    pub fn read_to_descendant(&mut self, name: &str) -> Result<bool> {
        match self.state {
            State::Errored => return Err(self.latched()),
            State::AtStreamEnd => return Ok(false),
            State::AtStreamStart => {
                if !self.advance(false)? {
                    return Ok(false);
                }
            }
            _ => {}
        }
        let baseline = self.depth();
        loop {
            if !self.advance(false)? {
                return Ok(false);
            }
            if self.depth() <= baseline {
                return Ok(false);
            }
            if self.current.name.as_deref() == Some(name) {
                return Ok(true);
            }
        }
    }

    /// Skip to the next sibling of the current tag, walking out of any
    /// subtree the current tag contains. Reading past the last sibling
    /// returns false and leaves the reader on the parent's successor, so
    /// callers can continue.
    pub fn read_to_next_sibling(&mut self) -> Result<bool> {
        match self.state {
            State::Errored => return Err(self.latched()),
            State::AtStreamEnd => return Ok(false),
            State::AtStreamStart => {
                if !self.advance(false)? {
                    return Ok(false);
                }
            }
            _ => {}
        }
        let target = self.depth();
        loop {
            if !self.advance(false)? {
                return Ok(false);
            }
            let depth = self.depth();
            if depth == target {
                return Ok(true);
            }
            if depth < target {
                return Ok(false);
            }
        }
    }

    /// As [`read_to_next_sibling`](Self::read_to_next_sibling), repeated
    /// until a sibling of the given name is found.
    pub fn read_to_next_sibling_named(&mut self, name: &str) -> Result<bool> {
        loop {
            if !self.read_to_next_sibling()? {
                return Ok(false);
            }
            if self.current.name.as_deref() == Some(name) {
                return Ok(true);
            }
        }
    }

    /// Consume and return the payload of the current value tag. With
    /// value caching enabled the first read memoizes and later reads
    /// return the cached copy.
    pub fn read_value(&mut self) -> Result<TagValue> {
        self.expect_positioned()?;
        if !self.current.tag_type.is_value() {
            return Err(Error::invalid_state(format!(
                "{:?} tag has no value to read",
                self.current.tag_type
            )));
        }
        if self.current.consumed {
            if let Some(v) = &self.cached {
                return Ok(v.clone());
            }
            return Err(Error::invalid_state(
                "value already consumed; enable value caching for repeated reads",
            ));
        }
        let length = self.current.length;
        let value = self.read_value_of(self.current.tag_type, Some(length))?;
        self.current.consumed = true;
        if self.opts.cache_tag_values {
            self.cached = Some(value.clone());
        }
        Ok(value)
    }

    /// [`read_value`](Self::read_value) with a widening conversion to a
    /// native type.
    pub fn read_value_as<T: FromTagValue>(&mut self) -> Result<T> {
        let value = self.read_value()?;
        T::from_tag_value(&value)
    }

    /// Read every element of the current list into a typed vector,
    /// widening each element. Lists of lists or compounds cannot be read
    /// this way.
    pub fn read_list_as_array<T: FromTagValue>(&mut self) -> Result<Vec<T>> {
        self.expect_positioned()?;
        if self.current.tag_type != Tag::List {
            return Err(Error::invalid_state(format!(
                "{:?} tag is not a list",
                self.current.tag_type
            )));
        }
        if self.current.consumed {
            return Err(Error::invalid_state("list already consumed"));
        }
        let elem = self.current.list_type.unwrap_or(Tag::End);
        if elem.is_container() {
            return Err(Error::invalid_state(format!(
                "cannot read a list of {:?} as an array",
                elem
            )));
        }
        let length = self.current.length;
        let mut out = Vec::with_capacity(length as usize);
        for _ in 0..length {
            let value = self.read_value_of(elem, None)?;
            out.push(T::from_tag_value(&value)?);
        }
        self.current.consumed = true;
        Ok(out)
    }

    /// Materialize the current tag and its whole subtree as an [`NbtTag`],
    /// consuming it. On an end marker (visible only with end skipping
    /// disabled) this is an invalid operation.
    pub fn read_as_tag(&mut self) -> Result<NbtTag> {
        match self.state {
            State::Errored => return Err(self.latched()),
            State::AtStreamEnd => {
                return Err(Error::invalid_state("reader is at stream end"))
            }
            State::AtEndMarker => {
                return Err(Error::invalid_state("cannot read an end marker as a tag"))
            }
            State::AtStreamStart => {
                if !self.advance(false)? {
                    return Err(Error::invalid_state("stream holds no tags"));
                }
            }
            State::AtTag => {}
        }
        if self.current.consumed {
            return Err(Error::invalid_state("tag already consumed"));
        }
        let tag = match self.current.tag_type {
            Tag::Compound => {
                let tag = match self.current.name.clone() {
                    Some(name) => NbtTag::named_compound(name),
                    None => NbtTag::compound(),
                };
                let r = tree::fill_compound_children(&mut self.dec, &tag, None);
                self.latch(r)?;
                tag
            }
            Tag::List => {
                let tag = match self.current.name.clone() {
                    Some(name) => NbtTag::named_list(name),
                    None => NbtTag::list(),
                };
                let elem = self.current.list_type.unwrap_or(Tag::End);
                tag.set_element_type(Some(elem))?;
                let length = self.current.length;
                let r = tree::fill_list_elements(&mut self.dec, &tag, elem, length, None);
                self.latch(r)?;
                tag
            }
            t => {
                let length = self.current.length;
                let value = self.read_value_of(t, Some(length))?;
                let tag = tag_from_value(value);
                if let Some(name) = self.current.name.clone() {
                    tag.rename(name)?;
                }
                tag
            }
        };
        self.current.consumed = true;
        Ok(tag)
    }

    /// Skip the current tag and every descendant, returning the number of
    /// tags skipped, the current one included. End markers are not tags
    /// and skip as 0.
    pub fn skip(&mut self) -> Result<u64> {
        match self.state {
            State::Errored => return Err(self.latched()),
            State::AtStreamEnd | State::AtEndMarker => return Ok(0),
            State::AtStreamStart => {
                if !self.advance(false)? {
                    return Ok(0);
                }
            }
            State::AtTag => {}
        }
        if self.current.consumed {
            return Err(Error::invalid_state("tag already consumed"));
        }
        let count = match self.current.tag_type {
            Tag::Compound => {
                let r = tree::skip_payload_counting(&mut self.dec, Tag::Compound);
                1 + self.latch(r)?
            }
            Tag::List => {
                let elem = self.current.list_type.unwrap_or(Tag::End);
                let length = self.current.length;
                let mut count = 1;
                for _ in 0..length {
                    let r = tree::skip_payload_counting(&mut self.dec, elem);
                    count += 1 + self.latch(r)?;
                }
                count
            }
            Tag::ByteArray => {
                let n = try_size(self.current.length, 1)?;
                let r = self.dec.skip(n);
                self.latch(r)?;
                1
            }
            Tag::IntArray => {
                let n = try_size(self.current.length, 4)?;
                let r = self.dec.skip(n);
                self.latch(r)?;
                1
            }
            Tag::LongArray => {
                let n = try_size(self.current.length, 8)?;
                let r = self.dec.skip(n);
                self.latch(r)?;
                1
            }
            t => {
                let r = tree::skip_payload(&mut self.dec, t);
                self.latch(r)?;
                1
            }
        };
        self.current.consumed = true;
        Ok(count)
    }

    fn expect_positioned(&self) -> Result<()> {
        match self.state {
            State::AtTag => Ok(()),
            State::Errored => Err(self.latched()),
            State::AtStreamStart => Err(Error::invalid_state(
                "reader is before the first tag; call read_to_following first",
            )),
            State::AtStreamEnd => Err(Error::invalid_state("reader is at stream end")),
            State::AtEndMarker => Err(Error::invalid_state("reader is on an end marker")),
        }
    }

    fn latched(&self) -> Error {
        Error::invalid_state("reader is in an error state")
    }

    /// Record format violations; the reader refuses further work once one
    /// has been observed.
    fn latch<T>(&mut self, r: Result<T>) -> Result<T> {
        if let Err(Error::Malformed(_) | Error::Truncated) = &r {
            self.state = State::Errored;
        }
        r
    }

    fn advance(&mut self, show_ends: bool) -> Result<bool> {
        match self.state {
            State::Errored => Err(self.latched()),
            State::AtStreamEnd => Ok(false),
            State::AtStreamStart => {
                let offset = self.dec.position();
                let tag = {
                    let r = self.dec.read_tag();
                    self.latch(r)?
                };
                if tag != Tag::Compound {
                    let err = Error::malformed(format!(
                        "root tag must be a compound, found {:?}",
                        tag
                    ));
                    return self.latch(Err(err));
                }
                let name = {
                    let r = self.dec.read_string();
                    self.latch(r)?
                };
                self.root_name = Some(name.clone());
                self.current = Current {
                    tag_type: Tag::Compound,
                    list_type: None,
                    name: Some(name),
                    length: 0,
                    list_index: None,
                    start_offset: offset,
                    consumed: false,
                };
                self.cached = None;
                self.state = State::AtTag;
                self.tags_read = 1;
                Ok(true)
            }
            State::AtTag => {
                if self.current.tag_type.is_container() && !self.current.consumed {
                    self.frames.push(Frame {
                        kind: self.current.tag_type,
                        name: self.current.name.clone(),
                        elem: self.current.list_type.unwrap_or(Tag::End),
                        length: self.current.length,
                        index: 0,
                    });
                } else if self.current.tag_type.is_value() && !self.current.consumed {
                    self.skip_current_value()?;
                }
                self.produce_next(show_ends)
            }
            State::AtEndMarker => self.produce_next(show_ends),
        }
    }

    /// Discard the unread payload of the current value tag.
    fn skip_current_value(&mut self) -> Result<()> {
        let r = match self.current.tag_type {
            Tag::ByteArray => {
                let n = try_size(self.current.length, 1)?;
                self.dec.skip(n)
            }
            Tag::IntArray => {
                let n = try_size(self.current.length, 4)?;
                self.dec.skip(n)
            }
            Tag::LongArray => {
                let n = try_size(self.current.length, 8)?;
                self.dec.skip(n)
            }
            t => tree::skip_payload(&mut self.dec, t),
        };
        self.latch(r)?;
        self.current.consumed = true;
        Ok(())
    }

    fn produce_next(&mut self, show_ends: bool) -> Result<bool> {
        loop {
            enum Step {
                StreamEnd,
                ListElement(Tag, i32),
                ListDone,
                CompoundChild,
            }
            let step = match self.frames.last_mut() {
                None => Step::StreamEnd,
                Some(top) if top.kind == Tag::List => {
                    if top.index >= top.length {
                        Step::ListDone
                    } else {
                        let index = top.index;
                        top.index += 1;
                        Step::ListElement(top.elem, index)
                    }
                }
                Some(_) => Step::CompoundChild,
            };
            match step {
                Step::StreamEnd => {
                    self.current = Current::none();
                    self.state = State::AtStreamEnd;
                    return Ok(false);
                }
                Step::ListDone => {
                    // lists have no end marker on the wire
                    self.frames.pop();
                    continue;
                }
                Step::ListElement(elem, index) => {
                    let offset = self.dec.position();
                    self.position_on(elem, None, Some(index), offset)?;
                    return Ok(true);
                }
                Step::CompoundChild => {
                    let offset = self.dec.position();
                    let tag = {
                        let r = self.dec.read_tag();
                        self.latch(r)?
                    };
                    if tag == Tag::End {
                        self.frames.pop();
                        if !show_ends {
                            continue;
                        }
                        self.current = Current {
                            tag_type: Tag::End,
                            list_type: None,
                            name: None,
                            length: 0,
                            list_index: None,
                            start_offset: offset,
                            consumed: true,
                        };
                        self.cached = None;
                        self.state = State::AtEndMarker;
                        return Ok(true);
                    }
                    let name = {
                        let r = self.dec.read_string();
                        self.latch(r)?
                    };
                    self.position_on(tag, Some(name), None, offset)?;
                    return Ok(true);
                }
            }
        }
    }

    /// Read the header extras for the tag the reader is arriving on (list
    /// element type and count, array count) and publish it as current.
    fn position_on(
        &mut self,
        tag: Tag,
        name: Option<String>,
        list_index: Option<i32>,
        offset: u64,
    ) -> Result<()> {
        let (list_type, length) = match tag {
            Tag::List => {
                let r = tree::read_list_header(&mut self.dec);
                let (elem, count) = self.latch(r)?;
                (Some(elem), count)
            }
            Tag::ByteArray => {
                let r = tree::read_array_len(&mut self.dec, "byte array");
                (None, self.latch(r)?)
            }
            Tag::IntArray => {
                let r = tree::read_array_len(&mut self.dec, "int array");
                (None, self.latch(r)?)
            }
            Tag::LongArray => {
                let r = tree::read_array_len(&mut self.dec, "long array");
                (None, self.latch(r)?)
            }
            _ => (None, 0),
        };
        self.current = Current {
            tag_type: tag,
            list_type,
            name,
            length,
            list_index,
            start_offset: offset,
            consumed: false,
        };
        self.cached = None;
        self.state = State::AtTag;
        self.tags_read += 1;
        Ok(())
    }

    /// Decode one payload of the given type. For arrays, `pre_len` is the
    /// already-consumed element count of the current tag; `None` means
    /// the count is still on the wire (list elements).
    fn read_value_of(&mut self, tag: Tag, pre_len: Option<i32>) -> Result<TagValue> {
        let value = match tag {
            Tag::Byte => {
                let r = self.dec.read_u8();
                TagValue::Byte(self.latch(r)?)
            }
            Tag::Short => {
                let r = self.dec.read_i16();
                TagValue::Short(self.latch(r)?)
            }
            Tag::Int => {
                let r = self.dec.read_i32();
                TagValue::Int(self.latch(r)?)
            }
            Tag::Long => {
                let r = self.dec.read_i64();
                TagValue::Long(self.latch(r)?)
            }
            Tag::Float => {
                let r = self.dec.read_f32();
                TagValue::Float(self.latch(r)?)
            }
            Tag::Double => {
                let r = self.dec.read_f64();
                TagValue::Double(self.latch(r)?)
            }
            Tag::String => {
                let r = self.dec.read_string();
                TagValue::String(self.latch(r)?)
            }
            Tag::ByteArray => {
                let len = self.array_len(pre_len, "byte array")?;
                let mut buf = vec![0u8; len as usize];
                let r = self.dec.fill(&mut buf);
                self.latch(r)?;
                TagValue::ByteArray(buf)
            }
            Tag::IntArray => {
                let len = self.array_len(pre_len, "int array")?;
                let mut buf = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    let r = self.dec.read_i32();
                    buf.push(self.latch(r)?);
                }
                TagValue::IntArray(buf)
            }
            Tag::LongArray => {
                let len = self.array_len(pre_len, "long array")?;
                let mut buf = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    let r = self.dec.read_i64();
                    buf.push(self.latch(r)?);
                }
                TagValue::LongArray(buf)
            }
            Tag::End | Tag::List | Tag::Compound => {
                return Err(Error::invalid_state(format!(
                    "{:?} tag has no scalar value",
                    tag
                )))
            }
        };
        Ok(value)
    }

    fn array_len(&mut self, pre_len: Option<i32>, what: &str) -> Result<i32> {
        match pre_len {
            Some(len) => Ok(len),
            None => {
                let r = tree::read_array_len(&mut self.dec, what);
                self.latch(r)
            }
        }
    }
}

fn tag_from_value(value: TagValue) -> NbtTag {
    match value {
        TagValue::Byte(v) => NbtTag::byte(v),
        TagValue::Short(v) => NbtTag::short(v),
        TagValue::Int(v) => NbtTag::int(v),
        TagValue::Long(v) => NbtTag::long(v),
        TagValue::Float(v) => NbtTag::float(v),
        TagValue::Double(v) => NbtTag::double(v),
        TagValue::String(v) => NbtTag::string(v),
        TagValue::ByteArray(v) => NbtTag::byte_array(v),
        TagValue::IntArray(v) => NbtTag::int_array(v),
        TagValue::LongArray(v) => NbtTag::long_array(v),
    }
}
