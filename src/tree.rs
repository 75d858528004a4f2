//! Recursive materialization and serialization of tag trees.
//!
//! The reader can be given a selector, a predicate consulted for every
//! named tag before its payload is decoded. The candidate tag is attached
//! to its parent first, carrying its type, name and parent chain, so the
//! selector can prune by location; a rejected tag has its payload skipped
//! without being materialized and is removed from the result. End markers
//! are processed either way, so the surrounding compound stays intact.

use std::io::Write;

use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::input::{try_size, Input};
use crate::tag::NbtTag;
use crate::Tag;

pub(crate) type Selector<'s> = &'s dyn Fn(&NbtTag) -> bool;

/// Read a whole document. The root must be a named Compound.
pub(crate) fn read_root<I: Input>(
    dec: &mut Decoder<I>,
    selector: Option<Selector<'_>>,
) -> Result<NbtTag> {
    let tag = dec.read_tag()?;
    if tag != Tag::Compound {
        return Err(Error::malformed(format!(
            "root tag must be a compound, found {:?}",
            tag
        )));
    }
    let name = dec.read_string()?;
    let root = NbtTag::named_compound(name);
    fill_compound_children(dec, &root, selector)?;
    Ok(root)
}

/// Construct an empty tag of the given wire type. `End` never reaches
/// here: callers handle it as a terminator.
fn shell_of(tag: Tag) -> NbtTag {
    match tag {
        Tag::Byte => NbtTag::byte(0),
        Tag::Short => NbtTag::short(0),
        Tag::Int => NbtTag::int(0),
        Tag::Long => NbtTag::long(0),
        Tag::Float => NbtTag::float(0.0),
        Tag::Double => NbtTag::double(0.0),
        Tag::String => NbtTag::string(""),
        Tag::ByteArray => NbtTag::byte_array(Vec::new()),
        Tag::IntArray => NbtTag::int_array(Vec::new()),
        Tag::LongArray => NbtTag::long_array(Vec::new()),
        Tag::List => NbtTag::list(),
        Tag::Compound => NbtTag::compound(),
        Tag::End => unreachable!("end markers are consumed by the compound loop"),
    }
}

/// Read named children into `parent` until the terminating end marker.
pub(crate) fn fill_compound_children<I: Input>(
    dec: &mut Decoder<I>,
    parent: &NbtTag,
    selector: Option<Selector<'_>>,
) -> Result<()> {
    loop {
        let tag = dec.read_tag()?;
        if tag == Tag::End {
            return Ok(());
        }
        let name = dec.read_string()?;
        if parent.contains_named(&name)? {
            return Err(Error::malformed(format!(
                "duplicate name \"{}\" in compound",
                name
            )));
        }
        let shell = shell_of(tag);
        shell.rename(name)?;
        parent.add(&shell)?;
        if let Some(selector) = selector {
            if !selector(&shell) {
                parent.remove(&shell)?;
                skip_payload(dec, tag)?;
                continue;
            }
        }
        fill_payload(dec, &shell, selector)?;
    }
}

/// Read `count` unnamed elements of `element` type into `list`.
pub(crate) fn fill_list_elements<I: Input>(
    dec: &mut Decoder<I>,
    list: &NbtTag,
    element: Tag,
    count: i32,
    selector: Option<Selector<'_>>,
) -> Result<()> {
    for _ in 0..count {
        let shell = shell_of(element);
        list.add(&shell)?;
        fill_payload(dec, &shell, selector)?;
    }
    Ok(())
}

/// Decode the payload for an already-typed, already-attached tag.
pub(crate) fn fill_payload<I: Input>(
    dec: &mut Decoder<I>,
    tag: &NbtTag,
    selector: Option<Selector<'_>>,
) -> Result<()> {
    match tag.kind() {
        Tag::Byte => tag.set_byte(dec.read_u8()?)?,
        Tag::Short => tag.set_short(dec.read_i16()?)?,
        Tag::Int => tag.set_int(dec.read_i32()?)?,
        Tag::Long => tag.set_long(dec.read_i64()?)?,
        Tag::Float => tag.set_float(dec.read_f32()?)?,
        Tag::Double => tag.set_double(dec.read_f64()?)?,
        Tag::String => tag.set_string(dec.read_string()?)?,
        Tag::ByteArray => {
            let len = read_array_len(dec, "byte array")?;
            let mut buf = vec![0u8; len as usize];
            dec.fill(&mut buf)?;
            tag.set_bytes(buf)?;
        }
        Tag::IntArray => {
            let len = read_array_len(dec, "int array")?;
            let mut buf = Vec::with_capacity(len as usize);
            for _ in 0..len {
                buf.push(dec.read_i32()?);
            }
            tag.set_ints(buf)?;
        }
        Tag::LongArray => {
            let len = read_array_len(dec, "long array")?;
            let mut buf = Vec::with_capacity(len as usize);
            for _ in 0..len {
                buf.push(dec.read_i64()?);
            }
            tag.set_longs(buf)?;
        }
        Tag::Compound => fill_compound_children(dec, tag, selector)?,
        Tag::List => {
            let (element, count) = read_list_header(dec)?;
            tag.set_element_type(Some(element))?;
            fill_list_elements(dec, tag, element, count, selector)?;
        }
        Tag::End => unreachable!(),
    }
    Ok(())
}

pub(crate) fn read_array_len<I: Input>(dec: &mut Decoder<I>, what: &str) -> Result<i32> {
    let len = dec.read_i32()?;
    if len < 0 {
        return Err(Error::negative_length(what, len));
    }
    Ok(len)
}

/// Element type byte plus count. A nonzero count with an `End` element
/// type is rejected; the historical empty `End` list is accepted.
pub(crate) fn read_list_header<I: Input>(dec: &mut Decoder<I>) -> Result<(Tag, i32)> {
    let element = dec.read_tag()?;
    let count = dec.read_i32()?;
    if count < 0 {
        return Err(Error::negative_length("list", count));
    }
    if element == Tag::End && count > 0 {
        return Err(Error::malformed(format!(
            "list of end tags declared {} elements",
            count
        )));
    }
    Ok((element, count))
}

/// Consume the payload of a tag of the given type without materializing
/// it. Scalar and array payloads are skipped by size; containers are
/// walked header by header.
pub(crate) fn skip_payload<I: Input>(dec: &mut Decoder<I>, tag: Tag) -> Result<()> {
    match tag {
        Tag::Byte => dec.skip(1)?,
        Tag::Short => dec.skip(2)?,
        Tag::Int | Tag::Float => dec.skip(4)?,
        Tag::Long | Tag::Double => dec.skip(8)?,
        Tag::String => skip_string(dec)?,
        Tag::ByteArray => {
            let len = read_array_len(dec, "byte array")?;
            dec.skip(try_size(len, 1)?)?;
        }
        Tag::IntArray => {
            let len = read_array_len(dec, "int array")?;
            dec.skip(try_size(len, 4)?)?;
        }
        Tag::LongArray => {
            let len = read_array_len(dec, "long array")?;
            dec.skip(try_size(len, 8)?)?;
        }
        Tag::Compound => loop {
            let child = dec.read_tag()?;
            if child == Tag::End {
                break;
            }
            skip_string(dec)?;
            skip_payload(dec, child)?;
        },
        Tag::List => {
            let (element, count) = read_list_header(dec)?;
            for _ in 0..count {
                skip_payload(dec, element)?;
            }
        }
        Tag::End => unreachable!(),
    }
    Ok(())
}

fn skip_string<I: Input>(dec: &mut Decoder<I>) -> Result<()> {
    let len = dec.read_i16()?;
    if len < 0 {
        return Err(Error::negative_length("string", len as i32));
    }
    dec.skip(len as u64)
}

/// Like [`skip_payload`] but counts the tags inside the payload. List
/// elements count as tags; end markers do not.
pub(crate) fn skip_payload_counting<I: Input>(dec: &mut Decoder<I>, tag: Tag) -> Result<u64> {
    Ok(match tag {
        Tag::Compound => {
            let mut count = 0;
            loop {
                let child = dec.read_tag()?;
                if child == Tag::End {
                    break;
                }
                skip_string(dec)?;
                count += 1 + skip_payload_counting(dec, child)?;
            }
            count
        }
        Tag::List => {
            let (element, len) = read_list_header(dec)?;
            let mut count = 0;
            for _ in 0..len {
                count += 1 + skip_payload_counting(dec, element)?;
            }
            count
        }
        _ => {
            skip_payload(dec, tag)?;
            0
        }
    })
}

/// Write a whole document: the tag must be a Compound; an unset name is
/// written as the empty root name.
pub(crate) fn write_root<W: Write>(enc: &mut Encoder<W>, root: &NbtTag) -> Result<()> {
    if root.kind() != Tag::Compound {
        return Err(Error::invalid_argument(format!(
            "root tag must be a compound, got {:?}",
            root.kind()
        )));
    }
    enc.write_tag(Tag::Compound)?;
    enc.write_string(&root.name().unwrap_or_default())?;
    write_payload(enc, root)
}

/// Write one named tag: header then payload.
pub(crate) fn write_named_tag<W: Write>(
    enc: &mut Encoder<W>,
    name: &str,
    tag: &NbtTag,
) -> Result<()> {
    enc.write_tag(tag.kind())?;
    enc.write_string(name)?;
    write_payload(enc, tag)
}

/// Write a tag's payload. Compounds emit each named child then the end
/// marker; lists emit the element type, the count, then bare payloads. A
/// list whose element type is still undetermined cannot be serialized.
pub(crate) fn write_payload<W: Write>(enc: &mut Encoder<W>, tag: &NbtTag) -> Result<()> {
    match tag.kind() {
        Tag::Byte => enc.write_u8(tag.as_byte()?)?,
        Tag::Short => enc.write_i16(tag.as_short()?)?,
        Tag::Int => enc.write_i32(tag.as_int()?)?,
        Tag::Long => enc.write_i64(tag.as_long()?)?,
        Tag::Float => enc.write_f32(tag.as_float()?)?,
        Tag::Double => enc.write_f64(tag.as_double()?)?,
        Tag::String => enc.write_string(&tag.string_value()?)?,
        Tag::ByteArray => {
            let data = tag.bytes()?;
            enc.write_i32(array_len(data.len())?)?;
            enc.write_bytes(&data)?;
        }
        Tag::IntArray => {
            let data = tag.ints()?;
            enc.write_i32(array_len(data.len())?)?;
            for v in data.iter() {
                enc.write_i32(*v)?;
            }
        }
        Tag::LongArray => {
            let data = tag.longs()?;
            enc.write_i32(array_len(data.len())?)?;
            for v in data.iter() {
                enc.write_i64(*v)?;
            }
        }
        Tag::Compound => {
            for child in tag.tags()? {
                let name = child.name().ok_or_else(|| {
                    Error::format("compound child has no name")
                })?;
                write_named_tag(enc, &name, &child)?;
            }
            enc.write_tag(Tag::End)?;
        }
        Tag::List => {
            let element = tag.element_type()?.ok_or_else(|| {
                Error::format(format!(
                    "list \"{}\" has an undetermined element type",
                    tag.name().unwrap_or_default()
                ))
            })?;
            let items = tag.tags()?;
            enc.write_tag(element)?;
            enc.write_i32(array_len(items.len())?)?;
            for item in &items {
                write_payload(enc, item)?;
            }
        }
        Tag::End => unreachable!(),
    }
    Ok(())
}

fn array_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| Error::invalid_argument(format!("length {} exceeds the wire maximum", len)))
}
