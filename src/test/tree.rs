use super::Builder;
use crate::codec::{Decoder, Encoder, Endian};
use crate::error::{Error, Result};
use crate::input::Slice;
use crate::{from_bytes, to_bytes, tree, NbtTag, Tag};

#[test]
fn smallest_file() -> Result<()> {
    // 0A 00 0B "hello world" 08 00 04 "name" 00 09 "Bananrama" 00
    let payload = Builder::new()
        .start_compound("hello world")
        .string("name", "Bananrama")
        .end_compound()
        .build();

    let root = from_bytes(&payload)?;
    assert_eq!(root.kind(), Tag::Compound);
    assert_eq!(root.name().as_deref(), Some("hello world"));
    assert_eq!(root.len()?, 1);
    assert_eq!(root.get_named("name")?.unwrap(), "Bananrama");

    assert_eq!(to_bytes(&root)?, payload);
    Ok(())
}

#[test]
fn round_trip_every_tag_type() -> Result<()> {
    let root = NbtTag::named_compound("all");
    root.add(&NbtTag::named_byte("byte", 255))?;
    root.add(&NbtTag::named_short("short", -32768))?;
    root.add(&NbtTag::named_int("int", i32::MIN))?;
    root.add(&NbtTag::named_long("long", i64::MAX))?;
    root.add(&NbtTag::named_float("float", 1.25))?;
    root.add(&NbtTag::named_double("double", -2.5))?;
    root.add(&NbtTag::named_string("string", "text"))?;
    root.add(&NbtTag::named_byte_array("bytes", vec![0u8, 127, 255]))?;
    root.add(&NbtTag::named_int_array("ints", vec![-1, 0, 1]))?;
    root.add(&NbtTag::named_long_array("longs", vec![i64::MIN, i64::MAX]))?;

    let list = NbtTag::named_list_of("list", Tag::String);
    list.add(&NbtTag::string("one"))?;
    list.add(&NbtTag::string("two"))?;
    root.add(&list)?;

    let nested = NbtTag::named_compound("nested");
    nested.add(&NbtTag::named_int("inner", 42))?;
    root.add(&nested)?;

    let bytes = to_bytes(&root)?;
    let reread = from_bytes(&bytes)?;
    assert_eq!(reread, root);
    assert_eq!(to_bytes(&reread)?, bytes);
    Ok(())
}

#[test]
fn round_trip_across_endianness() -> Result<()> {
    let root = NbtTag::named_compound("le");
    root.add(&NbtTag::named_int("value", 0x0102_0304))?;
    root.add(&NbtTag::named_string("s", "swap"))?;

    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out, Endian::Little);
    tree::write_root(&mut enc, &root)?;

    // little-endian bytes differ from the big-endian rendition
    assert_ne!(out, to_bytes(&root)?);

    let mut dec = Decoder::new(Slice::new(&out), Endian::Little);
    let reread = tree::read_root(&mut dec, None)?;
    assert_eq!(reread, root);
    Ok(())
}

#[test]
fn empty_containers_round_trip() -> Result<()> {
    let root = NbtTag::named_compound("empties");
    root.add(&NbtTag::named_compound("compound"))?;
    root.add(&NbtTag::named_byte_array("bytes", Vec::new()))?;
    root.add(&NbtTag::named_int_array("ints", Vec::<i32>::new()))?;
    root.add(&NbtTag::named_long_array("longs", Vec::<i64>::new()))?;
    root.add(&NbtTag::named_string("string", ""))?;
    for elem in [Tag::Byte, Tag::String, Tag::Compound, Tag::List] {
        root.add(&NbtTag::named_list_of(format!("list-{:?}", elem), elem))?;
    }

    let reread = from_bytes(&to_bytes(&root)?)?;
    assert_eq!(reread, root);
    assert_eq!(reread.get_named("list-Byte")?.unwrap().element_type()?, Some(Tag::Byte));
    Ok(())
}

#[test]
fn list_of_lists_with_empty_inner() -> Result<()> {
    let root = NbtTag::named_compound("root");
    root.add(&NbtTag::named_list_of("emptyList", Tag::End))?;

    let listy = NbtTag::named_list_of("listyList", Tag::List);
    listy.add(&NbtTag::list_of(Tag::End))?;
    root.add(&listy)?;

    let reread = from_bytes(&to_bytes(&root)?)?;

    let empty = reread.get_named("emptyList")?.unwrap();
    assert_eq!(empty.len()?, 0);
    assert_eq!(empty.element_type()?, Some(Tag::End));

    let listy = reread.get_named("listyList")?.unwrap();
    assert_eq!(listy.len()?, 1);
    assert_eq!(listy.element_type()?, Some(Tag::List));
    let inner = listy.get(0)?;
    assert_eq!(inner.element_type()?, Some(Tag::End));
    assert_eq!(inner.len()?, 0);
    Ok(())
}

#[test]
fn deeply_nested_lists_round_trip() -> Result<()> {
    let root = NbtTag::named_compound("deep");
    let mut current = NbtTag::named_list_of("l", Tag::List);
    root.add(&current)?;
    for _ in 0..32 {
        let next = NbtTag::list_of(Tag::List);
        current.add(&next)?;
        current = next;
    }
    current.set_element_type(Some(Tag::Int))?;
    current.add(&NbtTag::int(7))?;

    let reread = from_bytes(&to_bytes(&root)?)?;
    assert_eq!(reread, root);
    Ok(())
}

fn big_test_payload() -> Vec<u8> {
    Builder::new()
        .start_compound("Level")
        .int("intTest", 2147483647)
        .start_compound("nested compound test")
        .string("name", "Hampus")
        .float("value", 0.75)
        .end_compound()
        .start_list("listTest (long)", Tag::Long, 5)
        .long_payload(11)
        .long_payload(12)
        .long_payload(13)
        .long_payload(14)
        .long_payload(15)
        .string("stringTest", "HELLO WORLD THIS IS A TEST STRING")
        .end_compound()
        .build()
}

#[test]
fn filtered_load_prunes_by_name() -> Result<()> {
    let payload = big_test_payload();
    let selector = |t: &NbtTag| t.name().as_deref() != Some("nested compound test");

    let mut dec = Decoder::new(Slice::new(&payload), Endian::Big);
    let root = tree::read_root(&mut dec, Some(&selector))?;

    assert!(!root.contains_named("nested compound test")?);
    assert!(root.contains_named("intTest")?);
    assert!(root.contains_named("stringTest")?);

    let longs = root.get_named("listTest (long)")?.unwrap();
    assert_eq!(longs.element_type()?, Some(Tag::Long));
    assert_eq!(longs.len()?, 5);
    for (i, expected) in (11..=15).enumerate() {
        assert_eq!(longs.get(i)?.as_long()?, expected);
    }
    Ok(())
}

#[test]
fn selector_false_yields_empty_root() -> Result<()> {
    let payload = big_test_payload();
    let selector = |_: &NbtTag| false;

    let mut dec = Decoder::new(Slice::new(&payload), Endian::Big);
    let root = tree::read_root(&mut dec, Some(&selector))?;
    assert_eq!(root.len()?, 0);
    assert_eq!(root.name().as_deref(), Some("Level"));
    Ok(())
}

#[test]
fn selector_true_equals_unfiltered_load() -> Result<()> {
    let payload = big_test_payload();
    let selector = |_: &NbtTag| true;

    let mut dec = Decoder::new(Slice::new(&payload), Endian::Big);
    let filtered = tree::read_root(&mut dec, Some(&selector))?;
    let unfiltered = from_bytes(&payload)?;
    assert_eq!(filtered, unfiltered);
    Ok(())
}

#[test]
fn selector_sees_location_before_payload() -> Result<()> {
    let payload = big_test_payload();
    // prune by path, which requires the parent chain to be wired up
    let selector = |t: &NbtTag| !t.path().starts_with("Level.nested");

    let mut dec = Decoder::new(Slice::new(&payload), Endian::Big);
    let root = tree::read_root(&mut dec, Some(&selector))?;
    assert!(!root.contains_named("nested compound test")?);
    assert!(root.contains_named("listTest (long)")?);
    Ok(())
}

#[test]
fn root_must_be_a_compound() {
    let payload = Builder::new()
        .tag(Tag::Int)
        .name("x")
        .int_payload(1)
        .build();
    assert!(matches!(from_bytes(&payload), Err(Error::Malformed(_))));
}

#[test]
fn negative_array_length_is_malformed() {
    for tag in [Tag::ByteArray, Tag::IntArray, Tag::LongArray] {
        let payload = Builder::new()
            .start_compound("r")
            .tag(tag)
            .name("bad")
            .int_payload(-1)
            .end_compound()
            .build();
        assert!(matches!(from_bytes(&payload), Err(Error::Malformed(_))));
    }
}

#[test]
fn negative_list_count_is_malformed() {
    let payload = Builder::new()
        .start_compound("r")
        .start_list("bad", Tag::Int, -2)
        .end_compound()
        .build();
    assert!(matches!(from_bytes(&payload), Err(Error::Malformed(_))));
}

#[test]
fn nonempty_end_list_is_malformed() {
    let payload = Builder::new()
        .start_compound("r")
        .start_list("bad", Tag::End, 3)
        .end_compound()
        .build();
    assert!(matches!(from_bytes(&payload), Err(Error::Malformed(_))));
}

#[test]
fn duplicate_names_are_malformed() {
    let payload = Builder::new()
        .start_compound("r")
        .int("twin", 1)
        .int("twin", 2)
        .end_compound()
        .build();
    assert!(matches!(from_bytes(&payload), Err(Error::Malformed(_))));
}

#[test]
fn truncated_document() {
    let payload = Builder::new()
        .start_compound("r")
        .tag(Tag::Long)
        .name("cut")
        .int_payload(1)
        .build();
    assert!(matches!(from_bytes(&payload), Err(Error::Truncated)));
}

#[test]
fn undetermined_list_fails_to_serialize() -> Result<()> {
    let root = NbtTag::named_compound("r");
    root.add(&NbtTag::named_list("unknown"))?;
    assert!(matches!(to_bytes(&root), Err(Error::Format(_))));
    Ok(())
}

#[test]
fn end_typed_empty_list_serializes_verbatim() -> Result<()> {
    let root = NbtTag::named_compound("r");
    root.add(&NbtTag::named_list_of("historic", Tag::End))?;
    let bytes = to_bytes(&root)?;
    let expected = Builder::new()
        .start_compound("r")
        .start_list("historic", Tag::End, 0)
        .end_compound()
        .build();
    assert_eq!(bytes, expected);
    Ok(())
}

#[test]
fn large_byte_array_round_trip() -> Result<()> {
    // larger than the bulk-write chunk
    let data: Vec<u8> = (0..5 * 1024 * 1024u32).map(|i| i as u8).collect();
    let root = NbtTag::named_compound("big");
    root.add(&NbtTag::named_byte_array("blob", data.clone()))?;

    let reread = from_bytes(&to_bytes(&root)?)?;
    assert_eq!(&*reread.get_named("blob")?.unwrap().bytes()?, &data[..]);
    Ok(())
}

/// Deterministic xorshift so the unicode sweep is reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn random_unicode_string(rng: &mut XorShift) -> String {
    let len = (rng.next() % 64) as usize;
    let mut s = String::new();
    while s.chars().count() < len {
        let cp = (rng.next() % 0x11_0000) as u32;
        let c = match char::from_u32(cp) {
            Some(c) => c,
            None => continue, // surrogate range
        };
        // skip controls and the private use areas
        if c.is_control() {
            continue;
        }
        if matches!(cp, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD) {
            continue;
        }
        s.push(c);
    }
    s
}

#[test]
fn unicode_string_list_round_trip() -> Result<()> {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    let strings: Vec<String> = (0..1024).map(|_| random_unicode_string(&mut rng)).collect();

    let root = NbtTag::named_compound("unicode");
    let list = NbtTag::named_list_of("strings", Tag::String);
    for s in &strings {
        list.add(&NbtTag::string(s.clone()))?;
    }
    root.add(&list)?;

    let reread = from_bytes(&to_bytes(&root)?)?;
    let list = reread.get_named("strings")?.unwrap();
    assert_eq!(list.len()?, 1024);
    for (i, s) in strings.iter().enumerate() {
        assert_eq!(&*list.get(i)?.string_value()?, s.as_str());
    }
    Ok(())
}
