use std::io::Cursor;

use super::Builder;
use crate::error::{Error, Result};
use crate::{from_bytes, NbtReader, ReaderOptions, Tag, TagValue};

/// The standard reader test tree.
///
/// Document order: root(1) first(2) second(3) third-comp(4) inner-int(5)
/// inner-str(6) some-long(7) fourth-list(8) [list(9) compound(10)
/// list(11) list(12)] fifth(13) hugeArray(14).
fn reader_payload() -> Vec<u8> {
    Builder::new()
        .start_compound("root")
        .byte("first", 1)
        .short("second", 2)
        .start_compound("third-comp")
        .int("inner-int", 3)
        .string("inner-str", "three")
        .end_compound()
        .long("some-long", 4)
        .start_list("fourth-list", Tag::List, 3)
        .start_anon_list(Tag::Compound, 1)
        .start_anon_compound()
        .end_anon_compound()
        .start_anon_list(Tag::Compound, 0)
        .start_anon_list(Tag::Compound, 0)
        .string("fifth", "five")
        .byte_array("hugeArray", &[7u8; 1024])
        .end_compound()
        .build()
}

#[test]
fn positions_on_root_first() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    assert_eq!(reader.depth(), 0);
    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_type(), Tag::Compound);
    assert_eq!(reader.tag_name().as_deref(), Some("root"));
    assert_eq!(reader.root_name().as_deref(), Some("root"));
    assert_eq!(reader.depth(), 1);
    assert_eq!(reader.tags_read(), 1);
    assert_eq!(reader.tag_start_offset(), 0);
    assert!(reader.is_compound());
    assert!(!reader.has_value());
    Ok(())
}

#[test]
fn fourth_list_observables() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    assert!(reader.read_to_following_named("fourth-list")?);
    assert_eq!(reader.depth(), 2);
    assert_eq!(reader.tag_type(), Tag::List);
    assert_eq!(reader.list_type(), Some(Tag::List));
    assert_eq!(reader.tag_length(), 3);
    assert_eq!(reader.parent_name().as_deref(), Some("root"));
    assert_eq!(reader.parent_type(), Some(Tag::Compound));
    assert_eq!(reader.tags_read(), 8);
    assert!(reader.has_length());
    assert!(!reader.is_list_element());

    assert!(reader.read_to_following()?);
    assert_eq!(reader.depth(), 3);
    assert_eq!(reader.tag_type(), Tag::List);
    assert_eq!(reader.list_type(), Some(Tag::Compound));
    assert!(reader.is_list_element());
    assert_eq!(reader.list_index(), Some(0));
    assert_eq!(reader.parent_type(), Some(Tag::List));
    assert_eq!(reader.parent_tag_length(), 3);
    assert!(!reader.has_name());
    Ok(())
}

#[test]
fn walks_the_whole_document() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    let mut count = 0;
    while reader.read_to_following()? {
        count += 1;
    }
    assert_eq!(count, 14);
    assert_eq!(reader.tags_read(), 14);
    assert!(reader.is_at_stream_end());
    assert!(!reader.read_to_following()?);
    Ok(())
}

#[test]
fn byte_accounting_over_a_plain_reader() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_reader(payload.as_slice());
    while reader.read_to_following()? {}
    assert_eq!(reader.bytes_read(), payload.len() as u64);
    Ok(())
}

#[test]
fn skip_returns_inclusive_subtree_count() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    assert!(reader.read_to_following_named("third-comp")?);
    assert_eq!(reader.skip()?, 3);
    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_name().as_deref(), Some("some-long"));

    assert_eq!(reader.skip()?, 1);
    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_name().as_deref(), Some("fourth-list"));
    assert_eq!(reader.skip()?, 5);

    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_name().as_deref(), Some("fifth"));
    Ok(())
}

#[test]
fn skip_from_stream_start_consumes_the_document() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);
    assert_eq!(reader.skip()?, 14);
    assert!(!reader.read_to_following()?);
    assert!(reader.is_at_stream_end());
    Ok(())
}

#[test]
fn skip_works_without_seek_support() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_reader(payload.as_slice());
    assert!(reader.read_to_following_named("hugeArray")?);
    assert_eq!(reader.skip()?, 1);
    assert!(!reader.read_to_following()?);
    Ok(())
}

#[test]
fn skip_works_with_seek_support() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_seekable(Cursor::new(payload));
    assert!(reader.read_to_following_named("hugeArray")?);
    assert_eq!(reader.tag_length(), 1024);
    assert_eq!(reader.skip()?, 1);
    assert!(!reader.read_to_following()?);
    Ok(())
}

#[test]
fn read_value_for_each_scalar() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .byte("b", 255)
        .short("s", -2)
        .int("i", 3)
        .long("l", 4)
        .float("f", 1.5)
        .double("d", 2.5)
        .string("str", "text")
        .byte_array("ba", &[1, 2])
        .int_array("ia", &[3, 4])
        .long_array("la", &[5, 6])
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?; // root

    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Byte(255));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Short(-2));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Int(3));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Long(4));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Float(1.5));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Double(2.5));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::String("text".to_owned()));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::ByteArray(vec![1, 2]));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::IntArray(vec![3, 4]));
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::LongArray(vec![5, 6]));
    Ok(())
}

#[test]
fn read_value_twice_requires_caching() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .int("i", 5)
        .end_compound()
        .build();

    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Int(5));
    assert!(matches!(reader.read_value(), Err(Error::InvalidState(_))));

    let opts = ReaderOptions {
        cache_tag_values: true,
        ..ReaderOptions::default()
    };
    let mut reader = NbtReader::from_bytes_with(&payload, opts);
    reader.read_to_following()?;
    reader.read_to_following()?;
    assert_eq!(reader.read_value()?, TagValue::Int(5));
    assert_eq!(reader.read_value()?, TagValue::Int(5));
    Ok(())
}

#[test]
fn read_value_outside_a_value_tag() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);
    assert!(matches!(reader.read_value(), Err(Error::InvalidState(_))));
    reader.read_to_following()?; // root compound
    assert!(matches!(reader.read_value(), Err(Error::InvalidState(_))));
    Ok(())
}

#[test]
fn read_value_as_widens() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .byte("b", 7)
        .long("l", 9)
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;

    reader.read_to_following()?;
    assert_eq!(reader.read_value_as::<i32>()?, 7);
    reader.read_to_following()?;
    assert!(matches!(
        reader.read_value_as::<i32>(),
        Err(Error::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn read_list_as_array_with_widening() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .start_list("bytes", Tag::Byte, 3)
        .byte_payload(1)
        .byte_payload(2)
        .byte_payload(3)
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;
    assert!(reader.read_to_following_named("bytes")?);
    assert_eq!(reader.read_list_as_array::<i16>()?, vec![1, 2, 3]);

    // the list is consumed; the reader continues after it
    assert!(!reader.read_to_following()?);
    Ok(())
}

#[test]
fn read_list_of_containers_as_array_is_invalid() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);
    assert!(reader.read_to_following_named("fourth-list")?);
    assert!(matches!(
        reader.read_list_as_array::<i32>(),
        Err(Error::InvalidState(_))
    ));
    Ok(())
}

#[test]
fn read_as_tag_materializes_the_subtree() -> Result<()> {
    let payload = reader_payload();
    let expected = from_bytes(&payload)?
        .get_named("third-comp")?
        .unwrap()
        .clone();

    let mut reader = NbtReader::from_bytes(&payload);
    assert!(reader.read_to_following_named("third-comp")?);
    let tag = reader.read_as_tag()?;
    assert_eq!(tag, expected);
    assert!(tag.parent().is_none());

    // the reader has advanced past the subtree
    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_name().as_deref(), Some("some-long"));
    Ok(())
}

#[test]
fn read_as_tag_for_a_value_tag() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);
    assert!(reader.read_to_following_named("fifth")?);
    let tag = reader.read_as_tag()?;
    assert_eq!(tag.name().as_deref(), Some("fifth"));
    assert_eq!(tag, "five");
    Ok(())
}

#[test]
fn end_markers_surface_when_requested() -> Result<()> {
    let payload = reader_payload();
    let opts = ReaderOptions {
        skip_end_tags: false,
        ..ReaderOptions::default()
    };
    let mut reader = NbtReader::from_bytes_with(&payload, opts);

    let mut ends = 0;
    let mut tags = 0;
    while reader.read_to_following()? {
        if reader.tag_type() == Tag::End {
            ends += 1;
            assert!(!reader.has_name());
        } else {
            tags += 1;
        }
    }
    // one per compound: root, third-comp and the anonymous list element
    assert_eq!(ends, 3);
    assert_eq!(tags, 14);
    assert_eq!(reader.tags_read(), 14);
    Ok(())
}

#[test]
fn reading_an_end_marker_as_a_tag_is_invalid() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .end_compound()
        .build();
    let opts = ReaderOptions {
        skip_end_tags: false,
        ..ReaderOptions::default()
    };
    let mut reader = NbtReader::from_bytes_with(&payload, opts);
    reader.read_to_following()?; // root
    assert!(reader.read_to_following()?); // end marker
    assert_eq!(reader.tag_type(), Tag::End);
    assert!(matches!(reader.read_as_tag(), Err(Error::InvalidState(_))));
    Ok(())
}

#[test]
fn descendant_search_stays_inside_the_container() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    assert!(reader.read_to_following_named("third-comp")?);
    assert!(reader.read_to_descendant("inner-str")?);
    assert_eq!(reader.read_value()?, TagValue::String("three".to_owned()));

    // "fifth" exists in the document but not under third-comp's subtree,
    // which we have already left
    let mut reader = NbtReader::from_bytes(&payload);
    assert!(reader.read_to_following_named("third-comp")?);
    assert!(!reader.read_to_descendant("some-long")?);
    assert_eq!(reader.tag_name().as_deref(), Some("some-long"));
    Ok(())
}

#[test]
fn sibling_navigation() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    reader.read_to_following()?; // root
    reader.read_to_following()?; // first
    assert!(reader.read_to_next_sibling()?);
    assert_eq!(reader.tag_name().as_deref(), Some("second"));

    // sibling stepping walks over whole subtrees
    assert!(reader.read_to_next_sibling()?);
    assert_eq!(reader.tag_name().as_deref(), Some("third-comp"));
    assert!(reader.read_to_next_sibling()?);
    assert_eq!(reader.tag_name().as_deref(), Some("some-long"));

    assert!(reader.read_to_next_sibling_named("hugeArray")?);
    assert_eq!(reader.tag_name().as_deref(), Some("hugeArray"));

    // past the last sibling: false, positioned on the parent's successor
    assert!(!reader.read_to_next_sibling()?);
    assert!(reader.is_at_stream_end());
    Ok(())
}

#[test]
fn sibling_navigation_inside_a_nested_compound() -> Result<()> {
    let payload = reader_payload();
    let mut reader = NbtReader::from_bytes(&payload);

    assert!(reader.read_to_following_named("inner-int")?);
    assert!(reader.read_to_next_sibling()?);
    assert_eq!(reader.tag_name().as_deref(), Some("inner-str"));

    // inner-str is the last child: the search exits third-comp and leaves
    // the reader on its successor so callers can continue
    assert!(!reader.read_to_next_sibling()?);
    assert_eq!(reader.tag_name().as_deref(), Some("some-long"));
    Ok(())
}

#[test]
fn list_indices_progress() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .start_list("ints", Tag::Int, 3)
        .int_payload(10)
        .int_payload(20)
        .int_payload(30)
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;
    reader.read_to_following()?; // the list

    for expected in 0..3 {
        assert!(reader.read_to_following()?);
        assert_eq!(reader.list_index(), Some(expected));
        assert_eq!(reader.parent_name().as_deref(), Some("ints"));
        assert_eq!(reader.parent_tag_length(), 3);
        assert!(reader.is_list_element());
    }
    assert!(!reader.read_to_following()?);
    Ok(())
}

#[test]
fn malformed_input_latches_the_reader() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .tag(Tag::IntArray)
        .name("bad")
        .int_payload(-5)
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;

    assert!(matches!(
        reader.read_to_following(),
        Err(Error::Malformed(_))
    ));
    assert!(reader.is_in_error_state());

    // every further non-query operation fails without touching the stream
    assert!(matches!(
        reader.read_to_following(),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(reader.skip(), Err(Error::InvalidState(_))));
    assert!(matches!(reader.read_value(), Err(Error::InvalidState(_))));
    Ok(())
}

#[test]
fn invalid_tag_byte_latches_the_reader() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .raw_bytes(&[13])
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;
    assert!(matches!(
        reader.read_to_following(),
        Err(Error::Malformed(_))
    ));
    assert!(reader.is_in_error_state());
    Ok(())
}

#[test]
fn truncated_input_latches_the_reader() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .tag(Tag::Long)
        .name("cut")
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;
    reader.read_to_following()?; // positions on "cut"; payload still unread

    assert!(matches!(reader.read_value(), Err(Error::Truncated)));
    assert!(reader.is_in_error_state());
    assert!(matches!(
        reader.read_to_following(),
        Err(Error::InvalidState(_))
    ));
    Ok(())
}

#[test]
fn non_compound_root_is_malformed() {
    let payload = Builder::new()
        .tag(Tag::Byte)
        .name("x")
        .byte_payload(1)
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    assert!(matches!(
        reader.read_to_following(),
        Err(Error::Malformed(_))
    ));
    assert!(reader.is_in_error_state());
}

#[test]
fn tag_start_offsets() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .byte("b", 1)
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);

    reader.read_to_following()?;
    assert_eq!(reader.tag_start_offset(), 0);

    reader.read_to_following()?;
    // root header: tag byte + u16 length + "r"
    assert_eq!(reader.tag_start_offset(), 4);
    Ok(())
}

#[test]
fn empty_list_is_stepped_over() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .start_list("empty", Tag::End, 0)
        .int("after", 1)
        .end_compound()
        .build();
    let mut reader = NbtReader::from_bytes(&payload);
    reader.read_to_following()?;

    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_name().as_deref(), Some("empty"));
    assert_eq!(reader.list_type(), Some(Tag::End));
    assert_eq!(reader.tag_length(), 0);

    assert!(reader.read_to_following()?);
    assert_eq!(reader.tag_name().as_deref(), Some("after"));
    Ok(())
}
