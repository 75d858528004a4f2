use super::Builder;
use crate::error::{Error, Result};
use crate::{Compression, Endian, NbtFile, NbtTag, Tag};

fn sample_root() -> NbtTag {
    let root = NbtTag::named_compound("sample");
    root.add(&NbtTag::named_int("answer", 42)).unwrap();
    root.add(&NbtTag::named_string("greeting", "hej")).unwrap();
    let list = NbtTag::named_list_of("longs", Tag::Long);
    for v in [1i64, 2, 3] {
        list.add(&NbtTag::long(v)).unwrap();
    }
    root.add(&list).unwrap();
    root
}

#[test]
fn round_trip_uncompressed() -> Result<()> {
    let file = NbtFile::with_root(sample_root())?;
    let bytes = file.save_to_bytes(Compression::None)?;
    assert_eq!(bytes[0], 0x0A);

    let reread = NbtFile::load_from_bytes(&bytes)?;
    assert_eq!(reread.compression(), Compression::None);
    assert_eq!(*reread.root(), sample_root());
    assert_eq!(reread.bytes_read(), bytes.len() as u64);
    Ok(())
}

#[test]
fn round_trip_gzip() -> Result<()> {
    let file = NbtFile::with_root(sample_root())?;
    let bytes = file.save_to_bytes(Compression::GZip)?;
    assert_eq!(&bytes[..2], &[0x1F, 0x8B]);

    let reread = NbtFile::load_from_bytes(&bytes)?;
    assert_eq!(reread.compression(), Compression::GZip);
    assert_eq!(*reread.root(), sample_root());
    Ok(())
}

#[test]
fn round_trip_zlib() -> Result<()> {
    let file = NbtFile::with_root(sample_root())?;
    let bytes = file.save_to_bytes(Compression::ZLib)?;
    assert_eq!(bytes[0], 0x78);

    let reread = NbtFile::load_from_bytes(&bytes)?;
    assert_eq!(reread.compression(), Compression::ZLib);
    assert_eq!(*reread.root(), sample_root());

    // explicit framing works too
    let reread =
        NbtFile::load_from_bytes_with(&bytes, Compression::ZLib, Endian::Big, None)?;
    assert_eq!(*reread.root(), sample_root());
    Ok(())
}

#[test]
fn corrupt_zlib_stream_fails_to_load() {
    // valid zlib header followed by a reserved deflate block type
    let bytes = [0x78u8, 0x9C, 0x07, 0x00, 0x00];
    assert!(NbtFile::load_from_bytes(&bytes).is_err());
}

#[test]
fn load_from_a_plain_reader() -> Result<()> {
    let file = NbtFile::with_root(sample_root())?;
    let bytes = file.save_to_bytes(Compression::GZip)?;

    let reread = NbtFile::load_from_reader(bytes.as_slice())?;
    assert_eq!(*reread.root(), sample_root());
    Ok(())
}

#[test]
fn unknown_leading_byte_is_malformed() {
    let data = [0x42u8, 0x00, 0x00];
    assert!(matches!(
        NbtFile::load_from_bytes(&data),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn empty_input_is_truncated() {
    assert!(matches!(
        NbtFile::load_from_bytes(&[]),
        Err(Error::Truncated)
    ));
}

#[test]
fn auto_detect_is_rejected_on_save() -> Result<()> {
    let file = NbtFile::new();
    assert!(matches!(
        file.save_to_bytes(Compression::AutoDetect),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn root_must_be_a_detached_compound() -> Result<()> {
    assert!(matches!(
        NbtFile::with_root(NbtTag::int(1)),
        Err(Error::InvalidArgument(_))
    ));

    let parent = NbtTag::compound();
    let owned = NbtTag::named_compound("owned");
    parent.add(&owned)?;
    assert!(matches!(
        NbtFile::with_root(owned),
        Err(Error::InvalidArgument(_))
    ));

    // an unnamed root gains the empty name
    let file = NbtFile::with_root(NbtTag::compound())?;
    assert_eq!(file.root().name().as_deref(), Some(""));
    Ok(())
}

#[test]
fn selector_applies_during_load() -> Result<()> {
    let payload = Builder::new()
        .start_compound("r")
        .int("keep", 1)
        .int("drop", 2)
        .end_compound()
        .build();
    let selector = |t: &NbtTag| t.name().as_deref() != Some("drop");
    let file =
        NbtFile::load_from_bytes_with(&payload, Compression::None, Endian::Big, Some(&selector))?;
    assert!(file.root().contains_named("keep")?);
    assert!(!file.root().contains_named("drop")?);
    Ok(())
}

#[test]
fn little_endian_save_and_load() -> Result<()> {
    let mut file = NbtFile::with_root(sample_root())?;
    file.set_endian(Endian::Little);
    let little = file.save_to_bytes(Compression::None)?;
    assert_ne!(little, NbtFile::with_root(sample_root())?.save_to_bytes(Compression::None)?);

    let reread =
        NbtFile::load_from_bytes_with(&little, Compression::None, Endian::Little, None)?;
    assert_eq!(*reread.root(), sample_root());
    assert_eq!(reread.endian(), Endian::Little);
    Ok(())
}

#[test]
fn file_system_round_trip() -> Result<()> {
    let path = std::env::temp_dir().join(format!("nbtio-test-{}.nbt", std::process::id()));

    let file = NbtFile::with_root(sample_root())?;
    let written = file.save_to_file(&path, Compression::GZip)?;
    assert!(written > 0);

    let reread = NbtFile::load_from_file(&path)?;
    assert_eq!(*reread.root(), sample_root());
    assert_eq!(reread.compression(), Compression::GZip);

    std::fs::remove_file(&path).ok();
    Ok(())
}

#[test]
fn mutate_and_resave() -> Result<()> {
    let file = NbtFile::with_root(sample_root())?;
    let bytes = file.save_to_bytes(Compression::None)?;

    let reread = NbtFile::load_from_bytes(&bytes)?;
    reread.root().get_named("answer")?.unwrap().set_int(43)?;
    reread.root().put("extra", &NbtTag::string("new"))?;

    let bytes = reread.save_to_bytes(Compression::None)?;
    let last = NbtFile::load_from_bytes(&bytes)?;
    assert_eq!(last.root().get_named("answer")?.unwrap(), 43);
    assert_eq!(last.root().get_named("extra")?.unwrap(), "new");
    Ok(())
}

#[test]
fn display_uses_the_configured_indent() -> Result<()> {
    crate::set_default_indent(">>");
    let root = NbtTag::named_compound("r");
    root.add(&NbtTag::named_int("i", 1))?;
    let text = root.to_string();
    assert!(text.contains(">>TAG_Int(\"i\"): 1"));
    crate::set_default_indent("  ");
    Ok(())
}
