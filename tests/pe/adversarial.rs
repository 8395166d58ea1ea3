//! Hostile and truncated inputs.

use peoverlay::{ErrorKind, Layout, OpenOptions, PeContext, PeError, PeFile};

use crate::common::{create_temp_file, put, PeImage, COFF, LFANEW, OPTIONAL};

fn parse_kind(bytes: &[u8]) -> ErrorKind {
    Layout::parse(bytes).unwrap_err().kind()
}

#[test]
fn not_mz() {
    assert_eq!(parse_kind(b""), ErrorKind::NotAPeFile);
    assert_eq!(parse_kind(b"M"), ErrorKind::NotAPeFile);
    assert_eq!(parse_kind(b"ZM\0\0\0\0"), ErrorKind::NotAPeFile);
    assert_eq!(parse_kind(b"\x7fELF\x02\x01\x01"), ErrorKind::NotAPeFile);
}

#[test]
fn lfanew_out_of_range() {
    let mut bytes = PeImage::pe32().build();
    for lfanew in [bytes.len() as u32, bytes.len() as u32 - 3, u32::MAX, u32::MAX - 2] {
        put(&mut bytes, 60, &lfanew.to_le_bytes());
        assert!(matches!(
            Layout::parse(&bytes),
            Err(PeError::InvalidLfanew { lfanew: found }) if found == lfanew
        ));
    }
    // DOS header itself cut short
    assert_eq!(parse_kind(&bytes[..40]), ErrorKind::InvalidLfanew);
}

#[test]
fn bad_signature() {
    let mut bytes = PeImage::pe32().build();
    put(&mut bytes, LFANEW, b"PE\0\x01");
    assert!(matches!(
        Layout::parse(&bytes),
        Err(PeError::InvalidSignature { signature: 0x0100_4550 })
    ));
}

#[test]
fn truncation_at_every_header_boundary() {
    let image = PeImage::pe32();
    let bytes = image.build();

    assert_eq!(parse_kind(&bytes[..COFF + 19]), ErrorKind::MissingCoffHeader);
    assert_eq!(parse_kind(&bytes[..OPTIONAL + 1]), ErrorKind::MissingOptionalHeader);
    assert_eq!(parse_kind(&bytes[..OPTIONAL + 95]), ErrorKind::MissingOptionalHeader);
    assert_eq!(parse_kind(&bytes[..OPTIONAL + 96 + 7]), ErrorKind::TruncatedDirectoryTable);
    let table = image.section_table_offset();
    assert_eq!(parse_kind(&bytes[..table + 39]), ErrorKind::TruncatedSectionTable);
    assert_eq!(parse_kind(&bytes[..table + 79]), ErrorKind::TruncatedSectionTable);
    assert!(Layout::parse(&bytes[..table + 80]).is_ok());
}

#[test]
fn every_prefix_is_handled() {
    let bytes = PeImage::pe32plus_dll().build();
    for len in 0..bytes.len() {
        // Must never panic; either a clean error or a valid layout
        if let Ok(layout) = Layout::parse(&bytes[..len]) {
            let pe = PeFile::bind(&bytes[..len], &layout).unwrap();
            let _ = pe.rva_to_offset(u64::from(pe.entry_point()));
        }
    }
}

#[test]
fn hostile_counts_rejected_before_allocation() {
    let mut bytes = PeImage::pe32().build();
    put(&mut bytes, COFF + 2, &0xFFFFu16.to_le_bytes());
    assert!(matches!(
        Layout::parse(&bytes),
        Err(PeError::TooManySections { count: 0xFFFF, limit: 96 })
    ));

    let mut bytes = PeImage::pe32().build();
    put(&mut bytes, OPTIONAL + 92, &0x4000_0000u32.to_le_bytes());
    assert!(matches!(
        Layout::parse(&bytes),
        Err(PeError::TooManyDirectories { count: 0x4000_0000, limit: 16 })
    ));

    // Exactly at the limit is accepted while the table still fits
    let mut bytes = PeImage::pe32().build();
    put(&mut bytes, COFF + 2, &96u16.to_le_bytes());
    assert_eq!(Layout::parse(&bytes).unwrap().section_offsets().len(), 96);
}

#[test]
fn rom_image_unsupported() {
    let mut bytes = PeImage::pe32().build();
    put(&mut bytes, OPTIONAL, &0x107u16.to_le_bytes());
    let err = Layout::parse(&bytes).unwrap_err();
    assert!(matches!(err, PeError::UnsupportedImage { magic: 0x107 }));
    assert!(err.kind().is_format());
}

#[test]
fn pe32_magic_with_pe32plus_body() {
    // Declared 64-bit sizes with a 32-bit magic: directories follow the
    // concrete 96-byte header, sections follow SizeOfOptionalHeader
    let image = PeImage::pe32plus_dll();
    let mut bytes = image.build();
    put(&mut bytes, OPTIONAL, &0x10bu16.to_le_bytes());
    put(&mut bytes, OPTIONAL + 92, &4u32.to_le_bytes());

    let layout = Layout::parse(&bytes).unwrap();
    assert_eq!(layout.directories_base(), Some(OPTIONAL + 96));
    assert_eq!(layout.sections_base(), Some(image.section_table_offset()));
}

#[test]
fn section_fields_at_extremes() {
    let mut image = PeImage::pe32();
    image.sections[1].virtual_address = u32::MAX;
    image.sections[1].virtual_size = u32::MAX;
    image.sections[1].pointer_to_raw_data = 0x1400;
    let file = create_temp_file(&image.build());

    let ctx = PeContext::load(file.path(), &OpenOptions::default()).unwrap();
    let pe = ctx.pe().unwrap();
    let rva = u64::from(u32::MAX) + 0x10;
    assert_eq!(pe.rva_to_offset(rva), 0x1410);
    assert_eq!(pe.section_for_rva(u64::from(u32::MAX) * 2).unwrap().name(), ".data");
}

#[test]
fn raw_data_past_eof_is_clamped() {
    let image = PeImage::pe32();
    let mut bytes = image.build();
    // Patch only the header so the file stays short
    let at = image.section_table_offset() + 40 + 16;
    put(&mut bytes, at, &0x10_0000u32.to_le_bytes());
    let file = create_temp_file(&bytes);

    let ctx = PeContext::load(file.path(), &OpenOptions::default()).unwrap();
    let pe = ctx.pe().unwrap();
    let data = pe.section_by_name(".data").unwrap();
    assert_eq!(pe.section_data(&data).len(), 0x200);
}
