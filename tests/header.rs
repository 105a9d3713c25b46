use i8086_rs::header::{HeaderFlags, SegmentSizes};
use i8086_rs::{ExecHeader, HeaderError};
use pretty_assertions::assert_eq;

fn long_header(text: u32, data: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    bytes[..5].copy_from_slice(&[0x01, 0x03, 0x30, 0x04, 0x20]);
    for (i, v) in [text, data, 0x10, 0, 0x1000, 0].iter().enumerate() {
        let at = 8 + i * 4;
        bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

#[test]
fn wrong_magic_is_rejected() {
    assert_eq!(
        ExecHeader::parse(&[0x03, 0x01, 0x00, 0x04, 0x20]),
        Err(HeaderError::BadMagic { found: 0x0301 })
    );
    assert_eq!(
        ExecHeader::parse(&[0x01, 0x03, 0x00]),
        Err(HeaderError::TooShort { len: 3 })
    );
}

#[test]
fn long_header_sizes_are_little_endian() {
    let hdr = ExecHeader::parse(&long_header(0x0102, 0x20)).unwrap();
    assert_eq!(
        hdr.sizes,
        Some(SegmentSizes {
            text: 0x0102,
            data: 0x20,
            bss: 0x10,
            entry: 0,
            total: 0x1000,
            syms: 0,
        })
    );
    assert_eq!(hdr.flag_set(), HeaderFlags::EXEC | HeaderFlags::SEP);
}

#[test]
fn text_range_follows_declared_length() {
    let mut file = long_header(3, 2);
    file.extend_from_slice(&[0xB8, 0x05, 0x00, 0xAA, 0xBB]);
    let hdr = ExecHeader::parse(&file).unwrap();
    assert_eq!(hdr.text_range(file.len()).unwrap(), 32..35);
    assert_eq!(
        hdr.text_range(34),
        Err(HeaderError::TextTruncated {
            start: 32,
            end: 35,
            len: 34
        })
    );
}

#[test]
fn summary_lists_flags_and_sizes() {
    let hdr = ExecHeader::parse(&long_header(3, 2)).unwrap();
    assert_eq!(
        hdr.to_string(),
        "magic: 0103\tflags: 30 (EXEC|SEP)\tcpu: 04\thdrlen: 32B\n\
         textlen: 3B\tdatalen: 2B\tbsslen: 16B\tentrylen: 0B\ttotallen: 4096B\tsymslen: 0B"
    );
}
