//! Integration tests for Intel HEX images and program memory

use avr_spec::{HexFile, ProgramMemory, Record};
use proptest::prelude::*;

/// `avrdude`-style image: two data records, a start address, end of file
const IMAGE: &str = "\
:100000000C9434000C943E000C943E000C943E0082
:040010000F930895AD
:0400000300000000F9
:00000001FF
";

#[test]
fn test_parse_toolchain_image() {
    let hex: HexFile = IMAGE.parse().unwrap();
    assert_eq!(hex.records().len(), 4);
    assert_eq!(
        hex.records()[2],
        Record::StartSegmentAddress { cs: 0, ip: 0 }
    );
    assert_eq!(hex.data_len(), 20);

    let mut memory: Vec<u8> = Vec::new();
    hex.upload_to(&mut memory);
    assert_eq!(memory.size(), 20);
    // jmp 0x68
    assert_eq!(memory.read_word(0), Some(0x940C));
    assert_eq!(memory.read_word(1), Some(0x0034));
    // push r16 ; ret
    assert_eq!(memory.read_word(8), Some(0x930F));
    assert_eq!(memory.read_word(9), Some(0x9508));
    assert!(memory.is_past_end(10));
}

#[test]
fn test_display_reproduces_records() {
    let hex: HexFile = IMAGE.parse().unwrap();
    assert_eq!(hex.to_string(), IMAGE);
}

proptest! {
    #[test]
    fn test_image_survives_hex_text(image in prop::collection::vec(any::<u8>(), 0..600)) {
        let text = HexFile::from_image(&image).to_string();
        let parsed: HexFile = text.parse().unwrap();

        let mut memory: Vec<u8> = Vec::new();
        parsed.upload_to(&mut memory);
        prop_assert_eq!(memory, image);
    }
}
