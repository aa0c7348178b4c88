//! Integration tests for the AVR disassembler
//!
//! Decoding is checked against the assembler's encoder and parser:
//! every word the decoder accepts must survive encode/decode and
//! format/parse unchanged at the instruction level.

use avr_assembler::{assemble, encode, parse_instruction};
use avr_disassembler::{decode, decode_at, format, is_long, DisassemblerError};
use avr_spec::{Instruction, Register};
use proptest::prelude::*;

const SECOND_WORD: u16 = 0x1234;

fn decoded_words() -> impl Iterator<Item = (u16, Instruction)> {
    (0..=u16::MAX).filter_map(|word| decode(word, SECOND_WORD).ok().map(|instr| (word, instr)))
}

// ============================================================================
// Decoder / encoder agreement
// ============================================================================

#[test]
fn test_every_decoded_word_reencodes_to_same_instruction() {
    for (word, instr) in decoded_words() {
        let words = encode(&instr);
        assert_eq!(words.len() as u32, instr.width(), "{:04X} {:?}", word, instr);
        let next = words.get(1).copied().unwrap_or(0);
        assert_eq!(decode(words[0], next), Ok(instr), "word {:04X}", word);
    }
}

#[test]
fn test_long_forms_carry_second_word() {
    for (word, instr) in decoded_words().filter(|(word, _)| is_long(*word)) {
        assert!(instr.is_long(), "{:04X}", word);
        assert_eq!(encode(&instr)[1], SECOND_WORD);
    }
}

#[test]
fn test_canonical_encodings_are_exact() {
    let words = [
        0x0000, 0x930F, 0x910F, 0x9508, 0x9518, 0xCFFF, 0xD800, 0x9409, 0x9509, 0xF009,
        0xF7F9, 0xFF80, 0x9BB3, 0x1012, 0x0E1F, 0x2411, 0xEF0F, 0x01CF, 0x9724, 0xBFCD,
        0xB7CD, 0x8189, 0xAE07, 0x9478, 0x94F8, 0x95C8, 0x9005, 0x95E8, 0x9588,
    ];
    for word in words {
        let instr = decode(word, 0).unwrap();
        assert_eq!(encode(&instr), vec![word], "{}", format(&instr));
    }
}

#[test]
fn test_reserved_words_are_rejected() {
    let reserved = [0x0001, 0x00FF, 0x9003, 0x9008, 0x9203, 0x9404, 0x95B8, 0xF808, 0xFFFF];
    for word in reserved {
        assert_eq!(decode(word, 0), Err(DisassemblerError::UnknownOpcode(word)), "{:04X}", word);
    }
}

// ============================================================================
// Formatter / parser agreement
// ============================================================================

#[test]
fn test_every_formatted_instruction_parses_back() {
    for (word, instr) in decoded_words() {
        let text = format(&instr);
        let parsed = parse_instruction(&text)
            .unwrap_or_else(|e| panic!("{:04X} '{}': {}", word, text, e));
        assert_eq!(parsed, instr, "{:04X} '{}'", word, text);
    }
}

// ============================================================================
// Assembled programs
// ============================================================================

#[test]
fn test_decode_assembled_program() {
    let source = r#"
        ldi r24, 0x10
        call sub
    halt:
        rjmp halt
    sub:
        push r28
        sbrs r24, 0
        pop r28
        ret
    "#;
    let image = assemble(source).unwrap();
    let bytes = image.bytes();

    let mut pc = 0u32;
    let mut text = Vec::new();
    while (pc as usize) < image.len() {
        let instr = decode_at(bytes.as_slice(), pc).unwrap();
        text.push(format(&instr));
        pc += instr.width();
    }

    assert_eq!(
        text,
        vec![
            "ldi r24, 0x10",
            "call 0x8",
            "rjmp .-2",
            "push r28",
            "sbrs r24, 0",
            "pop r28",
            "ret",
        ]
    );
}

#[test]
fn test_decode_at_past_end() {
    let image = assemble("ret").unwrap().bytes();
    assert_eq!(
        decode_at(image.as_slice(), 1),
        Err(DisassemblerError::OutOfRange { pc: 1 })
    );
}

#[test]
fn test_decode_at_truncated_call() {
    let mut image = assemble("call 0").unwrap().bytes();
    image.truncate(2);
    assert_eq!(
        decode_at(image.as_slice(), 0),
        Err(DisassemblerError::Truncated { pc: 0 })
    );
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #[test]
    fn test_decode_is_stable_under_reencoding(word in any::<u16>(), next in any::<u16>()) {
        if let Ok(instr) = decode(word, next) {
            let words = encode(&instr);
            let second = words.get(1).copied().unwrap_or(0);
            prop_assert_eq!(decode(words[0], second), Ok(instr));
        }
    }

    #[test]
    fn test_push_pop_round_trip(index in 0usize..32) {
        let reg = Register::from_index(index).unwrap();
        for instr in [Instruction::Push { r: reg }, Instruction::Pop { d: reg }] {
            let words = encode(&instr);
            prop_assert_eq!(words.len(), 1);
            prop_assert_eq!(decode(words[0], 0), Ok(instr));
        }
    }
}
