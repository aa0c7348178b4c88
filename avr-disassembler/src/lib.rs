//! # AVR Disassembler
//!
//! Decode AVR instruction words into [`avr_spec::Instruction`] values.
//!
//! The decoder is total over every word of a program image: each
//! encoding yields an instruction, [`DisassemblerError::UnknownOpcode`] for
//! reserved encodings, or [`DisassemblerError::Truncated`] when a 32-bit
//! instruction is cut off by the end of the image.
//!
//! ## Example
//!
//! ```rust
//! use avr_spec::{Instruction, Register};
//! use avr_disassembler::{decode_at, format};
//!
//! // push r16 ; ret
//! let image: &[u8] = &[0x0F, 0x93, 0x08, 0x95];
//!
//! let first = decode_at(image, 0).unwrap();
//! assert_eq!(first, Instruction::Push { r: Register::R16 });
//! assert_eq!(format(&first), "push r16");
//! assert_eq!(decode_at(image, 1).unwrap(), Instruction::Ret);
//! ```

pub mod error;
pub mod decoder;
pub mod formatter;

pub use error::{DisassemblerError, Result};
pub use decoder::{decode, decode_at, is_long};
pub use formatter::format;

#[cfg(test)]
mod tests {
    use super::*;
    use avr_spec::{Instruction, Register};

    #[test]
    fn test_public_exports() {
        let _ = DisassemblerError::UnknownOpcode(0xFFFF);
        let _ = DisassemblerError::Truncated { pc: 0 };
    }

    #[test]
    fn test_disassembler_error_display() {
        assert_eq!(
            DisassemblerError::UnknownOpcode(0xFFFF).to_string(),
            "Unknown opcode: 0xFFFF"
        );
        assert_eq!(
            DisassemblerError::Truncated { pc: 0x10 }.to_string(),
            "Truncated instruction at PC 0x0010: second word past end of image"
        );
        assert_eq!(
            DisassemblerError::OutOfRange { pc: 0x10 }.to_string(),
            "PC 0x0010 is past end of image"
        );
    }

    #[test]
    fn test_result_type() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<i32> = Err(DisassemblerError::UnknownOpcode(0xFFFF));
        assert!(err.is_err());
    }

    #[test]
    fn test_decode_then_format() {
        let instr = decode(0x940E, 0x0034).unwrap();
        assert_eq!(format(&instr), "call 0x68");

        let instr = decode(0x2411, 0).unwrap();
        assert_eq!(instr, Instruction::Eor { d: Register::R1, r: Register::R1 });
        assert_eq!(format(&instr), "eor r1, r1");
    }

    // Note: encode/decode agreement over the whole instruction set is tested in
    // tests/integration_tests.rs against the assembler's encoder
}
