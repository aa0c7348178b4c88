//! Disassembler errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisassemblerError {
    #[error("Unknown opcode: 0x{0:04X}")]
    UnknownOpcode(u16),

    #[error("Truncated instruction at PC 0x{pc:04X}: second word past end of image")]
    Truncated { pc: u32 },

    #[error("PC 0x{pc:04X} is past end of image")]
    OutOfRange { pc: u32 },
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
