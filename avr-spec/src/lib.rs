//! # AVR Instruction Set Specification
//!
//! Core types shared by the decoder, the assembler and the stack analyzer.
//!
//! ## Key Features
//! - 16-bit instruction words, with 32-bit forms for LDS, STS, JMP and CALL
//! - Program counter counts words, not bytes (byte address = pc * 2)
//! - 32 general-purpose registers (r0-r31), X/Y/Z pointer pairs
//! - Closed control-flow classification ([`Flow`]) for static analysis
//! - Intel HEX load images ([`HexFile`])

pub mod register;
pub mod instruction;
pub mod flow;
pub mod memory;
pub mod hex;
pub mod error;

pub use register::{Register, Pointer, PointerMode, NUM_REGISTERS};
pub use instruction::Instruction;
pub use flow::{Flow, Target};
pub use memory::{ProgramMemory, ProgramMemoryMut};
pub use hex::{HexFile, Record};
pub use error::{AvrError, Result};

/// Bytes per instruction word
pub const WORD_BYTES: usize = 2;

/// Program counter (word address)
pub type Pc = u32;

/// Word address of the reset vector
pub const RESET_VECTOR: Pc = 0;

/// Return address size pushed by CALL/RCALL on devices with a 16-bit PC
pub const RETURN_ADDRESS_BYTES: u8 = 2;

/// Return address size pushed by CALL/RCALL on devices with a 22-bit PC
pub const RETURN_ADDRESS_BYTES_22BIT: u8 = 3;

/// Largest program memory addressable with a 22-bit word PC (8 MiB)
pub const MAX_PROGRAM_BYTES: usize = (1 << 22) * WORD_BYTES;

/// Convert a program counter into the byte address of its first word
#[inline]
pub const fn byte_address(pc: Pc) -> usize {
    pc as usize * WORD_BYTES
}
