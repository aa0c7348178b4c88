//! AVR Instruction Set
//!
//! Decoded form of the AVR core instruction set. Operand names follow the
//! Atmel instruction set manual: `d`/`r` registers, `k` constants and
//! addresses, `a` I/O addresses, `b` bit numbers, `s` SREG bits, `q`
//! displacements.
//!
//! ## Instruction Widths
//! - 1 word: everything except the four long forms below
//! - 2 words: LDS, STS, JMP, CALL

use crate::flow::{Flow, Target};
use crate::register::{Pointer, PointerMode, Register};
use serde::{Deserialize, Serialize};

/// Decoded AVR instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// NOP
    Nop,

    // ========== Two-register arithmetic and logic ==========
    /// ADD: Rd = Rd + Rr
    Add { d: Register, r: Register },
    /// ADC: Rd = Rd + Rr + C
    Adc { d: Register, r: Register },
    /// SUB: Rd = Rd - Rr
    Sub { d: Register, r: Register },
    /// SBC: Rd = Rd - Rr - C
    Sbc { d: Register, r: Register },
    /// AND: Rd = Rd & Rr
    And { d: Register, r: Register },
    /// OR: Rd = Rd | Rr
    Or { d: Register, r: Register },
    /// EOR: Rd = Rd ^ Rr
    Eor { d: Register, r: Register },
    /// CP: compare Rd with Rr
    Cp { d: Register, r: Register },
    /// CPC: compare Rd with Rr with carry
    Cpc { d: Register, r: Register },
    /// CPSE: compare, skip next instruction if equal
    Cpse { d: Register, r: Register },
    /// MOV: Rd = Rr
    Mov { d: Register, r: Register },
    /// MOVW: Rd+1:Rd = Rr+1:Rr
    Movw { d: Register, r: Register },

    // ========== Multiply ==========
    /// MUL: R1:R0 = Rd * Rr (unsigned)
    Mul { d: Register, r: Register },
    /// MULS: R1:R0 = Rd * Rr (signed)
    Muls { d: Register, r: Register },
    /// MULSU: R1:R0 = Rd * Rr (signed * unsigned)
    Mulsu { d: Register, r: Register },
    /// FMUL: R1:R0 = (Rd * Rr) << 1 (unsigned)
    Fmul { d: Register, r: Register },
    /// FMULS: R1:R0 = (Rd * Rr) << 1 (signed)
    Fmuls { d: Register, r: Register },
    /// FMULSU: R1:R0 = (Rd * Rr) << 1 (signed * unsigned)
    Fmulsu { d: Register, r: Register },

    // ========== Register-immediate ==========
    /// CPI: compare Rd with K
    Cpi { d: Register, k: u8 },
    /// SBCI: Rd = Rd - K - C
    Sbci { d: Register, k: u8 },
    /// SUBI: Rd = Rd - K
    Subi { d: Register, k: u8 },
    /// ORI: Rd = Rd | K
    Ori { d: Register, k: u8 },
    /// ANDI: Rd = Rd & K
    Andi { d: Register, k: u8 },
    /// LDI: Rd = K
    Ldi { d: Register, k: u8 },
    /// ADIW: Rd+1:Rd += K
    Adiw { d: Register, k: u8 },
    /// SBIW: Rd+1:Rd -= K
    Sbiw { d: Register, k: u8 },

    // ========== One-operand ==========
    /// COM: Rd = ~Rd
    Com { d: Register },
    /// NEG: Rd = -Rd
    Neg { d: Register },
    /// SWAP: swap nibbles of Rd
    Swap { d: Register },
    /// INC: Rd = Rd + 1
    Inc { d: Register },
    /// DEC: Rd = Rd - 1
    Dec { d: Register },
    /// ASR: arithmetic shift right
    Asr { d: Register },
    /// LSR: logical shift right
    Lsr { d: Register },
    /// ROR: rotate right through carry
    Ror { d: Register },

    // ========== Data transfer ==========
    /// LD Rd, X / X+ / -X (and Y, Z)
    Ld { d: Register, ptr: Pointer, mode: PointerMode },
    /// ST X / X+ / -X, Rr (and Y, Z)
    St { ptr: Pointer, mode: PointerMode, r: Register },
    /// LDD Rd, Y+q / Z+q
    Ldd { d: Register, ptr: Pointer, q: u8 },
    /// STD Y+q / Z+q, Rr
    Std { ptr: Pointer, q: u8, r: Register },
    /// LDS Rd, k (32-bit)
    Lds { d: Register, k: u16 },
    /// STS k, Rr (32-bit)
    Sts { k: u16, r: Register },
    /// LPM Rd, Z / Z+; `LPM` without operands loads r0 from Z
    Lpm { d: Register, post_increment: bool },
    /// ELPM Rd, Z / Z+; `ELPM` without operands loads r0 from RAMPZ:Z
    Elpm { d: Register, post_increment: bool },
    /// SPM / SPM Z+
    Spm { post_increment: bool },
    /// XCH Z, Rd
    Xch { d: Register },
    /// LAS Z, Rd
    Las { d: Register },
    /// LAC Z, Rd
    Lac { d: Register },
    /// LAT Z, Rd
    Lat { d: Register },
    /// IN Rd, A
    In { d: Register, a: u8 },
    /// OUT A, Rr
    Out { a: u8, r: Register },

    // ========== Stack ==========
    /// PUSH Rr: STACK = Rr, SP -= 1
    Push { r: Register },
    /// POP Rd: SP += 1, Rd = STACK
    Pop { d: Register },

    // ========== Bit and bit-test ==========
    /// BSET s: SREG(s) = 1 (SEC, SEI, ...)
    Bset { s: u8 },
    /// BCLR s: SREG(s) = 0 (CLC, CLI, ...)
    Bclr { s: u8 },
    /// BLD Rd, b: Rd(b) = T
    Bld { d: Register, b: u8 },
    /// BST Rd, b: T = Rd(b)
    Bst { d: Register, b: u8 },
    /// SBI A, b: I/O(A, b) = 1
    Sbi { a: u8, b: u8 },
    /// CBI A, b: I/O(A, b) = 0
    Cbi { a: u8, b: u8 },
    /// SBRC Rr, b: skip if bit in register cleared
    Sbrc { r: Register, b: u8 },
    /// SBRS Rr, b: skip if bit in register set
    Sbrs { r: Register, b: u8 },
    /// SBIC A, b: skip if bit in I/O register cleared
    Sbic { a: u8, b: u8 },
    /// SBIS A, b: skip if bit in I/O register set
    Sbis { a: u8, b: u8 },

    // ========== Branch ==========
    /// BRBS s, k: branch to PC + k + 1 if SREG(s) set (BREQ, BRLT, BRCS, ...)
    Brbs { s: u8, k: i8 },
    /// BRBC s, k: branch to PC + k + 1 if SREG(s) cleared (BRNE, BRGE, BRCC, ...)
    Brbc { s: u8, k: i8 },
    /// RJMP k: PC = PC + k + 1
    Rjmp { k: i16 },
    /// JMP k: PC = k (32-bit)
    Jmp { k: u32 },
    /// IJMP: PC = Z
    Ijmp,
    /// EIJMP: PC = EIND:Z
    Eijmp,
    /// RCALL k: push return address, PC = PC + k + 1
    Rcall { k: i16 },
    /// CALL k: push return address, PC = k (32-bit)
    Call { k: u32 },
    /// ICALL: push return address, PC = Z
    Icall,
    /// EICALL: push return address, PC = EIND:Z
    Eicall,
    /// RET: pop return address
    Ret,
    /// RETI: pop return address, set I flag
    Reti,

    // ========== MCU control ==========
    /// SLEEP
    Sleep,
    /// BREAK
    Break,
    /// WDR
    Wdr,
    /// DES K
    Des { k: u8 },
}

impl Instruction {
    /// Width of the encoded instruction in words
    pub fn width(&self) -> u32 {
        match self {
            Instruction::Lds { .. }
            | Instruction::Sts { .. }
            | Instruction::Jmp { .. }
            | Instruction::Call { .. } => 2,
            _ => 1,
        }
    }

    /// Classify the instruction's effect on control flow and stack height
    pub fn flow(&self) -> Flow {
        match *self {
            Instruction::Brbs { k, .. } | Instruction::Brbc { k, .. } => {
                Flow::Branch { offset: k as i32 }
            }

            Instruction::Cpse { .. }
            | Instruction::Sbrc { .. }
            | Instruction::Sbrs { .. }
            | Instruction::Sbic { .. }
            | Instruction::Sbis { .. } => Flow::Skip,

            Instruction::Rjmp { k } => Flow::Jump(Target::Relative(k as i32)),
            Instruction::Jmp { k } => Flow::Jump(Target::Absolute(k)),
            Instruction::Ijmp | Instruction::Eijmp => Flow::Jump(Target::Unresolved),

            Instruction::Rcall { k } => Flow::Call(Target::Relative(k as i32)),
            Instruction::Call { k } => Flow::Call(Target::Absolute(k)),
            Instruction::Icall | Instruction::Eicall => Flow::Call(Target::Unresolved),

            Instruction::Ret => Flow::Return,
            Instruction::Reti => Flow::ReturnFromInterrupt,

            Instruction::Push { .. } => Flow::Push,
            Instruction::Pop { .. } => Flow::Pop,
            Instruction::Sts { .. } => Flow::WideStore,

            _ => Flow::Straight,
        }
    }

    /// Check if this is one of the 32-bit encodings
    #[inline]
    pub fn is_long(&self) -> bool {
        self.width() == 2
    }
}
