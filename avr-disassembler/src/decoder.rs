//! Instruction decoder

use avr_spec::{Instruction, Pointer, PointerMode, ProgramMemory, Register};
use crate::error::{DisassemblerError, Result};

/// Check if a first word starts one of the 32-bit encodings (LDS, STS, JMP, CALL)
pub fn is_long(word: u16) -> bool {
    word & 0xFE0F == 0x9000
        || word & 0xFE0F == 0x9200
        || word & 0xFE0E == 0x940C
        || word & 0xFE0E == 0x940E
}

/// Decode the instruction at a program counter
///
/// Reads the second word only for 32-bit encodings.
pub fn decode_at<M: ProgramMemory + ?Sized>(memory: &M, pc: u32) -> Result<Instruction> {
    if memory.is_past_end(pc) {
        return Err(DisassemblerError::OutOfRange { pc });
    }

    let word = memory
        .read_word(pc)
        .ok_or(DisassemblerError::Truncated { pc })?;

    let next = if is_long(word) {
        memory
            .read_word(pc + 1)
            .ok_or(DisassemblerError::Truncated { pc })?
    } else {
        0
    };

    decode(word, next)
}

/// Decode one instruction from its first word and the word that follows it
///
/// `next` is only consulted for 32-bit encodings.
pub fn decode(word: u16, next: u16) -> Result<Instruction> {
    if word == 0x0000 {
        return Ok(Instruction::Nop);
    }

    match word >> 12 {
        0x0 => decode_group_0(word),
        0x1 => {
            let (d, r) = two_registers(word);
            Ok(match (word >> 10) & 0x3 {
                0 => Instruction::Cpse { d, r },
                1 => Instruction::Cp { d, r },
                2 => Instruction::Sub { d, r },
                _ => Instruction::Adc { d, r },
            })
        }
        0x2 => {
            let (d, r) = two_registers(word);
            Ok(match (word >> 10) & 0x3 {
                0 => Instruction::And { d, r },
                1 => Instruction::Eor { d, r },
                2 => Instruction::Or { d, r },
                _ => Instruction::Mov { d, r },
            })
        }
        0x3 => {
            let (d, k) = register_immediate(word);
            Ok(Instruction::Cpi { d, k })
        }
        0x4 => {
            let (d, k) = register_immediate(word);
            Ok(Instruction::Sbci { d, k })
        }
        0x5 => {
            let (d, k) = register_immediate(word);
            Ok(Instruction::Subi { d, k })
        }
        0x6 => {
            let (d, k) = register_immediate(word);
            Ok(Instruction::Ori { d, k })
        }
        0x7 => {
            let (d, k) = register_immediate(word);
            Ok(Instruction::Andi { d, k })
        }
        0x8 | 0xA => Ok(decode_displacement(word)),
        0x9 => decode_group_9(word, next),
        0xB => {
            let reg = Register::from_bits(word >> 4);
            let a = (((word >> 5) & 0x30) | (word & 0x0F)) as u8;
            if word & 0x0800 == 0 {
                Ok(Instruction::In { d: reg, a })
            } else {
                Ok(Instruction::Out { a, r: reg })
            }
        }
        0xC => Ok(Instruction::Rjmp { k: sign_extend_12(word) }),
        0xD => Ok(Instruction::Rcall { k: sign_extend_12(word) }),
        0xE => {
            let (d, k) = register_immediate(word);
            Ok(Instruction::Ldi { d, k })
        }
        _ => decode_group_f(word),
    }
}

/// 0000 xxxx xxxx xxxx: NOP, MOVW, MUL family, CPC, SBC, ADD
fn decode_group_0(word: u16) -> Result<Instruction> {
    match (word >> 10) & 0x3 {
        0 => match (word >> 8) & 0x3 {
            1 => Ok(Instruction::Movw {
                d: Register::from_bits(((word >> 4) & 0x0F) << 1),
                r: Register::from_bits((word & 0x0F) << 1),
            }),
            2 => Ok(Instruction::Muls {
                d: Register::from_bits(16 + ((word >> 4) & 0x0F)),
                r: Register::from_bits(16 + (word & 0x0F)),
            }),
            3 => {
                let d = Register::from_bits(16 + ((word >> 4) & 0x07));
                let r = Register::from_bits(16 + (word & 0x07));
                Ok(match ((word >> 7) & 1, (word >> 3) & 1) {
                    (0, 0) => Instruction::Mulsu { d, r },
                    (0, _) => Instruction::Fmul { d, r },
                    (_, 0) => Instruction::Fmuls { d, r },
                    _ => Instruction::Fmulsu { d, r },
                })
            }
            _ => Err(DisassemblerError::UnknownOpcode(word)),
        },
        1 => {
            let (d, r) = two_registers(word);
            Ok(Instruction::Cpc { d, r })
        }
        2 => {
            let (d, r) = two_registers(word);
            Ok(Instruction::Sbc { d, r })
        }
        _ => {
            let (d, r) = two_registers(word);
            Ok(Instruction::Add { d, r })
        }
    }
}

/// 10q0 qqsd dddd yqqq: LDD/STD with displacement
fn decode_displacement(word: u16) -> Instruction {
    let reg = Register::from_bits(word >> 4);
    let q = (((word >> 8) & 0x20) | ((word >> 7) & 0x18) | (word & 0x07)) as u8;
    let ptr = if word & 0x0008 != 0 { Pointer::Y } else { Pointer::Z };

    if word & 0x0200 == 0 {
        Instruction::Ldd { d: reg, ptr, q }
    } else {
        Instruction::Std { ptr, q, r: reg }
    }
}

/// 1001 xxxx xxxx xxxx
fn decode_group_9(word: u16, next: u16) -> Result<Instruction> {
    let reg = Register::from_bits(word >> 4);

    match (word >> 9) & 0x7 {
        // 1001 000d dddd xxxx: loads and POP
        0 => {
            let d = reg;
            Ok(match word & 0x0F {
                0x0 => Instruction::Lds { d, k: next },
                0x1 => Instruction::Ld { d, ptr: Pointer::Z, mode: PointerMode::PostIncrement },
                0x2 => Instruction::Ld { d, ptr: Pointer::Z, mode: PointerMode::PreDecrement },
                0x4 => Instruction::Lpm { d, post_increment: false },
                0x5 => Instruction::Lpm { d, post_increment: true },
                0x6 => Instruction::Elpm { d, post_increment: false },
                0x7 => Instruction::Elpm { d, post_increment: true },
                0x9 => Instruction::Ld { d, ptr: Pointer::Y, mode: PointerMode::PostIncrement },
                0xA => Instruction::Ld { d, ptr: Pointer::Y, mode: PointerMode::PreDecrement },
                0xC => Instruction::Ld { d, ptr: Pointer::X, mode: PointerMode::Plain },
                0xD => Instruction::Ld { d, ptr: Pointer::X, mode: PointerMode::PostIncrement },
                0xE => Instruction::Ld { d, ptr: Pointer::X, mode: PointerMode::PreDecrement },
                0xF => Instruction::Pop { d },
                _ => return Err(DisassemblerError::UnknownOpcode(word)),
            })
        }

        // 1001 001r rrrr xxxx: stores and PUSH
        1 => {
            let r = reg;
            Ok(match word & 0x0F {
                0x0 => Instruction::Sts { k: next, r },
                0x1 => Instruction::St { ptr: Pointer::Z, mode: PointerMode::PostIncrement, r },
                0x2 => Instruction::St { ptr: Pointer::Z, mode: PointerMode::PreDecrement, r },
                0x4 => Instruction::Xch { d: r },
                0x5 => Instruction::Las { d: r },
                0x6 => Instruction::Lac { d: r },
                0x7 => Instruction::Lat { d: r },
                0x9 => Instruction::St { ptr: Pointer::Y, mode: PointerMode::PostIncrement, r },
                0xA => Instruction::St { ptr: Pointer::Y, mode: PointerMode::PreDecrement, r },
                0xC => Instruction::St { ptr: Pointer::X, mode: PointerMode::Plain, r },
                0xD => Instruction::St { ptr: Pointer::X, mode: PointerMode::PostIncrement, r },
                0xE => Instruction::St { ptr: Pointer::X, mode: PointerMode::PreDecrement, r },
                0xF => Instruction::Push { r },
                _ => return Err(DisassemblerError::UnknownOpcode(word)),
            })
        }

        // 1001 010x xxxx xxxx: one-operand, SREG, returns, indirect and long jumps
        2 => decode_group_94(word, next),

        // 1001 011x KKdd KKKK: ADIW/SBIW
        3 => {
            let d = Register::from_bits(24 + (((word >> 4) & 0x3) << 1));
            let k = (((word >> 2) & 0x30) | (word & 0x0F)) as u8;
            if word & 0x0100 == 0 {
                Ok(Instruction::Adiw { d, k })
            } else {
                Ok(Instruction::Sbiw { d, k })
            }
        }

        // 1001 10xx AAAA Abbb: I/O bit operations
        4 | 5 => {
            let a = ((word >> 3) & 0x1F) as u8;
            let b = (word & 0x07) as u8;
            Ok(match (word >> 8) & 0x3 {
                0 => Instruction::Cbi { a, b },
                1 => Instruction::Sbic { a, b },
                2 => Instruction::Sbi { a, b },
                _ => Instruction::Sbis { a, b },
            })
        }

        // 1001 11rd dddd rrrr: MUL
        _ => {
            let (d, r) = two_registers(word);
            Ok(Instruction::Mul { d, r })
        }
    }
}

/// 1001 010x xxxx xxxx
fn decode_group_94(word: u16, next: u16) -> Result<Instruction> {
    let d = Register::from_bits(word >> 4);

    match word & 0x0F {
        0x0 => Ok(Instruction::Com { d }),
        0x1 => Ok(Instruction::Neg { d }),
        0x2 => Ok(Instruction::Swap { d }),
        0x3 => Ok(Instruction::Inc { d }),
        0x5 => Ok(Instruction::Asr { d }),
        0x6 => Ok(Instruction::Lsr { d }),
        0x7 => Ok(Instruction::Ror { d }),
        0xA => Ok(Instruction::Dec { d }),
        0x8 if word & 0x0100 == 0 => {
            let s = ((word >> 4) & 0x07) as u8;
            if word & 0x0080 == 0 {
                Ok(Instruction::Bset { s })
            } else {
                Ok(Instruction::Bclr { s })
            }
        }
        0x8 => match (word >> 4) & 0x0F {
            0x0 => Ok(Instruction::Ret),
            0x1 => Ok(Instruction::Reti),
            0x8 => Ok(Instruction::Sleep),
            0x9 => Ok(Instruction::Break),
            0xA => Ok(Instruction::Wdr),
            0xC => Ok(Instruction::Lpm { d: Register::R0, post_increment: false }),
            0xD => Ok(Instruction::Elpm { d: Register::R0, post_increment: false }),
            0xE => Ok(Instruction::Spm { post_increment: false }),
            0xF => Ok(Instruction::Spm { post_increment: true }),
            _ => Err(DisassemblerError::UnknownOpcode(word)),
        },
        0x9 => match word {
            0x9409 => Ok(Instruction::Ijmp),
            0x9419 => Ok(Instruction::Eijmp),
            0x9509 => Ok(Instruction::Icall),
            0x9519 => Ok(Instruction::Eicall),
            _ => Err(DisassemblerError::UnknownOpcode(word)),
        },
        0xB if word & 0x0100 == 0 => Ok(Instruction::Des { k: ((word >> 4) & 0x0F) as u8 }),
        0xC | 0xD => Ok(Instruction::Jmp { k: long_address(word, next) }),
        0xE | 0xF => Ok(Instruction::Call { k: long_address(word, next) }),
        _ => Err(DisassemblerError::UnknownOpcode(word)),
    }
}

/// 1111 xxxx xxxx xxxx: conditional branches and register bit operations
fn decode_group_f(word: u16) -> Result<Instruction> {
    let reg = Register::from_bits(word >> 4);
    let bit = (word & 0x07) as u8;

    match (word >> 10) & 0x3 {
        0 => Ok(Instruction::Brbs { s: bit, k: sign_extend_7(word >> 3) }),
        1 => Ok(Instruction::Brbc { s: bit, k: sign_extend_7(word >> 3) }),
        _ if word & 0x0008 != 0 => Err(DisassemblerError::UnknownOpcode(word)),
        2 => {
            if word & 0x0200 == 0 {
                Ok(Instruction::Bld { d: reg, b: bit })
            } else {
                Ok(Instruction::Bst { d: reg, b: bit })
            }
        }
        _ => {
            if word & 0x0200 == 0 {
                Ok(Instruction::Sbrc { r: reg, b: bit })
            } else {
                Ok(Instruction::Sbrs { r: reg, b: bit })
            }
        }
    }
}

// ========== Operand fields ==========

/// xxxx xxrd dddd rrrr
#[inline]
fn two_registers(word: u16) -> (Register, Register) {
    let d = Register::from_bits(word >> 4);
    let r = Register::from_bits(((word >> 5) & 0x10) | (word & 0x0F));
    (d, r)
}

/// xxxx KKKK dddd KKKK, d in r16-r31
#[inline]
fn register_immediate(word: u16) -> (Register, u8) {
    let d = Register::from_bits(16 + ((word >> 4) & 0x0F));
    let k = (((word >> 4) & 0xF0) | (word & 0x0F)) as u8;
    (d, k)
}

/// 1001 010k kkkk 11xk + 16-bit low word
#[inline]
fn long_address(word: u16, next: u16) -> u32 {
    let high = (((word >> 3) & 0x3E) | (word & 0x01)) as u32;
    (high << 16) | next as u32
}

#[inline]
fn sign_extend_12(word: u16) -> i16 {
    ((word << 4) as i16) >> 4
}

#[inline]
fn sign_extend_7(bits: u16) -> i8 {
    (((bits & 0x7F) << 9) as i16 >> 9) as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nop() {
        assert_eq!(decode(0x0000, 0).unwrap(), Instruction::Nop);
    }

    #[test]
    fn test_decode_push_pop() {
        // push r16 / pop r16
        assert_eq!(decode(0x930F, 0).unwrap(), Instruction::Push { r: Register::R16 });
        assert_eq!(decode(0x910F, 0).unwrap(), Instruction::Pop { d: Register::R16 });
        // push r28 / pop r29
        assert_eq!(decode(0x93CF, 0).unwrap(), Instruction::Push { r: Register::R28 });
        assert_eq!(decode(0x91DF, 0).unwrap(), Instruction::Pop { d: Register::R29 });
    }

    #[test]
    fn test_decode_returns() {
        assert_eq!(decode(0x9508, 0).unwrap(), Instruction::Ret);
        assert_eq!(decode(0x9518, 0).unwrap(), Instruction::Reti);
    }

    #[test]
    fn test_decode_relative_jumps() {
        // rjmp .-2 (self loop)
        assert_eq!(decode(0xCFFF, 0).unwrap(), Instruction::Rjmp { k: -1 });
        // rjmp .+4
        assert_eq!(decode(0xC002, 0).unwrap(), Instruction::Rjmp { k: 2 });
        // rcall .-4096 (most negative)
        assert_eq!(decode(0xD800, 0).unwrap(), Instruction::Rcall { k: -2048 });
    }

    #[test]
    fn test_decode_long_jumps() {
        // jmp 0x0068 (byte address 0xD0)
        assert_eq!(decode(0x940C, 0x0068).unwrap(), Instruction::Jmp { k: 0x68 });
        // call 0x0034
        assert_eq!(decode(0x940E, 0x0034).unwrap(), Instruction::Call { k: 0x34 });
        // call with high address bits: k21..16 = 0b100001
        assert_eq!(decode(0x950F, 0x1234).unwrap(), Instruction::Call { k: 0x21_1234 });
    }

    #[test]
    fn test_decode_indirect() {
        assert_eq!(decode(0x9409, 0).unwrap(), Instruction::Ijmp);
        assert_eq!(decode(0x9419, 0).unwrap(), Instruction::Eijmp);
        assert_eq!(decode(0x9509, 0).unwrap(), Instruction::Icall);
        assert_eq!(decode(0x9519, 0).unwrap(), Instruction::Eicall);
    }

    #[test]
    fn test_decode_branches() {
        // breq .+2 = brbs 1, 1
        assert_eq!(decode(0xF009, 0).unwrap(), Instruction::Brbs { s: 1, k: 1 });
        // brne .-2 = brbc 1, -1
        assert_eq!(decode(0xF7F9, 0).unwrap(), Instruction::Brbc { s: 1, k: -1 });
        // brge .+0 = brbc 4, 0
        assert_eq!(decode(0xF404, 0).unwrap(), Instruction::Brbc { s: 4, k: 0 });
        // brlt .-128 = brbs 4, -64
        assert_eq!(decode(0xF204, 0).unwrap(), Instruction::Brbs { s: 4, k: -64 });
    }

    #[test]
    fn test_decode_skips() {
        // sbrs r24, 0
        assert_eq!(decode(0xFF80, 0).unwrap(), Instruction::Sbrs { r: Register::R24, b: 0 });
        // sbrc r24, 7
        assert_eq!(decode(0xFD87, 0).unwrap(), Instruction::Sbrc { r: Register::R24, b: 7 });
        // sbis 0x16, 3
        assert_eq!(decode(0x9BB3, 0).unwrap(), Instruction::Sbis { a: 0x16, b: 3 });
        // cpse r1, r2
        assert_eq!(
            decode(0x1012, 0).unwrap(),
            Instruction::Cpse { d: Register::R1, r: Register::R2 }
        );
    }

    #[test]
    fn test_decode_sts_lds() {
        // sts 0x0100, r24
        assert_eq!(
            decode(0x9380, 0x0100).unwrap(),
            Instruction::Sts { k: 0x0100, r: Register::R24 }
        );
        // lds r24, 0x0100
        assert_eq!(
            decode(0x9180, 0x0100).unwrap(),
            Instruction::Lds { d: Register::R24, k: 0x0100 }
        );
    }

    #[test]
    fn test_decode_alu() {
        // add r1, r31
        assert_eq!(
            decode(0x0E1F, 0).unwrap(),
            Instruction::Add { d: Register::R1, r: Register::R31 }
        );
        // eor r1, r1 (clr r1)
        assert_eq!(
            decode(0x2411, 0).unwrap(),
            Instruction::Eor { d: Register::R1, r: Register::R1 }
        );
        // ldi r16, 0xFF
        assert_eq!(decode(0xEF0F, 0).unwrap(), Instruction::Ldi { d: Register::R16, k: 0xFF });
        // movw r24, r30
        assert_eq!(
            decode(0x01CF, 0).unwrap(),
            Instruction::Movw { d: Register::R24, r: Register::R30 }
        );
        // sbiw r28, 4
        assert_eq!(decode(0x9724, 0).unwrap(), Instruction::Sbiw { d: Register::R28, k: 4 });
    }

    #[test]
    fn test_decode_io() {
        // out 0x3D, r28 (SPL)
        assert_eq!(decode(0xBFCD, 0).unwrap(), Instruction::Out { a: 0x3D, r: Register::R28 });
        // in r28, 0x3D
        assert_eq!(decode(0xB7CD, 0).unwrap(), Instruction::In { d: Register::R28, a: 0x3D });
    }

    #[test]
    fn test_decode_displacement() {
        // ldd r24, Y+1
        assert_eq!(
            decode(0x8189, 0).unwrap(),
            Instruction::Ldd { d: Register::R24, ptr: Pointer::Y, q: 1 }
        );
        // std Z+63, r0
        assert_eq!(
            decode(0xAE07, 0).unwrap(),
            Instruction::Std { ptr: Pointer::Z, q: 63, r: Register::R0 }
        );
    }

    #[test]
    fn test_decode_sreg() {
        // sei = bset 7, cli = bclr 7
        assert_eq!(decode(0x9478, 0).unwrap(), Instruction::Bset { s: 7 });
        assert_eq!(decode(0x94F8, 0).unwrap(), Instruction::Bclr { s: 7 });
    }

    #[test]
    fn test_decode_reserved() {
        assert_eq!(decode(0xFFFF, 0), Err(DisassemblerError::UnknownOpcode(0xFFFF)));
        assert_eq!(decode(0x0001, 0), Err(DisassemblerError::UnknownOpcode(0x0001)));
        assert_eq!(decode(0x9003, 0), Err(DisassemblerError::UnknownOpcode(0x9003)));
    }

    #[test]
    fn test_is_long() {
        assert!(is_long(0x940C));
        assert!(is_long(0x940E));
        assert!(is_long(0x9380));
        assert!(is_long(0x9180));
        assert!(!is_long(0x930F));
        assert!(!is_long(0x9508));
    }

    #[test]
    fn test_decode_at_reads_second_word() {
        // call 0x0002 ; ret
        let image: &[u8] = &[0x0E, 0x94, 0x02, 0x00, 0x08, 0x95];
        assert_eq!(decode_at(image, 0).unwrap(), Instruction::Call { k: 2 });
        assert_eq!(decode_at(image, 2).unwrap(), Instruction::Ret);
        assert_eq!(decode_at(image, 3), Err(DisassemblerError::OutOfRange { pc: 3 }));
    }

    #[test]
    fn test_decode_at_truncated() {
        // jmp with its address word missing
        let image: &[u8] = &[0x0C, 0x94];
        assert_eq!(decode_at(image, 0), Err(DisassemblerError::Truncated { pc: 0 }));
    }
}
