//! Instruction encoding to AVR opcode words
//!
//! Most instructions encode to a single 16-bit word; LDS, STS, JMP and CALL
//! carry a second word with the address. Operand fields are masked to their
//! encoded width, range checking happens in the parser.

use avr_spec::{Instruction, Pointer, PointerMode, Register};

/// Encode instruction to one or two opcode words
pub fn encode(instr: &Instruction) -> Vec<u16> {
    let first = first_word(instr);
    match *instr {
        Instruction::Lds { k, .. } | Instruction::Sts { k, .. } => vec![first, k],
        Instruction::Jmp { k } | Instruction::Call { k } => vec![first, k as u16],
        _ => vec![first],
    }
}

/// Encode instruction into little-endian bytes as they appear in flash
pub fn encode_bytes(instr: &Instruction) -> Vec<u8> {
    encode(instr).into_iter().flat_map(u16::to_le_bytes).collect()
}

fn first_word(instr: &Instruction) -> u16 {
    match *instr {
        Instruction::Nop => 0x0000,

        // ========== Two-register ==========
        Instruction::Cpc { d, r } => two_registers(0x0400, d, r),
        Instruction::Sbc { d, r } => two_registers(0x0800, d, r),
        Instruction::Add { d, r } => two_registers(0x0C00, d, r),
        Instruction::Cpse { d, r } => two_registers(0x1000, d, r),
        Instruction::Cp { d, r } => two_registers(0x1400, d, r),
        Instruction::Sub { d, r } => two_registers(0x1800, d, r),
        Instruction::Adc { d, r } => two_registers(0x1C00, d, r),
        Instruction::And { d, r } => two_registers(0x2000, d, r),
        Instruction::Eor { d, r } => two_registers(0x2400, d, r),
        Instruction::Or { d, r } => two_registers(0x2800, d, r),
        Instruction::Mov { d, r } => two_registers(0x2C00, d, r),
        Instruction::Mul { d, r } => two_registers(0x9C00, d, r),
        Instruction::Movw { d, r } => {
            0x0100 | ((reg(d) >> 1) & 0x0F) << 4 | ((reg(r) >> 1) & 0x0F)
        }

        // ========== Multiply (upper registers) ==========
        Instruction::Muls { d, r } => 0x0200 | upper(d) << 4 | upper(r),
        Instruction::Mulsu { d, r } => multiply_small(0x0300, d, r),
        Instruction::Fmul { d, r } => multiply_small(0x0308, d, r),
        Instruction::Fmuls { d, r } => multiply_small(0x0380, d, r),
        Instruction::Fmulsu { d, r } => multiply_small(0x0388, d, r),

        // ========== Register-immediate ==========
        Instruction::Cpi { d, k } => register_immediate(0x3000, d, k),
        Instruction::Sbci { d, k } => register_immediate(0x4000, d, k),
        Instruction::Subi { d, k } => register_immediate(0x5000, d, k),
        Instruction::Ori { d, k } => register_immediate(0x6000, d, k),
        Instruction::Andi { d, k } => register_immediate(0x7000, d, k),
        Instruction::Ldi { d, k } => register_immediate(0xE000, d, k),
        Instruction::Adiw { d, k } => word_immediate(0x9600, d, k),
        Instruction::Sbiw { d, k } => word_immediate(0x9700, d, k),

        // ========== One-operand ==========
        Instruction::Com { d } => 0x9400 | dst(d),
        Instruction::Neg { d } => 0x9401 | dst(d),
        Instruction::Swap { d } => 0x9402 | dst(d),
        Instruction::Inc { d } => 0x9403 | dst(d),
        Instruction::Asr { d } => 0x9405 | dst(d),
        Instruction::Lsr { d } => 0x9406 | dst(d),
        Instruction::Ror { d } => 0x9407 | dst(d),
        Instruction::Dec { d } => 0x940A | dst(d),

        // ========== Data transfer ==========
        Instruction::Lds { d, .. } => 0x9000 | dst(d),
        Instruction::Sts { r, .. } => 0x9200 | dst(r),
        Instruction::Ld { d, ptr: Pointer::X, mode } => 0x9000 | dst(d) | x_mode(mode),
        Instruction::Ld { d, ptr, mode: PointerMode::Plain } => displacement(0x8000, d, ptr, 0),
        Instruction::Ld { d, ptr, mode } => 0x9000 | dst(d) | yz_mode(ptr, mode),
        Instruction::St { ptr: Pointer::X, mode, r } => 0x9200 | dst(r) | x_mode(mode),
        Instruction::St { ptr, mode: PointerMode::Plain, r } => displacement(0x8200, r, ptr, 0),
        Instruction::St { ptr, mode, r } => 0x9200 | dst(r) | yz_mode(ptr, mode),
        Instruction::Ldd { d, ptr, q } => displacement(0x8000, d, ptr, q),
        Instruction::Std { ptr, q, r } => displacement(0x8200, r, ptr, q),
        Instruction::Lpm { d: Register::R0, post_increment: false } => 0x95C8,
        Instruction::Lpm { d, post_increment } => 0x9004 | dst(d) | post_increment as u16,
        Instruction::Elpm { d: Register::R0, post_increment: false } => 0x95D8,
        Instruction::Elpm { d, post_increment } => 0x9006 | dst(d) | post_increment as u16,
        Instruction::Spm { post_increment } => 0x95E8 | (post_increment as u16) << 4,
        Instruction::Xch { d } => 0x9204 | dst(d),
        Instruction::Las { d } => 0x9205 | dst(d),
        Instruction::Lac { d } => 0x9206 | dst(d),
        Instruction::Lat { d } => 0x9207 | dst(d),
        Instruction::In { d, a } => 0xB000 | dst(d) | io_address(a),
        Instruction::Out { a, r } => 0xB800 | dst(r) | io_address(a),

        // ========== Stack ==========
        Instruction::Push { r } => 0x920F | dst(r),
        Instruction::Pop { d } => 0x900F | dst(d),

        // ========== Bit ==========
        Instruction::Bset { s } => 0x9408 | ((s & 0x07) as u16) << 4,
        Instruction::Bclr { s } => 0x9488 | ((s & 0x07) as u16) << 4,
        Instruction::Bld { d, b } => 0xF800 | dst(d) | bit(b),
        Instruction::Bst { d, b } => 0xFA00 | dst(d) | bit(b),
        Instruction::Sbrc { r, b } => 0xFC00 | dst(r) | bit(b),
        Instruction::Sbrs { r, b } => 0xFE00 | dst(r) | bit(b),
        Instruction::Cbi { a, b } => io_bit(0x9800, a, b),
        Instruction::Sbic { a, b } => io_bit(0x9900, a, b),
        Instruction::Sbi { a, b } => io_bit(0x9A00, a, b),
        Instruction::Sbis { a, b } => io_bit(0x9B00, a, b),

        // ========== Branch ==========
        Instruction::Jmp { k } => 0x940C | long_high(k),
        Instruction::Call { k } => 0x940E | long_high(k),
        Instruction::Brbs { s, k } => 0xF000 | ((k as u16) & 0x7F) << 3 | ((s & 0x07) as u16),
        Instruction::Brbc { s, k } => 0xF400 | ((k as u16) & 0x7F) << 3 | ((s & 0x07) as u16),
        Instruction::Rjmp { k } => 0xC000 | ((k as u16) & 0x0FFF),
        Instruction::Rcall { k } => 0xD000 | ((k as u16) & 0x0FFF),
        Instruction::Ijmp => 0x9409,
        Instruction::Eijmp => 0x9419,
        Instruction::Icall => 0x9509,
        Instruction::Eicall => 0x9519,
        Instruction::Ret => 0x9508,
        Instruction::Reti => 0x9518,

        // ========== MCU control ==========
        Instruction::Sleep => 0x9588,
        Instruction::Break => 0x9598,
        Instruction::Wdr => 0x95A8,
        Instruction::Des { k } => 0x940B | ((k & 0x0F) as u16) << 4,
    }
}

// ========== Operand fields ==========

#[inline]
fn reg(r: Register) -> u16 {
    r.index() as u16
}

/// xxxx xxxd dddd xxxx
#[inline]
fn dst(r: Register) -> u16 {
    (reg(r) & 0x1F) << 4
}

/// Register number relative to r16
#[inline]
fn upper(r: Register) -> u16 {
    reg(r).wrapping_sub(16) & 0x0F
}

/// xxxx xxrd dddd rrrr
#[inline]
fn two_registers(base: u16, d: Register, r: Register) -> u16 {
    base | (reg(r) & 0x10) << 5 | dst(d) | (reg(r) & 0x0F)
}

/// xxxx xxxx xddd xrrr, d and r in r16-r23
#[inline]
fn multiply_small(base: u16, d: Register, r: Register) -> u16 {
    base | (upper(d) & 0x07) << 4 | (upper(r) & 0x07)
}

/// xxxx KKKK dddd KKKK
#[inline]
fn register_immediate(base: u16, d: Register, k: u8) -> u16 {
    let k = k as u16;
    base | (k & 0xF0) << 4 | upper(d) << 4 | (k & 0x0F)
}

/// xxxx xxxx KKdd KKKK, d in r24/r26/r28/r30
#[inline]
fn word_immediate(base: u16, d: Register, k: u8) -> u16 {
    let k = k as u16;
    let pair = (reg(d).wrapping_sub(24) >> 1) & 0x03;
    base | (k & 0x30) << 2 | pair << 4 | (k & 0x0F)
}

/// 10q0 qqsd dddd yqqq
#[inline]
fn displacement(base: u16, r: Register, ptr: Pointer, q: u8) -> u16 {
    let q = q as u16;
    let y = if ptr == Pointer::Y { 0x0008 } else { 0 };
    base | (q & 0x20) << 8 | (q & 0x18) << 7 | dst(r) | y | (q & 0x07)
}

#[inline]
fn x_mode(mode: PointerMode) -> u16 {
    match mode {
        PointerMode::Plain => 0xC,
        PointerMode::PostIncrement => 0xD,
        PointerMode::PreDecrement => 0xE,
    }
}

#[inline]
fn yz_mode(ptr: Pointer, mode: PointerMode) -> u16 {
    let y = if ptr == Pointer::Y { 0x8 } else { 0 };
    let mode = if mode == PointerMode::PreDecrement { 0x2 } else { 0x1 };
    y | mode
}

/// xxxx xAAx xxxx AAAA
#[inline]
fn io_address(a: u8) -> u16 {
    let a = a as u16;
    (a & 0x30) << 5 | (a & 0x0F)
}

#[inline]
fn io_bit(base: u16, a: u8, b: u8) -> u16 {
    base | ((a & 0x1F) as u16) << 3 | bit(b)
}

#[inline]
fn bit(b: u8) -> u16 {
    (b & 0x07) as u16
}

/// 1001 010k kkkk 11xk: bits 21..16 of a long address
#[inline]
fn long_high(k: u32) -> u16 {
    let high = ((k >> 16) & 0x3F) as u16;
    (high & 0x3E) << 3 | (high & 0x01)
}
