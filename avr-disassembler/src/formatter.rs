//! Instruction formatting to assembly text
//!
//! Output follows avr-objdump conventions: relative branch offsets are
//! written in bytes from the following instruction (`rjmp .-2` jumps to
//! itself), absolute targets as byte addresses.

use avr_spec::{Instruction, Pointer, PointerMode, Register};

const BRBS_ALIASES: [&str; 8] = ["brcs", "breq", "brmi", "brvs", "brlt", "brhs", "brts", "brie"];
const BRBC_ALIASES: [&str; 8] = ["brcc", "brne", "brpl", "brvc", "brge", "brhc", "brtc", "brid"];
const BSET_ALIASES: [&str; 8] = ["sec", "sez", "sen", "sev", "ses", "seh", "set", "sei"];
const BCLR_ALIASES: [&str; 8] = ["clc", "clz", "cln", "clv", "cls", "clh", "clt", "cli"];

/// Format instruction as assembly text
pub fn format(instr: &Instruction) -> String {
    match *instr {
        Instruction::Nop => "nop".to_string(),

        // ========== Two-register ==========
        Instruction::Add { d, r } => two_reg("add", d, r),
        Instruction::Adc { d, r } => two_reg("adc", d, r),
        Instruction::Sub { d, r } => two_reg("sub", d, r),
        Instruction::Sbc { d, r } => two_reg("sbc", d, r),
        Instruction::And { d, r } => two_reg("and", d, r),
        Instruction::Or { d, r } => two_reg("or", d, r),
        Instruction::Eor { d, r } => two_reg("eor", d, r),
        Instruction::Cp { d, r } => two_reg("cp", d, r),
        Instruction::Cpc { d, r } => two_reg("cpc", d, r),
        Instruction::Cpse { d, r } => two_reg("cpse", d, r),
        Instruction::Mov { d, r } => two_reg("mov", d, r),
        Instruction::Movw { d, r } => two_reg("movw", d, r),
        Instruction::Mul { d, r } => two_reg("mul", d, r),
        Instruction::Muls { d, r } => two_reg("muls", d, r),
        Instruction::Mulsu { d, r } => two_reg("mulsu", d, r),
        Instruction::Fmul { d, r } => two_reg("fmul", d, r),
        Instruction::Fmuls { d, r } => two_reg("fmuls", d, r),
        Instruction::Fmulsu { d, r } => two_reg("fmulsu", d, r),

        // ========== Immediate ==========
        Instruction::Cpi { d, k } => reg_imm("cpi", d, k),
        Instruction::Sbci { d, k } => reg_imm("sbci", d, k),
        Instruction::Subi { d, k } => reg_imm("subi", d, k),
        Instruction::Ori { d, k } => reg_imm("ori", d, k),
        Instruction::Andi { d, k } => reg_imm("andi", d, k),
        Instruction::Ldi { d, k } => reg_imm("ldi", d, k),
        Instruction::Adiw { d, k } => format!("adiw {}, {}", d, k),
        Instruction::Sbiw { d, k } => format!("sbiw {}, {}", d, k),

        // ========== One-operand ==========
        Instruction::Com { d } => format!("com {}", d),
        Instruction::Neg { d } => format!("neg {}", d),
        Instruction::Swap { d } => format!("swap {}", d),
        Instruction::Inc { d } => format!("inc {}", d),
        Instruction::Dec { d } => format!("dec {}", d),
        Instruction::Asr { d } => format!("asr {}", d),
        Instruction::Lsr { d } => format!("lsr {}", d),
        Instruction::Ror { d } => format!("ror {}", d),

        // ========== Data transfer ==========
        Instruction::Ld { d, ptr, mode } => format!("ld {}, {}", d, pointer(ptr, mode)),
        Instruction::St { ptr, mode, r } => format!("st {}, {}", pointer(ptr, mode), r),
        Instruction::Ldd { d, ptr, q: 0 } => format!("ld {}, {}", d, ptr),
        Instruction::Ldd { d, ptr, q } => format!("ldd {}, {}+{}", d, ptr, q),
        Instruction::Std { ptr, q: 0, r } => format!("st {}, {}", ptr, r),
        Instruction::Std { ptr, q, r } => format!("std {}+{}, {}", ptr, q, r),
        Instruction::Lds { d, k } => format!("lds {}, 0x{:04X}", d, k),
        Instruction::Sts { k, r } => format!("sts 0x{:04X}, {}", k, r),
        Instruction::Lpm { d: Register::R0, post_increment: false } => "lpm".to_string(),
        Instruction::Lpm { d, post_increment } => format!("lpm {}, {}", d, z_operand(post_increment)),
        Instruction::Elpm { d: Register::R0, post_increment: false } => "elpm".to_string(),
        Instruction::Elpm { d, post_increment } => format!("elpm {}, {}", d, z_operand(post_increment)),
        Instruction::Spm { post_increment: false } => "spm".to_string(),
        Instruction::Spm { post_increment: true } => "spm Z+".to_string(),
        Instruction::Xch { d } => format!("xch Z, {}", d),
        Instruction::Las { d } => format!("las Z, {}", d),
        Instruction::Lac { d } => format!("lac Z, {}", d),
        Instruction::Lat { d } => format!("lat Z, {}", d),
        Instruction::In { d, a } => format!("in {}, 0x{:02X}", d, a),
        Instruction::Out { a, r } => format!("out 0x{:02X}, {}", a, r),

        // ========== Stack ==========
        Instruction::Push { r } => format!("push {}", r),
        Instruction::Pop { d } => format!("pop {}", d),

        // ========== Bit ==========
        Instruction::Bset { s } => BSET_ALIASES[(s & 7) as usize].to_string(),
        Instruction::Bclr { s } => BCLR_ALIASES[(s & 7) as usize].to_string(),
        Instruction::Bld { d, b } => format!("bld {}, {}", d, b),
        Instruction::Bst { d, b } => format!("bst {}, {}", d, b),
        Instruction::Sbi { a, b } => format!("sbi 0x{:02X}, {}", a, b),
        Instruction::Cbi { a, b } => format!("cbi 0x{:02X}, {}", a, b),
        Instruction::Sbrc { r, b } => format!("sbrc {}, {}", r, b),
        Instruction::Sbrs { r, b } => format!("sbrs {}, {}", r, b),
        Instruction::Sbic { a, b } => format!("sbic 0x{:02X}, {}", a, b),
        Instruction::Sbis { a, b } => format!("sbis 0x{:02X}, {}", a, b),

        // ========== Branch ==========
        Instruction::Brbs { s, k } => {
            format!("{} {}", BRBS_ALIASES[(s & 7) as usize], relative(k as i32))
        }
        Instruction::Brbc { s, k } => {
            format!("{} {}", BRBC_ALIASES[(s & 7) as usize], relative(k as i32))
        }
        Instruction::Rjmp { k } => format!("rjmp {}", relative(k as i32)),
        Instruction::Rcall { k } => format!("rcall {}", relative(k as i32)),
        Instruction::Jmp { k } => format!("jmp 0x{:X}", k as u64 * 2),
        Instruction::Call { k } => format!("call 0x{:X}", k as u64 * 2),
        Instruction::Ijmp => "ijmp".to_string(),
        Instruction::Eijmp => "eijmp".to_string(),
        Instruction::Icall => "icall".to_string(),
        Instruction::Eicall => "eicall".to_string(),
        Instruction::Ret => "ret".to_string(),
        Instruction::Reti => "reti".to_string(),

        // ========== MCU control ==========
        Instruction::Sleep => "sleep".to_string(),
        Instruction::Break => "break".to_string(),
        Instruction::Wdr => "wdr".to_string(),
        Instruction::Des { k } => format!("des {}", k),
    }
}

fn two_reg(mnemonic: &str, d: Register, r: Register) -> String {
    format!("{} {}, {}", mnemonic, d, r)
}

fn reg_imm(mnemonic: &str, d: Register, k: u8) -> String {
    format!("{} {}, 0x{:02X}", mnemonic, d, k)
}

fn pointer(ptr: Pointer, mode: PointerMode) -> String {
    match mode {
        PointerMode::Plain => ptr.to_string(),
        PointerMode::PostIncrement => format!("{}+", ptr),
        PointerMode::PreDecrement => format!("-{}", ptr),
    }
}

fn z_operand(post_increment: bool) -> &'static str {
    if post_increment {
        "Z+"
    } else {
        "Z"
    }
}

/// Word offset from the following instruction, written in bytes
fn relative(words: i32) -> String {
    let bytes = words * 2;
    if bytes < 0 {
        format!(".-{}", -bytes)
    } else {
        format!(".+{}", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stack_ops() {
        assert_eq!(format(&Instruction::Push { r: Register::R16 }), "push r16");
        assert_eq!(format(&Instruction::Pop { d: Register::R29 }), "pop r29");
        assert_eq!(format(&Instruction::Ret), "ret");
    }

    #[test]
    fn test_format_relative() {
        assert_eq!(format(&Instruction::Rjmp { k: -1 }), "rjmp .-2");
        assert_eq!(format(&Instruction::Rjmp { k: 0 }), "rjmp .+0");
        assert_eq!(format(&Instruction::Rcall { k: 3 }), "rcall .+6");
        assert_eq!(format(&Instruction::Brbs { s: 1, k: 1 }), "breq .+2");
        assert_eq!(format(&Instruction::Brbc { s: 4, k: -3 }), "brge .-6");
    }

    #[test]
    fn test_format_absolute() {
        assert_eq!(format(&Instruction::Call { k: 0x34 }), "call 0x68");
        assert_eq!(format(&Instruction::Jmp { k: 0 }), "jmp 0x0");
        assert_eq!(
            format(&Instruction::Sts { k: 0x0100, r: Register::R24 }),
            "sts 0x0100, r24"
        );
    }

    #[test]
    fn test_format_pointer_modes() {
        let ld = Instruction::Ld { d: Register::R24, ptr: Pointer::X, mode: PointerMode::PostIncrement };
        assert_eq!(format(&ld), "ld r24, X+");
        let st = Instruction::St { ptr: Pointer::Y, mode: PointerMode::PreDecrement, r: Register::R0 };
        assert_eq!(format(&st), "st -Y, r0");
        let ldd = Instruction::Ldd { d: Register::R24, ptr: Pointer::Y, q: 0 };
        assert_eq!(format(&ldd), "ld r24, Y");
        let ldd = Instruction::Ldd { d: Register::R24, ptr: Pointer::Z, q: 5 };
        assert_eq!(format(&ldd), "ldd r24, Z+5");
    }

    #[test]
    fn test_format_sreg_aliases() {
        assert_eq!(format(&Instruction::Bset { s: 7 }), "sei");
        assert_eq!(format(&Instruction::Bclr { s: 7 }), "cli");
    }
}
