//! Assembly parser
//!
//! Source is split into lines of tokens. Each line carries any number of
//! `label:` definitions followed by at most one statement. Statements are
//! turned into instructions once the label table is known.
//!
//! Relative operands follow the disassembler's convention: `.+N` / `.-N`
//! is a byte offset from the following instruction, so `rjmp .-2` jumps to
//! itself. Numeric `jmp`/`call` targets are byte addresses.

use std::collections::HashMap;

use avr_spec::{Instruction, Pointer, PointerMode, Register};
use logos::Logos;

use crate::error::{AssemblerError, Result};
use crate::lexer::Token;

/// Label name to word address
pub type Labels = HashMap<String, u32>;

const BRBS_ALIASES: [&str; 8] = ["brcs", "breq", "brmi", "brvs", "brlt", "brhs", "brts", "brie"];
const BRBC_ALIASES: [&str; 8] = ["brcc", "brne", "brpl", "brvc", "brge", "brhc", "brtc", "brid"];
const BSET_ALIASES: [&str; 8] = ["sec", "sez", "sen", "sev", "ses", "seh", "set", "sei"];
const BCLR_ALIASES: [&str; 8] = ["clc", "clz", "cln", "clv", "cls", "clh", "clt", "cli"];

/// Parsed instruction operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    /// X, Y+, -Z
    Pointer(Pointer, PointerMode),
    /// Y+q, Z+q
    Displacement(Pointer, i64),
    Number(i64),
    Label(String),
    /// `.+N` / `.-N`, in bytes
    Relative(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Instruction { mnemonic: String, operands: Vec<Operand> },
    /// `.word` data
    Words(Vec<u16>),
}

impl Statement {
    /// Size in words
    pub fn width(&self) -> u32 {
        match self {
            Statement::Instruction { mnemonic, .. } => match mnemonic.as_str() {
                "lds" | "sts" | "jmp" | "call" => 2,
                _ => 1,
            },
            Statement::Words(words) => words.len() as u32,
        }
    }
}

/// One non-empty source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number
    pub number: usize,
    pub labels: Vec<String>,
    pub statement: Option<Statement>,
}

/// Tokenize and parse a whole source
pub fn parse_source(source: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    let mut tokens = Vec::new();
    let mut number = 1;
    let mut lexer = Token::lexer(source);

    while let Some(token) = lexer.next() {
        match token {
            Ok(Token::Newline) => {
                if !tokens.is_empty() {
                    lines.push(parse_line(number, &tokens)?);
                    tokens.clear();
                }
                number += 1;
            }
            Ok(token) => tokens.push(token),
            Err(_) => {
                return Err(AssemblerError::SyntaxError {
                    line: number,
                    message: format!("unexpected input '{}'", lexer.slice()),
                })
            }
        }
    }

    if !tokens.is_empty() {
        lines.push(parse_line(number, &tokens)?);
    }

    Ok(lines)
}

/// Parse a single instruction from assembly text
///
/// Label operands are rejected since there is no label table.
pub fn parse_instruction(text: &str) -> Result<Instruction> {
    let lines = parse_source(text)?;
    let statement = match lines.as_slice() {
        [Line { labels, statement: Some(statement), .. }] if labels.is_empty() => statement,
        _ => {
            return Err(AssemblerError::SyntaxError {
                line: 1,
                message: "expected a single instruction".to_string(),
            })
        }
    };

    match statement {
        Statement::Instruction { mnemonic, operands } => {
            build_instruction(mnemonic, operands, 0, &Labels::new(), 1)
        }
        Statement::Words(_) => Err(AssemblerError::SyntaxError {
            line: 1,
            message: "expected an instruction, found data".to_string(),
        }),
    }
}

/// Parse register name (`r0`..`r31`)
pub fn parse_register(name: &str) -> Result<Register> {
    register_name(name.trim()).ok_or_else(|| AssemblerError::InvalidRegister {
        line: 0,
        name: name.trim().to_string(),
    })
}

fn register_name(name: &str) -> Option<Register> {
    let digits = name.strip_prefix('r').or_else(|| name.strip_prefix('R'))?;
    if digits.is_empty()
        || (digits.len() > 1 && digits.starts_with('0'))
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Register::from_index(digits.parse().ok()?)
}

fn pointer_name(name: &str) -> Option<Pointer> {
    match name {
        "X" | "x" => Some(Pointer::X),
        "Y" | "y" => Some(Pointer::Y),
        "Z" | "z" => Some(Pointer::Z),
        _ => None,
    }
}

// ========== Line parsing ==========

fn parse_line(number: usize, tokens: &[Token]) -> Result<Line> {
    let mut cursor = Cursor { tokens, pos: 0, line: number };

    let mut labels = Vec::new();
    while let (Some(Token::Identifier(name)), Some(Token::Colon)) = (cursor.peek(0), cursor.peek(1)) {
        labels.push(name.clone());
        cursor.pos += 2;
    }

    let statement = match cursor.next() {
        None => None,
        Some(Token::Identifier(mnemonic)) => Some(Statement::Instruction {
            mnemonic: mnemonic.to_lowercase(),
            operands: cursor.operands()?,
        }),
        Some(Token::Directive(name)) => Some(cursor.directive(name)?),
        Some(token) => return Err(cursor.syntax(format!("expected instruction, found {:?}", token))),
    };

    Ok(Line { number, labels, statement })
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self, ahead: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn syntax(&self, message: impl Into<String>) -> AssemblerError {
        AssemblerError::SyntaxError { line: self.line, message: message.into() }
    }

    fn operands(&mut self) -> Result<Vec<Operand>> {
        let mut operands = Vec::new();
        if self.at_end() {
            return Ok(operands);
        }
        loop {
            operands.push(self.operand()?);
            match self.next() {
                None => return Ok(operands),
                Some(Token::Comma) => continue,
                Some(token) => return Err(self.syntax(format!("expected ',', found {:?}", token))),
            }
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Identifier(name)) => {
                if let Some(reg) = register_name(name) {
                    return Ok(Operand::Register(reg));
                }
                let Some(ptr) = pointer_name(name) else {
                    return Ok(Operand::Label(name.clone()));
                };
                if self.peek(0) != Some(&Token::Plus) {
                    return Ok(Operand::Pointer(ptr, PointerMode::Plain));
                }
                self.pos += 1;
                match self.peek(0).and_then(Token::number) {
                    Some(q) => {
                        self.pos += 1;
                        Ok(Operand::Displacement(ptr, q))
                    }
                    None => Ok(Operand::Pointer(ptr, PointerMode::PostIncrement)),
                }
            }
            Some(Token::Minus) => match self.next() {
                Some(Token::Identifier(name)) => pointer_name(name)
                    .map(|ptr| Operand::Pointer(ptr, PointerMode::PreDecrement))
                    .ok_or_else(|| self.syntax(format!("expected pointer after '-', found {}", name))),
                Some(token) => token
                    .number()
                    .map(|n| Operand::Number(-n))
                    .ok_or_else(|| self.syntax("expected number or pointer after '-'")),
                None => Err(self.syntax("unexpected end of line after '-'")),
            },
            Some(Token::Dot) => {
                let sign = match self.next() {
                    Some(Token::Plus) => 1,
                    Some(Token::Minus) => -1,
                    _ => return Err(self.syntax("expected '.+N' or '.-N'")),
                };
                let bytes = self
                    .next()
                    .and_then(Token::number)
                    .ok_or_else(|| self.syntax("expected byte offset after '.'"))?;
                Ok(Operand::Relative(sign * bytes))
            }
            Some(token) => token
                .number()
                .map(Operand::Number)
                .ok_or_else(|| self.syntax(format!("expected operand, found {:?}", token))),
            None => Err(self.syntax("expected operand")),
        }
    }

    fn directive(&mut self, name: &str) -> Result<Statement> {
        match name {
            "word" => {
                let mut words = Vec::new();
                for operand in self.operands()? {
                    match operand {
                        Operand::Number(n) if (-0x8000..=0xFFFF).contains(&n) => words.push(n as u16),
                        Operand::Number(n) => {
                            return Err(AssemblerError::OutOfRange {
                                line: self.line,
                                value: n,
                                min: -0x8000,
                                max: 0xFFFF,
                            })
                        }
                        other => return Err(self.syntax(format!(".word expects numbers, found {:?}", other))),
                    }
                }
                Ok(Statement::Words(words))
            }
            _ => Err(AssemblerError::InvalidDirective { line: self.line, name: name.to_string() }),
        }
    }
}

// ========== Instruction building ==========

/// Build an instruction from a parsed statement placed at word address `pc`
pub fn build_instruction(
    mnemonic: &str,
    operands: &[Operand],
    pc: u32,
    labels: &Labels,
    line: usize,
) -> Result<Instruction> {
    let ops = Operands { items: operands, pc, labels, line };

    if let Some(s) = alias_bit(&BRBS_ALIASES, mnemonic) {
        ops.count(1)?;
        return Ok(Instruction::Brbs { s, k: ops.relative(0, 7)? as i8 });
    }
    if let Some(s) = alias_bit(&BRBC_ALIASES, mnemonic) {
        ops.count(1)?;
        return Ok(Instruction::Brbc { s, k: ops.relative(0, 7)? as i8 });
    }
    if let Some(s) = alias_bit(&BSET_ALIASES, mnemonic) {
        ops.count(0)?;
        return Ok(Instruction::Bset { s });
    }
    if let Some(s) = alias_bit(&BCLR_ALIASES, mnemonic) {
        ops.count(0)?;
        return Ok(Instruction::Bclr { s });
    }

    let instr = match mnemonic {
        "nop" => ops.count(0).map(|_| Instruction::Nop)?,

        // ========== Two-register ==========
        "add" => ops.two_registers().map(|(d, r)| Instruction::Add { d, r })?,
        "adc" => ops.two_registers().map(|(d, r)| Instruction::Adc { d, r })?,
        "sub" => ops.two_registers().map(|(d, r)| Instruction::Sub { d, r })?,
        "sbc" => ops.two_registers().map(|(d, r)| Instruction::Sbc { d, r })?,
        "and" => ops.two_registers().map(|(d, r)| Instruction::And { d, r })?,
        "or" => ops.two_registers().map(|(d, r)| Instruction::Or { d, r })?,
        "eor" => ops.two_registers().map(|(d, r)| Instruction::Eor { d, r })?,
        "cp" => ops.two_registers().map(|(d, r)| Instruction::Cp { d, r })?,
        "cpc" => ops.two_registers().map(|(d, r)| Instruction::Cpc { d, r })?,
        "cpse" => ops.two_registers().map(|(d, r)| Instruction::Cpse { d, r })?,
        "mov" => ops.two_registers().map(|(d, r)| Instruction::Mov { d, r })?,
        "mul" => ops.two_registers().map(|(d, r)| Instruction::Mul { d, r })?,
        "movw" => {
            let (d, r) = ops.two_registers()?;
            ops.even(d)?;
            ops.even(r)?;
            Instruction::Movw { d, r }
        }
        "muls" => {
            let (d, r) = ops.two_registers()?;
            ops.register_between(d, 16, 31)?;
            ops.register_between(r, 16, 31)?;
            Instruction::Muls { d, r }
        }
        "mulsu" | "fmul" | "fmuls" | "fmulsu" => {
            let (d, r) = ops.two_registers()?;
            ops.register_between(d, 16, 23)?;
            ops.register_between(r, 16, 23)?;
            match mnemonic {
                "mulsu" => Instruction::Mulsu { d, r },
                "fmul" => Instruction::Fmul { d, r },
                "fmuls" => Instruction::Fmuls { d, r },
                _ => Instruction::Fmulsu { d, r },
            }
        }

        // Single-register aliases of two-register forms
        "clr" => ops.one_register().map(|d| Instruction::Eor { d, r: d })?,
        "lsl" => ops.one_register().map(|d| Instruction::Add { d, r: d })?,
        "rol" => ops.one_register().map(|d| Instruction::Adc { d, r: d })?,
        "tst" => ops.one_register().map(|d| Instruction::And { d, r: d })?,

        // ========== Register-immediate ==========
        "cpi" => ops.upper_immediate().map(|(d, k)| Instruction::Cpi { d, k })?,
        "sbci" => ops.upper_immediate().map(|(d, k)| Instruction::Sbci { d, k })?,
        "subi" => ops.upper_immediate().map(|(d, k)| Instruction::Subi { d, k })?,
        "ori" | "sbr" => ops.upper_immediate().map(|(d, k)| Instruction::Ori { d, k })?,
        "andi" => ops.upper_immediate().map(|(d, k)| Instruction::Andi { d, k })?,
        "cbr" => ops.upper_immediate().map(|(d, k)| Instruction::Andi { d, k: !k })?,
        "ldi" => ops.upper_immediate().map(|(d, k)| Instruction::Ldi { d, k })?,
        "ser" => {
            let d = ops.one_register()?;
            ops.register_between(d, 16, 31)?;
            Instruction::Ldi { d, k: 0xFF }
        }
        "adiw" | "sbiw" => {
            ops.count(2)?;
            let d = ops.register(0)?;
            if !matches!(d.index(), 24 | 26 | 28 | 30) {
                return Err(ops.invalid(format!("{} expects r24, r26, r28 or r30, found {}", mnemonic, d)));
            }
            let k = ops.value(1, 0, 63)? as u8;
            if mnemonic == "adiw" {
                Instruction::Adiw { d, k }
            } else {
                Instruction::Sbiw { d, k }
            }
        }

        // ========== One-operand ==========
        "com" => ops.one_register().map(|d| Instruction::Com { d })?,
        "neg" => ops.one_register().map(|d| Instruction::Neg { d })?,
        "swap" => ops.one_register().map(|d| Instruction::Swap { d })?,
        "inc" => ops.one_register().map(|d| Instruction::Inc { d })?,
        "dec" => ops.one_register().map(|d| Instruction::Dec { d })?,
        "asr" => ops.one_register().map(|d| Instruction::Asr { d })?,
        "lsr" => ops.one_register().map(|d| Instruction::Lsr { d })?,
        "ror" => ops.one_register().map(|d| Instruction::Ror { d })?,

        // ========== Data transfer ==========
        "ld" => {
            ops.count(2)?;
            let d = ops.register(0)?;
            match ops.pointer(1)? {
                (ptr, PointerMode::Plain) if ptr != Pointer::X => Instruction::Ldd { d, ptr, q: 0 },
                (ptr, mode) => Instruction::Ld { d, ptr, mode },
            }
        }
        "st" => {
            ops.count(2)?;
            let r = ops.register(1)?;
            match ops.pointer(0)? {
                (ptr, PointerMode::Plain) if ptr != Pointer::X => Instruction::Std { ptr, q: 0, r },
                (ptr, mode) => Instruction::St { ptr, mode, r },
            }
        }
        "ldd" => {
            ops.count(2)?;
            let d = ops.register(0)?;
            let (ptr, q) = ops.displacement(1)?;
            Instruction::Ldd { d, ptr, q }
        }
        "std" => {
            ops.count(2)?;
            let (ptr, q) = ops.displacement(0)?;
            let r = ops.register(1)?;
            Instruction::Std { ptr, q, r }
        }
        "lds" => {
            ops.count(2)?;
            let d = ops.register(0)?;
            Instruction::Lds { d, k: ops.value(1, 0, 0xFFFF)? as u16 }
        }
        "sts" => {
            ops.count(2)?;
            let k = ops.value(0, 0, 0xFFFF)? as u16;
            Instruction::Sts { k, r: ops.register(1)? }
        }
        "lpm" | "elpm" => {
            let (d, post_increment) = if operands.is_empty() {
                (Register::R0, false)
            } else {
                ops.count(2)?;
                (ops.register(0)?, ops.z_pointer(1)?)
            };
            if mnemonic == "lpm" {
                Instruction::Lpm { d, post_increment }
            } else {
                Instruction::Elpm { d, post_increment }
            }
        }
        "spm" => {
            let post_increment = if operands.is_empty() {
                false
            } else {
                ops.count(1)?;
                ops.z_pointer(0)?
            };
            Instruction::Spm { post_increment }
        }
        "xch" | "las" | "lac" | "lat" => {
            ops.count(2)?;
            if ops.z_pointer(0)? {
                return Err(ops.invalid(format!("{} expects Z, found Z+", mnemonic)));
            }
            let d = ops.register(1)?;
            match mnemonic {
                "xch" => Instruction::Xch { d },
                "las" => Instruction::Las { d },
                "lac" => Instruction::Lac { d },
                _ => Instruction::Lat { d },
            }
        }
        "in" => {
            ops.count(2)?;
            let d = ops.register(0)?;
            Instruction::In { d, a: ops.value(1, 0, 63)? as u8 }
        }
        "out" => {
            ops.count(2)?;
            let a = ops.value(0, 0, 63)? as u8;
            Instruction::Out { a, r: ops.register(1)? }
        }

        // ========== Stack ==========
        "push" => ops.one_register().map(|r| Instruction::Push { r })?,
        "pop" => ops.one_register().map(|d| Instruction::Pop { d })?,

        // ========== Bit ==========
        "bset" | "bclr" => {
            ops.count(1)?;
            let s = ops.value(0, 0, 7)? as u8;
            if mnemonic == "bset" {
                Instruction::Bset { s }
            } else {
                Instruction::Bclr { s }
            }
        }
        "bld" | "bst" | "sbrc" | "sbrs" => {
            ops.count(2)?;
            let reg = ops.register(0)?;
            let b = ops.value(1, 0, 7)? as u8;
            match mnemonic {
                "bld" => Instruction::Bld { d: reg, b },
                "bst" => Instruction::Bst { d: reg, b },
                "sbrc" => Instruction::Sbrc { r: reg, b },
                _ => Instruction::Sbrs { r: reg, b },
            }
        }
        "sbi" | "cbi" | "sbic" | "sbis" => {
            ops.count(2)?;
            let a = ops.value(0, 0, 31)? as u8;
            let b = ops.value(1, 0, 7)? as u8;
            match mnemonic {
                "sbi" => Instruction::Sbi { a, b },
                "cbi" => Instruction::Cbi { a, b },
                "sbic" => Instruction::Sbic { a, b },
                _ => Instruction::Sbis { a, b },
            }
        }

        // ========== Branch ==========
        "brbs" | "brbc" => {
            ops.count(2)?;
            let s = ops.value(0, 0, 7)? as u8;
            let k = ops.relative(1, 7)? as i8;
            if mnemonic == "brbs" {
                Instruction::Brbs { s, k }
            } else {
                Instruction::Brbc { s, k }
            }
        }
        "brlo" => ops.count(1).and_then(|_| ops.relative(0, 7)).map(|k| Instruction::Brbs { s: 0, k: k as i8 })?,
        "brsh" => ops.count(1).and_then(|_| ops.relative(0, 7)).map(|k| Instruction::Brbc { s: 0, k: k as i8 })?,
        "rjmp" => ops.count(1).and_then(|_| ops.relative(0, 12)).map(|k| Instruction::Rjmp { k: k as i16 })?,
        "rcall" => ops.count(1).and_then(|_| ops.relative(0, 12)).map(|k| Instruction::Rcall { k: k as i16 })?,
        "jmp" => ops.count(1).and_then(|_| ops.absolute(0)).map(|k| Instruction::Jmp { k })?,
        "call" => ops.count(1).and_then(|_| ops.absolute(0)).map(|k| Instruction::Call { k })?,
        "ijmp" => ops.count(0).map(|_| Instruction::Ijmp)?,
        "eijmp" => ops.count(0).map(|_| Instruction::Eijmp)?,
        "icall" => ops.count(0).map(|_| Instruction::Icall)?,
        "eicall" => ops.count(0).map(|_| Instruction::Eicall)?,
        "ret" => ops.count(0).map(|_| Instruction::Ret)?,
        "reti" => ops.count(0).map(|_| Instruction::Reti)?,

        // ========== MCU control ==========
        "sleep" => ops.count(0).map(|_| Instruction::Sleep)?,
        "break" => ops.count(0).map(|_| Instruction::Break)?,
        "wdr" => ops.count(0).map(|_| Instruction::Wdr)?,
        "des" => ops.count(1).and_then(|_| ops.value(0, 0, 15)).map(|k| Instruction::Des { k: k as u8 })?,

        _ => {
            return Err(AssemblerError::UnknownInstruction {
                line,
                mnemonic: mnemonic.to_string(),
            })
        }
    };

    Ok(instr)
}

fn alias_bit(aliases: &[&str; 8], mnemonic: &str) -> Option<u8> {
    aliases.iter().position(|alias| *alias == mnemonic).map(|s| s as u8)
}

/// Operands of one statement with the context needed to resolve them
struct Operands<'a> {
    items: &'a [Operand],
    pc: u32,
    labels: &'a Labels,
    line: usize,
}

impl Operands<'_> {
    fn invalid(&self, message: impl Into<String>) -> AssemblerError {
        AssemblerError::InvalidOperand { line: self.line, message: message.into() }
    }

    fn out_of_range(&self, value: i64, min: i64, max: i64) -> AssemblerError {
        AssemblerError::OutOfRange { line: self.line, value, min, max }
    }

    fn count(&self, expected: usize) -> Result<()> {
        if self.items.len() != expected {
            return Err(self.invalid(format!(
                "expected {} operand(s), found {}",
                expected,
                self.items.len()
            )));
        }
        Ok(())
    }

    fn get(&self, index: usize) -> Result<&Operand> {
        self.items
            .get(index)
            .ok_or_else(|| self.invalid(format!("missing operand {}", index + 1)))
    }

    fn register(&self, index: usize) -> Result<Register> {
        match self.get(index)? {
            Operand::Register(reg) => Ok(*reg),
            Operand::Label(name) => Err(AssemblerError::InvalidRegister {
                line: self.line,
                name: name.clone(),
            }),
            other => Err(self.invalid(format!("expected register, found {:?}", other))),
        }
    }

    fn one_register(&self) -> Result<Register> {
        self.count(1)?;
        self.register(0)
    }

    fn two_registers(&self) -> Result<(Register, Register)> {
        self.count(2)?;
        Ok((self.register(0)?, self.register(1)?))
    }

    fn register_between(&self, reg: Register, low: u8, high: u8) -> Result<()> {
        if !(low..=high).contains(&reg.index()) {
            return Err(self.invalid(format!("{} not allowed, expected r{}-r{}", reg, low, high)));
        }
        Ok(())
    }

    fn even(&self, reg: Register) -> Result<()> {
        if reg.index() % 2 != 0 {
            return Err(self.invalid(format!("{} is not an even register", reg)));
        }
        Ok(())
    }

    /// Register r16-r31 and an 8-bit constant (negative values wrap)
    fn upper_immediate(&self) -> Result<(Register, u8)> {
        self.count(2)?;
        let d = self.register(0)?;
        self.register_between(d, 16, 31)?;
        let k = self.value(1, -128, 255)?;
        Ok((d, k as u8))
    }

    fn value(&self, index: usize, min: i64, max: i64) -> Result<i64> {
        match self.get(index)? {
            Operand::Number(n) if (min..=max).contains(n) => Ok(*n),
            Operand::Number(n) => Err(self.out_of_range(*n, min, max)),
            other => Err(self.invalid(format!("expected number, found {:?}", other))),
        }
    }

    fn pointer(&self, index: usize) -> Result<(Pointer, PointerMode)> {
        match self.get(index)? {
            Operand::Pointer(ptr, mode) => Ok((*ptr, *mode)),
            Operand::Displacement(ptr, 0) => Ok((*ptr, PointerMode::Plain)),
            other => Err(self.invalid(format!("expected X, Y or Z pointer, found {:?}", other))),
        }
    }

    fn displacement(&self, index: usize) -> Result<(Pointer, u8)> {
        match self.get(index)? {
            Operand::Displacement(Pointer::X, _) => Err(self.invalid("X has no displacement form")),
            Operand::Displacement(ptr, q) if (0..=63).contains(q) => Ok((*ptr, *q as u8)),
            Operand::Displacement(_, q) => Err(self.out_of_range(*q, 0, 63)),
            other => Err(self.invalid(format!("expected Y+q or Z+q, found {:?}", other))),
        }
    }

    /// Z or Z+, returning whether the pointer post-increments
    fn z_pointer(&self, index: usize) -> Result<bool> {
        match self.get(index)? {
            Operand::Pointer(Pointer::Z, PointerMode::Plain) => Ok(false),
            Operand::Pointer(Pointer::Z, PointerMode::PostIncrement) => Ok(true),
            other => Err(self.invalid(format!("expected Z or Z+, found {:?}", other))),
        }
    }

    /// Word offset from the following instruction, range-checked to `bits`
    fn relative(&self, index: usize, bits: u32) -> Result<i64> {
        let words = match self.get(index)? {
            Operand::Relative(bytes) if bytes % 2 == 0 => bytes / 2,
            Operand::Relative(bytes) => {
                return Err(self.invalid(format!("odd byte offset {}", bytes)))
            }
            Operand::Label(name) => self.label(name)? as i64 - (self.pc as i64 + 1),
            other => return Err(self.invalid(format!("expected label or .+N, found {:?}", other))),
        };

        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        if !(min..=max).contains(&words) {
            return Err(self.out_of_range(words, min, max));
        }
        Ok(words)
    }

    /// Word address for JMP/CALL; numeric operands are byte addresses
    fn absolute(&self, index: usize) -> Result<u32> {
        match self.get(index)? {
            Operand::Label(name) => self.label(name),
            Operand::Number(n) if n % 2 != 0 => Err(self.invalid(format!("odd byte address {}", n))),
            Operand::Number(n) if (0..=0x7F_FFFE).contains(n) => Ok((n / 2) as u32),
            Operand::Number(n) => Err(self.out_of_range(*n, 0, 0x7F_FFFE)),
            other => Err(self.invalid(format!("expected label or address, found {:?}", other))),
        }
    }

    fn label(&self, name: &str) -> Result<u32> {
        self.labels.get(name).copied().ok_or_else(|| AssemblerError::UndefinedLabel {
            line: self.line,
            label: name.to_string(),
        })
    }
}
