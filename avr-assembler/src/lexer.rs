//! # Lexer for AVR Assembly Language

use logos::Logos;

/// Tokens for AVR assembly
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Skip whitespace (not newlines)
#[logos(skip r";[^\n]*")] // Skip comments
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// Identifier (mnemonics, registers, pointer names, labels)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    /// Decimal number
    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    Number(i64),

    /// Hexadecimal number
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| i64::from_str_radix(&lex.slice()[2..], 16).ok())]
    Hex(i64),

    /// Binary number
    #[regex(r"0[bB][01]+", |lex| i64::from_str_radix(&lex.slice()[2..], 2).ok())]
    Binary(i64),

    /// Directive (.word)
    #[regex(r"\.[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Directive(String),

    /// Location counter in relative operands (`.+4`)
    #[token(".")]
    Dot,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token(",")]
    Comma,

    /// Colon (for labels)
    #[token(":")]
    Colon,

    #[token("\n")]
    Newline,
}

impl Token {
    /// Numeric value of a number token
    pub fn number(&self) -> Option<i64> {
        match self {
            Token::Number(n) | Token::Hex(n) | Token::Binary(n) => Some(*n),
            _ => None,
        }
    }
}
