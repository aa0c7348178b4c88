//! Assembler errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("Unknown instruction at line {line}: {mnemonic}")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("Invalid register at line {line}: {name}")]
    InvalidRegister { line: usize, name: String },

    #[error("Invalid operand at line {line}: {message}")]
    InvalidOperand { line: usize, message: String },

    #[error("Value {value} out of range [{min}, {max}] at line {line}")]
    OutOfRange { line: usize, value: i64, min: i64, max: i64 },

    #[error("Undefined label at line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("Duplicate label at line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("Invalid directive at line {line}: .{name}")]
    InvalidDirective { line: usize, name: String },
}

impl AssemblerError {
    /// Source line (1-based) the error was reported for
    pub fn line(&self) -> usize {
        match self {
            AssemblerError::SyntaxError { line, .. }
            | AssemblerError::UnknownInstruction { line, .. }
            | AssemblerError::InvalidRegister { line, .. }
            | AssemblerError::InvalidOperand { line, .. }
            | AssemblerError::OutOfRange { line, .. }
            | AssemblerError::UndefinedLabel { line, .. }
            | AssemblerError::DuplicateLabel { line, .. }
            | AssemblerError::InvalidDirective { line, .. } => *line,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
