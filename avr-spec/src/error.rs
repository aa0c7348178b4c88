//! # Error Types for AVR images

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvrError {
    // Record syntax errors
    #[error("Invalid HEX record at line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("Checksum mismatch at line {line}: expected {expected:#04x}, found {found:#04x}")]
    BadChecksum { line: usize, expected: u8, found: u8 },

    #[error("Record length mismatch at line {line}: header says {declared} bytes, found {found}")]
    LengthMismatch { line: usize, declared: usize, found: usize },

    #[error("Unsupported record type {kind:#04x} at line {line}")]
    UnsupportedRecordType { line: usize, kind: u8 },

    // Image structure errors
    #[error("Missing end-of-file record")]
    MissingEndOfFile,

    #[error("Record after end-of-file at line {line}")]
    RecordAfterEndOfFile { line: usize },

    #[error("Data at line {line} ends at byte {end:#x}, past the 8 MiB program memory")]
    ImageTooLarge { line: usize, end: usize },

    // I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AvrError>;

impl AvrError {
    /// Line of the offending record, if the error points at one
    pub fn line(&self) -> Option<usize> {
        match self {
            AvrError::InvalidRecord { line, .. }
            | AvrError::BadChecksum { line, .. }
            | AvrError::LengthMismatch { line, .. }
            | AvrError::UnsupportedRecordType { line, .. }
            | AvrError::RecordAfterEndOfFile { line }
            | AvrError::ImageTooLarge { line, .. } => Some(*line),
            AvrError::MissingEndOfFile | AvrError::IoError(_) => None,
        }
    }
}
