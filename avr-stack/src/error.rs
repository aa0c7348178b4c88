//! Analysis error types

use avr_disassembler::DisassemblerError;
use avr_spec::{AvrError, Instruction, Pc};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unsupported instruction at PC {pc:#06x}: {}", avr_disassembler::format(.instruction))]
    UnsupportedInstruction { pc: Pc, instruction: Instruction },

    #[error("Malformed image at PC {pc:#06x}: {source}")]
    Decode {
        pc: Pc,
        #[source]
        source: DisassemblerError,
    },

    #[error("Image error: {0}")]
    Image(#[from] AvrError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Program counter the error points at, if any
    pub fn pc(&self) -> Option<Pc> {
        match self {
            AnalysisError::UnsupportedInstruction { pc, .. } | AnalysisError::Decode { pc, .. } => {
                Some(*pc)
            }
            AnalysisError::Image(_) | AnalysisError::InvalidConfig(_) => None,
        }
    }
}
