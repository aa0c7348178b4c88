//! # Analysis Configuration
//!
//! Entry point, exploration budgets, the return-address size pushed by calls
//! and the memo's revisit policy.

use avr_spec::{Pc, RESET_VECTOR, RETURN_ADDRESS_BYTES, RETURN_ADDRESS_BYTES_22BIT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the memo treats a state reached again off the active path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisitPolicy {
    /// Explore each (instruction, next) state once; a later arrival at a
    /// greater height makes the result unbounded
    FirstVisit,
    /// Re-explore a state whenever it is reached with a strictly greater height
    #[default]
    HigherHeight,
}

impl fmt::Display for RevisitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisitPolicy::FirstVisit => write!(f, "first-visit"),
            RevisitPolicy::HigherHeight => write!(f, "higher-height"),
        }
    }
}

/// Stack analysis configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Word address the exploration starts from
    pub entry_point: Pc,

    /// Maximum number of explored steps before the result is declared unbounded
    pub max_steps: u64,

    /// Maximum number of states on the active exploration path
    pub max_depth: usize,

    /// Bytes pushed by CALL/RCALL (2, or 3 on devices with a 22-bit PC)
    pub return_address_bytes: u8,

    /// Memo revisit policy
    pub revisit: RevisitPolicy,
}

impl AnalysisConfig {
    /// Default configuration
    /// - Entry point: reset vector (0)
    /// - Step budget: 1,000,000
    /// - Depth budget: 100,000
    /// - Return address: 2 bytes
    /// - Revisit policy: higher height
    pub const DEFAULT: Self = Self {
        entry_point: RESET_VECTOR,
        max_steps: 1_000_000,
        max_depth: 100_000,
        return_address_bytes: RETURN_ADDRESS_BYTES,
        revisit: RevisitPolicy::HigherHeight,
    };

    /// Create a new configuration with validation
    pub const fn new(
        entry_point: Pc,
        max_steps: u64,
        max_depth: usize,
        return_address_bytes: u8,
        revisit: RevisitPolicy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            entry_point,
            max_steps,
            max_depth,
            return_address_bytes,
            revisit,
        };

        if return_address_bytes != RETURN_ADDRESS_BYTES
            && return_address_bytes != RETURN_ADDRESS_BYTES_22BIT
        {
            return Err(ConfigError::InvalidReturnAddressBytes);
        }
        if max_steps == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        if max_depth == 0 {
            return Err(ConfigError::ZeroDepthBudget);
        }

        Ok(config)
    }

    pub fn with_entry_point(mut self, entry_point: Pc) -> Self {
        self.entry_point = entry_point;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_return_address_bytes(mut self, bytes: u8) -> Self {
        self.return_address_bytes = bytes;
        self
    }

    pub fn with_revisit(mut self, revisit: RevisitPolicy) -> Self {
        self.revisit = revisit;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(
            self.entry_point,
            self.max_steps,
            self.max_depth,
            self.return_address_bytes,
            self.revisit,
        )
        .map(|_| ())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisConfig {{ entry: {:#06x}, max_steps: {}, max_depth: {}, return address: {} bytes, revisit: {} }}",
            self.entry_point,
            self.max_steps,
            self.max_depth,
            self.return_address_bytes,
            self.revisit,
        )
    }
}

/// Configuration error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Return address size must be 2 or 3 bytes
    InvalidReturnAddressBytes,
    /// Step budget must be non-zero
    ZeroStepBudget,
    /// Depth budget must be non-zero
    ZeroDepthBudget,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidReturnAddressBytes => {
                write!(f, "return_address_bytes must be 2 or 3")
            }
            ConfigError::ZeroStepBudget => {
                write!(f, "max_steps must be non-zero")
            }
            ConfigError::ZeroDepthBudget => {
                write!(f, "max_depth must be non-zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
