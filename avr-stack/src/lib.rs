//! # AVR Stack Analyzer
//!
//! Static worst-case stack usage of AVR firmware images.
//!
//! The analyzer explores every control-flow path reachable from the entry
//! point of an Intel HEX image and reports the maximum number of bytes the
//! hardware stack can hold, or that no finite bound exists.
//!
//! ## Features
//!
//! - **Path exploration**: branches, skips, jumps and calls followed statically
//! - **Stack effects**: PUSH/POP, return addresses (2 or 3 bytes), 32-bit STS
//! - **Cycle detection**: loops that grow the stack are reported as unbounded
//! - **Budgets**: step and depth limits keep every run finite
//! - **Gaps**: indirect jumps and calls are reported instead of guessed
//!
//! ## Example
//!
//! ```rust
//! use avr_stack::{analyze_hex, AnalysisConfig, StackUsage};
//!
//! // push r16 ; ret
//! let hex = ":040000000F930895BD\n:00000001FF\n";
//! let report = analyze_hex(hex, AnalysisConfig::default()).unwrap();
//! assert_eq!(report.usage, StackUsage::Bounded(1));
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod height;
pub mod memo;
pub mod memory;
pub mod report;

pub use analyzer::StackAnalysis;
pub use config::{AnalysisConfig, ConfigError, RevisitPolicy};
pub use error::{AnalysisError, Result};
pub use height::{MaxHeight, StackUsage};
pub use memo::{Visit, VisitKey, VisitedStates};
pub use memory::FirmwareMemory;
pub use report::{ReachabilityGap, StackReport, UnboundedReason};

/// Parse Intel HEX text and analyze it
pub fn analyze_hex(text: &str, config: AnalysisConfig) -> Result<StackReport> {
    let memory = FirmwareMemory::parse_hex(text)?;
    StackAnalysis::new(memory, config).analyze()
}
