//! Analysis report

use avr_spec::{Instruction, Pc};
use serde::Serialize;
use std::fmt;

use crate::height::StackUsage;

/// Control transfer whose destination could not be resolved statically
///
/// Successors of a gap are not explored, so the reported usage only covers
/// the code reachable without passing through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReachabilityGap {
    pub pc: Pc,
    pub instruction: Instruction,
}

impl fmt::Display for ReachabilityGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}: {}", self.pc, avr_disassembler::format(&self.instruction))
    }
}

/// Why the result was promoted to unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnboundedReason {
    /// A cycle on the active path re-entered a state with a greater height
    GrowingCycle { pc: Pc },
    /// An explored state was reached again higher and was not re-explored
    HigherRevisit { pc: Pc },
    /// The step budget ran out
    StepBudget { limit: u64 },
    /// The active path grew past the depth budget
    DepthBudget { limit: usize },
}

impl fmt::Display for UnboundedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnboundedReason::GrowingCycle { pc } => {
                write!(f, "stack grows on every pass through {:#06x}", pc)
            }
            UnboundedReason::HigherRevisit { pc } => {
                write!(f, "{:#06x} reached again above its explored height", pc)
            }
            UnboundedReason::StepBudget { limit } => {
                write!(f, "step budget of {} exhausted", limit)
            }
            UnboundedReason::DepthBudget { limit } => {
                write!(f, "depth budget of {} exceeded", limit)
            }
        }
    }
}

/// Full result of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackReport {
    /// Worst-case stack usage
    pub usage: StackUsage,
    /// Explored steps
    pub steps: u64,
    /// Distinct visited states
    pub states: usize,
    /// Unresolved control transfers, ordered by pc
    pub gaps: Vec<ReachabilityGap>,
    /// Pops that drove a path's height below zero, ordered by pc
    pub underflows: Vec<Pc>,
    pub unbounded: Option<UnboundedReason>,
}

impl StackReport {
    pub fn is_unbounded(&self) -> bool {
        self.usage.is_unbounded()
    }

    /// Whether every reachable control transfer was resolved
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

impl fmt::Display for StackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unbounded {
            Some(reason) => writeln!(f, "max stack: unbounded ({})", reason)?,
            None => writeln!(f, "max stack: {}", self.usage)?,
        }
        writeln!(f, "explored: {} steps, {} states", self.steps, self.states)?;

        if !self.gaps.is_empty() {
            writeln!(f, "unresolved control transfers:")?;
            for gap in &self.gaps {
                writeln!(f, "  {}", gap)?;
            }
        }
        if !self.underflows.is_empty() {
            writeln!(f, "stack underflows:")?;
            for pc in &self.underflows {
                writeln!(f, "  {:#06x}", pc)?;
            }
        }
        Ok(())
    }
}
