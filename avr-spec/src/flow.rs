//! Control-flow classification
//!
//! Every instruction falls into exactly one [`Flow`] category. The stack
//! analyzer matches on this enum rather than on concrete instructions, so
//! new straight-line instructions need no analyzer changes.

use serde::{Deserialize, Serialize};

/// Destination of a jump or call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Word offset from the following instruction
    Relative(i32),
    /// Absolute word address
    Absolute(u32),
    /// Computed at run time (IJMP, ICALL, ...)
    Unresolved,
}

impl Target {
    /// Resolve against the address of the following instruction
    ///
    /// Returns `None` for unresolved targets and for relative targets that
    /// would wrap below address zero.
    pub fn resolve(self, next: u32) -> Option<u32> {
        match self {
            Target::Relative(offset) => next.checked_add_signed(offset),
            Target::Absolute(address) => Some(address),
            Target::Unresolved => None,
        }
    }
}

/// Effect of an instruction on control flow and on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flow {
    /// Conditional relative branch: target and fallthrough
    Branch { offset: i32 },
    /// Skip the next instruction on a condition
    Skip,
    /// Unconditional jump
    Jump(Target),
    /// Subroutine call, pushes a return address
    Call(Target),
    /// Return from subroutine
    Return,
    /// Return from interrupt
    ReturnFromInterrupt,
    /// Pushes one byte
    Push,
    /// Pops one byte
    Pop,
    /// 32-bit STS, modeled as a two-byte cost
    WideStore,
    /// Falls through to the next instruction
    Straight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(Target::Relative(4).resolve(10), Some(14));
        assert_eq!(Target::Relative(-1).resolve(10), Some(9));
        assert_eq!(Target::Relative(-11).resolve(10), None);
    }

    #[test]
    fn test_resolve_absolute_and_unresolved() {
        assert_eq!(Target::Absolute(0x34).resolve(10), Some(0x34));
        assert_eq!(Target::Unresolved.resolve(10), None);
    }
}
