//! Visited-state memo
//!
//! Keys are `(instruction, next_pc)` pairs. The memo cuts off re-exploration
//! of a key reached again at a height it has already been explored at, which
//! bounds the traversal over cyclic control flow. It also tracks which keys
//! lie on the active exploration path so a cycle that grows the stack on
//! every pass can be told apart from an ordinary loop.
//!
//! A key reached again higher than it was explored is never cut off
//! silently: it is either re-explored or reported as [`Visit::Higher`].

use std::collections::HashMap;

use avr_spec::{Instruction, Pc};

use crate::config::RevisitPolicy;

/// Memo key: a decoded instruction and the pc of the instruction after it
pub type VisitKey = (Instruction, Pc);

/// Outcome of recording a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Never seen before; explore it
    First,
    /// Seen off the active path at a lower height; explore it again
    Raised { previous: i32 },
    /// Already explored at this height or above; cut off
    Revisit,
    /// Still on the active path and reached again higher than it was entered
    GrowingCycle { entered: i32, now: i32 },
    /// Off the active path, reached higher than it was explored, and the
    /// policy does not re-explore
    Higher { explored: i32, now: i32 },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Height the key was last explored at
    height: i32,
    on_path: bool,
}

/// Table of explored states
#[derive(Debug, Clone, Default)]
pub struct VisitedStates {
    policy: RevisitPolicy,
    entries: HashMap<VisitKey, Entry>,
}

impl VisitedStates {
    pub fn new(policy: RevisitPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    /// Record an arrival at `key` with the given height
    ///
    /// Keys returned as [`Visit::First`] or [`Visit::Raised`] are marked as on
    /// the active path until [`VisitedStates::leave`] is called for them.
    pub fn record(&mut self, key: VisitKey, height: i32) -> Visit {
        let Some(entry) = self.entries.get_mut(&key) else {
            self.entries.insert(key, Entry { height, on_path: true });
            return Visit::First;
        };

        if entry.on_path {
            return if height > entry.height {
                Visit::GrowingCycle { entered: entry.height, now: height }
            } else {
                Visit::Revisit
            };
        }

        if height <= entry.height {
            return Visit::Revisit;
        }

        match self.policy {
            RevisitPolicy::HigherHeight => {
                let previous = entry.height;
                entry.height = height;
                entry.on_path = true;
                Visit::Raised { previous }
            }
            RevisitPolicy::FirstVisit => Visit::Higher {
                explored: entry.height,
                now: height,
            },
        }
    }

    /// Mark a key as no longer on the active path
    pub fn leave(&mut self, key: &VisitKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.on_path = false;
        }
    }

    /// Number of distinct states recorded
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
