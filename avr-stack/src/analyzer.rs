//! Worst-case stack height analysis
//!
//! Explores every statically reachable path from the entry point and tracks
//! the stack height along each one. Exploration is depth-first over an
//! explicit worklist, so deep firmware call chains never recurse on the host
//! stack. Each `(instruction, next_pc)` state is explored once per height it
//! is reached at: under
//! [`RevisitPolicy::HigherHeight`](crate::RevisitPolicy::HigherHeight) a state reached
//! again higher is re-explored, under
//! [`RevisitPolicy::FirstVisit`](crate::RevisitPolicy::FirstVisit) it promotes the result
//! to unbounded. A state re-entered on its own path at a greater height also
//! promotes the result to unbounded.

use std::collections::{BTreeMap, BTreeSet};

use avr_disassembler::{decode_at, format};
use avr_spec::{Flow, HexFile, Instruction, Pc, ProgramMemory, Target};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::height::{MaxHeight, StackUsage};
use crate::memo::{Visit, VisitKey, VisitedStates};
use crate::memory::FirmwareMemory;
use crate::report::{ReachabilityGap, StackReport, UnboundedReason};

/// Stack analysis over a loaded firmware image
///
/// Owns the image and configuration only; every call to [`apply`] or
/// [`analyze`] runs in a fresh session, so one instance can be queried
/// repeatedly and always yields the same result.
///
/// [`apply`]: StackAnalysis::apply
/// [`analyze`]: StackAnalysis::analyze
#[derive(Debug, Clone)]
pub struct StackAnalysis<M = FirmwareMemory> {
    memory: M,
    config: AnalysisConfig,
}

impl StackAnalysis<FirmwareMemory> {
    /// Load a parsed HEX file with the default configuration
    pub fn from_hex(hex: &HexFile) -> Self {
        Self::new(FirmwareMemory::from_hex(hex), AnalysisConfig::default())
    }
}

impl<M: ProgramMemory> StackAnalysis<M> {
    pub fn new(memory: M, config: AnalysisConfig) -> Self {
        Self { memory, config }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Worst-case stack usage from the entry point
    pub fn apply(&self) -> Result<StackUsage> {
        Ok(self.analyze()?.usage)
    }

    /// Run the analysis and return the full report
    pub fn analyze(&self) -> Result<StackReport> {
        self.config.validate()?;

        tracing::debug!(
            "Analyzing {} bytes from PC {:#06x} ({})",
            self.memory.size(),
            self.config.entry_point,
            self.config
        );

        let report = Session::new(&self.memory, &self.config).run()?;

        tracing::debug!(
            "Analysis finished: {} after {} steps, {} states",
            report.usage,
            report.steps,
            report.states
        );

        Ok(report)
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Task {
    /// Arrive at a pc with a stack height
    Visit { pc: Pc, height: i32 },
    /// All successors of a state have been explored
    Leave(VisitKey),
}

/// State of one analysis run
struct Session<'a, M: ?Sized> {
    memory: &'a M,
    config: &'a AnalysisConfig,
    memo: VisitedStates,
    max: MaxHeight,
    worklist: Vec<Task>,
    steps: u64,
    /// States on the active path
    depth: usize,
    gaps: BTreeMap<Pc, Instruction>,
    underflows: BTreeSet<Pc>,
    unbounded: Option<UnboundedReason>,
}

impl<'a, M: ProgramMemory + ?Sized> Session<'a, M> {
    fn new(memory: &'a M, config: &'a AnalysisConfig) -> Self {
        Self {
            memory,
            config,
            memo: VisitedStates::new(config.revisit),
            max: MaxHeight::new(),
            worklist: Vec::new(),
            steps: 0,
            depth: 0,
            gaps: BTreeMap::new(),
            underflows: BTreeSet::new(),
            unbounded: None,
        }
    }

    fn run(mut self) -> Result<StackReport> {
        self.worklist.push(Task::Visit {
            pc: self.config.entry_point,
            height: 0,
        });

        while let Some(task) = self.worklist.pop() {
            match task {
                Task::Visit { pc, height } => self.traverse(pc, height)?,
                Task::Leave(key) => {
                    self.memo.leave(&key);
                    self.depth = self.depth.saturating_sub(1);
                }
            }
        }

        Ok(self.finish())
    }

    fn traverse(&mut self, pc: Pc, height: i32) -> Result<()> {
        if self.steps >= self.config.max_steps {
            self.promote(UnboundedReason::StepBudget {
                limit: self.config.max_steps,
            });
            return Ok(());
        }
        self.steps += 1;

        self.max.observe(height);

        if self.memory.is_past_end(pc) {
            tracing::trace!("[{:6}] PC={:#06x} h={} past end of image", self.steps, pc, height);
            return Ok(());
        }

        let instruction = self.decode(pc)?;
        let next = pc + instruction.width();

        tracing::trace!("[{:6}] PC={:#06x} h={} {}", self.steps, pc, height, format(&instruction));

        self.process(pc, instruction, next, height)
    }

    fn process(&mut self, pc: Pc, instruction: Instruction, next: Pc, height: i32) -> Result<()> {
        let key = (instruction, next);

        match self.memo.record(key, height) {
            Visit::First | Visit::Raised { .. } => {}
            Visit::Revisit => return Ok(()),
            Visit::GrowingCycle { entered, now } => {
                tracing::debug!(
                    "PC {:#06x} re-entered at height {} (entered at {})",
                    pc,
                    now,
                    entered
                );
                self.promote(UnboundedReason::GrowingCycle { pc });
                return Ok(());
            }
            Visit::Higher { explored, now } => {
                tracing::debug!(
                    "PC {:#06x} reached at height {} (explored at {})",
                    pc,
                    now,
                    explored
                );
                self.promote(UnboundedReason::HigherRevisit { pc });
                return Ok(());
            }
        }

        if self.depth >= self.config.max_depth {
            self.promote(UnboundedReason::DepthBudget {
                limit: self.config.max_depth,
            });
            return Ok(());
        }
        self.depth += 1;
        self.worklist.push(Task::Leave(key));

        match instruction.flow() {
            Flow::Branch { offset } => {
                match Target::Relative(offset).resolve(next) {
                    Some(target) => self.explore(&[(target, height), (next, height)]),
                    None => {
                        self.gap(pc, instruction);
                        self.explore(&[(next, height)]);
                    }
                }
            }

            // Lands past the whole skipped instruction, so skipping a 32-bit
            // CALL or LDS never resumes on its operand word
            Flow::Skip => {
                let skipped = if self.memory.is_past_end(next) {
                    1
                } else {
                    self.decode(next)?.width()
                };
                self.explore(&[(next + skipped, height), (next, height)]);
            }

            Flow::Jump(target) => match target.resolve(next) {
                Some(target) => self.explore(&[(target, height)]),
                None => self.gap(pc, instruction),
            },

            Flow::Call(target) => {
                let called = height.saturating_add(i32::from(self.config.return_address_bytes));
                match target.resolve(next) {
                    None => self.gap(pc, instruction),
                    // RCALL continues only at its target
                    Some(dest) if matches!(target, Target::Relative(_)) => {
                        self.explore(&[(dest, called)])
                    }
                    Some(dest) => self.explore(&[(next, height), (dest, called)]),
                }
            }

            Flow::Return => {}

            Flow::ReturnFromInterrupt => {
                return Err(AnalysisError::UnsupportedInstruction { pc, instruction });
            }

            Flow::Push => self.explore(&[(next, height.saturating_add(1))]),

            Flow::Pop => {
                let popped = height.saturating_sub(1);
                if popped < 0 {
                    self.underflow(pc);
                }
                self.explore(&[(next, popped)]);
            }

            Flow::WideStore => self.explore(&[(next, height.saturating_add(2))]),

            Flow::Straight => self.explore(&[(next, height)]),
        }

        Ok(())
    }

    /// Queue successors so the first one listed is explored first
    fn explore(&mut self, successors: &[(Pc, i32)]) {
        for &(pc, height) in successors.iter().rev() {
            self.worklist.push(Task::Visit { pc, height });
        }
    }

    fn decode(&self, pc: Pc) -> Result<Instruction> {
        decode_at(self.memory, pc).map_err(|source| AnalysisError::Decode { pc, source })
    }

    fn gap(&mut self, pc: Pc, instruction: Instruction) {
        if self.gaps.insert(pc, instruction).is_none() {
            tracing::warn!("Unresolved control transfer at PC {:#06x}: {}", pc, format(&instruction));
        }
    }

    fn underflow(&mut self, pc: Pc) {
        if self.underflows.insert(pc) {
            tracing::warn!("Stack underflow at PC {:#06x}", pc);
        }
    }

    fn promote(&mut self, reason: UnboundedReason) {
        if self.unbounded.is_none() {
            tracing::debug!(
                "Stack usage unbounded after a peak of {} bytes: {}",
                self.max.peak(),
                reason
            );
            self.max.promote();
            self.unbounded = Some(reason);
        }
        self.worklist.clear();
    }

    fn finish(self) -> StackReport {
        StackReport {
            usage: self.max.get(),
            steps: self.steps,
            states: self.memo.len(),
            gaps: self
                .gaps
                .into_iter()
                .map(|(pc, instruction)| ReachabilityGap { pc, instruction })
                .collect(),
            underflows: self.underflows.into_iter().collect(),
            unbounded: self.unbounded,
        }
    }
}
