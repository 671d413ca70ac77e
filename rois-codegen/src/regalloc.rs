//! Register Allocation
//! 
//! Block-local linear scan over instruction positions. Block arguments
//! are bound at the virtual position -1, every other register at the
//! index of its defining instruction. A range ends at its last use; a
//! register that is never read gets no physical register at all.
//! There is no spilling: running out of registers is fatal.

use crate::asm::GpReg;
use log::{debug, trace};
use rois_common::BlockId;
use rois_ir::{BasicBlock, Function, Register};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegAllocError {
    #[error("BB{block}: out of registers at position {position} (live: {live:?})")]
    OutOfRegisters { block: BlockId, position: isize, live: Vec<GpReg> },

    #[error("register {0} was allocated twice")]
    DuplicateRegister(String),

    #[error("register {0} has no allocation")]
    MissingRegister(String),
}

/// Live range of one register, in instruction positions
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRange {
    pub reg: Register,
    pub start: isize,
    /// Position of the last use, `None` if the value is never read
    pub end: Option<isize>,
}

/// Live ranges of every register of a block, in slot order
pub fn live_ranges(block: &BasicBlock) -> Vec<LiveRange> {
    let mut ends: BTreeMap<Register, isize> = BTreeMap::new();
    for (index, instr) in block.instructions() {
        for value in instr.operands() {
            if let Some(reg) = value.as_reg() {
                ends.insert(reg.clone(), index as isize);
            }
        }
    }

    let starts = block
        .args()
        .iter()
        .map(|arg| (arg.clone(), -1))
        .chain(
            block
                .instructions()
                .filter_map(|(index, instr)| instr.out.clone().map(|out| (out, index as isize))),
        );

    starts
        .map(|(reg, start)| {
            let end = ends.get(&reg).copied();
            LiveRange { reg, start, end }
        })
        .collect()
}

/// Result of allocating one block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockAllocation {
    /// `None` marks a dead value that needs no storage
    pub assignments: BTreeMap<Register, Option<GpReg>>,
    /// Registers in use across each instruction that asked for them
    pub live_across: BTreeMap<usize, Vec<GpReg>>,
}

/// Simple linear scan register allocator
pub struct LinearScanAllocator {
    registers: Vec<GpReg>,
}

impl LinearScanAllocator {
    pub fn new() -> Self {
        Self::with_registers(GpReg::ALL.to_vec())
    }

    /// Create an allocator with custom available registers
    pub fn with_registers(registers: Vec<GpReg>) -> Self {
        Self { registers }
    }

    pub fn allocate_block(&self, block: &BasicBlock) -> Result<BlockAllocation, RegAllocError> {
        let ranges = live_ranges(block);
        let mut free: BTreeSet<GpReg> = self.registers.iter().copied().collect();
        let mut result = BlockAllocation::default();

        let in_use = |free: &BTreeSet<GpReg>| -> Vec<GpReg> {
            self.registers.iter().copied().filter(|reg| !free.contains(reg)).collect()
        };

        for position in -1..block.len() as isize {
            // free ranges ending here first, so an output may reuse an operand's register
            for range in ranges.iter().filter(|r| r.end == Some(position)) {
                if let Some(Some(reg)) = result.assignments.get(&range.reg) {
                    free.insert(*reg);
                }
            }

            if position >= 0 {
                let index = position as usize;
                if block.instr(index).is_some_and(|i| i.kind.requires_live_registers()) {
                    let live = in_use(&free);
                    trace!("BB{}[{}]: live across {:?}", block.id(), index, live);
                    result.live_across.insert(index, live);
                }
            }

            for range in ranges.iter().filter(|r| r.start == position) {
                let assigned = match range.end {
                    None => None,
                    Some(_) => {
                        let reg = free.pop_first().ok_or_else(|| RegAllocError::OutOfRegisters {
                            block: block.id(),
                            position,
                            live: in_use(&free),
                        })?;
                        Some(reg)
                    }
                };
                trace!("BB{}: {} -> {:?}", block.id(), range.reg, assigned);
                result.assignments.insert(range.reg.clone(), assigned);
            }
        }

        debug!("BB{}: allocated {} registers", block.id(), result.assignments.len());
        Ok(result)
    }
}

impl Default for LinearScanAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocation of every block of a function, merged
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllocationTable {
    assignments: BTreeMap<Register, Option<GpReg>>,
    live_across: BTreeMap<(BlockId, usize), Vec<GpReg>>,
}

impl AllocationTable {
    pub fn for_function(func: &Function, allocator: &LinearScanAllocator) -> Result<Self, RegAllocError> {
        let mut table = Self::default();
        for block in &func.blocks {
            let allocation = allocator.allocate_block(block)?;
            table.merge(block.id(), allocation)?;
        }
        Ok(table)
    }

    pub fn merge(&mut self, block: BlockId, allocation: BlockAllocation) -> Result<(), RegAllocError> {
        for (reg, assigned) in allocation.assignments {
            if self.assignments.contains_key(&reg) {
                return Err(RegAllocError::DuplicateRegister(reg.to_string()));
            }
            self.assignments.insert(reg, assigned);
        }
        for (index, live) in allocation.live_across {
            self.live_across.insert((block, index), live);
        }
        Ok(())
    }

    /// Physical register of `reg`; `Ok(None)` for dead values
    pub fn lookup(&self, reg: &Register) -> Result<Option<GpReg>, RegAllocError> {
        self.assignments
            .get(reg)
            .copied()
            .ok_or_else(|| RegAllocError::MissingRegister(reg.to_string()))
    }

    pub fn live_across(&self, block: BlockId, index: usize) -> &[GpReg] {
        self.live_across
            .get(&(block, index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn assignments(&self) -> &BTreeMap<Register, Option<GpReg>> {
        &self.assignments
    }
}
