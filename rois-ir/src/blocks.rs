//! Basic Block Management
//! 
//! A block is a list of definitions: its arguments occupy the first
//! register slots, every instruction occupies the next one. Removed
//! instructions leave a tombstone so slot indices never shift.

use log::trace;
use rois_common::{BlockId, SlotId};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::IrError;
use crate::instructions::{InstrKind, Instruction};
use crate::types::Type;
use crate::values::{Register, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    id: BlockId,
    args: Vec<Register>,
    slots: Vec<Option<Instruction>>,
}

impl BasicBlock {
    pub fn new(id: BlockId, arg_types: Vec<Type>) -> Self {
        let args = arg_types
            .into_iter()
            .enumerate()
            .map(|(slot, ty)| Register::new(id, slot as SlotId, ty))
            .collect();
        Self { id, args, slots: Vec::new() }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn args(&self) -> &[Register] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<Value> {
        self.args.get(index).cloned().map(Value::Reg)
    }

    /// Instruction slots, tombstones included
    pub fn slots(&self) -> &[Option<Instruction>] {
        &self.slots
    }

    pub fn instr(&self, index: usize) -> Option<&Instruction> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    /// Live instructions with their slot index
    pub fn instructions(&self) -> impl Iterator<Item = (usize, &Instruction)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|instr| (i, instr)))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions().next().is_none()
    }

    /// Register slot of the instruction at `index`
    pub fn slot_of(&self, index: usize) -> SlotId {
        (self.args.len() + index) as SlotId
    }

    /// Instruction index defining `reg`, `None` for block arguments
    pub fn index_of(&self, reg: &Register) -> Option<usize> {
        (reg.slot as usize).checked_sub(self.args.len())
    }

    fn next_slot(&self) -> SlotId {
        self.slot_of(self.slots.len())
    }

    /// Type of the register defined at `slot`, if it is live and defined before `limit`
    fn defined_type(&self, slot: SlotId, limit: SlotId) -> Option<Type> {
        if slot >= limit {
            return None;
        }
        let slot = slot as usize;
        if slot < self.args.len() {
            return Some(self.args[slot].ty.clone());
        }
        self.instr(slot - self.args.len())
            .and_then(|instr| instr.out.as_ref())
            .map(|out| out.ty.clone())
    }

    /// Every register operand must be owned by this block and defined
    /// in a slot preceding `limit`.
    pub(crate) fn check_operands(&self, kind: &InstrKind, limit: SlotId) -> Result<(), IrError> {
        for value in kind.operands() {
            let Some(reg) = value.as_reg() else { continue };
            if reg.block != self.id {
                return Err(IrError::ForeignRegister {
                    register: reg.to_string(),
                    owner: reg.block,
                    block: self.id,
                });
            }
            match self.defined_type(reg.slot, limit) {
                None => {
                    return Err(IrError::UndefinedRegister {
                        register: reg.to_string(),
                        block: self.id,
                    })
                }
                Some(ty) if ty != reg.ty => {
                    return Err(IrError::type_mismatch(kind.name(), ty, &reg.ty));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn output_for(&self, kind: &InstrKind, slot: SlotId) -> Option<Register> {
        kind.has_out().then(|| Register::new(self.id, slot, kind.out_type()))
    }

    /// Append an instruction, returning the register it defines
    pub fn add_instr(&mut self, kind: InstrKind) -> Result<Option<Register>, IrError> {
        let slot = self.next_slot();
        self.check_operands(&kind, slot)?;
        let out = self.output_for(&kind, slot);
        trace!("BB{}: append {}", self.id, kind);
        self.slots.push(Some(Instruction { out: out.clone(), kind }));
        Ok(out)
    }

    /// Overwrite slot `index` in place; later slots keep their indices
    pub fn replace_instr(&mut self, index: usize, kind: InstrKind) -> Result<Option<Register>, IrError> {
        if index >= self.slots.len() {
            return Err(IrError::SlotOutOfRange { block: self.id, index });
        }
        let slot = self.slot_of(index);
        self.check_operands(&kind, slot)?;
        let out = self.output_for(&kind, slot);
        if let Some(old) = self.instr(index).and_then(|i| i.out.as_ref()) {
            if out.as_ref().map(|o| &o.ty) != Some(&old.ty) {
                return Err(IrError::type_mismatch(kind.name(), &old.ty, kind.out_type()));
            }
        }
        trace!("BB{}: replace slot {} with {}", self.id, index, kind);
        self.slots[index] = Some(Instruction { out: out.clone(), kind });
        Ok(out)
    }

    /// Tombstone the instruction at `index`
    pub fn remove_instr(&mut self, index: usize) -> Option<Instruction> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Drop every slot after `index`, returning how many live instructions went away
    pub fn truncate_after(&mut self, index: usize) -> usize {
        if index + 1 >= self.slots.len() {
            return 0;
        }
        let removed = self.slots[index + 1..].iter().filter(|s| s.is_some()).count();
        self.slots.truncate(index + 1);
        removed
    }

    /// Substitute `to` for every use of `from` in the block
    pub fn replace_all(&mut self, from: &Register, to: &Value) -> usize {
        self.slots
            .iter_mut()
            .flatten()
            .map(|instr| instr.kind.replace(from, to))
            .sum()
    }

    /// Index of the first terminator
    pub fn terminator_index(&self) -> Option<usize> {
        self.instructions()
            .find(|(_, instr)| instr.is_terminator())
            .map(|(i, _)| i)
    }

    pub fn has_terminator(&self) -> bool {
        self.terminator_index().is_some()
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.terminator_index().and_then(|i| self.instr(i))
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.instructions()
            .flat_map(|(_, instr)| instr.kind.successors())
            .collect()
    }

    /// Arguments followed by every instruction output, in slot order
    pub fn all_registers(&self) -> Vec<Register> {
        self.args
            .iter()
            .cloned()
            .chain(self.instructions().filter_map(|(_, instr)| instr.out.clone()))
            .collect()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{}(", self.id)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{} {}", arg.ty, arg)?;
        }
        writeln!(f, "):")?;
        for (_, instr) in self.instructions() {
            writeln!(f, "  {instr}")?;
        }
        Ok(())
    }
}
