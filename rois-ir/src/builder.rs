//! IR Builder
//! 
//! Checked construction and in-place rewriting of instructions.
//! Every `build_*` call validates its operand types before touching the
//! block and returns the defined value. A violated precondition is a
//! malformed-IR error and aborts the unit.

use rois_common::BlockId;
use crate::error::IrError;
use crate::function::Function;
use crate::instructions::{FieldRef, InstrKind, Jump};
use crate::ops::{BinaryOp, CmpOp, UnaryOp};
use crate::types::Type;
use crate::values::{Register, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Insert at the end of the current block
    Append,
    /// Overwrite the given slot with the next built instruction
    Replace(usize),
}

/// Builder positioned on one block of a function
pub struct IrBuilder<'f> {
    func: &'f mut Function,
    block: BlockId,
    cursor: Cursor,
}

impl<'f> IrBuilder<'f> {
    /// Builder appending to the entry block
    pub fn new(func: &'f mut Function) -> Self {
        Self { func, block: 0, cursor: Cursor::Append }
    }

    pub fn function(&self) -> &Function {
        &*self.func
    }

    pub fn current_block(&self) -> BlockId {
        self.block
    }

    pub fn add_block(&mut self, arg_types: Vec<Type>) -> BlockId {
        self.func.add_block(arg_types)
    }

    /// Move to the end of another block
    pub fn switch_block(&mut self, block: BlockId) -> Result<(), IrError> {
        self.func.block(block)?;
        self.block = block;
        self.cursor = Cursor::Append;
        Ok(())
    }

    /// The next build call overwrites slot `index` instead of appending,
    /// then the builder falls back to append mode.
    pub fn switch_to_replace_mode(&mut self, index: usize) -> Result<(), IrError> {
        let len = self.func.block(self.block)?.len();
        if index >= len {
            return Err(IrError::SlotOutOfRange { block: self.block, index });
        }
        self.cursor = Cursor::Replace(index);
        Ok(())
    }

    pub fn is_replacing(&self) -> bool {
        matches!(self.cursor, Cursor::Replace(_))
    }

    pub fn block_arg(&self, index: usize) -> Result<Value, IrError> {
        let block = self.func.block(self.block)?;
        block.arg(index).ok_or(IrError::UndefinedRegister {
            register: format!("argument {index}"),
            block: self.block,
        })
    }

    fn insert(&mut self, kind: InstrKind) -> Result<Option<Register>, IrError> {
        kind.check_types()?;
        match &kind {
            InstrKind::Goto(jump) => self.func.check_jump(jump)?,
            InstrKind::Branch { then_jump, else_jump, .. } => {
                self.func.check_jump(then_jump)?;
                self.func.check_jump(else_jump)?;
            }
            InstrKind::Ret(value) => self.func.check_ret(value)?,
            _ => {}
        }
        let block = self.block;
        let cursor = self.cursor;
        let target = self.func.block_mut(block)?;
        let out = match cursor {
            Cursor::Append => target.add_instr(kind)?,
            Cursor::Replace(index) => {
                let out = target.replace_instr(index, kind)?;
                self.cursor = Cursor::Append;
                out
            }
        };
        Ok(out)
    }

    fn insert_value(&mut self, kind: InstrKind) -> Result<Value, IrError> {
        let instr = kind.name();
        self.insert(kind)?
            .map(Value::Reg)
            .ok_or_else(|| IrError::type_mismatch(instr, "non-void result", Type::Void))
    }

    pub fn build_binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.insert_value(InstrKind::Binary { op, lhs, rhs })
    }

    pub fn build_iadd(&mut self, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(BinaryOp::IAdd, lhs, rhs)
    }

    pub fn build_isub(&mut self, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(BinaryOp::ISub, lhs, rhs)
    }

    pub fn build_imul(&mut self, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(BinaryOp::IMul, lhs, rhs)
    }

    pub fn build_and(&mut self, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(BinaryOp::And, lhs, rhs)
    }

    pub fn build_or(&mut self, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(BinaryOp::Or, lhs, rhs)
    }

    pub fn build_ineg(&mut self, operand: Value) -> Result<Value, IrError> {
        self.insert_value(InstrKind::Unary { op: UnaryOp::INeg, operand })
    }

    pub fn build_not(&mut self, operand: Value) -> Result<Value, IrError> {
        self.insert_value(InstrKind::Unary { op: UnaryOp::Not, operand })
    }

    pub fn build_icmp(&mut self, op: CmpOp, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.insert_value(InstrKind::ICmp { op, lhs, rhs })
    }

    pub fn build_goto(&mut self, target: BlockId, args: Vec<Value>) -> Result<(), IrError> {
        self.insert(InstrKind::Goto(Jump::new(target, args)))?;
        Ok(())
    }

    pub fn build_branch(&mut self, cond: Value, then_jump: Jump, else_jump: Jump) -> Result<(), IrError> {
        self.insert(InstrKind::Branch { cond, then_jump, else_jump })?;
        Ok(())
    }

    /// `Value::Undef` returns from a void function
    pub fn build_ret(&mut self, value: Value) -> Result<(), IrError> {
        self.insert(InstrKind::Ret(value))?;
        Ok(())
    }

    /// Returns `None` for calls to void functions
    pub fn build_call(&mut self, callee: Value, args: Vec<Value>, preserve_live: bool) -> Result<Option<Value>, IrError> {
        let out = self.insert(InstrKind::Call { callee, args, preserve_live })?;
        Ok(out.map(Value::Reg))
    }

    pub fn build_alloc_class(&mut self, class: impl Into<String>) -> Result<Value, IrError> {
        self.insert_value(InstrKind::AllocClass(class.into()))
    }

    pub fn build_load(&mut self, field: FieldRef, object: Value) -> Result<Value, IrError> {
        self.insert_value(InstrKind::Load { field, object })
    }

    pub fn build_store(&mut self, field: FieldRef, object: Value, value: Value) -> Result<(), IrError> {
        self.insert(InstrKind::Store { field, object, value })?;
        Ok(())
    }

    pub fn build_get_tag(&mut self, class: impl Into<String>, object: Value) -> Result<Value, IrError> {
        self.insert_value(InstrKind::GetTag { class: class.into(), object })
    }

    pub fn build_set_tag(&mut self, class: impl Into<String>, object: Value, tag: u32) -> Result<(), IrError> {
        self.insert(InstrKind::SetTag { class: class.into(), object, tag })?;
        Ok(())
    }

    pub fn build_const_string(&mut self, text: impl Into<String>) -> Result<Value, IrError> {
        self.insert_value(InstrKind::ConstString(text.into()))
    }

    pub fn build_fail(&mut self, message: impl Into<String>) -> Result<(), IrError> {
        self.insert(InstrKind::Fail(message.into()))?;
        Ok(())
    }

    pub fn build_bitcast(&mut self, value: Value, ty: Type) -> Result<Value, IrError> {
        self.insert_value(InstrKind::Bitcast { value, ty })
    }
}
