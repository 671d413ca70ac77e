//! IR Instructions
//! 
//! Defines the instruction catalog. Each instruction occupies one slot of
//! its block and produces at most one register.

use rois_common::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::IrError;
use crate::ops::{BinaryOp, CmpOp, UnaryOp};
use crate::types::Type;
use crate::values::{Register, Value};

/// Transfer of control to a block, passing its block arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    pub target: BlockId,
    pub args: Vec<Value>,
}

impl Jump {
    pub fn new(target: BlockId, args: Vec<Value>) -> Self {
        Self { target, args }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{}(", self.target)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// Field descriptor: aggregate type, field index and, for enum classes,
/// the variant the field belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub class: String,
    pub index: u32,
    pub variant: Option<u32>,
    pub ty: Type,
}

impl FieldRef {
    pub fn new(class: impl Into<String>, index: u32, ty: Type) -> Self {
        Self { class: class.into(), index, variant: None, ty }
    }

    pub fn in_variant(class: impl Into<String>, variant: u32, index: u32, ty: Type) -> Self {
        Self { class: class.into(), index, variant: Some(variant), ty }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            Some(v) => write!(f, "{}[{}].{}", self.class, v, self.index),
            None => write!(f, "{}.{}", self.class, self.index),
        }
    }
}

/// Instruction payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrKind {
    /// out = op lhs, rhs
    Binary { op: BinaryOp, lhs: Value, rhs: Value },

    /// out = op operand
    Unary { op: UnaryOp, operand: Value },

    /// out = lhs <op> rhs, as bool
    ICmp { op: CmpOp, lhs: Value, rhs: Value },

    Goto(Jump),

    /// Two-way branch, each arm with its own argument list
    Branch { cond: Value, then_jump: Jump, else_jump: Jump },

    /// Return; `Undef` for void functions
    Ret(Value),

    /// Direct (global) or indirect (register) call.
    /// `preserve_live` asks the backend to save live caller registers.
    Call { callee: Value, args: Vec<Value>, preserve_live: bool },

    /// out = new instance of a class
    AllocClass(String),

    /// out = object.field
    Load { field: FieldRef, object: Value },

    /// object.field = value
    Store { field: FieldRef, object: Value, value: Value },

    /// out = discriminant of an enum object
    GetTag { class: String, object: Value },

    SetTag { class: String, object: Value, tag: u32 },

    /// out = address of a length-prefixed string literal
    ConstString(String),

    /// Trap with a message
    Fail(String),

    /// out = value reinterpreted as another type
    Bitcast { value: Value, ty: Type },
}

fn expect(instr: &InstrKind, value: &Value, expected: &Type) -> Result<(), IrError> {
    let found = value.ty();
    if &found == expected {
        Ok(())
    } else {
        Err(IrError::type_mismatch(instr.name(), expected, found))
    }
}

impl InstrKind {
    /// Mnemonic used in dumps and diagnostics
    pub fn name(&self) -> String {
        match self {
            InstrKind::Binary { op, .. } => op.to_string(),
            InstrKind::Unary { op, .. } => op.to_string(),
            InstrKind::ICmp { op, .. } => format!("ICmp.{op}"),
            InstrKind::Goto(_) => "Goto".to_string(),
            InstrKind::Branch { .. } => "Branch".to_string(),
            InstrKind::Ret(_) => "Ret".to_string(),
            InstrKind::Call { .. } => "Call".to_string(),
            InstrKind::AllocClass(_) => "AllocClass".to_string(),
            InstrKind::Load { .. } => "Load".to_string(),
            InstrKind::Store { .. } => "Store".to_string(),
            InstrKind::GetTag { .. } => "GetTag".to_string(),
            InstrKind::SetTag { .. } => "SetTag".to_string(),
            InstrKind::ConstString(_) => "ConstString".to_string(),
            InstrKind::Fail(_) => "Fail".to_string(),
            InstrKind::Bitcast { .. } => "Bitcast".to_string(),
        }
    }

    pub fn out_type(&self) -> Type {
        match self {
            InstrKind::Binary { op, .. } if op.is_logical() => Type::Bool,
            InstrKind::Binary { .. } => Type::Int,
            InstrKind::Unary { op: UnaryOp::INeg, .. } => Type::Int,
            InstrKind::Unary { op: UnaryOp::Not, .. } => Type::Bool,
            InstrKind::ICmp { .. } => Type::Bool,
            InstrKind::Call { callee, .. } => match callee.ty() {
                Type::Func(ft) => *ft.ret,
                _ => Type::Void,
            },
            InstrKind::AllocClass(class) => Type::Class(class.clone()),
            InstrKind::Load { field, .. } => field.ty.clone(),
            InstrKind::GetTag { .. } => Type::Int,
            InstrKind::ConstString(_) => Type::Ptr,
            InstrKind::Bitcast { ty, .. } => ty.clone(),
            InstrKind::Goto(_)
            | InstrKind::Branch { .. }
            | InstrKind::Ret(_)
            | InstrKind::Store { .. }
            | InstrKind::SetTag { .. }
            | InstrKind::Fail(_) => Type::Void,
        }
    }

    /// Does the instruction produce a meaningful output?
    /// Calls to void functions do not.
    pub fn has_out(&self) -> bool {
        !self.out_type().is_void()
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, InstrKind::Goto(_) | InstrKind::Branch { .. } | InstrKind::Ret(_))
    }

    /// Side-effecting instructions are emitted even when their output is dead
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            InstrKind::Goto(_)
                | InstrKind::Branch { .. }
                | InstrKind::Ret(_)
                | InstrKind::Call { .. }
                | InstrKind::AllocClass(_)
                | InstrKind::Store { .. }
                | InstrKind::SetTag { .. }
                | InstrKind::Fail(_)
        )
    }

    /// Instructions that call out of the function need the set of
    /// registers live across them
    pub fn requires_live_registers(&self) -> bool {
        matches!(self, InstrKind::Call { .. } | InstrKind::AllocClass(_))
    }

    /// Blocks this instruction may transfer control to
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            InstrKind::Goto(jump) => vec![jump.target],
            InstrKind::Branch { then_jump, else_jump, .. } => vec![then_jump.target, else_jump.target],
            _ => Vec::new(),
        }
    }

    /// Jumps carried by a terminator, in arm order
    pub fn jumps(&self) -> Vec<&Jump> {
        match self {
            InstrKind::Goto(jump) => vec![jump],
            InstrKind::Branch { then_jump, else_jump, .. } => vec![then_jump, else_jump],
            _ => Vec::new(),
        }
    }

    /// All input operands, in evaluation order
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            InstrKind::Binary { lhs, rhs, .. } | InstrKind::ICmp { lhs, rhs, .. } => vec![lhs, rhs],
            InstrKind::Unary { operand, .. } => vec![operand],
            InstrKind::Goto(jump) => jump.args.iter().collect(),
            InstrKind::Branch { cond, then_jump, else_jump } => std::iter::once(cond)
                .chain(then_jump.args.iter())
                .chain(else_jump.args.iter())
                .collect(),
            InstrKind::Ret(value) => vec![value],
            InstrKind::Call { callee, args, .. } => std::iter::once(callee).chain(args.iter()).collect(),
            InstrKind::Load { object, .. }
            | InstrKind::GetTag { object, .. }
            | InstrKind::SetTag { object, .. } => vec![object],
            InstrKind::Store { object, value, .. } => vec![object, value],
            InstrKind::Bitcast { value, .. } => vec![value],
            InstrKind::AllocClass(_) | InstrKind::ConstString(_) | InstrKind::Fail(_) => Vec::new(),
        }
    }

    /// Rewrite every input operand in place
    pub fn map_operands<F: FnMut(&mut Value)>(&mut self, mut f: F) {
        match self {
            InstrKind::Binary { lhs, rhs, .. } | InstrKind::ICmp { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            InstrKind::Unary { operand, .. } => f(operand),
            InstrKind::Goto(jump) => jump.args.iter_mut().for_each(&mut f),
            InstrKind::Branch { cond, then_jump, else_jump } => {
                f(cond);
                then_jump.args.iter_mut().for_each(&mut f);
                else_jump.args.iter_mut().for_each(&mut f);
            }
            InstrKind::Ret(value) => f(value),
            InstrKind::Call { callee, args, .. } => {
                f(callee);
                args.iter_mut().for_each(&mut f);
            }
            InstrKind::Load { object, .. }
            | InstrKind::GetTag { object, .. }
            | InstrKind::SetTag { object, .. } => f(object),
            InstrKind::Store { object, value, .. } => {
                f(object);
                f(value);
            }
            InstrKind::Bitcast { value, .. } => f(value),
            InstrKind::AllocClass(_) | InstrKind::ConstString(_) | InstrKind::Fail(_) => {}
        }
    }

    /// Replace every use of `from` with `to`, returning the number of uses rewritten
    pub fn replace(&mut self, from: &Register, to: &Value) -> usize {
        let mut count = 0;
        self.map_operands(|value| {
            if value.as_reg() == Some(from) {
                *value = to.clone();
                count += 1;
            }
        });
        count
    }

    /// Operand type rules that need no context beyond the instruction
    /// itself. Jump targets and return types are checked by the function.
    pub fn check_types(&self) -> Result<(), IrError> {
        match self {
            InstrKind::Binary { op, lhs, rhs } => {
                let ty = if op.is_logical() { Type::Bool } else { Type::Int };
                expect(self, lhs, &ty)?;
                expect(self, rhs, &ty)
            }
            InstrKind::Unary { op, operand } => {
                let ty = match op {
                    UnaryOp::INeg => Type::Int,
                    UnaryOp::Not => Type::Bool,
                };
                expect(self, operand, &ty)
            }
            InstrKind::ICmp { lhs, rhs, .. } => {
                expect(self, lhs, &Type::Int)?;
                expect(self, rhs, &Type::Int)
            }
            InstrKind::Branch { cond, .. } => expect(self, cond, &Type::Bool),
            InstrKind::Call { callee, args, .. } => {
                let callee_ty = callee.ty();
                let ft = callee_ty
                    .as_func()
                    .ok_or_else(|| IrError::type_mismatch(self.name(), "function", &callee_ty))?;
                if ft.params.len() != args.len() {
                    return Err(IrError::ArgumentCount {
                        instr: self.name(),
                        expected: ft.params.len(),
                        found: args.len(),
                    });
                }
                for (arg, param) in args.iter().zip(&ft.params) {
                    expect(self, arg, param)?;
                }
                Ok(())
            }
            InstrKind::Load { field, object } => expect(self, object, &Type::Class(field.class.clone())),
            InstrKind::Store { field, object, value } => {
                expect(self, object, &Type::Class(field.class.clone()))?;
                expect(self, value, &field.ty)
            }
            InstrKind::GetTag { class, object } | InstrKind::SetTag { class, object, .. } => {
                expect(self, object, &Type::Class(class.clone()))
            }
            InstrKind::Bitcast { value, ty } => {
                if value.ty().is_void() || ty.is_void() {
                    Err(IrError::type_mismatch(self.name(), "non-void value", value.ty()))
                } else {
                    Ok(())
                }
            }
            InstrKind::Goto(_)
            | InstrKind::Ret(_)
            | InstrKind::AllocClass(_)
            | InstrKind::ConstString(_)
            | InstrKind::Fail(_) => Ok(()),
        }
    }
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrKind::Binary { op, lhs, rhs } => write!(f, "{op} {lhs}, {rhs}"),
            InstrKind::Unary { op, operand } => write!(f, "{op} {operand}"),
            InstrKind::ICmp { op, lhs, rhs } => write!(f, "ICmp.{op} {lhs}, {rhs}"),
            InstrKind::Goto(jump) => write!(f, "Goto {jump}"),
            InstrKind::Branch { cond, then_jump, else_jump } => {
                write!(f, "If {cond} Then {then_jump} Else {else_jump}")
            }
            InstrKind::Ret(Value::Undef) => write!(f, "Ret"),
            InstrKind::Ret(value) => write!(f, "Ret {value}"),
            InstrKind::Call { callee, args, .. } => {
                write!(f, "Call {callee}")?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                Ok(())
            }
            InstrKind::AllocClass(class) => write!(f, "AllocClass {class}"),
            InstrKind::Load { field, object } => write!(f, "Load {field} {object}"),
            InstrKind::Store { field, object, value } => write!(f, "Store {field} {object}, {value}"),
            InstrKind::GetTag { class, object } => write!(f, "GetTag {class} {object}"),
            InstrKind::SetTag { class, object, tag } => write!(f, "SetTag {class} {object}, {tag}"),
            InstrKind::ConstString(text) => write!(f, "ConstString {text:?}"),
            InstrKind::Fail(message) => write!(f, "Fail {message:?}"),
            InstrKind::Bitcast { value, ty } => write!(f, "Bitcast {value} to {ty}"),
        }
    }
}

/// An instruction together with the register it defines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub out: Option<Register>,
    pub kind: InstrKind,
}

impl Instruction {
    pub fn has_out(&self) -> bool {
        self.out.is_some()
    }

    pub fn out_type(&self) -> Type {
        self.kind.out_type()
    }

    pub fn operands(&self) -> Vec<&Value> {
        self.kind.operands()
    }

    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(out) = &self.out {
            write!(f, "{out} = ")?;
        }
        write!(f, "{}", self.kind)
    }
}
