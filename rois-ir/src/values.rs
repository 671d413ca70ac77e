//! IR Value Representations
//! 
//! Operands of IR instructions: constants, registers (block-local SSA
//! values) and references to global functions.

use rois_common::{BlockId, SlotId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use crate::types::{FuncType, Type};

/// An SSA register, identified by its defining block and slot.
///
/// The type tag travels alongside but does not take part in identity:
/// two registers are equal iff their `(block, slot)` pairs match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Register {
    pub block: BlockId,
    pub slot: SlotId,
    pub ty: Type,
}

impl Register {
    pub fn new(block: BlockId, slot: SlotId, ty: Type) -> Self {
        Self { block, slot, ty }
    }

    fn key(&self) -> (BlockId, SlotId) {
        (self.block, self.slot)
    }
}

impl PartialEq for Register {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Register {}

impl Hash for Register {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Register {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Register {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}.{}", self.block, self.slot)
    }
}

/// Reference to a module-level function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalRef {
    pub name: String,
    pub ty: FuncType,
    pub is_extern: bool,
    /// Owning class when the function is a method
    pub owner: Option<String>,
}

impl GlobalRef {
    /// Plain assembly-level symbol. Externs keep their name, methods are
    /// qualified with their class.
    pub fn symbol(&self) -> String {
        match &self.owner {
            Some(class) if !self.is_extern => format!("{class}_{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// IR Value - represents operands in IR instructions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// No value (void return, missing argument)
    Undef,
    ConstInt(i32),
    ConstBool(bool),
    Reg(Register),
    Global(GlobalRef),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Undef => Type::Void,
            Value::ConstInt(_) => Type::Int,
            Value::ConstBool(_) => Type::Bool,
            Value::Reg(reg) => reg.ty.clone(),
            Value::Global(global) => Type::Func(global.ty.clone()),
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Value::ConstInt(_) | Value::ConstBool(_))
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn as_reg(&self) -> Option<&Register> {
        match self {
            Value::Reg(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn as_const_int(&self) -> Option<i32> {
        match self {
            Value::ConstInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_const_bool(&self) -> Option<bool> {
        match self {
            Value::ConstBool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_global(&self) -> Option<&GlobalRef> {
        match self {
            Value::Global(global) => Some(global),
            _ => None,
        }
    }
}

impl From<Register> for Value {
    fn from(reg: Register) -> Self {
        Value::Reg(reg)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "undefined"),
            Value::ConstInt(v) => write!(f, "const {v}"),
            Value::ConstBool(b) => write!(f, "const {b}"),
            Value::Reg(reg) => write!(f, "{reg}"),
            Value::Global(global) => write!(f, "@{}", global.name),
        }
    }
}
