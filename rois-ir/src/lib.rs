//! Rois Intermediate Representation
//! 
//! A static-single-assignment IR with block arguments instead of phi
//! nodes. Registers are block-local: a value crosses a block boundary
//! only as an argument of the jump that enters the block.
//! 
//! ## Architecture
//! 
//! - `types` - semantic types and class declarations
//! - `values` - operands (constants, registers, globals)
//! - `ops` - arithmetic, logical and comparison operators
//! - `instructions` - the instruction catalog
//! - `blocks` - basic blocks with tombstoned slots
//! - `function` / `module` - containers
//! - `builder` - checked construction and in-place replacement
//! - `verify` - structural checks for modules built elsewhere

pub use self::types::{ClassDef, ClassKind, Field, FuncType, Type, Variant};
pub use self::values::{GlobalRef, Register, Value};
pub use self::ops::{BinaryOp, CmpOp, UnaryOp};
pub use self::instructions::{FieldRef, InstrKind, Instruction, Jump};
pub use self::blocks::BasicBlock;
pub use self::function::Function;
pub use self::module::Module;
pub use self::builder::IrBuilder;
pub use self::error::IrError;

mod types;
mod values;
mod ops;
mod instructions;
mod blocks;
mod function;
mod module;
mod builder;
mod verify;
mod error;
