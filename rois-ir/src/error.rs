//! Malformed-IR errors
//! 
//! All of these are programmer errors on the producer side of the IR.
//! They abort the compilation unit and are never coerced.

use rois_common::{BlockId, CompilerError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IrError {
    #[error("register {register} belongs to BB{owner} but is used in BB{block}")]
    ForeignRegister { register: String, owner: BlockId, block: BlockId },

    #[error("register {register} is used in BB{block} before it is defined")]
    UndefinedRegister { register: String, block: BlockId },

    #[error("{instr}: expected operand of type {expected}, found {found}")]
    TypeMismatch { instr: String, expected: String, found: String },

    #[error("{instr}: expected {expected} arguments, found {found}")]
    ArgumentCount { instr: String, expected: usize, found: usize },

    #[error("BB{block} does not exist in function {function}")]
    UnknownBlock { function: String, block: BlockId },

    #[error("slot {index} is out of range for BB{block}")]
    SlotOutOfRange { block: BlockId, index: usize },

    #[error("unknown class {name}")]
    UnknownClass { name: String },

    #[error("class {class} has no field {index} (variant {variant:?})")]
    UnknownField { class: String, index: u32, variant: Option<u32> },

    #[error("function {function}: {message}")]
    MalformedFunction { function: String, message: String },

    #[error("instruction {instr} in BB{block} at index {index} carries a wrong output register")]
    BadOutput { instr: String, block: BlockId, index: usize },
}

impl IrError {
    pub fn type_mismatch(instr: impl Into<String>, expected: impl ToString, found: impl ToString) -> Self {
        IrError::TypeMismatch {
            instr: instr.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn malformed(function: &str, message: impl Into<String>) -> Self {
        IrError::MalformedFunction {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

impl From<IrError> for CompilerError {
    fn from(err: IrError) -> Self {
        CompilerError::MalformedIr { message: err.to_string() }
    }
}
