//! Code generation errors

use crate::moves::MoveError;
use crate::regalloc::RegAllocError;
use rois_common::CompilerError;
use rois_ir::IrError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    RegAlloc(#[from] RegAllocError),

    #[error(transparent)]
    Moves(#[from] MoveError),

    #[error("{function}: {count} arguments, at most {max} can be passed in registers")]
    TooManyArguments { function: String, count: usize, max: usize },

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("class '{class}' has no field {index}")]
    UnknownField { class: String, index: u32 },

    #[error("{function}: cannot emit {what}")]
    Unsupported { function: String, what: String },
}

impl From<CodegenError> for CompilerError {
    fn from(err: CodegenError) -> Self {
        match err {
            CodegenError::Ir(err) => err.into(),
            CodegenError::RegAlloc(err) => CompilerError::RegisterAllocation { message: err.to_string() },
            CodegenError::Moves(err) => CompilerError::MoveResolution { message: err.to_string() },
            other => CompilerError::codegen(other.to_string()),
        }
    }
}
