//! Rois Compiler - Common Types and Utilities
//! 
//! This crate contains shared identifiers, the top-level error type and
//! the compile options used across all stages of the Rois back end.

pub mod error;
pub mod types;
pub mod options;

pub use error::CompilerError;
pub use types::*;
pub use options::{CompileOptions, Target};
