//! Error handling for the Rois compiler
//! 
//! Every stage has its own error enum; they all funnel into
//! [`CompilerError`] at the compilation-unit boundary.

use thiserror::Error;

/// Main compiler error type for one compilation unit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    /// Programmer error in the IR handed to the back end
    #[error("Malformed IR: {message}")]
    MalformedIr { message: String },

    /// More simultaneously live values than physical registers
    #[error("Register allocation failed: {message}")]
    RegisterAllocation { message: String },

    /// A simultaneous assignment the move resolver cannot sequence
    #[error("Move resolution failed: {message}")]
    MoveResolution { message: String },

    #[error("Code generation error: {message}")]
    Codegen { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompilerError {
    pub fn malformed_ir(message: impl Into<String>) -> Self {
        CompilerError::MalformedIr { message: message.into() }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        CompilerError::Codegen { message: message.into() }
    }

    /// Short name of the error class, used in driver diagnostics
    pub fn class(&self) -> &'static str {
        match self {
            CompilerError::MalformedIr { .. } => "malformed-ir",
            CompilerError::RegisterAllocation { .. } => "regalloc",
            CompilerError::MoveResolution { .. } => "moves",
            CompilerError::Codegen { .. } => "codegen",
            CompilerError::IoError { .. } => "io",
            CompilerError::InternalError { .. } => "internal",
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

/// Convert from String (for simple error cases)
impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::InternalError { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = CompilerError::malformed_ir("register %1.0 used in BB0");
        assert_eq!(err.to_string(), "Malformed IR: register %1.0 used in BB0");
        assert_eq!(err.class(), "malformed-ir");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: CompilerError = io.into();
        assert!(matches!(err, CompilerError::IoError { .. }));
        assert_eq!(err.class(), "io");
    }
}
