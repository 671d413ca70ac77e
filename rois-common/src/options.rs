//! Compile options shared by the driver and the emitters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output target of the back end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// x86-64 assembly text (NASM syntax)
    #[default]
    Asm,
    /// Portable C, compiled by an external C compiler
    C,
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Target::Asm => "asm",
            Target::C => "c",
        }
    }

    /// File extension used when no output path is given
    pub fn extension(&self) -> &str {
        match self {
            Target::Asm => "asm",
            Target::C => "c",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for one compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub target: Target,
    /// Run constant folding and dead-tail elimination
    pub optimize: bool,
    /// Dump the IR after the optimizer ran
    pub verbose: bool,
    /// Directory prefix of the runtime headers in `#include` lines
    pub runtime_include: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::Asm,
            optimize: true,
            verbose: false,
            runtime_include: "std".to_string(),
        }
    }
}
