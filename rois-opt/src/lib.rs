//! Rois Optimizer
//! 
//! Block-local IR-to-IR rewrites. Each pass walks every block of a
//! function independently, front to back, and reports whether it changed
//! anything.

pub mod rewriter;
pub mod const_fold;
pub mod dead_tail;
pub mod manager;

pub use rewriter::Rewriter;
pub use const_fold::ConstantFold;
pub use dead_tail::DeadTail;
pub use manager::PassManager;

use rois_common::BlockId;
use rois_ir::{Function, IrError};

/// An optimization pass over the blocks of one function
pub trait Pass {
    /// Name of this pass (for diagnostics)
    fn name(&self) -> &str;

    /// Rewrite one block, returning whether anything changed
    fn run_on_block(&self, func: &mut Function, block: BlockId) -> Result<bool, IrError>;

    fn run_on_function(&self, func: &mut Function) -> Result<bool, IrError> {
        let mut changed = false;
        for block in 0..func.blocks.len() as BlockId {
            changed |= self.run_on_block(func, block)?;
        }
        Ok(changed)
    }
}
