//! Rewriting helpers shared by the passes

use rois_common::BlockId;
use rois_ir::{BasicBlock, Function, IrBuilder, IrError, Value};

/// Rewrites positioned on one block of a function
pub struct Rewriter<'f> {
    func: &'f mut Function,
    block: BlockId,
}

impl<'f> Rewriter<'f> {
    pub fn new(func: &'f mut Function, block: BlockId) -> Result<Self, IrError> {
        func.block(block)?;
        Ok(Self { func, block })
    }

    pub fn block(&self) -> Result<&BasicBlock, IrError> {
        self.func.block(self.block)
    }

    /// Overwrite slot `index` with whatever `build` constructs through a
    /// builder in replace mode
    pub fn replace_instr<F>(&mut self, index: usize, build: F) -> Result<(), IrError>
    where
        F: FnOnce(&mut IrBuilder<'_>) -> Result<(), IrError>,
    {
        let mut builder = IrBuilder::new(&mut *self.func);
        builder.switch_block(self.block)?;
        builder.switch_to_replace_mode(index)?;
        build(&mut builder)
    }

    /// Drop the instruction at `index` and forward `value` to every use
    /// of its output
    pub fn replace_with_value(&mut self, index: usize, value: Value) -> Result<(), IrError> {
        let block = self.func.block_mut(self.block)?;
        if let Some(out) = block.remove_instr(index).and_then(|instr| instr.out) {
            block.replace_all(&out, &value);
        }
        Ok(())
    }
}
