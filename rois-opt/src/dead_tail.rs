//! Dead-tail elimination
//! 
//! Everything after the first terminator of a block is unreachable and
//! gets dropped. Blocks no jump targets any more are kept.

use log::debug;
use rois_common::BlockId;
use rois_ir::{Function, IrError};
use crate::Pass;

pub struct DeadTail;

impl Pass for DeadTail {
    fn name(&self) -> &str { "dead-tail" }

    fn run_on_block(&self, func: &mut Function, block: BlockId) -> Result<bool, IrError> {
        let block = func.block_mut(block)?;
        let Some(terminator) = block.terminator_index() else {
            return Ok(false);
        };
        let removed = block.truncate_after(terminator);
        if removed > 0 {
            debug!("BB{}: removed {} instructions after terminator", block.id(), removed);
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rois_ir::{FuncType, IrBuilder, Type, Value};

    fn block_with_tail() -> Function {
        let mut func = Function::new("f", FuncType::new(vec![Type::Int], Type::Int));
        let mut b = IrBuilder::new(&mut func);
        let a = b.block_arg(0).unwrap();
        let s = b.build_iadd(a.clone(), Value::ConstInt(1)).unwrap();
        b.build_ret(s).unwrap();
        let t = b.build_imul(a.clone(), a).unwrap();
        b.build_ret(t).unwrap();
        func
    }

    #[test]
    fn test_tail_removed() {
        let mut func = block_with_tail();
        assert!(DeadTail.run_on_function(&mut func).unwrap());
        assert_eq!(func.blocks[0].len(), 2);
        assert_eq!(func.blocks[0].terminator_index(), Some(1));
    }

    #[test]
    fn test_idempotent() {
        let mut once = block_with_tail();
        DeadTail.run_on_function(&mut once).unwrap();
        let mut twice = once.clone();
        assert!(!DeadTail.run_on_function(&mut twice).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_block_without_terminator_untouched() {
        let mut func = Function::new("f", FuncType::new(vec![Type::Int], Type::Int));
        let mut b = IrBuilder::new(&mut func);
        let a = b.block_arg(0).unwrap();
        b.build_ineg(a).unwrap();
        let before = func.clone();
        assert!(!DeadTail.run_on_function(&mut func).unwrap());
        assert_eq!(func, before);
    }
}
