//! Constant folding
//! 
//! Evaluates arithmetic, logic and comparisons on constant operands with
//! 32-bit wraparound and turns branches on a constant condition into
//! jumps. The arm that is no longer taken is left in place.

use log::debug;
use rois_common::BlockId;
use rois_ir::{BinaryOp, Function, InstrKind, IrError, Jump, Type, UnaryOp, Value};
use crate::rewriter::Rewriter;
use crate::Pass;

pub struct ConstantFold;

enum Folded {
    /// Every use of the output becomes this value
    Value(Value),
    /// The branch becomes this jump
    Jump(Jump),
}

fn fold_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    match op {
        BinaryOp::IAdd | BinaryOp::ISub | BinaryOp::IMul => {
            let result = op.eval_int(lhs.as_const_int()?, rhs.as_const_int()?)?;
            Some(Value::ConstInt(result))
        }
        BinaryOp::And => match (lhs.as_const_bool(), rhs.as_const_bool()) {
            (Some(false), _) | (_, Some(false)) => Some(Value::ConstBool(false)),
            (Some(true), _) => Some(rhs.clone()),
            (_, Some(true)) => Some(lhs.clone()),
            (None, None) => None,
        },
        BinaryOp::Or => match (lhs.as_const_bool(), rhs.as_const_bool()) {
            (Some(true), _) | (_, Some(true)) => Some(Value::ConstBool(true)),
            (Some(false), _) => Some(rhs.clone()),
            (_, Some(false)) => Some(lhs.clone()),
            (None, None) => None,
        },
    }
}

fn fold(kind: &InstrKind) -> Option<Folded> {
    let value = match kind {
        InstrKind::Binary { op, lhs, rhs } => fold_binary(*op, lhs, rhs)?,
        InstrKind::Unary { op: UnaryOp::INeg, operand } => Value::ConstInt(operand.as_const_int()?.wrapping_neg()),
        InstrKind::Unary { op: UnaryOp::Not, operand } => Value::ConstBool(!operand.as_const_bool()?),
        InstrKind::ICmp { op, lhs, rhs } => Value::ConstBool(op.eval(lhs.as_const_int()?, rhs.as_const_int()?)),
        InstrKind::Branch { cond, then_jump, else_jump } => {
            let jump = if cond.as_const_bool()? { then_jump } else { else_jump };
            return Some(Folded::Jump(jump.clone()));
        }
        InstrKind::Bitcast { value, ty } if &value.ty() == ty => value.clone(),
        InstrKind::Bitcast { value: Value::ConstBool(b), ty: Type::Int } => Value::ConstInt(i32::from(*b)),
        _ => return None,
    };
    Some(Folded::Value(value))
}

impl Pass for ConstantFold {
    fn name(&self) -> &str { "constant-fold" }

    fn run_on_block(&self, func: &mut Function, block: BlockId) -> Result<bool, IrError> {
        let mut rewriter = Rewriter::new(func, block)?;
        let len = rewriter.block()?.len();
        let mut changed = false;
        for index in 0..len {
            let Some(folded) = rewriter.block()?.instr(index).and_then(|instr| fold(&instr.kind)) else {
                continue;
            };
            match folded {
                Folded::Value(value) => {
                    debug!("BB{block}[{index}]: folded to {value}");
                    rewriter.replace_with_value(index, value)?;
                }
                Folded::Jump(jump) => {
                    debug!("BB{block}[{index}]: branch folded to jump {jump}");
                    rewriter.replace_instr(index, |b| b.build_goto(jump.target, jump.args))?;
                }
            }
            changed = true;
        }
        Ok(changed)
    }
}
