//! Built-in IR programs for trying the back end without a front end
//!
//! Each demo has a `main` returning an int, so the C output links into a
//! program whose exit status is the result.

use rois_common::CompilerError;
use rois_ir::{CmpOp, FuncType, Function, IrBuilder, IrError, Jump, Module, Type, Value};

pub const DEMOS: [&str; 3] = ["sum", "branch", "call"];

pub fn demo(name: &str) -> Result<Module, CompilerError> {
    let module = match name {
        "sum" => sum()?,
        "branch" => branch()?,
        "call" => call()?,
        _ => {
            return Err(CompilerError::InternalError {
                message: format!("unknown demo '{}' (available: {})", name, DEMOS.join(", ")),
            })
        }
    };
    module.verify()?;
    Ok(module)
}

fn int_fn(arity: usize) -> FuncType {
    FuncType::new(vec![Type::Int; arity], Type::Int)
}

/// main() = f(3, 4)
fn main_calling(callee: &Function, args: Vec<Value>) -> Result<Function, IrError> {
    let mut main = Function::new("main", int_fn(0));
    let mut b = IrBuilder::new(&mut main);
    let result = b
        .build_call(callee.as_value(), args, true)?
        .ok_or_else(|| IrError::malformed("main", "demo callee returns void"))?;
    b.build_ret(result)?;
    Ok(main)
}

/// f(a, b) = (a + b) + (b + a)
fn sum() -> Result<Module, IrError> {
    let mut f = Function::new("f", int_fn(2));
    let mut b = IrBuilder::new(&mut f);
    let (x, y) = (b.block_arg(0)?, b.block_arg(1)?);
    let s1 = b.build_iadd(x.clone(), y.clone())?;
    let s2 = b.build_iadd(y, x)?;
    let s = b.build_iadd(s1, s2)?;
    b.build_ret(s)?;

    let mut module = Module::new("sum");
    module.add_function(main_calling(&f, vec![Value::ConstInt(3), Value::ConstInt(4)])?);
    module.add_function(f);
    Ok(module)
}

/// clamp(x) = x < 0 ? 0 : x, with a branch the optimizer folds away in main
fn branch() -> Result<Module, IrError> {
    let mut f = Function::new("clamp", int_fn(1));
    let mut b = IrBuilder::new(&mut f);
    let x = b.block_arg(0)?;
    let join = b.add_block(vec![Type::Int]);
    let negative = b.build_icmp(CmpOp::Lt, x.clone(), Value::ConstInt(0))?;
    b.build_branch(negative, Jump::new(join, vec![Value::ConstInt(0)]), Jump::new(join, vec![x]))?;
    b.switch_block(join)?;
    let r = b.block_arg(0)?;
    b.build_ret(r)?;

    let mut main = Function::new("main", int_fn(0));
    let mut b = IrBuilder::new(&mut main);
    let taken = b.add_block(vec![]);
    let skipped = b.add_block(vec![]);
    let always = b.build_icmp(CmpOp::Gt, Value::ConstInt(2), Value::ConstInt(1))?;
    b.build_branch(always, Jump::new(taken, vec![]), Jump::new(skipped, vec![]))?;
    b.switch_block(taken)?;
    let r = b
        .build_call(f.as_value(), vec![Value::ConstInt(-5)], true)?
        .ok_or_else(|| IrError::malformed("main", "clamp returns void"))?;
    let r = b.build_iadd(r, Value::ConstInt(9))?;
    b.build_ret(r)?;
    b.switch_block(skipped)?;
    b.build_fail("unreachable")?;
    b.build_ret(Value::ConstInt(1))?;

    let mut module = Module::new("branch");
    module.add_function(main);
    module.add_function(f);
    Ok(module)
}

/// square_plus(a, b) = square(a) + b, with b kept live across the call
fn call() -> Result<Module, IrError> {
    let mut square = Function::new("square", int_fn(1));
    let mut b = IrBuilder::new(&mut square);
    let x = b.block_arg(0)?;
    let sq = b.build_imul(x.clone(), x)?;
    b.build_ret(sq)?;

    let mut f = Function::new("square_plus", int_fn(2));
    let mut b = IrBuilder::new(&mut f);
    let (x, y) = (b.block_arg(0)?, b.block_arg(1)?);
    let sq = b
        .build_call(square.as_value(), vec![x], true)?
        .ok_or_else(|| IrError::malformed("square_plus", "square returns void"))?;
    let r = b.build_iadd(sq, y)?;
    b.build_ret(r)?;

    let mut module = Module::new("call");
    module.add_function(main_calling(&f, vec![Value::ConstInt(5), Value::ConstInt(6)])?);
    module.add_function(f);
    module.add_function(square);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demos_verify() {
        for name in DEMOS {
            let module = demo(name).unwrap();
            assert!(module.function("main").is_some(), "{name}");
        }
    }

    #[test]
    fn test_unknown_demo() {
        let err = demo("nope").unwrap_err();
        assert_eq!(err.class(), "internal");
        assert!(err.to_string().contains("sum, branch, call"));
    }
}
