//! Rois Compiler - Code Generation Backend
//! 
//! Turns a verified module into target text:
//! 
//! - `regalloc` - block-local linear scan onto the x86-64 register file
//! - `moves` - sequencing of simultaneous register assignments
//! - `layout` - field offsets and object sizes
//! - `emit` - NASM x86-64 assembly
//! - `c` - a C translation unit and the symbol mangler it uses

pub mod asm;
pub mod regalloc;
pub mod moves;
pub mod layout;
pub mod emit;
pub mod c;
mod error;

pub use asm::{AsmInst, GpReg, Operand, Width};
pub use regalloc::{AllocationTable, LinearScanAllocator, RegAllocError};
pub use moves::{MoveError, MoveGraph, MoveInst, MoveSource};
pub use layout::{Repr, StructLayout};
pub use emit::{emit_module, AsmEmitter, AsmProgram};
pub use c::{emit_c, CEmitter, NameMangler};
pub use error::CodegenError;

use log::info;
use rois_common::{CompileOptions, Target};
use rois_ir::Module;

/// Main entry point for code generation
pub fn generate(module: &Module, options: &CompileOptions) -> Result<String, CodegenError> {
    info!("generating {} for module '{}'", options.target, module.name);
    match options.target {
        Target::Asm => Ok(emit_module(module)?.to_string()),
        Target::C => emit_c(module, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rois_ir::{FuncType, Function, IrBuilder, Type, Value};

    #[test]
    fn test_basic_code_generation() {
        let mut module = Module::new("m");
        let mut f = Function::new("seven", FuncType::new(vec![], Type::Int));
        IrBuilder::new(&mut f).build_ret(Value::ConstInt(7)).unwrap();
        module.add_function(f);

        let asm = generate(&module, &CompileOptions::default()).unwrap();
        assert!(asm.contains("global seven"));
        assert!(asm.contains("\tmov eax, dword 7"));
        assert!(asm.contains("\tret"));

        let options = CompileOptions { target: Target::C, ..CompileOptions::default() };
        let c = generate(&module, &options).unwrap();
        assert!(c.contains("I32 GF_seven_I(void) {"));
        assert!(c.contains("return ((I32)7);"));
    }
}
