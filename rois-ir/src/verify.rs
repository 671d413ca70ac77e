//! Module verifier
//! 
//! Re-checks every structural invariant the builder enforces, for modules
//! that did not come through the builder (e.g. deserialized from JSON).

use log::debug;
use crate::blocks::BasicBlock;
use crate::error::IrError;
use crate::function::Function;
use crate::instructions::{InstrKind, Instruction};
use crate::module::Module;
use crate::types::{ClassKind, Type};
use crate::values::Value;

impl Module {
    pub fn verify(&self) -> Result<(), IrError> {
        for class in &self.classes {
            for ty in class.field_types() {
                self.check_type(ty)?;
            }
        }
        for func in &self.functions {
            self.verify_function(func)?;
        }
        debug!("module {} verified ({} functions)", self.name, self.functions.len());
        Ok(())
    }

    fn check_type(&self, ty: &Type) -> Result<(), IrError> {
        match ty {
            Type::Class(name) => self.class_def(name).map(|_| ()),
            Type::Func(ft) => {
                for param in &ft.params {
                    self.check_type(param)?;
                }
                self.check_type(&ft.ret)
            }
            Type::Void | Type::Int | Type::Bool | Type::Ptr => Ok(()),
        }
    }

    fn class_def(&self, name: &str) -> Result<&crate::types::ClassDef, IrError> {
        self.class(name).ok_or_else(|| IrError::UnknownClass { name: name.to_string() })
    }

    fn verify_function(&self, func: &Function) -> Result<(), IrError> {
        func.ty.params.iter().try_for_each(|p| self.check_type(p))?;
        self.check_type(&func.ty.ret)?;
        if func.is_extern {
            if !func.blocks.is_empty() {
                return Err(IrError::malformed(&func.name, "extern function has a body"));
            }
            return Ok(());
        }
        let entry = func
            .entry()
            .ok_or_else(|| IrError::malformed(&func.name, "function has no blocks"))?;
        let entry_types: Vec<&Type> = entry.args().iter().map(|a| &a.ty).collect();
        let param_types: Vec<&Type> = func.ty.params.iter().collect();
        if entry_types != param_types {
            return Err(IrError::malformed(
                &func.name,
                format!("entry block takes {} arguments, function has {} parameters", entry_types.len(), param_types.len()),
            ));
        }
        for (index, block) in func.blocks.iter().enumerate() {
            if block.id() as usize != index {
                return Err(IrError::malformed(&func.name, format!("block at position {index} is labelled BB{}", block.id())));
            }
            self.verify_block(func, block)?;
        }
        Ok(())
    }

    fn verify_block(&self, func: &Function, block: &BasicBlock) -> Result<(), IrError> {
        for (slot, arg) in block.args().iter().enumerate() {
            if arg.block != block.id() || arg.slot as usize != slot {
                return Err(IrError::malformed(&func.name, format!("argument {slot} of BB{} is {arg}", block.id())));
            }
            self.check_type(&arg.ty)?;
        }
        for (index, instr) in block.instructions() {
            let kind = &instr.kind;
            kind.check_types()?;
            block.check_operands(kind, block.slot_of(index))?;
            self.check_output(block, index, instr)?;
            for jump in kind.jumps() {
                func.check_jump(jump)?;
            }
            if let InstrKind::Ret(value) = kind {
                func.check_ret(value)?;
            }
            for value in kind.operands() {
                if let Value::Global(global) = value {
                    let target = self.function(&global.name).ok_or_else(|| {
                        IrError::malformed(&func.name, format!("call to unknown function @{}", global.name))
                    })?;
                    if target.ty != global.ty {
                        return Err(IrError::type_mismatch(kind.name(), &target.ty, &global.ty));
                    }
                }
            }
            self.check_class_refs(kind)?;
        }
        Ok(())
    }

    fn check_output(&self, block: &BasicBlock, index: usize, instr: &Instruction) -> Result<(), IrError> {
        let expected = instr
            .kind
            .has_out()
            .then(|| (block.id(), block.slot_of(index), instr.kind.out_type()));
        let found = instr.out.as_ref().map(|r| (r.block, r.slot, r.ty.clone()));
        if expected != found {
            return Err(IrError::BadOutput {
                instr: instr.kind.name(),
                block: block.id(),
                index,
            });
        }
        self.check_type(&instr.kind.out_type())
    }

    fn check_class_refs(&self, kind: &InstrKind) -> Result<(), IrError> {
        match kind {
            InstrKind::AllocClass(class) => self.class_def(class).map(|_| ()),
            InstrKind::Load { field, .. } | InstrKind::Store { field, .. } => {
                let class = self.class_def(&field.class)?;
                match class.field(field.variant, field.index) {
                    Some(decl) if decl.ty == field.ty => Ok(()),
                    Some(decl) => Err(IrError::type_mismatch(kind.name(), &decl.ty, &field.ty)),
                    None => Err(IrError::UnknownField {
                        class: field.class.clone(),
                        index: field.index,
                        variant: field.variant,
                    }),
                }
            }
            InstrKind::GetTag { class, .. } => {
                let def = self.class_def(class)?;
                if !def.is_enum() {
                    return Err(IrError::type_mismatch(kind.name(), "enum class", class));
                }
                Ok(())
            }
            InstrKind::SetTag { class, tag, .. } => match &self.class_def(class)?.kind {
                ClassKind::Enum { variants } if (*tag as usize) < variants.len() => Ok(()),
                ClassKind::Enum { .. } => Err(IrError::UnknownField {
                    class: class.clone(),
                    index: *tag,
                    variant: None,
                }),
                ClassKind::Struct { .. } => Err(IrError::type_mismatch(kind.name(), "enum class", class)),
            },
            InstrKind::Bitcast { ty, .. } => self.check_type(ty),
            _ => Ok(()),
        }
    }
}
