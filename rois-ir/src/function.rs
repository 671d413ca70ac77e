//! Function Definitions

use rois_common::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::blocks::BasicBlock;
use crate::error::IrError;
use crate::instructions::Jump;
use crate::types::{FuncType, Type};
use crate::values::{GlobalRef, Register, Value};

/// IR Function. Block 0 is the entry block; its arguments are the
/// function parameters. Extern functions have no blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub ty: FuncType,
    pub blocks: Vec<BasicBlock>,
    pub is_extern: bool,
    /// Owning class for methods
    pub class: Option<String>,
}

impl Function {
    pub fn new(name: impl Into<String>, ty: FuncType) -> Self {
        let entry = BasicBlock::new(0, ty.params.clone());
        Self {
            name: name.into(),
            ty,
            blocks: vec![entry],
            is_extern: false,
            class: None,
        }
    }

    pub fn new_extern(name: impl Into<String>, ty: FuncType) -> Self {
        Self {
            name: name.into(),
            ty,
            blocks: Vec::new(),
            is_extern: true,
            class: None,
        }
    }

    pub fn new_method(class: impl Into<String>, name: impl Into<String>, ty: FuncType) -> Self {
        let mut func = Self::new(name, ty);
        func.class = Some(class.into());
        func
    }

    /// Append a block with the given argument types
    pub fn add_block(&mut self, arg_types: Vec<Type>) -> BlockId {
        let id = self.blocks.len() as BlockId;
        self.blocks.push(BasicBlock::new(id, arg_types));
        id
    }

    pub fn block(&self, id: BlockId) -> Result<&BasicBlock, IrError> {
        self.blocks.get(id as usize).ok_or_else(|| IrError::UnknownBlock {
            function: self.name.clone(),
            block: id,
        })
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock, IrError> {
        let name = &self.name;
        self.blocks.get_mut(id as usize).ok_or_else(|| IrError::UnknownBlock {
            function: name.clone(),
            block: id,
        })
    }

    pub fn entry(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn params(&self) -> &[Register] {
        self.entry().map(|b| b.args()).unwrap_or(&[])
    }

    pub fn ret_type(&self) -> &Type {
        &self.ty.ret
    }

    /// Operand referring to this function
    pub fn global_ref(&self) -> GlobalRef {
        GlobalRef {
            name: self.name.clone(),
            ty: self.ty.clone(),
            is_extern: self.is_extern,
            owner: self.class.clone(),
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Global(self.global_ref())
    }

    /// A jump must name an existing block and match its argument types
    pub fn check_jump(&self, jump: &Jump) -> Result<(), IrError> {
        let target = self.block(jump.target)?;
        if target.args().len() != jump.args.len() {
            return Err(IrError::ArgumentCount {
                instr: format!("jump to BB{}", jump.target),
                expected: target.args().len(),
                found: jump.args.len(),
            });
        }
        for (arg, param) in jump.args.iter().zip(target.args()) {
            let found = arg.ty();
            if found != param.ty {
                return Err(IrError::type_mismatch(format!("jump to BB{}", jump.target), &param.ty, found));
            }
        }
        Ok(())
    }

    pub fn check_ret(&self, value: &Value) -> Result<(), IrError> {
        let found = value.ty();
        if &found != self.ret_type() {
            return Err(IrError::type_mismatch("Ret", self.ret_type(), found));
        }
        Ok(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qualified = match &self.class {
            Some(class) => format!("{class}.{}", self.name),
            None => self.name.clone(),
        };
        if self.is_extern {
            return writeln!(f, "extern @{} : {}", qualified, self.ty);
        }
        writeln!(f, "def @{} : {}:", qualified, self.ty)?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}
