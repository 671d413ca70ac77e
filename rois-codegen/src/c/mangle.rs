//! Symbol mangling for C output
//!
//! Every emitted name carries a category prefix; function names also
//! encode their signature so overloads by type never collide.

use rois_ir::{FuncType, Register, Type};
use std::collections::HashMap;

/// Prefixes owned by the mangler. Unmangled extern names should avoid them.
pub const RESERVED_PREFIXES: [&str; 5] = ["GF_", "GV_", "GM", "T_", "L_"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Multi-character codes are prefixed with their length
fn component(code: &str) -> String {
    if code.len() > 1 {
        format!("{}{}", code.len(), code)
    } else {
        code.to_string()
    }
}

/// Source names are always length-prefixed so they cannot run into the
/// signature that follows
fn ident(name: &str) -> String {
    format!("{}{}", name.len(), name)
}

#[derive(Debug, Default)]
pub struct NameMangler {
    codes: HashMap<Type, String>,
}

impl NameMangler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_code(&mut self, ty: &Type) -> String {
        if let Some(code) = self.codes.get(ty) {
            return code.clone();
        }
        let code = match ty {
            Type::Int => "I".to_string(),
            Type::Bool => "B".to_string(),
            Type::Void => "V".to_string(),
            Type::Ptr => "P".to_string(),
            Type::Class(name) => format!("C{name}"),
            Type::Func(ft) => format!("F{}{}", ft.params.len(), self.signature(ft)),
        };
        self.codes.insert(ty.clone(), code.clone());
        code
    }

    /// `_<arg>..._<ret>`
    fn signature(&mut self, ty: &FuncType) -> String {
        let mut out = String::new();
        for param in &ty.params {
            out.push('_');
            out.push_str(&component(&self.type_code(param)));
        }
        out.push('_');
        out.push_str(&component(&self.type_code(&ty.ret)));
        out
    }

    pub fn function_name(&mut self, name: &str, ty: &FuncType) -> String {
        format!("GF_{}{}", ident(name), self.signature(ty))
    }

    pub fn method(&mut self, class: &str, name: &str, ty: &FuncType) -> String {
        format!("GM{}_{}{}", ident(class), ident(name), self.signature(ty))
    }

    pub fn static_var(&mut self, name: &str, ty: &Type) -> String {
        format!("GV_{}_{}", ident(name), component(&self.type_code(ty)))
    }

    pub fn type_name(&self, class: &str) -> String {
        format!("T_{class}")
    }

    pub fn local(&self, reg: &Register) -> String {
        format!("L_{}_{}", reg.block, reg.slot)
    }

    /// C spelling of a type; function types use their typedef'd code
    pub fn c_type(&mut self, ty: &Type) -> String {
        match ty {
            Type::Int => "I32".to_string(),
            Type::Bool => "BOOL".to_string(),
            Type::Void => "void".to_string(),
            Type::Ptr => "PTR".to_string(),
            Type::Class(name) => self.type_name(name),
            Type::Func(_) => self.type_code(ty),
        }
    }
}
