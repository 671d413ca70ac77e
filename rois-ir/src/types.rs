//! IR Type System
//! 
//! Semantic types carried by operands, plus the aggregate (class)
//! declarations a module owns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of an IR value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Void,
    /// 32-bit two's complement integer
    Int,
    Bool,
    /// Untyped pointer (string literals, runtime handles)
    Ptr,
    Func(FuncType),
    /// Heap-allocated class, identified by name
    Class(String),
}

/// Function signature: ordered parameter types and a return type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl FuncType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret: Box::new(ret) }
    }
}

impl Type {
    pub fn func(params: Vec<Type>, ret: Type) -> Self {
        Type::Func(FuncType::new(params, ret))
    }

    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn as_func(&self) -> Option<&FuncType> {
        match self {
            Type::Func(ft) => Some(ft),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Ptr => write!(f, "ptr"),
            Type::Func(ft) => write!(f, "{ft}"),
            Type::Class(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A named, typed field of a struct class or of one enum variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

/// One alternative of an enum class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Struct { fields: Vec<Field> },
    /// Tagged union; the tag value of a variant is its index
    Enum { variants: Vec<Variant> },
}

/// Aggregate type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
}

impl ClassDef {
    pub fn new_struct(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(), kind: ClassKind::Struct { fields } }
    }

    pub fn new_enum(name: impl Into<String>, variants: Vec<Variant>) -> Self {
        Self { name: name.into(), kind: ClassKind::Enum { variants } }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ClassKind::Enum { .. })
    }

    pub fn ty(&self) -> Type {
        Type::Class(self.name.clone())
    }

    /// Field list of the struct itself or of the given variant
    pub fn fields(&self, variant: Option<u32>) -> Option<&[Field]> {
        match (&self.kind, variant) {
            (ClassKind::Struct { fields }, None) => Some(fields),
            (ClassKind::Enum { variants }, Some(v)) => {
                variants.get(v as usize).map(|v| v.fields.as_slice())
            }
            _ => None,
        }
    }

    pub fn field(&self, variant: Option<u32>, index: u32) -> Option<&Field> {
        self.fields(variant)?.get(index as usize)
    }

    /// Every field type declared anywhere in the class
    pub fn field_types(&self) -> Vec<&Type> {
        match &self.kind {
            ClassKind::Struct { fields } => fields.iter().map(|f| &f.ty).collect(),
            ClassKind::Enum { variants } => variants
                .iter()
                .flat_map(|v| v.fields.iter().map(|f| &f.ty))
                .collect(),
        }
    }
}

impl fmt::Display for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[Field]) -> fmt::Result {
            for (i, field) in fields.iter().enumerate() {
                if i > 0 { write!(f, ", ")?; }
                write!(f, "{}: {}", field.name, field.ty)?;
            }
            Ok(())
        }

        match &self.kind {
            ClassKind::Struct { fields } => {
                write!(f, "class {} {{ ", self.name)?;
                write_fields(f, fields)?;
                write!(f, " }}")
            }
            ClassKind::Enum { variants } => {
                write!(f, "enum {} {{ ", self.name)?;
                for (i, variant) in variants.iter().enumerate() {
                    if i > 0 { write!(f, " | ")?; }
                    write!(f, "{}(", variant.name)?;
                    write_fields(f, &variant.fields)?;
                    write!(f, ")")?;
                }
                write!(f, " }}")
            }
        }
    }
}
