//! Struct Layout
//! 
//! Byte offsets of class fields under natural alignment. Layouts are
//! computed on first use and cached for the life of one emission session.

use crate::asm::Width;
use crate::error::CodegenError;
use rois_ir::{ClassDef, ClassKind, Field, FieldRef, Module, Type};
use std::collections::BTreeMap;

/// Machine representation class of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// No storage (void)
    Zero,
    /// 4-byte value (int, bool)
    V32,
    /// 8-byte value or raw pointer (ptr, fn)
    V64,
    /// 8-byte reference to a heap object (class)
    Addr,
}

impl Repr {
    pub fn of(ty: &Type) -> Self {
        match ty {
            Type::Void => Repr::Zero,
            Type::Int | Type::Bool => Repr::V32,
            Type::Ptr | Type::Func(_) => Repr::V64,
            Type::Class(_) => Repr::Addr,
        }
    }

    pub fn size(self) -> u32 {
        match self {
            Repr::Zero => 0,
            Repr::V32 => 4,
            Repr::V64 | Repr::Addr => 8,
        }
    }

    pub fn align(self) -> u32 {
        match self {
            Repr::Zero => 1,
            Repr::V32 => 4,
            Repr::V64 | Repr::Addr => 8,
        }
    }

    /// Register width used to move a value of this representation
    pub fn width(self) -> Width {
        match self {
            Repr::Zero | Repr::V32 => Width::B32,
            Repr::V64 | Repr::Addr => Width::B64,
        }
    }
}

pub fn align_up(offset: u32, align: u32) -> u32 {
    offset.div_ceil(align) * align
}

/// Layout of one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    pub size: u32,
    pub align: u32,
    offsets: BTreeMap<(Option<u32>, u32), u32>,
}

impl ClassLayout {
    pub fn offset(&self, variant: Option<u32>, index: u32) -> Option<u32> {
        self.offsets.get(&(variant, index)).copied()
    }
}

/// Place `fields` starting at `base`; returns (end offset, max alignment)
fn place(fields: &[Field], base: u32, variant: Option<u32>, offsets: &mut BTreeMap<(Option<u32>, u32), u32>) -> (u32, u32) {
    let mut offset = base;
    let mut max_align = 1;
    for (index, field) in fields.iter().enumerate() {
        let repr = Repr::of(&field.ty);
        offset = align_up(offset, repr.align());
        offsets.insert((variant, index as u32), offset);
        offset += repr.size();
        max_align = max_align.max(repr.align());
    }
    (offset, max_align)
}

pub fn compute_layout(class: &ClassDef) -> ClassLayout {
    let mut offsets = BTreeMap::new();
    match &class.kind {
        ClassKind::Struct { fields } => {
            let (end, align) = place(fields, 0, None, &mut offsets);
            ClassLayout { size: align_up(end, align), align, offsets }
        }
        ClassKind::Enum { variants } => {
            // tag first, then the payload union aligned for its strictest member
            let payload_align = variants
                .iter()
                .flat_map(|v| v.fields.iter())
                .map(|f| Repr::of(&f.ty).align())
                .max()
                .unwrap_or(1);
            let payload = align_up(Repr::V32.size(), payload_align);
            let mut end = payload;
            for (index, variant) in variants.iter().enumerate() {
                let (variant_end, _) = place(&variant.fields, payload, Some(index as u32), &mut offsets);
                end = end.max(variant_end);
            }
            let align = payload_align.max(Repr::V32.align());
            ClassLayout { size: align_up(end, align), align, offsets }
        }
    }
}

/// Per-session layout cache
pub struct StructLayout<'m> {
    module: &'m Module,
    cache: BTreeMap<String, ClassLayout>,
}

impl<'m> StructLayout<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module, cache: BTreeMap::new() }
    }

    pub fn layout(&mut self, class: &str) -> Result<&ClassLayout, CodegenError> {
        if !self.cache.contains_key(class) {
            let def = self
                .module
                .class(class)
                .ok_or_else(|| CodegenError::UnknownClass(class.to_string()))?;
            self.cache.insert(class.to_string(), compute_layout(def));
        }
        self.cache
            .get(class)
            .ok_or_else(|| CodegenError::UnknownClass(class.to_string()))
    }

    pub fn size_of(&mut self, class: &str) -> Result<u32, CodegenError> {
        Ok(self.layout(class)?.size)
    }

    pub fn field_offset(&mut self, field: &FieldRef) -> Result<u32, CodegenError> {
        self.layout(&field.class)?
            .offset(field.variant, field.index)
            .ok_or_else(|| CodegenError::UnknownField { class: field.class.clone(), index: field.index })
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rois_ir::{FuncType, Variant};

    #[test]
    fn test_struct_padding() {
        let class = ClassDef::new_struct("Mixed", vec![
            Field::new("flag", Type::Bool),
            Field::new("next", Type::class("Mixed")),
            Field::new("count", Type::Int),
        ]);
        let layout = compute_layout(&class);
        assert_eq!(layout.offset(None, 0), Some(0));
        assert_eq!(layout.offset(None, 1), Some(8));
        assert_eq!(layout.offset(None, 2), Some(16));
        assert_eq!((layout.size, layout.align), (24, 8));
    }

    #[test]
    fn test_packed_ints_and_void() {
        let class = ClassDef::new_struct("P", vec![
            Field::new("x", Type::Int),
            Field::new("unit", Type::Void),
            Field::new("y", Type::Int),
        ]);
        let layout = compute_layout(&class);
        assert_eq!(layout.offset(None, 1), Some(4));
        assert_eq!(layout.offset(None, 2), Some(4));
        assert_eq!(layout.size, 8);
    }

    #[test]
    fn test_enum_tag_and_payload() {
        let class = ClassDef::new_enum("Shape", vec![
            Variant { name: "Circle".to_string(), fields: vec![Field::new("r", Type::Int)] },
            Variant {
                name: "Poly".to_string(),
                fields: vec![Field::new("n", Type::Int), Field::new("pts", Type::Ptr)],
            },
        ]);
        let layout = compute_layout(&class);
        // pointer payload pushes the union to offset 8
        assert_eq!(layout.offset(Some(0), 0), Some(8));
        assert_eq!(layout.offset(Some(1), 0), Some(8));
        assert_eq!(layout.offset(Some(1), 1), Some(16));
        assert_eq!(layout.size, 24);

        let small = ClassDef::new_enum("Flag", vec![
            Variant { name: "On".to_string(), fields: vec![] },
            Variant { name: "Level".to_string(), fields: vec![Field::new("v", Type::Int)] },
        ]);
        let layout = compute_layout(&small);
        assert_eq!(layout.offset(Some(1), 0), Some(4));
        assert_eq!(layout.size, 8);
    }

    #[test]
    fn test_session_cache() {
        let mut module = Module::new("m");
        module.add_class(ClassDef::new_struct("P", vec![
            Field::new("x", Type::Int),
            Field::new("f", Type::func(vec![], Type::Void)),
        ]));
        let mut layouts = StructLayout::new(&module);
        assert_eq!(layouts.size_of("P"), Ok(16));
        let f = FieldRef::new("P", 1, Type::Func(FuncType::new(vec![], Type::Void)));
        assert_eq!(layouts.field_offset(&f), Ok(8));
        assert_eq!(layouts.cached(), 1);
        assert_eq!(layouts.size_of("Q"), Err(CodegenError::UnknownClass("Q".to_string())));
        let missing = FieldRef::new("P", 7, Type::Int);
        assert!(matches!(layouts.field_offset(&missing), Err(CodegenError::UnknownField { .. })));
    }
}
