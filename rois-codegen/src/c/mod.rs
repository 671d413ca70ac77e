//! C Emission
//!
//! Prints a module as a single C translation unit against the runtime
//! headers in `runtime/std`. Every SSA register becomes a local; block
//! arguments are declared up front and assigned by the jumps that enter
//! their block.

pub mod mangle;

pub use mangle::NameMangler;

use crate::error::CodegenError;
use log::{debug, info, warn};
use rois_common::CompileOptions;
use rois_ir::{
    BinaryOp, ClassDef, ClassKind, CmpOp, Field, FieldRef, FuncType, Function, GlobalRef, InstrKind, Instruction,
    Jump, Module, Type, UnaryOp, Value,
};

const INDENT: &str = "    ";

pub fn emit_c(module: &Module, options: &CompileOptions) -> Result<String, CodegenError> {
    CEmitter::new(module, options.runtime_include.clone()).emit()
}

fn cmp_operator(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::Ne => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

/// Length-prefixed string literal, every byte as a hex escape
pub fn string_literal(text: &str) -> String {
    let mut out = String::from("\"");
    let len = (text.len() as u32).to_le_bytes();
    for byte in len.iter().chain(text.as_bytes()) {
        out.push_str(&format!("\\x{byte:02x}"));
    }
    out.push('"');
    out
}

/// Plain C string; octal escapes always take three digits
pub fn escape(text: &str) -> String {
    let mut out = String::new();
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\{byte:03o}")),
        }
    }
    out
}

pub struct CEmitter<'m> {
    module: &'m Module,
    include_dir: String,
    mangler: NameMangler,
    out: String,
    indent: usize,
}

impl<'m> CEmitter<'m> {
    pub fn new(module: &'m Module, include_dir: impl Into<String>) -> Self {
        Self {
            module,
            include_dir: include_dir.into(),
            mangler: NameMangler::new(),
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn emit(mut self) -> Result<String, CodegenError> {
        info!("emitting C for module '{}'", self.module.name);
        let module = self.module;
        self.line(format!("#include \"{}/core.h\"", self.include_dir));
        self.line(format!("#include \"{}/alloc.h\"", self.include_dir));
        self.line("");

        for class in &module.classes {
            let name = self.mangler.type_name(&class.name);
            self.line(format!("typedef struct struct_{}* {};", class.name, name));
        }
        for ty in self.function_types() {
            let ret = self.mangler.c_type(&ty.ret);
            let params = self.param_list(&ty.params);
            let code = self.mangler.type_code(&Type::Func(ty));
            self.line(format!("typedef {ret} (*{code})({params});"));
        }
        self.line("");

        for class in &module.classes {
            self.emit_class(class);
        }

        for func in &module.functions {
            let signature = self.prototype(func, false);
            self.line(format!("{signature};"));
        }
        self.line("");

        for func in module.functions.iter().filter(|f| !f.is_extern) {
            self.emit_function(func)?;
        }

        if let Some(main) = module.function("main").filter(|f| !f.is_extern) {
            self.emit_trampoline(main);
        }
        Ok(self.out)
    }

    /// Distinct function types of the module, inner types first
    fn function_types(&self) -> Vec<FuncType> {
        fn visit(ty: &Type, seen: &mut Vec<FuncType>) {
            if let Type::Func(ft) = ty {
                for param in &ft.params {
                    visit(param, seen);
                }
                visit(&ft.ret, seen);
                if !seen.contains(ft) {
                    seen.push(ft.clone());
                }
            }
        }

        let mut seen = Vec::new();
        for class in &self.module.classes {
            for ty in class.field_types() {
                visit(ty, &mut seen);
            }
        }
        for func in &self.module.functions {
            visit(&Type::Func(func.ty.clone()), &mut seen);
            for block in &func.blocks {
                for arg in block.args() {
                    visit(&arg.ty, &mut seen);
                }
                for (_, instr) in block.instructions() {
                    visit(&instr.out_type(), &mut seen);
                    for operand in instr.operands() {
                        visit(&operand.ty(), &mut seen);
                    }
                }
            }
        }
        seen
    }

    fn param_list(&mut self, params: &[Type]) -> String {
        if params.is_empty() {
            return "void".to_string();
        }
        params.iter().map(|p| self.mangler.c_type(p)).collect::<Vec<_>>().join(", ")
    }

    fn field_decls(&mut self, fields: &[Field]) -> Vec<String> {
        let decls: Vec<String> = fields
            .iter()
            .filter(|f| !f.ty.is_void())
            .map(|f| format!("{} {};", self.mangler.c_type(&f.ty), f.name))
            .collect();
        if decls.is_empty() {
            // ISO C has no empty structs
            vec!["char _unused;".to_string()]
        } else {
            decls
        }
    }

    fn emit_class(&mut self, class: &ClassDef) {
        self.line(format!("struct struct_{} {{", class.name));
        self.indent += 1;
        match &class.kind {
            ClassKind::Struct { fields } => {
                for decl in self.field_decls(fields) {
                    self.line(decl);
                }
            }
            ClassKind::Enum { variants } => {
                self.line("I32 tag;");
                if !variants.is_empty() {
                    self.line("union {");
                    self.indent += 1;
                    for variant in variants {
                        let decls = self.field_decls(&variant.fields).join(" ");
                        self.line(format!("struct {{ {decls} }} {};", variant.name));
                    }
                    self.indent -= 1;
                    self.line("} payload;");
                }
            }
        }
        self.indent -= 1;
        self.line("};");
        self.line("");
    }

    fn function_name(&mut self, func: &Function) -> String {
        self.global_name(&func.global_ref())
    }

    fn global_name(&mut self, global: &GlobalRef) -> String {
        if global.is_extern {
            return global.name.clone();
        }
        match &global.owner {
            Some(class) => self.mangler.method(class, &global.name, &global.ty),
            None => self.mangler.function_name(&global.name, &global.ty),
        }
    }

    /// `ret name(params)`, with parameter names for definitions
    fn prototype(&mut self, func: &Function, named: bool) -> String {
        let name = self.function_name(func);
        if func.is_extern && mangle::is_reserved(&name) {
            warn!("extern function '{name}' uses a reserved mangling prefix");
        }
        let ret = self.mangler.c_type(func.ret_type());
        let params = if named && !func.params().is_empty() {
            func.params()
                .iter()
                .map(|p| format!("{} {}", self.mangler.c_type(&p.ty), self.mangler.local(p)))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            self.param_list(&func.ty.params)
        };
        format!("{ret} {name}({params})")
    }

    fn emit_function(&mut self, func: &Function) -> Result<(), CodegenError> {
        info!("emitting function {}", func.name);
        let signature = self.prototype(func, true);
        self.line(format!("{signature} {{"));
        self.indent += 1;

        for block in func.blocks.iter().skip(1) {
            for arg in block.args().iter().filter(|a| !a.ty.is_void()) {
                let decl = format!("{} {};", self.mangler.c_type(&arg.ty), self.mangler.local(arg));
                self.line(decl);
            }
        }

        for block in &func.blocks {
            debug!("{}: BB{}", func.name, block.id());
            self.indent -= 1;
            self.line(format!("bb{}: ;", block.id()));
            self.indent += 1;
            for (_, instr) in block.instructions() {
                self.emit_instr(func, instr)?;
            }
        }

        self.indent -= 1;
        self.line("}");
        self.line("");
        Ok(())
    }

    fn value(&mut self, value: &Value) -> String {
        match value {
            Value::Undef => "0".to_string(),
            Value::ConstInt(i32::MIN) => "((I32)(-2147483647 - 1))".to_string(),
            Value::ConstInt(n) => format!("((I32){n})"),
            Value::ConstBool(true) => "true".to_string(),
            Value::ConstBool(false) => "false".to_string(),
            Value::Reg(reg) => self.mangler.local(reg),
            Value::Global(global) => self.global_name(global),
        }
    }

    fn class_of(&self, name: &str) -> Result<&'m ClassDef, CodegenError> {
        self.module
            .class(name)
            .ok_or_else(|| CodegenError::UnknownClass(name.to_string()))
    }

    /// Member path of a field inside its struct
    fn field_path(&self, field: &FieldRef) -> Result<String, CodegenError> {
        let class = self.class_of(&field.class)?;
        let unknown = || CodegenError::UnknownField { class: field.class.clone(), index: field.index };
        let name = &class.field(field.variant, field.index).ok_or_else(unknown)?.name;
        match (&class.kind, field.variant) {
            (ClassKind::Enum { variants }, Some(v)) => {
                let variant = variants.get(v as usize).ok_or_else(unknown)?;
                Ok(format!("payload.{}.{}", variant.name, name))
            }
            _ => Ok(name.clone()),
        }
    }

    fn object(&mut self, class: &str, object: &Value) -> String {
        let ty = self.mangler.type_name(class);
        format!("(({ty}){})", self.value(object))
    }

    fn emit_jump(&mut self, func: &Function, jump: &Jump) -> Result<(), CodegenError> {
        let target = func.block(jump.target)?;
        let pairs: Vec<_> = jump
            .args
            .iter()
            .zip(target.args())
            .filter(|(_, param)| !param.ty.is_void())
            .collect();
        if pairs.len() > 1 {
            // block arguments are assigned simultaneously
            self.line("{");
            self.indent += 1;
            for (i, (arg, param)) in pairs.iter().enumerate() {
                let ty = self.mangler.c_type(&param.ty);
                let value = self.value(arg);
                self.line(format!("{ty} tmp{i} = {value};"));
            }
            for (i, (_, param)) in pairs.iter().enumerate() {
                let local = self.mangler.local(param);
                self.line(format!("{local} = tmp{i};"));
            }
            self.line(format!("goto bb{};", jump.target));
            self.indent -= 1;
            self.line("}");
        } else {
            for (arg, param) in pairs {
                let local = self.mangler.local(param);
                let value = self.value(arg);
                self.line(format!("{local} = {value};"));
            }
            self.line(format!("goto bb{};", jump.target));
        }
        Ok(())
    }

    fn emit_instr(&mut self, func: &Function, instr: &Instruction) -> Result<(), CodegenError> {
        let expr = match &instr.kind {
            InstrKind::Binary { op, lhs, rhs } => {
                let (l, r) = (self.value(lhs), self.value(rhs));
                match op {
                    // unsigned arithmetic wraps instead of overflowing
                    BinaryOp::IAdd => format!("(I32)((U32)({l}) + (U32)({r}))"),
                    BinaryOp::ISub => format!("(I32)((U32)({l}) - (U32)({r}))"),
                    BinaryOp::IMul => format!("(I32)((U32)({l}) * (U32)({r}))"),
                    // bools keep their raw bits, as in registers
                    BinaryOp::And => format!("(({l}) & ({r}))"),
                    BinaryOp::Or => format!("(({l}) | ({r}))"),
                }
            }
            InstrKind::Unary { op, operand } => {
                let v = self.value(operand);
                match op {
                    UnaryOp::INeg => format!("(I32)(0u - (U32)({v}))"),
                    UnaryOp::Not => format!("(({v}) ^ 1)"),
                }
            }
            InstrKind::ICmp { op, lhs, rhs } => {
                let (l, r) = (self.value(lhs), self.value(rhs));
                format!("((I32){l}) {} ((I32){r})", cmp_operator(*op))
            }
            InstrKind::Goto(jump) => return self.emit_jump(func, jump),
            InstrKind::Branch { cond, then_jump, else_jump } => {
                let c = self.value(cond);
                self.line(format!("if ({c} != 0) {{"));
                self.indent += 1;
                self.emit_jump(func, then_jump)?;
                self.indent -= 1;
                self.line("} else {");
                self.indent += 1;
                self.emit_jump(func, else_jump)?;
                self.indent -= 1;
                self.line("}");
                return Ok(());
            }
            InstrKind::Ret(value) => {
                if value.is_undef() || func.ret_type().is_void() {
                    self.line("return;");
                } else {
                    let v = self.value(value);
                    self.line(format!("return {v};"));
                }
                return Ok(());
            }
            InstrKind::Call { callee, args, .. } => {
                let target = match callee {
                    Value::Global(global) => self.global_name(global),
                    other => format!("({})", self.value(other)),
                };
                let args: Vec<String> = args.iter().map(|a| self.value(a)).collect();
                format!("{target}({})", args.join(", "))
            }
            InstrKind::AllocClass(class) => {
                self.class_of(class)?;
                let ty = self.mangler.type_name(class);
                format!("({ty})_halloc(sizeof(struct struct_{class}))")
            }
            InstrKind::Load { field, object } => {
                let path = self.field_path(field)?;
                format!("{}->{path}", self.object(&field.class, object))
            }
            InstrKind::Store { field, object, value } => {
                let path = self.field_path(field)?;
                if !field.ty.is_void() && !value.is_undef() {
                    let target = self.object(&field.class, object);
                    let v = self.value(value);
                    self.line(format!("{target}->{path} = {v};"));
                }
                return Ok(());
            }
            InstrKind::GetTag { class, object } => format!("{}->tag", self.object(class, object)),
            InstrKind::SetTag { class, object, tag } => {
                let target = self.object(class, object);
                self.line(format!("{target}->tag = {tag};"));
                return Ok(());
            }
            InstrKind::ConstString(text) => format!("(PTR){}", string_literal(text)),
            InstrKind::Fail(message) => {
                self.line(format!("__rtfail(\"{}\");", escape(message)));
                return Ok(());
            }
            InstrKind::Bitcast { value, ty } => {
                let ty = self.mangler.c_type(ty);
                format!("(({ty}) {})", self.value(value))
            }
        };

        match &instr.out {
            Some(out) if instr.has_out() => {
                let ty = self.mangler.c_type(&out.ty);
                let local = self.mangler.local(out);
                self.line(format!("{ty} {local} = {expr};"));
            }
            _ => self.line(format!("{expr};")),
        }
        Ok(())
    }

    /// `main` entry point forwarding to the mangled function
    fn emit_trampoline(&mut self, main: &Function) {
        if !main.params().is_empty() {
            warn!("main takes parameters, no C entry point emitted");
            return;
        }
        let name = self.function_name(main);
        self.line("int main(void) {");
        self.indent += 1;
        match main.ret_type() {
            Type::Int | Type::Bool => self.line(format!("return (int){name}();")),
            _ => {
                self.line(format!("{name}();"));
                self.line("return 0;");
            }
        }
        self.indent -= 1;
        self.line("}");
    }
}
