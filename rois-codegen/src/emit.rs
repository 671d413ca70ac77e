//! Assembly Emission
//!
//! Lowers an allocated module to NASM-syntax x86-64. Every function is
//! register-allocated block by block; block arguments and call arguments
//! are bound with the parallel move resolver.
//!
//! Calling convention: the first four arguments travel in `rcx, rdx,
//! r8, r9`, the result comes back in `rax`. Registers live across a call
//! are saved with `push`/`pop` around it. `rdi` and `rsi` belong to the
//! caller, so a function that allocates them saves them on entry and
//! restores them before every `ret`.
//!
//! Every `call` reserves 32 bytes of home space below the pushed
//! registers and pads the frame so that `rsp` is 16-byte aligned at the
//! call instruction. Functions may assume `rsp % 16 == 8` on entry.

use crate::asm::{AsmInst, Cond, GpReg, Operand, Width};
use crate::error::CodegenError;
use crate::layout::{Repr, StructLayout};
use crate::moves::{MoveGraph, MoveInst, MoveSource};
use crate::regalloc::{AllocationTable, LinearScanAllocator};
use log::{debug, info, trace};
use rois_common::BlockId;
use rois_ir::{BasicBlock, BinaryOp, Function, InstrKind, Instruction, Jump, Module, Register, UnaryOp, Value};
use std::fmt;

/// Runtime entry points every program may call
pub const HALLOC: &str = "_halloc";
pub const RTFAIL: &str = "__rtfail";

/// Home space a callee may use for its register arguments
pub const HOME_SPACE: u32 = 32;

/// Emitted assembly, one entry per output line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsmProgram {
    pub lines: Vec<AsmInst>,
}

impl AsmProgram {
    /// Index of the line defining `label`
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| matches!(line, AsmInst::Label(l) if l == label))
    }
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub fn block_label(symbol: &str, block: BlockId) -> String {
    format!("{symbol}_bb{block}")
}

pub fn emit_module(module: &Module) -> Result<AsmProgram, CodegenError> {
    AsmEmitter::new(module).emit()
}

/// Per-function emission state
struct FunctionCtx<'f> {
    func: &'f Function,
    symbol: String,
    table: AllocationTable,
    callee_saved: Vec<GpReg>,
}

impl FunctionCtx<'_> {
    /// Bytes to reserve before a call made with `pushed` registers saved
    /// at the call site
    fn call_frame(&self, pushed: usize) -> u32 {
        // return address plus every push since entry
        let words = 1 + self.callee_saved.len() + pushed;
        HOME_SPACE + if words % 2 == 1 { 8 } else { 0 }
    }

    fn reg(&self, reg: &Register) -> Result<Option<GpReg>, CodegenError> {
        Ok(self.table.lookup(reg)?)
    }

    /// Physical register of a register operand that is actually read
    fn used_reg(&self, reg: &Register) -> Result<GpReg, CodegenError> {
        self.reg(reg)?.ok_or_else(|| CodegenError::Unsupported {
            function: self.func.name.clone(),
            what: format!("read of unallocated register {reg}"),
        })
    }

    fn operand(&self, value: &Value) -> Result<Operand, CodegenError> {
        match value {
            Value::Undef => Ok(Operand::Imm(0, Width::B32)),
            Value::ConstInt(n) => Ok(Operand::Imm(*n as i64, Width::B32)),
            Value::ConstBool(b) => Ok(Operand::Imm(*b as i64, Width::B32)),
            Value::Reg(reg) => Ok(Operand::Reg(self.used_reg(reg)?, Repr::of(&reg.ty).width())),
            Value::Global(global) => Err(CodegenError::Unsupported {
                function: self.func.name.clone(),
                what: format!("@{} as an arithmetic operand", global.name),
            }),
        }
    }

    /// Source of a move; `None` for values that need no move (undefined)
    fn source(&self, value: &Value) -> Result<Option<MoveSource>, CodegenError> {
        Ok(match value {
            Value::Undef => None,
            Value::ConstInt(n) => Some(MoveSource::Imm(*n)),
            Value::ConstBool(b) => Some(MoveSource::Imm(*b as i32)),
            Value::Reg(reg) => Some(MoveSource::Reg(self.used_reg(reg)?)),
            Value::Global(global) => Some(MoveSource::Symbol(global.symbol())),
        })
    }
}

fn lower_move(inst: MoveInst) -> AsmInst {
    match inst {
        MoveInst::MovReg { dest, src } => AsmInst::Mov(Operand::reg64(dest), Operand::reg64(src)),
        MoveInst::MovImm { dest, value } => AsmInst::Mov(Operand::reg32(dest), Operand::Imm(value as i64, Width::B32)),
        MoveInst::LoadAddr { dest, symbol } => AsmInst::Lea(dest, symbol),
        MoveInst::Swap(a, b) => AsmInst::Xchg(a, b),
    }
}

fn binary_inst(op: BinaryOp, dest: Operand, src: Operand) -> AsmInst {
    match op {
        BinaryOp::IAdd => AsmInst::Add(dest, src),
        BinaryOp::ISub => AsmInst::Sub(dest, src),
        BinaryOp::IMul => AsmInst::Imul(dest, src),
        BinaryOp::And => AsmInst::And(dest, src),
        BinaryOp::Or => AsmInst::Or(dest, src),
    }
}

/// Assembly emitter for one module
pub struct AsmEmitter<'m> {
    module: &'m Module,
    layouts: StructLayout<'m>,
    allocator: LinearScanAllocator,
    lines: Vec<AsmInst>,
    rodata: Vec<AsmInst>,
    strings: usize,
}

impl<'m> AsmEmitter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self::with_allocator(module, LinearScanAllocator::new())
    }

    pub fn with_allocator(module: &'m Module, allocator: LinearScanAllocator) -> Self {
        Self {
            module,
            layouts: StructLayout::new(module),
            allocator,
            lines: Vec::new(),
            rodata: Vec::new(),
            strings: 0,
        }
    }

    pub fn emit(mut self) -> Result<AsmProgram, CodegenError> {
        info!("emitting assembly for module '{}'", self.module.name);
        self.lines.push(AsmInst::DefaultRel);
        let module = self.module;
        for func in &module.functions {
            let symbol = func.global_ref().symbol();
            if func.is_extern {
                self.lines.push(AsmInst::Extern(symbol));
            } else {
                self.lines.push(AsmInst::Global(symbol));
            }
        }
        for runtime in [HALLOC, RTFAIL] {
            if module.function(runtime).is_none() {
                self.lines.push(AsmInst::Extern(runtime.to_string()));
            }
        }
        self.lines.push(AsmInst::Section(".text".to_string()));

        for func in module.functions.iter().filter(|f| !f.is_extern) {
            self.emit_function(func)?;
        }

        if !self.rodata.is_empty() {
            self.lines.push(AsmInst::Blank);
            self.lines.push(AsmInst::Section(".rodata".to_string()));
            self.lines.append(&mut self.rodata);
        }
        Ok(AsmProgram { lines: self.lines })
    }

    fn emit_function(&mut self, func: &Function) -> Result<(), CodegenError> {
        let table = AllocationTable::for_function(func, &self.allocator)?;
        let callee_saved = [GpReg::Rdi, GpReg::Rsi]
            .into_iter()
            .filter(|reg| table.assignments().values().any(|a| *a == Some(*reg)))
            .collect();
        let ctx = FunctionCtx { func, symbol: func.global_ref().symbol(), table, callee_saved };
        info!("emitting function {}", ctx.symbol);

        if func.params().len() > GpReg::ARGS.len() {
            return Err(CodegenError::TooManyArguments {
                function: func.name.clone(),
                count: func.params().len(),
                max: GpReg::ARGS.len(),
            });
        }

        self.lines.push(AsmInst::Blank);
        self.lines.push(AsmInst::Label(ctx.symbol.clone()));
        for reg in &ctx.callee_saved {
            self.lines.push(AsmInst::Push(*reg));
        }

        // bind the incoming argument registers ahead of the entry label so
        // jumps back into the entry block skip it
        let mut graph = MoveGraph::new();
        for (param, conv) in func.params().iter().zip(GpReg::ARGS) {
            if let Some(dest) = ctx.reg(param)? {
                graph.add_move(MoveSource::Reg(conv), dest)?;
            }
        }
        self.emit_moves(graph)?;

        for block in &func.blocks {
            self.emit_block(&ctx, block)?;
        }
        Ok(())
    }

    fn emit_moves(&mut self, graph: MoveGraph) -> Result<(), CodegenError> {
        for inst in graph.resolve()? {
            self.lines.push(lower_move(inst));
        }
        Ok(())
    }

    fn emit_block(&mut self, ctx: &FunctionCtx, block: &BasicBlock) -> Result<(), CodegenError> {
        debug!("{}: BB{} with {} instructions", ctx.symbol, block.id(), block.len());
        self.lines.push(AsmInst::Label(block_label(&ctx.symbol, block.id())));
        for (index, instr) in block.instructions() {
            let out = match &instr.out {
                Some(reg) => ctx.reg(reg)?,
                None => None,
            };
            if out.is_none() && !instr.kind.has_side_effects() {
                trace!("{}: skipping dead {}", ctx.symbol, instr);
                continue;
            }
            self.lines.push(AsmInst::Comment(instr.to_string()));
            self.emit_instr(ctx, block.id(), index, instr, out)?;
        }
        Ok(())
    }

    fn emit_instr(
        &mut self,
        ctx: &FunctionCtx,
        block: BlockId,
        index: usize,
        instr: &Instruction,
        out: Option<GpReg>,
    ) -> Result<(), CodegenError> {
        let width = Repr::of(&instr.out_type()).width();
        match &instr.kind {
            InstrKind::Binary { op, lhs, rhs } => {
                let Some(o) = out else { return Ok(()) };
                let dest = Operand::Reg(o, width);
                let lhs = ctx.operand(lhs)?;
                let rhs = ctx.operand(rhs)?;
                if rhs.as_reg() == Some(o) {
                    // out shares the right operand's register
                    if op.is_commutative() {
                        self.lines.push(binary_inst(*op, dest, lhs));
                    } else {
                        self.lines.push(AsmInst::Sub(dest.clone(), lhs));
                        self.lines.push(AsmInst::Neg(dest));
                    }
                } else {
                    if lhs.as_reg() != Some(o) {
                        self.lines.push(AsmInst::Mov(dest.clone(), lhs));
                    }
                    self.lines.push(binary_inst(*op, dest, rhs));
                }
            }
            InstrKind::Unary { op, operand } => {
                let Some(o) = out else { return Ok(()) };
                let dest = Operand::Reg(o, width);
                let operand = ctx.operand(operand)?;
                if operand.as_reg() != Some(o) {
                    self.lines.push(AsmInst::Mov(dest.clone(), operand));
                }
                match op {
                    UnaryOp::INeg => self.lines.push(AsmInst::Neg(dest)),
                    UnaryOp::Not => self.lines.push(AsmInst::Xor(dest, Operand::Imm(1, Width::B32))),
                }
            }
            InstrKind::ICmp { op, lhs, rhs } => {
                let Some(o) = out else { return Ok(()) };
                let lhs = ctx.operand(lhs)?;
                let rhs = ctx.operand(rhs)?;
                let cond = match (lhs.as_reg(), rhs.as_reg()) {
                    (Some(_), _) => {
                        self.lines.push(AsmInst::Cmp(lhs, rhs));
                        Cond::from(*op)
                    }
                    (None, Some(_)) => {
                        self.lines.push(AsmInst::Cmp(rhs, lhs));
                        Cond::from(op.swapped())
                    }
                    (None, None) => {
                        self.lines.push(AsmInst::Mov(Operand::reg32(o), lhs));
                        self.lines.push(AsmInst::Cmp(Operand::reg32(o), rhs));
                        Cond::from(*op)
                    }
                };
                self.lines.push(AsmInst::Set(cond, Operand::Reg(o, Width::B8)));
                self.lines.push(AsmInst::Movzx(Operand::reg32(o), Operand::Reg(o, Width::B8)));
            }
            InstrKind::Bitcast { value, .. } => {
                let Some(o) = out else { return Ok(()) };
                self.copy_into(ctx, o, value)?;
            }
            InstrKind::Goto(jump) => self.emit_jump(ctx, jump)?,
            InstrKind::Branch { cond, then_jump, else_jump } => {
                if let Some(taken) = cond.as_const_bool() {
                    let jump = if taken { then_jump } else { else_jump };
                    self.emit_jump(ctx, jump)?;
                } else {
                    let cond = ctx.operand(cond)?;
                    let else_label = format!("{}_bb{}_{}_else", ctx.symbol, block, index);
                    self.lines.push(AsmInst::Test(cond.clone(), cond));
                    self.lines.push(AsmInst::Jz(else_label.clone()));
                    self.emit_jump(ctx, then_jump)?;
                    self.lines.push(AsmInst::Label(else_label));
                    self.emit_jump(ctx, else_jump)?;
                }
            }
            InstrKind::Ret(value) => {
                if !value.is_undef() {
                    self.copy_into(ctx, GpReg::Rax, value)?;
                }
                for reg in ctx.callee_saved.iter().rev() {
                    self.lines.push(AsmInst::Pop(*reg));
                }
                self.lines.push(AsmInst::Ret);
            }
            InstrKind::Call { callee, args, preserve_live } => {
                if args.len() > GpReg::ARGS.len() {
                    return Err(CodegenError::TooManyArguments {
                        function: ctx.func.name.clone(),
                        count: args.len(),
                        max: GpReg::ARGS.len(),
                    });
                }
                let saved: Vec<GpReg> = if *preserve_live {
                    ctx.table.live_across(block, index).to_vec()
                } else {
                    Vec::new()
                };
                for reg in &saved {
                    self.lines.push(AsmInst::Push(*reg));
                }

                let mut graph = MoveGraph::new();
                for (arg, conv) in args.iter().zip(GpReg::ARGS) {
                    if let Some(source) = ctx.source(arg)? {
                        graph.add_move(source, conv)?;
                    }
                }
                let call = match callee {
                    Value::Global(global) => AsmInst::Call(global.symbol()),
                    other => {
                        let target = ctx.source(other)?.ok_or_else(|| CodegenError::Unsupported {
                            function: ctx.func.name.clone(),
                            what: "call through an undefined value".to_string(),
                        })?;
                        graph.add_move(target, GpReg::Rax)?;
                        AsmInst::CallReg(GpReg::Rax)
                    }
                };
                let frame = ctx.call_frame(saved.len());
                self.lines.push(AsmInst::ReserveStack(frame));
                self.emit_moves(graph)?;
                self.lines.push(call);
                self.lines.push(AsmInst::ReleaseStack(frame));
                self.emit_result(out);

                for reg in saved.iter().rev() {
                    self.lines.push(AsmInst::Pop(*reg));
                }
            }
            InstrKind::AllocClass(class) => {
                let size = self.layouts.size_of(class)?;
                let saved = ctx.table.live_across(block, index).to_vec();
                for reg in &saved {
                    self.lines.push(AsmInst::Push(*reg));
                }
                let frame = ctx.call_frame(saved.len());
                self.lines.push(AsmInst::ReserveStack(frame));
                self.lines.push(AsmInst::Mov(Operand::reg64(GpReg::Rcx), Operand::Imm(size as i64, Width::B64)));
                self.lines.push(AsmInst::Call(HALLOC.to_string()));
                self.lines.push(AsmInst::ReleaseStack(frame));
                self.emit_result(out);
                for reg in saved.iter().rev() {
                    self.lines.push(AsmInst::Pop(*reg));
                }
            }
            InstrKind::Load { field, object } => {
                let Some(o) = out else { return Ok(()) };
                let base = self.object_reg(ctx, object)?;
                let offset = self.layouts.field_offset(field)?;
                let width = Repr::of(&field.ty).width();
                self.lines.push(AsmInst::Mov(Operand::Reg(o, width), Operand::Mem { base, offset, width }));
            }
            InstrKind::Store { field, object, value } => {
                let repr = Repr::of(&field.ty);
                if repr == Repr::Zero || value.is_undef() {
                    return Ok(());
                }
                let base = self.object_reg(ctx, object)?;
                let offset = self.layouts.field_offset(field)?;
                let width = repr.width();
                let mem = Operand::Mem { base, offset, width };
                match value {
                    Value::Global(global) => {
                        let scratch = if base == GpReg::Rax { GpReg::Rcx } else { GpReg::Rax };
                        self.lines.push(AsmInst::Push(scratch));
                        self.lines.push(AsmInst::Lea(scratch, global.symbol()));
                        self.lines.push(AsmInst::Mov(mem, Operand::reg64(scratch)));
                        self.lines.push(AsmInst::Pop(scratch));
                    }
                    Value::Reg(reg) => {
                        let src = ctx.used_reg(reg)?;
                        self.lines.push(AsmInst::Mov(mem, Operand::Reg(src, width)));
                    }
                    constant => {
                        let imm = ctx.operand(constant)?;
                        self.lines.push(AsmInst::Mov(mem, imm));
                    }
                }
            }
            InstrKind::GetTag { object, .. } => {
                let Some(o) = out else { return Ok(()) };
                let base = self.object_reg(ctx, object)?;
                self.lines.push(AsmInst::Mov(Operand::reg32(o), Operand::Mem { base, offset: 0, width: Width::B32 }));
            }
            InstrKind::SetTag { object, tag, .. } => {
                let base = self.object_reg(ctx, object)?;
                self.lines.push(AsmInst::Mov(
                    Operand::Mem { base, offset: 0, width: Width::B32 },
                    Operand::Imm(*tag as i64, Width::B32),
                ));
            }
            InstrKind::ConstString(text) => {
                let Some(o) = out else { return Ok(()) };
                let mut bytes = (text.len() as u32).to_le_bytes().to_vec();
                bytes.extend_from_slice(text.as_bytes());
                let label = self.add_string(ctx, bytes);
                self.lines.push(AsmInst::Lea(o, label));
            }
            InstrKind::Fail(message) => {
                // the runtime takes a NUL-terminated message
                let mut bytes = message.as_bytes().to_vec();
                bytes.push(0);
                let label = self.add_string(ctx, bytes);
                let frame = ctx.call_frame(0);
                self.lines.push(AsmInst::ReserveStack(frame));
                self.lines.push(AsmInst::Lea(GpReg::Rcx, label));
                self.lines.push(AsmInst::Call(RTFAIL.to_string()));
                self.lines.push(AsmInst::ReleaseStack(frame));
            }
        }
        Ok(())
    }

    fn emit_result(&mut self, out: Option<GpReg>) {
        if let Some(o) = out {
            if o != GpReg::Rax {
                self.lines.push(AsmInst::Mov(Operand::reg64(o), Operand::reg64(GpReg::Rax)));
            }
        }
    }

    fn emit_jump(&mut self, ctx: &FunctionCtx, jump: &Jump) -> Result<(), CodegenError> {
        let target = ctx.func.block(jump.target)?;
        let mut graph = MoveGraph::new();
        for (arg, param) in jump.args.iter().zip(target.args()) {
            if let (Some(dest), Some(source)) = (ctx.reg(param)?, ctx.source(arg)?) {
                graph.add_move(source, dest)?;
            }
        }
        self.emit_moves(graph)?;
        self.lines.push(AsmInst::Jmp(block_label(&ctx.symbol, jump.target)));
        Ok(())
    }

    fn copy_into(&mut self, ctx: &FunctionCtx, dest: GpReg, value: &Value) -> Result<(), CodegenError> {
        let mut graph = MoveGraph::new();
        if let Some(source) = ctx.source(value)? {
            graph.add_move(source, dest)?;
        }
        self.emit_moves(graph)
    }

    fn object_reg(&self, ctx: &FunctionCtx, object: &Value) -> Result<GpReg, CodegenError> {
        match object {
            Value::Reg(reg) => ctx.used_reg(reg),
            other => Err(CodegenError::Unsupported {
                function: ctx.func.name.clone(),
                what: format!("field access on {other}"),
            }),
        }
    }

    fn add_string(&mut self, ctx: &FunctionCtx, bytes: Vec<u8>) -> String {
        let label = format!("{}_str{}", ctx.symbol, self.strings);
        self.strings += 1;
        self.rodata.push(AsmInst::Data(label.clone(), bytes));
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rois_ir::{CmpOp, FuncType, IrBuilder, Type};

    fn lines_of(program: &AsmProgram, label: &str) -> Vec<String> {
        let start = program.label_index(label).unwrap() + 1;
        program.lines[start..]
            .iter()
            .take_while(|l| !matches!(l, AsmInst::Label(_) | AsmInst::Blank))
            .filter(|l| !matches!(l, AsmInst::Comment(_)))
            .map(|l| l.to_string())
            .collect()
    }

    fn single(func: Function) -> AsmProgram {
        let mut module = Module::new("t");
        module.add_function(func);
        emit_module(&module).unwrap()
    }

    #[test]
    fn test_prologue() {
        let mut module = Module::new("t");
        module.add_function(Function::new_extern("puts", FuncType::new(vec![Type::Ptr], Type::Void)));
        let mut f = Function::new("f", FuncType::new(vec![], Type::Int));
        IrBuilder::new(&mut f).build_ret(Value::ConstInt(1)).unwrap();
        module.add_function(f);

        let text = emit_module(&module).unwrap().to_string();
        assert!(text.starts_with("\tdefault rel\nextern puts\nglobal f\nextern _halloc\nextern __rtfail\nsection .text\n"));
        assert!(text.contains("f:\nf_bb0:\n"));
    }

    #[test]
    fn test_sub_into_rhs_register() {
        // %0.2 = ISub 10, %0.0 reuses rcx for both the operand and the result
        let mut f = Function::new("f", FuncType::new(vec![Type::Int], Type::Int));
        let mut b = IrBuilder::new(&mut f);
        let x = b.block_arg(0).unwrap();
        let d = b.build_isub(Value::ConstInt(10), x).unwrap();
        b.build_ret(d).unwrap();

        let program = single(f);
        assert_eq!(lines_of(&program, "f_bb0"), vec![
            "\tsub ecx, dword 10",
            "\tneg ecx",
            "\tmov rax, rcx",
            "\tret",
        ]);
    }

    #[test]
    fn test_compare_swaps_constant_side() {
        let mut f = Function::new("f", FuncType::new(vec![Type::Int], Type::Bool));
        let mut b = IrBuilder::new(&mut f);
        let x = b.block_arg(0).unwrap();
        let c = b.build_icmp(CmpOp::Lt, Value::ConstInt(3), x).unwrap();
        b.build_ret(c).unwrap();

        let program = single(f);
        assert_eq!(lines_of(&program, "f_bb0"), vec![
            "\tcmp ecx, dword 3",
            "\tsetg cl",
            "\tmovzx ecx, cl",
            "\tmov rax, rcx",
            "\tret",
        ]);
    }

    #[test]
    fn test_entry_binding_swaps() {
        // g(a, b) returns b - a; after allocation the parameters stay put
        let mut f = Function::new("g", FuncType::new(vec![Type::Int, Type::Int], Type::Int));
        let mut b = IrBuilder::new(&mut f);
        let (x, y) = (b.block_arg(0).unwrap(), b.block_arg(1).unwrap());
        let d = b.build_isub(y, x).unwrap();
        b.build_ret(d).unwrap();

        let program = single(f);
        // the range of x ends at the sub, so the result lands in rcx
        assert_eq!(lines_of(&program, "g_bb0"), vec![
            "\tsub ecx, edx",
            "\tneg ecx",
            "\tmov rax, rcx",
            "\tret",
        ]);
        assert_eq!(lines_of(&program, "g"), Vec::<String>::new());
    }

    #[test]
    fn test_too_many_arguments() {
        let ty = FuncType::new(vec![Type::Int; 5], Type::Void);
        let mut f = Function::new("wide", ty);
        IrBuilder::new(&mut f).build_ret(Value::Undef).unwrap();
        let mut module = Module::new("t");
        module.add_function(f);
        let err = emit_module(&module).unwrap_err();
        assert_eq!(err, CodegenError::TooManyArguments { function: "wide".to_string(), count: 5, max: 4 });
    }

    #[test]
    fn test_strings_in_rodata() {
        let mut f = Function::new("s", FuncType::new(vec![], Type::Ptr));
        let mut b = IrBuilder::new(&mut f);
        let p = b.build_const_string("hi").unwrap();
        b.build_ret(p).unwrap();

        let text = single(f).to_string();
        assert!(text.contains("\tlea rcx, [rel s_str0]\n"));
        assert!(text.ends_with("section .rodata\ns_str0: db 2, 0, 0, 0, 104, 105\n"));
    }
}
