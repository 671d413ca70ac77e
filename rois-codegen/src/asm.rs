//! x86-64 Assembly Instruction Definitions
//! 
//! The register model and the subset of x86-64 (NASM syntax) the
//! assembly emitter produces.

use rois_ir::CmpOp;
use std::fmt;

/// Allocatable general-purpose registers, in allocation preference order.
///
/// The first four double as the argument registers of the calling
/// convention (`rcx, rdx, r8, r9`); `rax` carries return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GpReg {
    Rcx,
    Rdx,
    R8,
    R9,
    Rdi,
    Rsi,
    Rax,
}

impl GpReg {
    pub const ALL: [GpReg; 7] = [GpReg::Rcx, GpReg::Rdx, GpReg::R8, GpReg::R9, GpReg::Rdi, GpReg::Rsi, GpReg::Rax];

    /// Argument-passing registers, in parameter order
    pub const ARGS: [GpReg; 4] = [GpReg::Rcx, GpReg::Rdx, GpReg::R8, GpReg::R9];

    pub fn name(self, width: Width) -> &'static str {
        match (self, width) {
            (GpReg::Rcx, Width::B8) => "cl",
            (GpReg::Rcx, Width::B32) => "ecx",
            (GpReg::Rcx, Width::B64) => "rcx",
            (GpReg::Rdx, Width::B8) => "dl",
            (GpReg::Rdx, Width::B32) => "edx",
            (GpReg::Rdx, Width::B64) => "rdx",
            (GpReg::R8, Width::B8) => "r8b",
            (GpReg::R8, Width::B32) => "r8d",
            (GpReg::R8, Width::B64) => "r8",
            (GpReg::R9, Width::B8) => "r9b",
            (GpReg::R9, Width::B32) => "r9d",
            (GpReg::R9, Width::B64) => "r9",
            (GpReg::Rdi, Width::B8) => "dil",
            (GpReg::Rdi, Width::B32) => "edi",
            (GpReg::Rdi, Width::B64) => "rdi",
            (GpReg::Rsi, Width::B8) => "sil",
            (GpReg::Rsi, Width::B32) => "esi",
            (GpReg::Rsi, Width::B64) => "rsi",
            (GpReg::Rax, Width::B8) => "al",
            (GpReg::Rax, Width::B32) => "eax",
            (GpReg::Rax, Width::B64) => "rax",
        }
    }
}

impl fmt::Display for GpReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name(Width::B64))
    }
}

/// Operand width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    B8,
    B32,
    B64,
}

impl Width {
    pub fn keyword(self) -> &'static str {
        match self {
            Width::B8 => "byte",
            Width::B32 => "dword",
            Width::B64 => "qword",
        }
    }

    pub fn bytes(self) -> u32 {
        match self {
            Width::B8 => 1,
            Width::B32 => 4,
            Width::B64 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(GpReg, Width),
    /// Immediate, printed with an explicit size keyword
    Imm(i64, Width),
    /// `[base + offset]`
    Mem { base: GpReg, offset: u32, width: Width },
}

impl Operand {
    pub fn reg32(reg: GpReg) -> Self {
        Operand::Reg(reg, Width::B32)
    }

    pub fn reg64(reg: GpReg) -> Self {
        Operand::Reg(reg, Width::B64)
    }

    pub fn width(&self) -> Width {
        match self {
            Operand::Reg(_, w) | Operand::Imm(_, w) | Operand::Mem { width: w, .. } => *w,
        }
    }

    pub fn as_reg(&self) -> Option<GpReg> {
        match self {
            Operand::Reg(reg, _) => Some(*reg),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg, width) => write!(f, "{}", reg.name(*width)),
            Operand::Imm(value, width) => write!(f, "{} {}", width.keyword(), value),
            Operand::Mem { base, offset: 0, width } => write!(f, "{} [{}]", width.keyword(), base),
            Operand::Mem { base, offset, width } => write!(f, "{} [{} + {}]", width.keyword(), base, offset),
        }
    }
}

/// Condition codes of `setcc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
}

impl Cond {
    pub fn suffix(self) -> &'static str {
        match self {
            Cond::E => "e",
            Cond::Ne => "ne",
            Cond::L => "l",
            Cond::Le => "le",
            Cond::G => "g",
            Cond::Ge => "ge",
        }
    }

    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        CmpOp::from(self).eval(lhs, rhs)
    }
}

impl From<CmpOp> for Cond {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Eq => Cond::E,
            CmpOp::Ne => Cond::Ne,
            CmpOp::Lt => Cond::L,
            CmpOp::Le => Cond::Le,
            CmpOp::Gt => Cond::G,
            CmpOp::Ge => Cond::Ge,
        }
    }
}

impl From<Cond> for CmpOp {
    fn from(cond: Cond) -> Self {
        match cond {
            Cond::E => CmpOp::Eq,
            Cond::Ne => CmpOp::Ne,
            Cond::L => CmpOp::Lt,
            Cond::Le => CmpOp::Le,
            Cond::G => CmpOp::Gt,
            Cond::Ge => CmpOp::Ge,
        }
    }
}

/// x86-64 Assembly Instructions
/// 
/// Two-operand instructions are `(destination, source)`.
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    // Directives
    DefaultRel,
    Extern(String),
    Global(String),
    Section(String),

    // Data movement
    Mov(Operand, Operand),
    Movzx(Operand, Operand),
    Lea(GpReg, String),           // lea reg, [rel symbol]
    Xchg(GpReg, GpReg),
    Push(GpReg),
    Pop(GpReg),
    ReserveStack(u32),            // sub rsp, n
    ReleaseStack(u32),            // add rsp, n

    // Arithmetic and logic
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Imul(Operand, Operand),
    And(Operand, Operand),
    Or(Operand, Operand),
    Xor(Operand, Operand),
    Neg(Operand),
    Cmp(Operand, Operand),
    Test(Operand, Operand),
    Set(Cond, Operand),

    // Control flow
    Call(String),
    CallReg(GpReg),
    Jmp(String),
    Jz(String),
    Ret,

    // Pseudo
    Label(String),
    Data(String, Vec<u8>),        // label: db ...
    Comment(String),
    Blank,
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::DefaultRel => write!(f, "\tdefault rel"),
            AsmInst::Extern(sym) => write!(f, "extern {sym}"),
            AsmInst::Global(sym) => write!(f, "global {sym}"),
            AsmInst::Section(name) => write!(f, "section {name}"),

            AsmInst::Mov(d, s) => write!(f, "\tmov {d}, {s}"),
            AsmInst::Movzx(d, s) => write!(f, "\tmovzx {d}, {s}"),
            AsmInst::Lea(d, sym) => write!(f, "\tlea {d}, [rel {sym}]"),
            AsmInst::Xchg(a, b) => write!(f, "\txchg {a}, {b}"),
            AsmInst::Push(r) => write!(f, "\tpush {r}"),
            AsmInst::Pop(r) => write!(f, "\tpop {r}"),
            AsmInst::ReserveStack(n) => write!(f, "\tsub rsp, {n}"),
            AsmInst::ReleaseStack(n) => write!(f, "\tadd rsp, {n}"),

            AsmInst::Add(d, s) => write!(f, "\tadd {d}, {s}"),
            AsmInst::Sub(d, s) => write!(f, "\tsub {d}, {s}"),
            AsmInst::Imul(d, s) => write!(f, "\timul {d}, {s}"),
            AsmInst::And(d, s) => write!(f, "\tand {d}, {s}"),
            AsmInst::Or(d, s) => write!(f, "\tor {d}, {s}"),
            AsmInst::Xor(d, s) => write!(f, "\txor {d}, {s}"),
            AsmInst::Neg(d) => write!(f, "\tneg {d}"),
            AsmInst::Cmp(a, b) => write!(f, "\tcmp {a}, {b}"),
            AsmInst::Test(a, b) => write!(f, "\ttest {a}, {b}"),
            AsmInst::Set(cond, d) => write!(f, "\tset{} {d}", cond.suffix()),

            AsmInst::Call(sym) => write!(f, "\tcall {sym}"),
            AsmInst::CallReg(r) => write!(f, "\tcall {r}"),
            AsmInst::Jmp(label) => write!(f, "\tjmp {label}"),
            AsmInst::Jz(label) => write!(f, "\tjz {label}"),
            AsmInst::Ret => write!(f, "\tret"),

            AsmInst::Label(label) => write!(f, "{label}:"),
            AsmInst::Data(label, bytes) => {
                write!(f, "{label}: db ")?;
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{byte}")?;
                }
                Ok(())
            }
            AsmInst::Comment(text) => write!(f, "; {text}"),
            AsmInst::Blank => Ok(()),
        }
    }
}
