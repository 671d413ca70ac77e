//! Interpreter for the x86-64 subset the assembly emitter produces.
//!
//! Registers hold 64-bit values; 32-bit writes zero the upper half, 8-bit
//! writes keep it. Calls to labels outside the program behave like
//! foreign functions: `_halloc` hands out zeroed heap memory, `__rtfail`
//! stops the machine and every other symbol is recorded and returns 0.
//! Foreign calls clobber the volatile registers and the 32 bytes of home
//! space above the stack pointer.
//!
//! The stack is a list of 8-byte words. `call` starts with one word (the
//! return address) on it, so `rsp` is 16-byte aligned exactly when the
//! word count is even; every call checks that.

use rois_codegen::{AsmInst, AsmProgram, GpReg, Operand, Width};
use rois_codegen::asm::Cond;
use std::collections::{BTreeMap, HashMap};

const CODE_BASE: u64 = 0x4000_0000;
const DATA_BASE: u64 = 0x0010_0000;
const HEAP_BASE: u64 = 0x0100_0000;
const RETURN_SENTINEL: u64 = u64::MAX;
const STEP_LIMIT: usize = 1_000_000;
const CLOBBER: u64 = 0xdead_beef_dead_beef;
const VOLATILE: [GpReg; 5] = [GpReg::Rcx, GpReg::Rdx, GpReg::R8, GpReg::R9, GpReg::Rax];
const HOME_WORDS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Exit {
    Returned(u64),
    Failed(String),
}

impl Exit {
    /// Low 32 bits of the returned value
    pub fn int(&self) -> i32 {
        match self {
            Exit::Returned(v) => *v as u32 as i32,
            Exit::Failed(msg) => panic!("program failed: {msg}"),
        }
    }
}

pub struct Machine<'p> {
    lines: &'p [AsmInst],
    labels: HashMap<String, usize>,
    data: HashMap<String, u64>,
    regs: BTreeMap<GpReg, u64>,
    stack: Vec<u64>,
    memory: BTreeMap<u64, u8>,
    heap_next: u64,
    cmp: (i64, i64),
    zero: bool,
    pub foreign_calls: Vec<(String, Vec<i32>)>,
    pub steps: usize,
}

fn mask(value: u64, width: Width) -> u64 {
    match width {
        Width::B8 => value & 0xff,
        Width::B32 => value & 0xffff_ffff,
        Width::B64 => value,
    }
}

fn signed(value: u64, width: Width) -> i64 {
    match width {
        Width::B8 => value as u8 as i8 as i64,
        Width::B32 => value as u32 as i32 as i64,
        Width::B64 => value as i64,
    }
}

fn holds(cond: Cond, (lhs, rhs): (i64, i64)) -> bool {
    match cond {
        Cond::E => lhs == rhs,
        Cond::Ne => lhs != rhs,
        Cond::L => lhs < rhs,
        Cond::Le => lhs <= rhs,
        Cond::G => lhs > rhs,
        Cond::Ge => lhs >= rhs,
    }
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p AsmProgram) -> Self {
        let mut labels = HashMap::new();
        let mut data = HashMap::new();
        let mut memory = BTreeMap::new();
        let mut next = DATA_BASE;
        for (index, line) in program.lines.iter().enumerate() {
            match line {
                AsmInst::Label(label) => {
                    labels.insert(label.clone(), index);
                }
                AsmInst::Data(label, bytes) => {
                    data.insert(label.clone(), next);
                    for (i, byte) in bytes.iter().enumerate() {
                        memory.insert(next + i as u64, *byte);
                    }
                    next += (bytes.len() as u64).div_ceil(8).max(1) * 8;
                }
                _ => {}
            }
        }
        Self {
            lines: &program.lines,
            labels,
            data,
            regs: GpReg::ALL.iter().map(|&r| (r, 0)).collect(),
            stack: Vec::new(),
            memory,
            heap_next: HEAP_BASE,
            cmp: (0, 0),
            zero: false,
            foreign_calls: Vec::new(),
            steps: 0,
        }
    }

    pub fn reg(&self, reg: GpReg) -> u64 {
        self.regs[&reg]
    }

    fn load(&self, addr: u64, width: Width) -> u64 {
        (0..width.bytes() as u64).fold(0, |acc, i| {
            acc | (*self.memory.get(&(addr + i)).unwrap_or(&0) as u64) << (8 * i)
        })
    }

    fn store(&mut self, addr: u64, width: Width, value: u64) {
        for i in 0..width.bytes() as u64 {
            self.memory.insert(addr + i, (value >> (8 * i)) as u8);
        }
    }

    pub fn read_u32(&self, addr: u64) -> u32 {
        self.load(addr, Width::B32) as u32
    }

    fn read_cstr(&self, mut addr: u64) -> String {
        let mut bytes = Vec::new();
        while let Some(&b) = self.memory.get(&addr) {
            if b == 0 {
                break;
            }
            bytes.push(b);
            addr += 1;
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn read(&self, operand: &Operand) -> u64 {
        match operand {
            Operand::Reg(reg, width) => mask(self.regs[reg], *width),
            Operand::Imm(value, width) => mask(*value as u64, *width),
            Operand::Mem { base, offset, width } => self.load(self.regs[base] + *offset as u64, *width),
        }
    }

    fn write(&mut self, operand: &Operand, value: u64) {
        match operand {
            Operand::Reg(reg, Width::B8) => {
                let old = self.regs[reg];
                self.regs.insert(*reg, (old & !0xff) | (value & 0xff));
            }
            Operand::Reg(reg, width) => {
                self.regs.insert(*reg, mask(value, *width));
            }
            Operand::Mem { base, offset, width } => {
                let addr = self.regs[base] + *offset as u64;
                self.store(addr, *width, value);
            }
            Operand::Imm(..) => panic!("write to immediate"),
        }
    }

    fn arith(&mut self, dest: &Operand, src: &Operand, f: fn(i64, i64) -> i64) {
        let width = dest.width();
        let a = signed(self.read(dest), width);
        let b = signed(self.read(src), width);
        let result = f(a, b) as u64;
        self.write(dest, mask(result, width));
        self.zero = mask(result, width) == 0;
    }

    fn address_of(&self, symbol: &str) -> u64 {
        if let Some(addr) = self.data.get(symbol) {
            *addr
        } else if let Some(index) = self.labels.get(symbol) {
            CODE_BASE + *index as u64
        } else {
            panic!("unknown symbol {symbol}")
        }
    }

    fn check_alignment(&self, target: &str) {
        assert!(self.stack.len() % 2 == 0, "rsp not 16-byte aligned at call {target}");
    }

    fn foreign_call(&mut self, symbol: &str) -> Option<Exit> {
        let depth = self.stack.len();
        assert!(depth > HOME_WORDS, "no home space reserved for {symbol}");
        for word in &mut self.stack[depth - HOME_WORDS..] {
            *word = CLOBBER;
        }
        let args: Vec<i32> = GpReg::ARGS.iter().map(|r| self.regs[r] as u32 as i32).collect();
        let result = match symbol {
            "_halloc" => {
                let size = self.regs[&GpReg::Rcx];
                let addr = self.heap_next;
                self.heap_next += size.div_ceil(16).max(1) * 16;
                addr
            }
            "__rtfail" => return Some(Exit::Failed(self.read_cstr(self.regs[&GpReg::Rcx]))),
            _ => {
                self.foreign_calls.push((symbol.to_string(), args));
                0
            }
        };
        for reg in VOLATILE {
            self.regs.insert(reg, CLOBBER);
        }
        self.regs.insert(GpReg::Rax, result);
        None
    }

    /// Run `entry` with up to four integer arguments
    pub fn call(&mut self, entry: &str, args: &[i32]) -> Exit {
        for (reg, arg) in GpReg::ARGS.iter().zip(args) {
            self.regs.insert(*reg, *arg as u32 as u64);
        }
        let mut pc = *self.labels.get(entry).unwrap_or_else(|| panic!("no label {entry}"));
        self.stack.push(RETURN_SENTINEL);
        let depth = self.stack.len();
        let lines = self.lines;

        loop {
            self.steps += 1;
            assert!(self.steps < STEP_LIMIT, "step limit exceeded");
            let line = lines.get(pc).unwrap_or_else(|| panic!("fell off the program at {pc}"));
            let mut next = pc + 1;
            match line {
                AsmInst::DefaultRel
                | AsmInst::Extern(_)
                | AsmInst::Global(_)
                | AsmInst::Section(_)
                | AsmInst::Label(_)
                | AsmInst::Data(..)
                | AsmInst::Comment(_)
                | AsmInst::Blank => {}

                AsmInst::Mov(d, s) | AsmInst::Movzx(d, s) => {
                    let v = self.read(s);
                    self.write(d, v);
                }
                AsmInst::Lea(reg, symbol) => {
                    let addr = self.address_of(symbol);
                    self.regs.insert(*reg, addr);
                }
                AsmInst::Xchg(a, b) => {
                    let (va, vb) = (self.regs[a], self.regs[b]);
                    self.regs.insert(*a, vb);
                    self.regs.insert(*b, va);
                }
                AsmInst::Push(reg) => self.stack.push(self.regs[reg]),
                AsmInst::ReserveStack(bytes) => {
                    assert!(bytes % 8 == 0, "stack adjusted by {bytes}");
                    let len = self.stack.len() + *bytes as usize / 8;
                    self.stack.resize(len, CLOBBER);
                }
                AsmInst::ReleaseStack(bytes) => {
                    let words = *bytes as usize / 8;
                    assert!(self.stack.len() >= words, "stack released past its base");
                    self.stack.truncate(self.stack.len() - words);
                }
                AsmInst::Pop(reg) => {
                    let v = self.stack.pop().expect("pop from empty stack");
                    self.regs.insert(*reg, v);
                }

                AsmInst::Add(d, s) => self.arith(d, s, i64::wrapping_add),
                AsmInst::Sub(d, s) => self.arith(d, s, i64::wrapping_sub),
                AsmInst::Imul(d, s) => self.arith(d, s, i64::wrapping_mul),
                AsmInst::And(d, s) => self.arith(d, s, |a, b| a & b),
                AsmInst::Or(d, s) => self.arith(d, s, |a, b| a | b),
                AsmInst::Xor(d, s) => self.arith(d, s, |a, b| a ^ b),
                AsmInst::Neg(d) => self.arith(d, &Operand::Imm(0, d.width()), |a, _| a.wrapping_neg()),
                AsmInst::Cmp(a, b) => {
                    let width = a.width();
                    self.cmp = (signed(self.read(a), width), signed(self.read(b), width));
                    self.zero = self.cmp.0 == self.cmp.1;
                }
                AsmInst::Test(a, b) => {
                    self.zero = self.read(a) & self.read(b) == 0;
                }
                AsmInst::Set(cond, d) => {
                    let v = holds(*cond, self.cmp) as u64;
                    self.write(d, v);
                }

                AsmInst::Call(symbol) => match self.labels.get(symbol) {
                    Some(&target) => {
                        self.check_alignment(symbol);
                        self.stack.push(next as u64);
                        next = target;
                    }
                    None => {
                        self.check_alignment(symbol);
                        if let Some(exit) = self.foreign_call(symbol) {
                            return exit;
                        }
                    }
                },
                AsmInst::CallReg(reg) => {
                    let target = self.regs[reg];
                    assert!(target >= CODE_BASE, "call through non-code address {target:#x}");
                    self.check_alignment(&reg.to_string());
                    self.stack.push(next as u64);
                    next = (target - CODE_BASE) as usize;
                }
                AsmInst::Jmp(label) => next = self.labels[label],
                AsmInst::Jz(label) => {
                    if self.zero {
                        next = self.labels[label];
                    }
                }
                AsmInst::Ret => {
                    let target = self.stack.pop().expect("ret with empty stack");
                    if target == RETURN_SENTINEL {
                        assert_eq!(self.stack.len(), depth - 1, "unbalanced stack");
                        return Exit::Returned(self.regs[&GpReg::Rax]);
                    }
                    next = target as usize;
                }
            }
            pc = next;
        }
    }
}
