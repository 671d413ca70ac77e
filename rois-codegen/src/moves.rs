//! Parallel move resolution
//! 
//! Sequences a set of simultaneous `source -> register` assignments into
//! plain moves and swaps. Consider
//! 
//! ```text
//! 3   -> rcx
//! rcx -> rdx
//! ```
//! 
//! Emitting `mov rcx, 3; mov rdx, rcx` in that order would overwrite rcx
//! before it is read. The pending assignment is kept as a graph whose
//! edges point from where a value is to where it has to go; moves are
//! emitted starting at destinations nothing else still reads from.
//! Only two-register cycles are broken (with `xchg`).

use crate::asm::GpReg;
use log::{error, trace};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoveError {
    #[error("register {dest} is assigned from both {first} and {second}")]
    ConflictingSources { dest: GpReg, first: String, second: String },

    #[error("cannot resolve a move cycle of length {length}\n{graph}")]
    UnsupportedCycle { length: usize, graph: String },
}

/// Where a value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveSource {
    Reg(GpReg),
    Imm(i32),
    /// Address of a global symbol
    Symbol(String),
}

impl fmt::Display for MoveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveSource::Reg(reg) => write!(f, "{reg}"),
            MoveSource::Imm(value) => write!(f, "{value}"),
            MoveSource::Symbol(sym) => write!(f, "@{sym}"),
        }
    }
}

/// Primitive operations realizing a parallel move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveInst {
    MovReg { dest: GpReg, src: GpReg },
    MovImm { dest: GpReg, value: i32 },
    LoadAddr { dest: GpReg, symbol: String },
    Swap(GpReg, GpReg),
}

impl fmt::Display for MoveInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveInst::MovReg { dest, src } => write!(f, "mov {dest}, {src}"),
            MoveInst::MovImm { dest, value } => write!(f, "mov {dest}, {value}"),
            MoveInst::LoadAddr { dest, symbol } => write!(f, "lea {dest}, {symbol}"),
            MoveInst::Swap(a, b) => write!(f, "xchg {a}, {b}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    src: usize,
    dest: GpReg,
}

/// Pending simultaneous assignment. Vertices keep insertion order so the
/// resolved sequence only depends on the order moves were added in.
#[derive(Debug, Clone, Default)]
pub struct MoveGraph {
    vertices: Vec<Option<MoveSource>>,
    edges: Vec<Edge>,
}

impl MoveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn vertex(&mut self, source: MoveSource) -> usize {
        if let Some(index) = self.vertices.iter().position(|v| v.as_ref() == Some(&source)) {
            return index;
        }
        self.vertices.push(Some(source));
        self.vertices.len() - 1
    }

    fn find(&self, source: &MoveSource) -> Option<usize> {
        self.vertices.iter().position(|v| v.as_ref() == Some(source))
    }

    /// Record `source -> dest`. Self-moves are dropped right away.
    pub fn add_move(&mut self, source: MoveSource, dest: GpReg) -> Result<(), MoveError> {
        if source == MoveSource::Reg(dest) {
            return Ok(());
        }
        if let Some(existing) = self.edges.iter().find(|e| e.dest == dest) {
            let first = self.vertices[existing.src].clone();
            if first.as_ref() == Some(&source) {
                return Ok(());
            }
            return Err(MoveError::ConflictingSources {
                dest,
                first: first.map(|s| s.to_string()).unwrap_or_default(),
                second: source.to_string(),
            });
        }
        let src = self.vertex(source);
        self.vertex(MoveSource::Reg(dest));
        self.edges.push(Edge { src, dest });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn live(&self) -> impl Iterator<Item = usize> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|_| i))
    }

    fn has_out_edges(&self, vertex: usize) -> bool {
        self.edges.iter().any(|e| e.src == vertex)
    }

    fn reg_of(&self, vertex: usize) -> Option<GpReg> {
        match self.vertices.get(vertex) {
            Some(Some(MoveSource::Reg(reg))) => Some(*reg),
            _ => None,
        }
    }

    fn in_edge(&self, vertex: usize) -> Option<usize> {
        let reg = self.reg_of(vertex)?;
        self.edges.iter().position(|e| e.dest == reg)
    }

    fn remove_vertex(&mut self, vertex: usize) {
        let reg = self.reg_of(vertex);
        self.edges.retain(|e| e.src != vertex && Some(e.dest) != reg);
        self.vertices[vertex] = None;
    }

    /// Two registers that have to trade places
    fn find_two_cycle(&self) -> Option<(usize, usize)> {
        self.edges.iter().find_map(|e| {
            let a = e.src;
            let b = self.find(&MoveSource::Reg(e.dest))?;
            let a_reg = self.reg_of(a)?;
            self.edges
                .iter()
                .any(|back| back.src == b && back.dest == a_reg)
                .then_some((a, b))
        })
    }

    /// Length of the cycle through `start`, following the out-edges
    fn cycle_length(&self, start: usize) -> usize {
        let mut length = 0;
        let mut current = start;
        loop {
            let next = self
                .edges
                .iter()
                .find(|e| e.src == current)
                .and_then(|e| self.find(&MoveSource::Reg(e.dest)));
            length += 1;
            match next {
                Some(v) if v != start && length < self.vertices.len() => current = v,
                _ => return length,
            }
        }
    }

    /// Graphviz rendering of the pending moves
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph moves {\n");
        for edge in &self.edges {
            if let Some(Some(src)) = self.vertices.get(edge.src) {
                dot.push_str(&format!("  \"{}\" -> \"{}\";\n", src, edge.dest));
            }
        }
        dot.push('}');
        dot
    }

    /// Sequence the assignment into moves and swaps
    pub fn resolve(mut self) -> Result<Vec<MoveInst>, MoveError> {
        let mut out = Vec::new();
        while self.live().next().is_some() {
            // a destination nothing reads from any more
            let sink = self.live().find(|&v| !self.has_out_edges(v));
            if let Some(vertex) = sink {
                if let Some(edge) = self.in_edge(vertex) {
                    let Edge { src, dest } = self.edges[edge];
                    let inst = match self.vertices[src].clone() {
                        Some(MoveSource::Reg(reg)) => Some(MoveInst::MovReg { dest, src: reg }),
                        Some(MoveSource::Imm(value)) => Some(MoveInst::MovImm { dest, value }),
                        Some(MoveSource::Symbol(symbol)) => Some(MoveInst::LoadAddr { dest, symbol }),
                        None => None,
                    };
                    if let Some(inst) = inst {
                        trace!("move: {inst}");
                        out.push(inst);
                    }
                }
                self.remove_vertex(vertex);
                continue;
            }

            // every vertex still has a pending read: only cycles are left
            if let Some((a, b)) = self.find_two_cycle() {
                if let (Some(ra), Some(rb)) = (self.reg_of(a), self.reg_of(b)) {
                    trace!("move: xchg {ra}, {rb}");
                    out.push(MoveInst::Swap(ra, rb));
                }
                self.remove_vertex(a);
                self.remove_vertex(b);
                continue;
            }

            let start = self.live().next().unwrap_or_default();
            let length = self.cycle_length(start);
            let graph = self.to_dot();
            error!("unresolvable move cycle of length {length}:\n{graph}");
            return Err(MoveError::UnsupportedCycle { length, graph });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    use GpReg::*;

    /// Executes the sequence on a register file where every register
    /// initially holds a distinct marker value
    fn run(moves: &[MoveInst]) -> BTreeMap<GpReg, i64> {
        let mut regs: BTreeMap<GpReg, i64> = GpReg::ALL.iter().map(|&r| (r, 1000 + r as i64)).collect();
        for inst in moves {
            match inst {
                MoveInst::MovReg { dest, src } => {
                    let v = regs[src];
                    regs.insert(*dest, v);
                }
                MoveInst::MovImm { dest, value } => {
                    regs.insert(*dest, *value as i64);
                }
                MoveInst::LoadAddr { dest, .. } => {
                    regs.insert(*dest, -1);
                }
                MoveInst::Swap(a, b) => {
                    let (va, vb) = (regs[a], regs[b]);
                    regs.insert(*a, vb);
                    regs.insert(*b, va);
                }
            }
        }
        regs
    }

    /// Simultaneous-assignment semantics of the same moves
    fn expected(pairs: &[(MoveSource, GpReg)]) -> BTreeMap<GpReg, i64> {
        let initial: BTreeMap<GpReg, i64> = GpReg::ALL.iter().map(|&r| (r, 1000 + r as i64)).collect();
        let mut regs = initial.clone();
        for (src, dest) in pairs {
            let v = match src {
                MoveSource::Reg(r) => initial[r],
                MoveSource::Imm(v) => *v as i64,
                MoveSource::Symbol(_) => -1,
            };
            regs.insert(*dest, v);
        }
        regs
    }

    fn resolve(pairs: &[(MoveSource, GpReg)]) -> Result<Vec<MoveInst>, MoveError> {
        let mut graph = MoveGraph::new();
        for (src, dest) in pairs {
            graph.add_move(src.clone(), *dest)?;
        }
        graph.resolve()
    }

    fn check(pairs: &[(MoveSource, GpReg)]) -> Vec<MoveInst> {
        let moves = resolve(pairs).unwrap();
        assert_eq!(run(&moves), expected(pairs), "{moves:?}");
        moves
    }

    #[test]
    fn test_constant_after_its_reader() {
        let moves = check(&[(MoveSource::Imm(3), Rcx), (MoveSource::Reg(Rcx), Rdx)]);
        assert_eq!(moves, vec![
            MoveInst::MovReg { dest: Rdx, src: Rcx },
            MoveInst::MovImm { dest: Rcx, value: 3 },
        ]);
    }

    #[test]
    fn test_two_cycle_is_one_swap() {
        let moves = check(&[(MoveSource::Reg(Rcx), Rdx), (MoveSource::Reg(Rdx), Rcx)]);
        assert_eq!(moves, vec![MoveInst::Swap(Rcx, Rdx)]);
    }

    #[test]
    fn test_self_move_elided() {
        assert_eq!(check(&[(MoveSource::Reg(R8), R8)]), vec![]);
    }

    #[test]
    fn test_chain_runs_backwards() {
        let pairs = [
            (MoveSource::Reg(Rcx), Rdx),
            (MoveSource::Reg(Rdx), R8),
            (MoveSource::Reg(R8), R9),
        ];
        let moves = check(&pairs);
        assert_eq!(moves, vec![
            MoveInst::MovReg { dest: R9, src: R8 },
            MoveInst::MovReg { dest: R8, src: Rdx },
            MoveInst::MovReg { dest: Rdx, src: Rcx },
        ]);
    }

    #[test]
    fn test_fan_out_and_cycle_tail() {
        // rcx feeds two destinations and sits in a swap with rdx
        let pairs = [
            (MoveSource::Reg(Rcx), Rdx),
            (MoveSource::Reg(Rdx), Rcx),
            (MoveSource::Reg(Rcx), Rsi),
            (MoveSource::Symbol("g".to_string()), Rax),
            (MoveSource::Imm(7), Rdi),
        ];
        let moves = check(&pairs);
        assert_eq!(moves.iter().filter(|m| matches!(m, MoveInst::Swap(..))).count(), 1);
    }

    #[test]
    fn test_mixed_sources() {
        let pairs = [
            (MoveSource::Reg(Rdx), Rcx),
            (MoveSource::Reg(Rcx), Rax),
            (MoveSource::Imm(0), Rdx),
            (MoveSource::Reg(Rsi), R8),
            (MoveSource::Imm(0), R9),
        ];
        check(&pairs);
    }

    #[test]
    fn test_deterministic() {
        let pairs = [
            (MoveSource::Reg(Rsi), Rcx),
            (MoveSource::Reg(Rdi), Rdx),
            (MoveSource::Imm(1), Rsi),
        ];
        assert_eq!(resolve(&pairs), resolve(&pairs));
    }

    #[test]
    fn test_three_cycle_rejected() {
        let err = resolve(&[
            (MoveSource::Reg(Rcx), Rdx),
            (MoveSource::Reg(Rdx), R8),
            (MoveSource::Reg(R8), Rcx),
        ])
        .unwrap_err();
        match err {
            MoveError::UnsupportedCycle { length, graph } => {
                assert_eq!(length, 3);
                assert!(graph.starts_with("digraph moves {"));
                assert!(graph.contains("\"rcx\" -> \"rdx\";"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    /// Length of the register cycle through `start`, following each
    /// destination back to its source
    fn cycle_through(pairs: &[(MoveSource, GpReg)], start: GpReg) -> Option<usize> {
        let source_of = |dest: GpReg| {
            pairs.iter().find_map(|(src, d)| match src {
                MoveSource::Reg(r) if *d == dest => Some(*r),
                _ => None,
            })
        };
        let mut current = start;
        for length in 1..=pairs.len() {
            current = source_of(current)?;
            if current == start {
                return Some(length);
            }
        }
        None
    }

    #[test]
    fn test_every_assignment_over_five_registers() {
        // each destination is unassigned, takes one of the five registers
        // or takes an immediate
        const REGS: [GpReg; 5] = [Rcx, Rdx, R8, R9, Rdi];
        const CHOICES: usize = REGS.len() + 2;
        let (mut resolved, mut rejected) = (0, 0);

        for code in 0..CHOICES.pow(REGS.len() as u32) {
            let mut pairs = Vec::new();
            let mut rest = code;
            for dest in REGS {
                match rest % CHOICES {
                    0 => {}
                    c if c <= REGS.len() => pairs.push((MoveSource::Reg(REGS[c - 1]), dest)),
                    _ => pairs.push((MoveSource::Imm(40 + dest as i32), dest)),
                }
                rest /= CHOICES;
            }

            let long_cycle = REGS.iter().any(|&r| cycle_through(&pairs, r).is_some_and(|n| n >= 3));
            match resolve(&pairs) {
                Ok(moves) => {
                    assert!(!long_cycle, "{pairs:?} resolved despite a long cycle");
                    assert_eq!(run(&moves), expected(&pairs), "{pairs:?} -> {moves:?}");
                    assert!(moves.len() <= pairs.len(), "{pairs:?} -> {moves:?}");
                    resolved += 1;
                }
                Err(MoveError::UnsupportedCycle { length, .. }) => {
                    assert!(long_cycle && length >= 3, "{pairs:?} rejected with length {length}");
                    rejected += 1;
                }
                Err(other) => panic!("{pairs:?}: {other}"),
            }
        }
        assert_eq!(resolved + rejected, 16807);
        assert!(rejected > 0);
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        let err = resolve(&[(MoveSource::Reg(Rcx), Rax), (MoveSource::Imm(1), Rax)]).unwrap_err();
        assert!(matches!(err, MoveError::ConflictingSources { dest: Rax, .. }));
        // the same assignment twice is fine
        check(&[(MoveSource::Imm(1), Rax), (MoveSource::Imm(1), Rax)]);
    }
}
