//! IR Operations
//! 
//! Operators used by the arithmetic, logical and comparison instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators. The `I*` operators take and produce `int`,
/// `And`/`Or` take and produce `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    IAdd,
    ISub,
    IMul,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_commutative(&self) -> bool {
        !matches!(self, BinaryOp::ISub)
    }

    /// Evaluate on 32-bit integers with wraparound
    pub fn eval_int(&self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            BinaryOp::IAdd => Some(lhs.wrapping_add(rhs)),
            BinaryOp::ISub => Some(lhs.wrapping_sub(rhs)),
            BinaryOp::IMul => Some(lhs.wrapping_mul(rhs)),
            BinaryOp::And | BinaryOp::Or => None,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::IAdd => write!(f, "IAdd"),
            BinaryOp::ISub => write!(f, "ISub"),
            BinaryOp::IMul => write!(f, "IMul"),
            BinaryOp::And => write!(f, "And"),
            BinaryOp::Or => write!(f, "Or"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Integer negation
    INeg,
    /// Boolean negation
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::INeg => write!(f, "INeg"),
            UnaryOp::Not => write!(f, "Not"),
        }
    }
}

/// Signed integer comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub const ALL: [CmpOp; 6] = [CmpOp::Eq, CmpOp::Ne, CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge];

    /// Predicate that holds for `(rhs, lhs)` whenever `self` holds for `(lhs, rhs)`
    pub fn swapped(&self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }

    pub fn eval(&self, lhs: i32, rhs: i32) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CmpOp::Eq => "Eq",
            CmpOp::Ne => "Ne",
            CmpOp::Lt => "Lt",
            CmpOp::Le => "Le",
            CmpOp::Gt => "Gt",
            CmpOp::Ge => "Ge",
        };
        write!(f, "{name}")
    }
}
