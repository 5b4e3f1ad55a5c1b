//! IR expressions.
//!
//! Expressions form a closed tree: constants, variables, binary and
//! relational operators, casts, extract/concat, if-then-else, loads and
//! explicit undefined values. Relational operators always produce a 1-bit
//! expression. Construction does not validate widths; widths are derivable
//! from any node via [`Expr::width`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arm::register::Register;
use crate::bitvec::BitVector;

/// Binary operators. Shifts take the amount on the right-hand side at the
/// same width as the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    /// Logical (unsigned) shift right.
    Shr,
    /// Arithmetic (sign-preserving) shift right.
    Sar,
    UDiv,
    SDiv,
    URem,
    SRem,
}

/// Relational operators; unsigned unless prefixed with `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    SGt,
    SGe,
    SLt,
    SLe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// Two's-complement negation.
    Neg,
    /// Bitwise complement.
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastKind {
    ZeroExt,
    SignExt,
    Trunc,
}

/// Why an expression is undefined. `Unpredictable` marks results the
/// architecture leaves undefined; `Unimplemented` marks sub-semantics the
/// lifter deliberately does not model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UndefKind {
    Unpredictable,
    Unimplemented,
}

/// A variable: either a long-lived architectural register handle or a
/// temporary local to one instruction's statement sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Var {
    Reg(Register),
    Tmp { id: u32, width: u32 },
}

impl Var {
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Reg(r) => r.width(),
            Self::Tmp { width, .. } => width,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg(r) => write!(f, "{r}"),
            Self::Tmp { id, width } => write!(f, "T_{id}:I{width}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Num(BitVector),
    Var(Var),
    BinOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    RelOp {
        op: RelOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    UnOp {
        op: UnOp,
        operand: Box<Expr>,
    },
    Cast {
        kind: CastKind,
        width: u32,
        operand: Box<Expr>,
    },
    Extract {
        width: u32,
        pos: u32,
        operand: Box<Expr>,
    },
    Concat {
        hi: Box<Expr>,
        lo: Box<Expr>,
    },
    Ite {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// Little-endian memory load of `width` bits.
    Load {
        width: u32,
        addr: Box<Expr>,
    },
    Undefined {
        width: u32,
        kind: UndefKind,
        reason: String,
    },
}

impl Expr {
    /// The width of the value this expression evaluates to.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Num(bv) => bv.width(),
            Self::Var(v) => v.width(),
            Self::BinOp { lhs, .. } => lhs.width(),
            Self::RelOp { .. } => 1,
            Self::UnOp { operand, .. } => operand.width(),
            Self::Cast { width, .. }
            | Self::Extract { width, .. }
            | Self::Load { width, .. }
            | Self::Undefined { width, .. } => *width,
            Self::Concat { hi, lo } => hi.width() + lo.width(),
            Self::Ite { then_expr, .. } => then_expr.width(),
        }
    }

    fn bin(op: BinOp, lhs: Self, rhs: Self) -> Self {
        Self::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn rel(op: RelOp, lhs: Self, rhs: Self) -> Self {
        Self::RelOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[must_use]
    pub fn add(self, rhs: Self) -> Self {
        Self::bin(BinOp::Add, self, rhs)
    }

    #[must_use]
    pub fn sub(self, rhs: Self) -> Self {
        Self::bin(BinOp::Sub, self, rhs)
    }

    #[must_use]
    pub fn mul(self, rhs: Self) -> Self {
        Self::bin(BinOp::Mul, self, rhs)
    }

    #[must_use]
    pub fn band(self, rhs: Self) -> Self {
        Self::bin(BinOp::And, self, rhs)
    }

    #[must_use]
    pub fn bor(self, rhs: Self) -> Self {
        Self::bin(BinOp::Or, self, rhs)
    }

    #[must_use]
    pub fn bxor(self, rhs: Self) -> Self {
        Self::bin(BinOp::Xor, self, rhs)
    }

    #[must_use]
    pub fn shl(self, rhs: Self) -> Self {
        Self::bin(BinOp::Shl, self, rhs)
    }

    #[must_use]
    pub fn shr(self, rhs: Self) -> Self {
        Self::bin(BinOp::Shr, self, rhs)
    }

    #[must_use]
    pub fn sar(self, rhs: Self) -> Self {
        Self::bin(BinOp::Sar, self, rhs)
    }

    #[must_use]
    pub fn udiv(self, rhs: Self) -> Self {
        Self::bin(BinOp::UDiv, self, rhs)
    }

    #[must_use]
    pub fn sdiv(self, rhs: Self) -> Self {
        Self::bin(BinOp::SDiv, self, rhs)
    }

    #[must_use]
    pub fn urem(self, rhs: Self) -> Self {
        Self::bin(BinOp::URem, self, rhs)
    }

    #[must_use]
    pub fn srem(self, rhs: Self) -> Self {
        Self::bin(BinOp::SRem, self, rhs)
    }

    #[must_use]
    pub fn eq(self, rhs: Self) -> Self {
        Self::rel(RelOp::Eq, self, rhs)
    }

    #[must_use]
    pub fn neq(self, rhs: Self) -> Self {
        Self::rel(RelOp::Neq, self, rhs)
    }

    #[must_use]
    pub fn ugt(self, rhs: Self) -> Self {
        Self::rel(RelOp::Gt, self, rhs)
    }

    #[must_use]
    pub fn uge(self, rhs: Self) -> Self {
        Self::rel(RelOp::Ge, self, rhs)
    }

    #[must_use]
    pub fn ult(self, rhs: Self) -> Self {
        Self::rel(RelOp::Lt, self, rhs)
    }

    #[must_use]
    pub fn ule(self, rhs: Self) -> Self {
        Self::rel(RelOp::Le, self, rhs)
    }

    #[must_use]
    pub fn sgt(self, rhs: Self) -> Self {
        Self::rel(RelOp::SGt, self, rhs)
    }

    #[must_use]
    pub fn sge(self, rhs: Self) -> Self {
        Self::rel(RelOp::SGe, self, rhs)
    }

    #[must_use]
    pub fn slt(self, rhs: Self) -> Self {
        Self::rel(RelOp::SLt, self, rhs)
    }

    #[must_use]
    pub fn sle(self, rhs: Self) -> Self {
        Self::rel(RelOp::SLe, self, rhs)
    }

    #[must_use]
    pub fn neg(self) -> Self {
        Self::UnOp {
            op: UnOp::Neg,
            operand: Box::new(self),
        }
    }

    #[must_use]
    pub fn not(self) -> Self {
        Self::UnOp {
            op: UnOp::Not,
            operand: Box::new(self),
        }
    }
}

/// Constant expression from a bit-vector value.
#[must_use]
pub fn num(bv: BitVector) -> Expr {
    Expr::Num(bv)
}

/// 32-bit constant.
#[must_use]
pub fn num_u32(value: u32) -> Expr {
    Expr::Num(BitVector::of_u64(u64::from(value), 32).expect("32 is a legal width"))
}

/// Zero of the given legal width.
#[must_use]
pub fn num0(width: u32) -> Expr {
    Expr::Num(BitVector::zero(width).expect("caller passes a legal width"))
}

/// One of the given legal width.
#[must_use]
pub fn num1(width: u32) -> Expr {
    Expr::Num(BitVector::one(width).expect("caller passes a legal width"))
}

/// The 1-bit false constant.
#[must_use]
pub fn b0() -> Expr {
    Expr::Num(BitVector::f())
}

/// The 1-bit true constant.
#[must_use]
pub fn b1() -> Expr {
    Expr::Num(BitVector::t())
}

/// Register variable expression.
#[must_use]
pub fn var(reg: Register) -> Expr {
    Expr::Var(Var::Reg(reg))
}

#[must_use]
pub fn var_of(v: Var) -> Expr {
    Expr::Var(v)
}

#[must_use]
pub fn zext(width: u32, e: Expr) -> Expr {
    Expr::Cast {
        kind: CastKind::ZeroExt,
        width,
        operand: Box::new(e),
    }
}

#[must_use]
pub fn sext(width: u32, e: Expr) -> Expr {
    Expr::Cast {
        kind: CastKind::SignExt,
        width,
        operand: Box::new(e),
    }
}

#[must_use]
pub fn extract(e: Expr, width: u32, pos: u32) -> Expr {
    Expr::Extract {
        width,
        pos,
        operand: Box::new(e),
    }
}

/// The low `width` bits of `e`.
#[must_use]
pub fn extract_low(width: u32, e: Expr) -> Expr {
    extract(e, width, 0)
}

/// The high `width` bits of `e`.
#[must_use]
pub fn extract_high(width: u32, e: Expr) -> Expr {
    let pos = e.width() - width;
    extract(e, width, pos)
}

#[must_use]
pub fn concat(hi: Expr, lo: Expr) -> Expr {
    Expr::Concat {
        hi: Box::new(hi),
        lo: Box::new(lo),
    }
}

/// Ternary on a 1-bit condition.
#[must_use]
pub fn ite(cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    Expr::Ite {
        cond: Box::new(cond),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    }
}

/// Little-endian load of `width` bits from `addr`.
#[must_use]
pub fn load_le(width: u32, addr: Expr) -> Expr {
    Expr::Load {
        width,
        addr: Box::new(addr),
    }
}

/// Architecturally-undefined value.
#[must_use]
pub fn undef(width: u32, reason: &str) -> Expr {
    Expr::Undefined {
        width,
        kind: UndefKind::Unpredictable,
        reason: reason.to_owned(),
    }
}

/// Deliberately unmodeled value.
#[must_use]
pub fn unimplemented(width: u32, reason: &str) -> Expr {
    Expr::Undefined {
        width,
        kind: UndefKind::Unimplemented,
        reason: reason.to_owned(),
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Sar => "?>>",
            Self::UDiv => "/",
            Self::SDiv => "?/",
            Self::URem => "%",
            Self::SRem => "?%",
        };
        f.write_str(token)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::SGt => "?>",
            Self::SGe => "?>=",
            Self::SLt => "?<",
            Self::SLe => "?<=",
        };
        f.write_str(token)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(bv) => write!(f, "{bv}"),
            Self::Var(v) => write!(f, "{v}"),
            Self::BinOp { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Self::RelOp { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Self::UnOp { op, operand } => match op {
                UnOp::Neg => write!(f, "(- {operand})"),
                UnOp::Not => write!(f, "(~ {operand})"),
            },
            Self::Cast {
                kind,
                width,
                operand,
            } => {
                let name = match kind {
                    CastKind::ZeroExt => "zext",
                    CastKind::SignExt => "sext",
                    CastKind::Trunc => "trunc",
                };
                write!(f, "{name}:I{width}({operand})")
            }
            Self::Extract {
                width,
                pos,
                operand,
            } => write!(f, "({operand}[{}:{pos}])", pos + width - 1),
            Self::Concat { hi, lo } => write!(f, "({hi} ++ {lo})"),
            Self::Ite {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "({cond} ? {then_expr} : {else_expr})"),
            Self::Load { width, addr } => write!(f, "[{addr}]:I{width}"),
            Self::Undefined {
                width,
                kind,
                reason,
            } => {
                let tag = match kind {
                    UndefKind::Unpredictable => "undef",
                    UndefKind::Unimplemented => "unimpl",
                };
                write!(f, "{tag}:I{width}({reason})")
            }
        }
    }
}
