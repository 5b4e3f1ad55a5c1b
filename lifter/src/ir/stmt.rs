//! IR statements.
//!
//! One machine instruction lifts to a linear statement sequence framed by
//! an `ISMark`/`IEMark` pair. Labels are local to that sequence: their
//! names need not be unique across instructions, but the (name, id) pair is
//! unique within one instruction's output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ir::expr::{Expr, Var};

/// A label local to one instruction's statement sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub id: u32,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.id)
    }
}

/// Opaque side effects the IR cannot express as data flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideEffect {
    /// The instruction is undefined or unpredictable at this point.
    UndefinedInstr,
    /// Floating-point semantics the lifter does not model.
    UnsupportedFp,
    /// Supervisor call (SVC).
    SysCall,
    /// Breakpoint (BKPT).
    Breakpoint,
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedInstr => f.write_str("UndefinedInstr"),
            Self::UnsupportedFp => f.write_str("UnsupportedFP"),
            Self::SysCall => f.write_str("SysCall"),
            Self::Breakpoint => f.write_str("Breakpoint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stmt {
    /// Instruction-start marker: address and byte length.
    ISMark { addr: u64, len: u32 },
    /// Instruction-end marker: address of the next instruction.
    IEMark { addr: u64 },
    /// Register or temporary write.
    Put { dst: Var, src: Expr },
    /// Little-endian memory write; the width is the width of `value`.
    Store { addr: Expr, value: Expr },
    /// Label placement.
    LMark(Label),
    /// Unconditional jump within the instruction.
    Jmp(Label),
    /// Conditional branch within the instruction on a 1-bit condition.
    CJmp {
        cond: Expr,
        taken: Label,
        not_taken: Label,
    },
    /// Jump out of the instruction; `pc` is the program counter variable
    /// and `target` the destination expression.
    InterJmp { pc: Var, target: Expr },
    SideEffect(SideEffect),
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ISMark { addr, len } => write!(f, "=== ISMark (0x{addr:x}, {len})"),
            Self::IEMark { addr } => write!(f, "=== IEMark (0x{addr:x})"),
            Self::Put { dst, src } => write!(f, "{dst} := {src}"),
            Self::Store { addr, value } => write!(f, "[{addr}] := {value}"),
            Self::LMark(label) => write!(f, "{label}:"),
            Self::Jmp(label) => write!(f, "jmp {label}"),
            Self::CJmp {
                cond,
                taken,
                not_taken,
            } => write!(f, "if {cond} then jmp {taken} else jmp {not_taken}"),
            Self::InterJmp { pc, target } => write!(f, "{pc} := interjmp {target}"),
            Self::SideEffect(kind) => write!(f, "sideeffect {kind}"),
        }
    }
}
