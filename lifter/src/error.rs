//! Errors raised while lifting an instruction to IR.
//!
//! Architecturally-undefined inputs are *not* errors: per the manual they
//! lower to `SideEffect(UndefinedInstr)` statements or `Undefined`
//! expressions so the emitted IR itself carries the "unpredictable" flag.
//! The variants here are contract violations between the decoder, the
//! bit-vector layer and the lifter, and they propagate to the caller
//! without recovery.

use thiserror::Error;

use crate::arm::instruction::Opcode;
use crate::arm::register::Register;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiftError {
    /// The operand tuple does not match the shape expected for the opcode.
    #[error("operand tuple does not match the expected shape for {0}")]
    InvalidOperand(Opcode),

    /// An operand refers to a register outside the supported set.
    #[error("register {0} is not valid here")]
    InvalidRegister(Register),

    /// Dispatch received an opcode whose block-addressing kind is
    /// inconsistent with the operation being lifted.
    #[error("opcode {0} has an inconsistent addressing kind")]
    InvalidOpcode(Opcode),

    /// A zero shift amount reached a helper that requires a nonzero one.
    #[error("shift amount must be nonzero")]
    InvalidShiftAmount,

    /// A bit-vector was constructed or operated on with an illegal width.
    #[error("invalid bit width: {0}")]
    InvalidBitWidth(u32),

    /// Two bit-vector operands of different widths reached an arithmetic op.
    #[error("arithmetic type mismatch: {lhs} vs {rhs} bits")]
    ArithTypeMismatch { lhs: u32, rhs: u32 },

    /// Unsigned or signed division by a zero bit-vector.
    #[error("division by zero")]
    DivByZero,

    /// A branch target's architecture mode does not match the source mode
    /// in a legal way (e.g. a Thumb-only opcode lifted in ARM mode).
    #[error("target architecture mode is illegal for {0}")]
    InvalidTargetArchMode(Opcode),

    /// The opcode is decodable but the lifter has no semantics for it yet.
    #[error("IR not implemented for {0}")]
    NotImplemented(Opcode),
}
