//! Barrel-shifter lowering with carry-out.
//!
//! Two families: a compile-time amount known at lift time ([`shift_c`],
//! [`shift`]) and a runtime amount taken from a register
//! ([`shift_c_for_reg`], [`shift_for_reg`]). The carry-out follows the
//! manual:
//!
//! - LSL by k: carry = bit (width - k) of the input
//! - LSR/ASR by k: carry = bit (k - 1) of the input
//! - ROR by k: carry = top bit of the rotated result
//! - RRX: carry = bit 0 of the input
//! - shift by zero: carry = the prior carry-in
//!
//! For runtime amounts, the zero-amount and negative-amount edge cases are
//! made explicit in the emitted IR with `ite` guards.

use serde::{Deserialize, Serialize};

use crate::error::LiftError;
use crate::ir::expr::{self, Expr};

/// The barrel-shifter operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right.
    Ror,
    /// Rotate right with extend; always shifts by 1.
    Rrx,
}

impl std::fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lsl => f.write_str("LSL"),
            Self::Lsr => f.write_str("LSR"),
            Self::Asr => f.write_str("ASR"),
            Self::Ror => f.write_str("ROR"),
            Self::Rrx => f.write_str("RRX"),
        }
    }
}

fn amount_num(width: u32, amount: u32) -> Expr {
    expr::num(
        crate::bitvec::BitVector::of_u64(u64::from(amount), width)
            .expect("shift width is a legal width"),
    )
}

fn lsl_c(value: Expr, width: u32, amount: u32) -> Result<(Expr, Expr), LiftError> {
    if amount == 0 || amount > width {
        return Err(LiftError::InvalidShiftAmount);
    }
    let carry = expr::extract(value.clone(), 1, width - amount);
    Ok((value.shl(amount_num(width, amount)), carry))
}

fn lsr_c(value: Expr, width: u32, amount: u32) -> Result<(Expr, Expr), LiftError> {
    if amount == 0 || amount > width {
        return Err(LiftError::InvalidShiftAmount);
    }
    let carry = expr::extract(value.clone(), 1, amount - 1);
    Ok((value.shr(amount_num(width, amount)), carry))
}

fn asr_c(value: Expr, width: u32, amount: u32) -> Result<(Expr, Expr), LiftError> {
    if amount == 0 || amount > width {
        return Err(LiftError::InvalidShiftAmount);
    }
    let carry = expr::extract(value.clone(), 1, amount - 1);
    Ok((value.sar(amount_num(width, amount)), carry))
}

fn ror_c(value: Expr, width: u32, amount: u32) -> Result<(Expr, Expr), LiftError> {
    if amount == 0 {
        return Err(LiftError::InvalidShiftAmount);
    }
    let rot = amount % width;
    let result = if rot == 0 {
        value
    } else {
        value
            .clone()
            .shr(amount_num(width, rot))
            .bor(value.shl(amount_num(width, width - rot)))
    };
    let carry = expr::extract(result.clone(), 1, width - 1);
    Ok((result, carry))
}

fn rrx_c(value: Expr, width: u32, carry_in: Expr) -> (Expr, Expr) {
    let carry = expr::extract(value.clone(), 1, 0);
    let result = expr::zext(width, carry_in)
        .shl(amount_num(width, width - 1))
        .bor(value.shr(amount_num(width, 1)));
    (result, carry)
}

/// Shift by a compile-time amount, returning the shifted expression and
/// the carry-out expression. A zero amount yields the value unchanged and
/// the prior carry (RRX ignores the amount and always shifts by 1).
pub fn shift_c(
    value: Expr,
    width: u32,
    kind: ShiftKind,
    amount: u32,
    carry_in: Expr,
) -> Result<(Expr, Expr), LiftError> {
    if amount == 0 && kind != ShiftKind::Rrx {
        return Ok((value, carry_in));
    }
    match kind {
        ShiftKind::Lsl => lsl_c(value, width, amount),
        ShiftKind::Lsr => lsr_c(value, width, amount),
        ShiftKind::Asr => asr_c(value, width, amount),
        ShiftKind::Ror => ror_c(value, width, amount),
        ShiftKind::Rrx => Ok(rrx_c(value, width, carry_in)),
    }
}

/// [`shift_c`] without the carry-out.
pub fn shift(
    value: Expr,
    width: u32,
    kind: ShiftKind,
    amount: u32,
    carry_in: Expr,
) -> Result<Expr, LiftError> {
    shift_c(value, width, kind, amount, carry_in).map(|(e, _)| e)
}

fn raw_shift_for_reg(
    value: Expr,
    width: u32,
    kind: ShiftKind,
    amount: &Expr,
) -> Result<(Expr, Expr), LiftError> {
    let width_num = || amount_num(width, width);
    match kind {
        ShiftKind::Lsl => {
            let result = value.clone().shl(amount.clone());
            let carry = expr::extract_low(1, value.shr(width_num().sub(amount.clone())));
            Ok((result, carry))
        }
        ShiftKind::Lsr => {
            let result = value.clone().shr(amount.clone());
            let carry =
                expr::extract_low(1, value.shr(amount.clone().sub(expr::num1(width))));
            Ok((result, carry))
        }
        ShiftKind::Asr => {
            let result = value.clone().sar(amount.clone());
            let carry =
                expr::extract_low(1, value.shr(amount.clone().sub(expr::num1(width))));
            Ok((result, carry))
        }
        ShiftKind::Ror => {
            let rot = amount.clone().band(amount_num(width, width - 1));
            let result = value
                .clone()
                .shr(rot.clone())
                .bor(value.shl(width_num().sub(rot)));
            let carry = expr::extract(result.clone(), 1, width - 1);
            Ok((result, carry))
        }
        // RRX has no register-amount form.
        ShiftKind::Rrx => Err(LiftError::InvalidShiftAmount),
    }
}

/// Shift by a runtime amount. The architectural edge cases stay explicit
/// in the IR: a zero amount yields the unshifted value and the prior
/// carry, and the shifted result is additionally guarded on the amount
/// being positive.
pub fn shift_c_for_reg(
    value: Expr,
    width: u32,
    kind: ShiftKind,
    amount: Expr,
    carry_in: Expr,
) -> Result<(Expr, Expr), LiftError> {
    let (raw, raw_carry) = raw_shift_for_reg(value.clone(), width, kind, &amount)?;
    let is_zero = amount.clone().eq(expr::num0(width));
    let is_positive = amount.ugt(expr::num0(width));
    let guarded = expr::ite(
        is_positive,
        raw,
        expr::undef(width, "shift amount out of range"),
    );
    let result = expr::ite(is_zero.clone(), value, guarded);
    let carry = expr::ite(is_zero, carry_in, raw_carry);
    Ok((result, carry))
}

/// [`shift_c_for_reg`] without the carry-out.
pub fn shift_for_reg(
    value: Expr,
    width: u32,
    kind: ShiftKind,
    amount: Expr,
    carry_in: Expr,
) -> Result<Expr, LiftError> {
    shift_c_for_reg(value, width, kind, amount, carry_in).map(|(e, _)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{b0, b1, num_u32, var};
    use crate::arm::register::Register;
    use crate::ir::{BinOp, Expr};
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_amount_passes_value_and_carry_through() {
        let (e, c) = shift_c(var(Register::R1), 32, ShiftKind::Lsl, 0, b1()).unwrap();
        assert_eq!(e, var(Register::R1));
        assert_eq!(c, b1());
    }

    #[test]
    fn lsl_carry_is_last_bit_shifted_out() {
        let (e, c) = shift_c(var(Register::R1), 32, ShiftKind::Lsl, 4, b0()).unwrap();
        assert_eq!(e, var(Register::R1).shl(num_u32(4)));
        assert_eq!(c, crate::ir::expr::extract(var(Register::R1), 1, 28));
    }

    #[test]
    fn lsr_and_asr_carry_is_bit_amount_minus_one() {
        let (_, c) = shift_c(var(Register::R2), 32, ShiftKind::Lsr, 1, b0()).unwrap();
        assert_eq!(c, crate::ir::expr::extract(var(Register::R2), 1, 0));
        let (e, c) = shift_c(var(Register::R2), 32, ShiftKind::Asr, 8, b0()).unwrap();
        assert!(matches!(e, Expr::BinOp { op: BinOp::Sar, .. }));
        assert_eq!(c, crate::ir::expr::extract(var(Register::R2), 1, 7));
    }

    #[test]
    fn ror_carry_is_top_bit_of_result() {
        let (e, c) = shift_c(var(Register::R3), 32, ShiftKind::Ror, 8, b0()).unwrap();
        assert_eq!(c, crate::ir::expr::extract(e, 1, 31));
    }

    #[test]
    fn rrx_shifts_by_one_from_carry() {
        let (e, c) = shift_c(var(Register::R4), 32, ShiftKind::Rrx, 0, b1()).unwrap();
        assert_eq!(c, crate::ir::expr::extract(var(Register::R4), 1, 0));
        // Carry lands in the top bit, the value moves down one.
        assert!(matches!(e, Expr::BinOp { op: BinOp::Or, .. }));
    }

    #[test]
    fn direct_zero_amount_is_rejected_by_the_inner_helpers() {
        assert_eq!(
            super::lsl_c(var(Register::R0), 32, 0).unwrap_err(),
            LiftError::InvalidShiftAmount
        );
    }

    #[test]
    fn register_amount_is_guarded_by_ites() {
        let amount = var(Register::R3);
        let (e, c) =
            shift_c_for_reg(var(Register::R1), 32, ShiftKind::Lsl, amount, b0()).unwrap();
        assert!(matches!(e, Expr::Ite { .. }));
        assert!(matches!(c, Expr::Ite { .. }));
    }

    #[test]
    fn register_amount_rrx_is_rejected() {
        assert_eq!(
            shift_c_for_reg(var(Register::R1), 32, ShiftKind::Rrx, var(Register::R2), b0())
                .unwrap_err(),
            LiftError::InvalidShiftAmount
        );
    }
}
