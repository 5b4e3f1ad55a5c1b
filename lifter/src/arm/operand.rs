//! Operand translation: decoded operands to IR expressions.
//!
//! Memory operands lower to an address expression plus an optional
//! write-back assignment the caller appends after the access. Shifter
//! operands lower through the barrel-shifter helpers so the carry-out is
//! available to flag-setting instructions.

use crate::arm::helper::{carry_flag, pc_value, read_reg};
use crate::arm::instruction::{
    AddressingMode, InstructionInfo, Offset, Operand, ShiftAmount, Sign,
};
use crate::arm::register::{register_mask, Register};
use crate::arm::shift::{shift, shift_c, shift_c_for_reg, ShiftKind};
use crate::bitvec::BitVector;
use crate::error::LiftError;
use crate::ir::expr::{self, Expr};

/// A lowered memory operand: the access address, and the base-register
/// update to append after the access (pre/post-indexed modes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemAccess {
    pub addr: Expr,
    pub write_back: Option<(Register, Expr)>,
}

/// Immediate operands are 32-bit constants.
pub fn imm_expr(imm: i64) -> Result<Expr, LiftError> {
    Ok(expr::num(BitVector::of_i64(imm, 32)?))
}

/// The 16-bit register-list constant: bit *n* set iff register *n* is in
/// the list.
pub fn reg_list_expr(regs: &[Register]) -> Result<Expr, LiftError> {
    let mask = register_mask(regs)?;
    Ok(expr::num(BitVector::of_u64(u64::from(mask), 16)?))
}

/// `base ± offset` for an offset operand; the base alone when the offset
/// is absent. Register offsets route through the shift helper even for
/// the default LSL #0, picking up the current carry.
fn offset_addr(ins: &InstructionInfo, offset: &Offset) -> Result<Expr, LiftError> {
    match offset {
        Offset::Imm { base, offset: None } => Ok(read_reg(ins, *base)),
        Offset::Imm {
            base,
            offset: Some((sign, imm)),
        } => {
            let base = read_reg(ins, *base);
            let imm = expr::num_u32(*imm);
            Ok(match sign {
                Sign::Plus => base.add(imm),
                Sign::Minus => base.sub(imm),
            })
        }
        Offset::Reg {
            base,
            sign,
            index,
            shift: shift_opt,
        } => {
            let (kind, amount) = shift_opt.unwrap_or((ShiftKind::Lsl, 0));
            let index = shift(read_reg(ins, *index), 32, kind, amount, carry_flag())?;
            let base = read_reg(ins, *base);
            Ok(match sign {
                Sign::Plus => base.add(index),
                Sign::Minus => base.sub(index),
            })
        }
    }
}

/// Lowers a memory addressing mode to an address plus write-back.
pub fn mem_access(
    ins: &InstructionInfo,
    mode: &AddressingMode,
) -> Result<MemAccess, LiftError> {
    match mode {
        AddressingMode::Offset(offset) => Ok(MemAccess {
            addr: offset_addr(ins, offset)?,
            write_back: None,
        }),
        AddressingMode::PreIndexed(offset) => {
            let base = offset_base(offset);
            let addr = offset_addr(ins, offset)?;
            Ok(MemAccess {
                addr: addr.clone(),
                write_back: Some((base, addr)),
            })
        }
        AddressingMode::PostIndexed(offset) => {
            let base = offset_base(offset);
            Ok(MemAccess {
                addr: read_reg(ins, base),
                write_back: Some((base, offset_addr(ins, offset)?)),
            })
        }
        AddressingMode::Literal(imm) => {
            let pc = i64::from(pc_value(ins) & !0b11);
            Ok(MemAccess {
                addr: expr::num_u32((pc + imm) as u32),
                write_back: None,
            })
        }
    }
}

const fn offset_base(offset: &Offset) -> Register {
    match offset {
        Offset::Imm { base, .. } | Offset::Reg { base, .. } => *base,
    }
}

/// Lowers a data-processing second operand to (value, shifter carry-out).
///
/// `shift_op` is the optional trailing shift operand. Immediate operands
/// take the prior carry unless their top bit is set (the decoder supplies
/// expanded constants, so a set top bit implies a rotated encoding whose
/// carry-out is bit 31).
pub fn shifter(
    ins: &InstructionInfo,
    op2: &Operand,
    shift_op: Option<&Operand>,
) -> Result<(Expr, Expr), LiftError> {
    match (op2, shift_op) {
        (Operand::Imm(imm), None) => {
            let value = imm_expr(*imm)?;
            let carry = if (*imm as u32) & 0x8000_0000 == 0 {
                carry_flag()
            } else {
                expr::b1()
            };
            Ok((value, carry))
        }
        (Operand::Reg(rm), None) => {
            shift_c(read_reg(ins, *rm), 32, ShiftKind::Lsl, 0, carry_flag())
        }
        (
            Operand::Reg(rm),
            Some(Operand::Shift {
                kind,
                amount: ShiftAmount::Imm(k),
            }),
        ) => shift_c(read_reg(ins, *rm), 32, *kind, *k, carry_flag()),
        (
            Operand::Reg(rm),
            Some(Operand::Shift {
                kind,
                amount: ShiftAmount::Reg(rs),
            }),
        ) => shift_c_for_reg(
            read_reg(ins, *rm),
            32,
            *kind,
            expr::zext(32, expr::extract_low(8, read_reg(ins, *rs))),
            carry_flag(),
        ),
        _ => Err(LiftError::InvalidOperand(ins.opcode)),
    }
}
