//! Shared lowering helpers: register reads, flag access, the condition
//! gate, carry/overflow arithmetic and the three PC-write flavors.

use crate::arm::condition::Condition;
use crate::arm::instruction::{InstructionInfo, OperatingMode};
use crate::arm::psr::PsrField;
use crate::arm::register::Register;
use crate::ir::expr::{self, Expr, Var};
use crate::ir::stmt::{Label, SideEffect};
use crate::ir::StmtBuilder;

/// The value PC reads as: the instruction address plus the pipeline
/// offset (8 in ARM state, 4 in Thumb state).
#[must_use]
pub(crate) fn pc_value(ins: &InstructionInfo) -> u32 {
    let offset = match ins.mode {
        OperatingMode::Arm => 8,
        OperatingMode::Thumb => 4,
    };
    (ins.address as u32).wrapping_add(offset)
}

/// Register read expression; PC reads as a constant.
pub(crate) fn read_reg(ins: &InstructionInfo, reg: Register) -> Expr {
    if reg == Register::PC {
        expr::num_u32(pc_value(ins))
    } else {
        expr::var(reg)
    }
}

/// The field masked in place within the PSR register: `r & mask`.
pub(crate) fn psr_field(reg: Register, field: PsrField) -> Expr {
    expr::var(reg).band(expr::num_u32(field.mask()))
}

/// A single-bit PSR field as a 1-bit expression.
pub(crate) fn psr_bit(reg: Register, field: PsrField) -> Expr {
    expr::extract(expr::var(reg), 1, field.pos())
}

pub(crate) fn carry_flag() -> Expr {
    psr_bit(Register::APSR, PsrField::C)
}

/// Sets the field: clear it in place, then OR in the zero-extended value
/// shifted to the field position.
pub(crate) fn set_psr_field(bld: &mut StmtBuilder, reg: Register, field: PsrField, value: Expr) {
    let cleared = expr::var(reg).band(expr::num_u32(!field.mask()));
    let shifted = expr::zext(32, value).shl(expr::num_u32(field.pos()));
    bld.put(Var::Reg(reg), cleared.bor(shifted));
}

pub(crate) fn enable_psr(bld: &mut StmtBuilder, reg: Register, field: PsrField) {
    bld.put(
        Var::Reg(reg),
        expr::var(reg).bor(expr::num_u32(field.mask())),
    );
}

pub(crate) fn disable_psr(bld: &mut StmtBuilder, reg: Register, field: PsrField) {
    bld.put(
        Var::Reg(reg),
        expr::var(reg).band(expr::num_u32(!field.mask())),
    );
}

/// The 1-bit pass/fail expression for a condition code, computed from the
/// APSR flags.
pub(crate) fn cond_expr(cond: Condition) -> Expr {
    let n = || psr_bit(Register::APSR, PsrField::N);
    let z = || psr_bit(Register::APSR, PsrField::Z);
    let c = || psr_bit(Register::APSR, PsrField::C);
    let v = || psr_bit(Register::APSR, PsrField::V);
    match cond {
        Condition::EQ => z(),
        Condition::NE => z().not(),
        Condition::CS => c(),
        Condition::CC => c().not(),
        Condition::MI => n(),
        Condition::PL => n().not(),
        Condition::VS => v(),
        Condition::VC => v().not(),
        Condition::HI => c().band(z().not()),
        Condition::LS => c().band(z().not()).not(),
        Condition::GE => n().eq(v()),
        Condition::LT => n().neq(v()),
        Condition::GT => n().eq(v()).band(z().not()),
        Condition::LE => n().eq(v()).band(z().not()).not(),
        Condition::AL | Condition::UN => expr::b1(),
    }
}

/// Opens the condition gate: for a real condition, emits the conditional
/// branch and the pass label, returning the fail label to be placed by
/// [`end_gate`]. `AL`, `UN` and absent conditions emit nothing.
pub(crate) fn start_gate(bld: &mut StmtBuilder, ins: &InstructionInfo) -> Option<Label> {
    match ins.condition {
        None => None,
        Some(cond) if cond.is_unconditional() => None,
        Some(cond) => {
            let pass = bld.new_label("pass");
            let fail = bld.new_label("fail");
            bld.cjmp(cond_expr(cond), pass.clone(), fail.clone());
            bld.lmark(pass);
            Some(fail)
        }
    }
}

pub(crate) fn end_gate(bld: &mut StmtBuilder, fail: Option<Label>) {
    if let Some(label) = fail {
        bld.lmark(label);
    }
}

/// `AddWithCarry` from the manual: computes `a + b + cin` into a fresh
/// temporary and returns (result, carry-out, overflow) expressions.
pub(crate) fn add_with_carry(
    bld: &mut StmtBuilder,
    a: Expr,
    b: Expr,
    cin: Expr,
) -> (Expr, Expr, Expr) {
    let t = bld.tmp_var(32);
    bld.put(t, a.clone().add(b.clone()).add(expr::zext(32, cin)));
    let result = expr::var_of(t);
    let carry = result.clone().ult(a.clone());
    let sign_a = expr::extract(a, 1, 31);
    let sign_b = expr::extract(b, 1, 31);
    let sign_r = expr::extract(result.clone(), 1, 31);
    let overflow = sign_a
        .clone()
        .eq(sign_b)
        .band(sign_a.neq(sign_r));
    (result, carry, overflow)
}

/// Writes N and Z from the result.
pub(crate) fn set_flags_nz(bld: &mut StmtBuilder, result: Expr) {
    set_psr_field(
        bld,
        Register::APSR,
        PsrField::N,
        expr::extract(result.clone(), 1, 31),
    );
    set_psr_field(
        bld,
        Register::APSR,
        PsrField::Z,
        result.eq(expr::num0(32)),
    );
}

/// Writes N, Z and C: the logical-instruction flag update, with C coming
/// from the barrel shifter.
pub(crate) fn set_flags_nzc(bld: &mut StmtBuilder, result: Expr, carry: Expr) {
    set_flags_nz(bld, result);
    set_psr_field(bld, Register::APSR, PsrField::C, carry);
}

/// Writes N, Z, C and V, the arithmetic flag update.
pub(crate) fn set_flags_nzcv(bld: &mut StmtBuilder, result: Expr, carry: Expr, overflow: Expr) {
    set_flags_nzc(bld, result, carry);
    set_psr_field(bld, Register::APSR, PsrField::V, overflow);
}

/// Simple branch: jump to the target with the low bit(s) aligned away
/// (one bit in Thumb state, two in ARM state).
pub(crate) fn branch_write_pc(bld: &mut StmtBuilder, ins: &InstructionInfo, target: Expr) {
    let align_mask = match ins.mode {
        OperatingMode::Arm => !0b11u32,
        OperatingMode::Thumb => !0b1u32,
    };
    bld.inter_jmp(
        Var::Reg(Register::PC),
        target.band(expr::num_u32(align_mask)),
    );
}

/// Interworking branch: bit 0 of the target selects Thumb state, else an
/// even target with bit 1 clear selects ARM state, else the behavior is
/// undefined. Emitted as an inline label/branch state machine.
pub(crate) fn bx_write_pc(bld: &mut StmtBuilder, target: Expr) {
    let t = bld.tmp_var(32);
    bld.put(t, target);
    let addr = expr::var_of(t);

    let to_thumb = bld.new_label("bx_thumb");
    let not_thumb = bld.new_label("bx_not_thumb");
    let to_arm = bld.new_label("bx_arm");
    let undefined = bld.new_label("bx_undef");

    bld.cjmp(
        expr::extract(addr.clone(), 1, 0),
        to_thumb.clone(),
        not_thumb.clone(),
    );
    bld.lmark(to_thumb);
    disable_psr(bld, Register::APSR, PsrField::J);
    enable_psr(bld, Register::APSR, PsrField::T);
    bld.inter_jmp(
        Var::Reg(Register::PC),
        addr.clone().band(expr::num_u32(!0b1)),
    );
    bld.lmark(not_thumb);
    bld.cjmp(
        expr::extract(addr.clone(), 1, 1),
        undefined.clone(),
        to_arm.clone(),
    );
    bld.lmark(to_arm);
    disable_psr(bld, Register::APSR, PsrField::J);
    disable_psr(bld, Register::APSR, PsrField::T);
    bld.inter_jmp(Var::Reg(Register::PC), addr);
    bld.lmark(undefined);
    bld.side_effect(SideEffect::UndefinedInstr);
}

/// ALU write to PC (ARMv7): interworking in ARM state, simple branch in
/// Thumb state. The state is known at lift time, so the selection is
/// static.
pub(crate) fn alu_write_pc(bld: &mut StmtBuilder, ins: &InstructionInfo, target: Expr) {
    match ins.mode {
        OperatingMode::Arm => bx_write_pc(bld, target),
        OperatingMode::Thumb => branch_write_pc(bld, ins, target),
    }
}

/// PC loaded from memory (ARMv5T and later): always interworking.
pub(crate) fn load_write_pc(bld: &mut StmtBuilder, target: Expr) {
    bx_write_pc(bld, target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::instruction::{Opcode, Operands};
    use crate::ir::expr::{b0, num_u32, var};
    use crate::ir::Stmt;
    use pretty_assertions::assert_eq;

    fn ins(mode: OperatingMode, condition: Option<Condition>) -> InstructionInfo {
        InstructionInfo {
            address: 0x8000,
            num_bytes: 4,
            opcode: Opcode::Nop,
            condition,
            set_flags: false,
            write_back: false,
            mode,
            operands: Operands::Zero,
        }
    }

    #[test]
    fn pc_reads_as_pipeline_value() {
        let arm = ins(OperatingMode::Arm, None);
        assert_eq!(read_reg(&arm, Register::PC), num_u32(0x8008));
        let thumb = ins(OperatingMode::Thumb, None);
        assert_eq!(read_reg(&thumb, Register::PC), num_u32(0x8004));
        assert_eq!(read_reg(&arm, Register::R1), var(Register::R1));
    }

    #[test]
    fn unconditional_codes_emit_no_gate() {
        let mut bld = StmtBuilder::with_capacity(4);
        assert!(start_gate(&mut bld, &ins(OperatingMode::Arm, Some(Condition::AL))).is_none());
        assert!(start_gate(&mut bld, &ins(OperatingMode::Arm, Some(Condition::UN))).is_none());
        assert!(start_gate(&mut bld, &ins(OperatingMode::Arm, None)).is_none());
        assert!(bld.is_empty());
    }

    #[test]
    fn conditional_gate_brackets_the_body() {
        let mut bld = StmtBuilder::with_capacity(8);
        let fail = start_gate(&mut bld, &ins(OperatingMode::Arm, Some(Condition::EQ)));
        end_gate(&mut bld, fail);
        let stmts = bld.finish();
        assert_eq!(stmts.len(), 3);
        match &stmts[0] {
            Stmt::CJmp { cond, .. } => {
                assert_eq!(*cond, psr_bit(Register::APSR, PsrField::Z));
            }
            other => panic!("expected CJmp, got {other}"),
        }
        assert!(matches!(stmts[1], Stmt::LMark(_)));
        assert!(matches!(stmts[2], Stmt::LMark(_)));
    }

    #[test]
    fn condition_expressions_follow_the_flag_table() {
        let n = psr_bit(Register::APSR, PsrField::N);
        let v = psr_bit(Register::APSR, PsrField::V);
        let z = psr_bit(Register::APSR, PsrField::Z);
        assert_eq!(cond_expr(Condition::GE), n.clone().eq(v.clone()));
        assert_eq!(cond_expr(Condition::GT), n.eq(v).band(z.not()));
        assert_eq!(cond_expr(Condition::AL), crate::ir::expr::b1());
    }

    #[test]
    fn add_with_carry_produces_result_carry_overflow() {
        let mut bld = StmtBuilder::with_capacity(4);
        let (result, carry, overflow) =
            add_with_carry(&mut bld, var(Register::R1), var(Register::R2), b0());
        assert_eq!(result.width(), 32);
        assert_eq!(carry.width(), 1);
        assert_eq!(overflow.width(), 1);
        // carry-out is the unsigned wrap test: result < a
        assert_eq!(carry, result.ult(var(Register::R1)));
        let stmts = bld.finish();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Put { .. }));
    }

    #[test]
    fn branch_write_pc_aligns_per_mode() {
        let mut bld = StmtBuilder::with_capacity(2);
        branch_write_pc(&mut bld, &ins(OperatingMode::Arm, None), num_u32(0x9001));
        let stmts = bld.finish();
        match &stmts[0] {
            Stmt::InterJmp { target, .. } => {
                assert_eq!(*target, num_u32(0x9001).band(num_u32(0xFFFF_FFFC)));
            }
            other => panic!("expected InterJmp, got {other}"),
        }
    }

    #[test]
    fn bx_write_pc_emits_the_interworking_machine() {
        let mut bld = StmtBuilder::with_capacity(16);
        bx_write_pc(&mut bld, var(Register::R0));
        let stmts = bld.finish();
        // Thumb arm: clear J, set T; ARM arm: clear J, clear T; undefined tail.
        let cjmps = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::CJmp { .. }))
            .count();
        assert_eq!(cjmps, 2);
        let interjmps = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::InterJmp { .. }))
            .count();
        assert_eq!(interjmps, 2);
        assert!(
            stmts
                .iter()
                .any(|s| matches!(s, Stmt::SideEffect(SideEffect::UndefinedInstr)))
        );
    }
}
