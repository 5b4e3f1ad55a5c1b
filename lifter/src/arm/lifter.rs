//! Per-instruction IR emitters and the opcode dispatch.
//!
//! [`translate`] is the library entry point: it frames the output with the
//! `ISMark`/`IEMark` pair, opens the condition gate, dispatches on the
//! opcode and closes the gate. Each emitter method lowers exactly one
//! instruction family, reproducing the manual's pseudocode: flag effects
//! through [`add_with_carry`] and the barrel-shifter carry, PC writes
//! through the interworking helpers, and unpredictable inputs as explicit
//! `Undefined`/`SideEffect` IR rather than errors.

use crate::arm::context::TransContext;
use crate::arm::helper::{
    add_with_carry, alu_write_pc, branch_write_pc, bx_write_pc, carry_flag, end_gate,
    load_write_pc, pc_value, psr_field, read_reg, set_flags_nz, set_flags_nzc, set_flags_nzcv,
    set_psr_field, start_gate,
};
use crate::arm::instruction::{
    AddressingMode, InstructionInfo, Opcode, Operand, Operands, OperatingMode, ShiftAmount,
};
use crate::arm::operand::{imm_expr, mem_access, shifter, MemAccess};
use crate::arm::psr::PsrField;
use crate::arm::register::{register_mask, Register, CORE_REGISTERS};
use crate::arm::shift::{shift, shift_c, shift_c_for_reg, ShiftKind};
use crate::error::LiftError;
use crate::ir::expr::{self, Expr};
use crate::ir::stmt::SideEffect;
use crate::ir::{Stmt, StmtBuilder};

/// Translates one decoded instruction into its IR statement sequence.
pub fn translate(
    ins: &InstructionInfo,
    ctxt: &TransContext,
) -> Result<Vec<Stmt>, LiftError> {
    let mut bld = StmtBuilder::with_capacity(32);
    bld.is_mark(ins.address, ins.num_bytes);
    let gate = start_gate(&mut bld, ins);
    Lifter { ins, ctxt }.lift(&mut bld)?;
    end_gate(&mut bld, gate);
    bld.ie_mark(ins.next_address());
    Ok(bld.finish())
}

/// How an emitter updates the APSR when the S suffix is present.
enum FlagKind {
    None,
    /// N/Z from the result, C from the barrel shifter.
    Logical(Expr),
    /// N/Z from the result, C and V from `add_with_carry`.
    Arith { carry: Expr, overflow: Expr },
    /// N/Z only (multiplies).
    NZ,
}

enum ArithKind {
    Add,
    Adc,
    Sub,
    Sbc,
    Rsb,
    Rsc,
}

enum LogicalKind {
    And,
    Orr,
    Eor,
    Bic,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Ia,
    Ib,
    Da,
    Db,
}

struct Lifter<'a> {
    ins: &'a InstructionInfo,
    ctxt: &'a TransContext,
}

impl Lifter<'_> {
    fn lift(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        match self.ins.opcode {
            Opcode::Add => self.arith(bld, ArithKind::Add),
            Opcode::Adc => self.arith(bld, ArithKind::Adc),
            Opcode::Sub => self.arith(bld, ArithKind::Sub),
            Opcode::Sbc => self.arith(bld, ArithKind::Sbc),
            Opcode::Rsb => self.arith(bld, ArithKind::Rsb),
            Opcode::Rsc => self.arith(bld, ArithKind::Rsc),
            Opcode::And => self.logical(bld, LogicalKind::And),
            Opcode::Orr => self.logical(bld, LogicalKind::Orr),
            Opcode::Eor => self.logical(bld, LogicalKind::Eor),
            Opcode::Bic => self.logical(bld, LogicalKind::Bic),
            Opcode::Mov => self.move_op(bld, false),
            Opcode::Mvn => self.move_op(bld, true),
            Opcode::Movw => self.movw(bld),
            Opcode::Movt => self.movt(bld),
            Opcode::Cmp | Opcode::Cmn | Opcode::Tst | Opcode::Teq => self.compare(bld),
            Opcode::Lsl => self.shift_ins(bld, ShiftKind::Lsl),
            Opcode::Lsr => self.shift_ins(bld, ShiftKind::Lsr),
            Opcode::Asr => self.shift_ins(bld, ShiftKind::Asr),
            Opcode::Ror => self.shift_ins(bld, ShiftKind::Ror),
            Opcode::Rrx => self.rrx(bld),
            Opcode::Mul => self.mul(bld),
            Opcode::Mla => self.mla(bld, false),
            Opcode::Mls => self.mla(bld, true),
            Opcode::Umull => self.mull(bld, false, false),
            Opcode::Umlal => self.mull(bld, false, true),
            Opcode::Smull => self.mull(bld, true, false),
            Opcode::Smlal => self.mull(bld, true, true),
            Opcode::B => self.branch(bld, false),
            Opcode::Bl => self.branch(bld, true),
            Opcode::Blx => self.blx(bld),
            Opcode::Bx => self.bx(bld),
            Opcode::Cbz => self.cbz(bld, false),
            Opcode::Cbnz => self.cbz(bld, true),
            Opcode::Tbb => self.table_branch(bld, false),
            Opcode::Tbh => self.table_branch(bld, true),
            Opcode::Ldr => self.load(bld, 32, false),
            Opcode::Ldrb => self.load(bld, 8, false),
            Opcode::Ldrh => self.load(bld, 16, false),
            Opcode::Ldrsb => self.load(bld, 8, true),
            Opcode::Ldrsh => self.load(bld, 16, true),
            Opcode::Ldrd => self.load_dual(bld),
            Opcode::Str => self.store(bld, 32),
            Opcode::Strb => self.store(bld, 8),
            Opcode::Strh => self.store(bld, 16),
            Opcode::Strd => self.store_dual(bld),
            Opcode::Ldm
            | Opcode::Ldmib
            | Opcode::Ldmda
            | Opcode::Ldmdb
            | Opcode::Stm
            | Opcode::Stmib
            | Opcode::Stmda
            | Opcode::Stmdb
            | Opcode::Push
            | Opcode::Pop => self.block_transfer(bld),
            Opcode::Uxtb => self.extend(bld, 8, false, false),
            Opcode::Uxth => self.extend(bld, 16, false, false),
            Opcode::Sxtb => self.extend(bld, 8, true, false),
            Opcode::Sxth => self.extend(bld, 16, true, false),
            Opcode::Uxtab => self.extend(bld, 8, false, true),
            Opcode::Uxtah => self.extend(bld, 16, false, true),
            Opcode::Sxtab => self.extend(bld, 8, true, true),
            Opcode::Sxtah => self.extend(bld, 16, true, true),
            Opcode::Bfc => self.bfc(bld),
            Opcode::Bfi => self.bfi(bld),
            Opcode::Ubfx => self.bfx(bld, false),
            Opcode::Sbfx => self.bfx(bld, true),
            Opcode::Rev => self.rev(bld),
            Opcode::Mrs => self.mrs(bld),
            Opcode::Msr => self.msr(bld),
            Opcode::Nop => Ok(()),
            Opcode::Svc => {
                bld.side_effect(SideEffect::SysCall);
                Ok(())
            }
            Opcode::Bkpt => {
                bld.side_effect(SideEffect::Breakpoint);
                Ok(())
            }
            Opcode::Clz => Err(LiftError::NotImplemented(Opcode::Clz)),
            Opcode::Vldr => self.vldr(bld),
            Opcode::Vstr => self.vstr(bld),
            Opcode::Vpush => self.vpush_pop(bld, true),
            Opcode::Vpop => self.vpush_pop(bld, false),
            Opcode::Vadd
            | Opcode::Vsub
            | Opcode::Vmul
            | Opcode::Vdiv
            | Opcode::Vmov
            | Opcode::Vcmp
            | Opcode::Vcvt
            | Opcode::Vmls => {
                bld.side_effect(SideEffect::UnsupportedFp);
                Ok(())
            }
        }
    }

    // ---- operand shape accessors -------------------------------------

    fn bad_shape(&self) -> LiftError {
        LiftError::InvalidOperand(self.ins.opcode)
    }

    fn as_reg(&self, op: &Operand) -> Result<Register, LiftError> {
        match op {
            Operand::Reg(r) => Ok(*r),
            _ => Err(self.bad_shape()),
        }
    }

    fn as_imm(&self, op: &Operand) -> Result<i64, LiftError> {
        match op {
            Operand::Imm(imm) => Ok(*imm),
            _ => Err(self.bad_shape()),
        }
    }

    fn as_mem<'b>(&self, op: &'b Operand) -> Result<&'b AddressingMode, LiftError> {
        match op {
            Operand::Mem(mode) => Ok(mode),
            _ => Err(self.bad_shape()),
        }
    }

    fn as_list<'b>(&self, op: &'b Operand) -> Result<&'b [Register], LiftError> {
        match op {
            Operand::RegList(regs) => Ok(regs),
            _ => Err(self.bad_shape()),
        }
    }

    fn read(&self, reg: Register) -> Expr {
        read_reg(self.ins, reg)
    }

    // ---- result and flag writing -------------------------------------

    /// Writes a data-processing result. A PC destination routes through
    /// the ALU-write-PC rules, or through the exception-return sequence
    /// for the S forms (the `SUBS PC, LR` family).
    fn write_result(
        &self,
        bld: &mut StmtBuilder,
        dst: Register,
        value: Expr,
        flags: FlagKind,
    ) -> Result<(), LiftError> {
        if dst == Register::PC {
            if self.ins.set_flags {
                self.exception_return(bld, value);
            } else {
                alu_write_pc(bld, self.ins, value);
            }
            return Ok(());
        }
        if !self.ins.set_flags {
            bld.put(self.ctxt.reg_var(dst), value);
            return Ok(());
        }
        let staged = if matches!(value, Expr::Var(_)) {
            value
        } else {
            let t = bld.tmp_var(32);
            bld.put(t, value);
            expr::var_of(t)
        };
        bld.put(self.ctxt.reg_var(dst), staged.clone());
        match flags {
            FlagKind::None => {}
            FlagKind::Logical(carry) => set_flags_nzc(bld, staged, carry),
            FlagKind::Arith { carry, overflow } => set_flags_nzcv(bld, staged, carry, overflow),
            FlagKind::NZ => set_flags_nz(bld, staged),
        }
        Ok(())
    }

    /// Exception return: `SUBS PC, LR`-style writes copy SPSR into CPSR
    /// and branch. Returning this way from User, System or Hyp mode is
    /// unpredictable, so those modes branch to an undefined-instruction
    /// side effect. Secure-state restrictions are not modeled.
    fn exception_return(&self, bld: &mut StmtBuilder, value: Expr) {
        tracing::debug!(
            addr = self.ins.address,
            "exception return lifted without secure-state checks"
        );
        let t = bld.tmp_var(32);
        bld.put(t, value);
        let mode = || psr_field(Register::CPSR, PsrField::M);
        let bad = mode()
            .eq(expr::num_u32(0b10000))
            .bor(mode().eq(expr::num_u32(0b11111)))
            .bor(mode().eq(expr::num_u32(0b11010)));
        let ok = bld.new_label("eret");
        let undefined = bld.new_label("eret_undef");
        bld.cjmp(bad, undefined.clone(), ok.clone());
        bld.lmark(ok);
        bld.put(self.ctxt.reg_var(Register::CPSR), expr::var(Register::SPSR));
        bld.inter_jmp(self.ctxt.reg_var(Register::PC), expr::var_of(t));
        bld.lmark(undefined);
        bld.side_effect(SideEffect::UndefinedInstr);
    }

    // ---- data processing ---------------------------------------------

    /// (dst, rn, op2 value, shifter carry) for the three- and four-operand
    /// data-processing shapes.
    fn data_operands(&self) -> Result<(Register, Expr, Expr, Expr), LiftError> {
        let (dst, rn, op2, shift_op) = match &self.ins.operands {
            Operands::Three(d, n, o2) => (d, n, o2, None),
            Operands::Four(d, n, o2, s) => (d, n, o2, Some(s)),
            _ => return Err(self.bad_shape()),
        };
        let dst = self.as_reg(dst)?;
        let rn = self.as_reg(rn)?;
        let (value, carry) = shifter(self.ins, op2, shift_op)?;
        Ok((dst, self.read(rn), value, carry))
    }

    fn arith(&self, bld: &mut StmtBuilder, kind: ArithKind) -> Result<(), LiftError> {
        let (dst, a, b, _) = self.data_operands()?;
        let (result, carry, overflow) = match kind {
            ArithKind::Add => add_with_carry(bld, a, b, expr::b0()),
            ArithKind::Adc => add_with_carry(bld, a, b, carry_flag()),
            ArithKind::Sub => add_with_carry(bld, a, b.not(), expr::b1()),
            ArithKind::Sbc => add_with_carry(bld, a, b.not(), carry_flag()),
            ArithKind::Rsb => add_with_carry(bld, a.not(), b, expr::b1()),
            ArithKind::Rsc => add_with_carry(bld, a.not(), b, carry_flag()),
        };
        self.write_result(bld, dst, result, FlagKind::Arith { carry, overflow })
    }

    fn logical(&self, bld: &mut StmtBuilder, kind: LogicalKind) -> Result<(), LiftError> {
        let (dst, a, b, carry) = self.data_operands()?;
        let value = match kind {
            LogicalKind::And => a.band(b),
            LogicalKind::Orr => a.bor(b),
            LogicalKind::Eor => a.bxor(b),
            LogicalKind::Bic => a.band(b.not()),
        };
        self.write_result(bld, dst, value, FlagKind::Logical(carry))
    }

    fn move_op(&self, bld: &mut StmtBuilder, negate: bool) -> Result<(), LiftError> {
        let (dst, op2, shift_op) = match &self.ins.operands {
            Operands::Two(d, o2) => (d, o2, None),
            Operands::Three(d, o2, s) => (d, o2, Some(s)),
            _ => return Err(self.bad_shape()),
        };
        let dst = self.as_reg(dst)?;
        let (value, carry) = shifter(self.ins, op2, shift_op)?;
        let value = if negate { value.not() } else { value };
        self.write_result(bld, dst, value, FlagKind::Logical(carry))
    }

    fn movw(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Two(dst, imm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let imm = self.as_imm(imm)? as u32 & 0xFFFF;
        self.write_result(bld, dst, expr::num_u32(imm), FlagKind::None)
    }

    /// MOVT keeps the low half and replaces the high half.
    fn movt(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Two(dst, imm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let imm = self.as_imm(imm)? as u64 & 0xFFFF;
        let hi = expr::num(crate::bitvec::BitVector::of_u64(imm, 16)?);
        let value = expr::concat(hi, expr::extract_low(16, self.read(dst)));
        self.write_result(bld, dst, value, FlagKind::None)
    }

    fn compare(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let (rn, op2, shift_op) = match &self.ins.operands {
            Operands::Two(n, o2) => (n, o2, None),
            Operands::Three(n, o2, s) => (n, o2, Some(s)),
            _ => return Err(self.bad_shape()),
        };
        let a = self.read(self.as_reg(rn)?);
        let (b, shifter_carry) = shifter(self.ins, op2, shift_op)?;
        match self.ins.opcode {
            Opcode::Cmp => {
                let (result, carry, overflow) = add_with_carry(bld, a, b.not(), expr::b1());
                set_flags_nzcv(bld, result, carry, overflow);
            }
            Opcode::Cmn => {
                let (result, carry, overflow) = add_with_carry(bld, a, b, expr::b0());
                set_flags_nzcv(bld, result, carry, overflow);
            }
            Opcode::Tst => {
                let t = bld.tmp_var(32);
                bld.put(t, a.band(b));
                set_flags_nzc(bld, expr::var_of(t), shifter_carry);
            }
            Opcode::Teq => {
                let t = bld.tmp_var(32);
                bld.put(t, a.bxor(b));
                set_flags_nzc(bld, expr::var_of(t), shifter_carry);
            }
            _ => return Err(LiftError::InvalidOpcode(self.ins.opcode)),
        }
        Ok(())
    }

    // ---- shift instructions ------------------------------------------

    fn shift_ins(&self, bld: &mut StmtBuilder, kind: ShiftKind) -> Result<(), LiftError> {
        let Operands::Three(dst, rm, amount) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let rm = self.read(self.as_reg(rm)?);
        let (value, carry) = match amount {
            Operand::Imm(k) => shift_c(rm, 32, kind, *k as u32, carry_flag())?,
            Operand::Reg(rs) => shift_c_for_reg(
                rm,
                32,
                kind,
                expr::zext(32, expr::extract_low(8, self.read(*rs))),
                carry_flag(),
            )?,
            _ => return Err(self.bad_shape()),
        };
        self.write_result(bld, dst, value, FlagKind::Logical(carry))
    }

    fn rrx(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Two(dst, rm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let rm = self.read(self.as_reg(rm)?);
        let (value, carry) = shift_c(rm, 32, ShiftKind::Rrx, 1, carry_flag())?;
        self.write_result(bld, dst, value, FlagKind::Logical(carry))
    }

    // ---- multiplies --------------------------------------------------

    fn mul(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Three(dst, rn, rm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let value = self.read(self.as_reg(rn)?).mul(self.read(self.as_reg(rm)?));
        self.write_result(bld, dst, value, FlagKind::NZ)
    }

    fn mla(&self, bld: &mut StmtBuilder, subtract: bool) -> Result<(), LiftError> {
        let Operands::Four(dst, rn, rm, ra) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let product = self.read(self.as_reg(rn)?).mul(self.read(self.as_reg(rm)?));
        let acc = self.read(self.as_reg(ra)?);
        let value = if subtract {
            acc.sub(product)
        } else {
            product.add(acc)
        };
        self.write_result(bld, dst, value, FlagKind::NZ)
    }

    /// 64-bit multiply (long) family; the product lands in a 64-bit
    /// temporary split across RdLo/RdHi.
    fn mull(
        &self,
        bld: &mut StmtBuilder,
        signed: bool,
        accumulate: bool,
    ) -> Result<(), LiftError> {
        let Operands::Four(dlo, dhi, rn, rm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dlo = self.as_reg(dlo)?;
        let dhi = self.as_reg(dhi)?;
        let ext = |e: Expr| {
            if signed {
                expr::sext(64, e)
            } else {
                expr::zext(64, e)
            }
        };
        let mut product = ext(self.read(self.as_reg(rn)?)).mul(ext(self.read(self.as_reg(rm)?)));
        if accumulate {
            product = product.add(expr::concat(self.read(dhi), self.read(dlo)));
        }
        let t = bld.tmp_var(64);
        bld.put(t, product);
        bld.put(self.ctxt.reg_var(dlo), expr::extract_low(32, expr::var_of(t)));
        bld.put(self.ctxt.reg_var(dhi), expr::extract_high(32, expr::var_of(t)));
        if self.ins.set_flags {
            set_psr_field(
                bld,
                Register::APSR,
                PsrField::N,
                expr::extract(expr::var_of(t), 1, 63),
            );
            set_psr_field(
                bld,
                Register::APSR,
                PsrField::Z,
                expr::var_of(t).eq(expr::num0(64)),
            );
        }
        Ok(())
    }

    // ---- branches ----------------------------------------------------

    fn branch_target(&self, offset: i64) -> u32 {
        (i64::from(pc_value(self.ins)) + offset) as u32
    }

    /// Return address written by BL/BLX; bit 0 marks Thumb.
    fn put_link(&self, bld: &mut StmtBuilder) {
        let ret = (self.ins.address as u32).wrapping_add(self.ins.num_bytes);
        let value = match self.ins.mode {
            OperatingMode::Arm => ret,
            OperatingMode::Thumb => ret | 1,
        };
        bld.put(self.ctxt.reg_var(Register::LR), expr::num_u32(value));
    }

    fn branch(&self, bld: &mut StmtBuilder, link: bool) -> Result<(), LiftError> {
        let Operands::One(offset) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let target = self.branch_target(self.as_imm(offset)?);
        if link {
            self.put_link(bld);
        }
        branch_write_pc(bld, self.ins, expr::num_u32(target));
        Ok(())
    }

    /// BLX: immediate form always swaps instruction sets, register form
    /// interworks on bit 0.
    fn blx(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::One(target) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        match target {
            Operand::Imm(offset) => {
                self.put_link(bld);
                let target = match self.ins.mode {
                    // ARM to Thumb: request Thumb state via bit 0.
                    OperatingMode::Arm => self.branch_target(*offset) | 1,
                    // Thumb to ARM: word-aligned target, bit 1 clear.
                    OperatingMode::Thumb => {
                        (i64::from(pc_value(self.ins) & !0b11) + offset) as u32 & !0b11
                    }
                };
                bx_write_pc(bld, expr::num_u32(target));
                Ok(())
            }
            Operand::Reg(rm) => {
                let rm = *rm;
                self.put_link(bld);
                bx_write_pc(bld, self.read(rm));
                Ok(())
            }
            _ => Err(self.bad_shape()),
        }
    }

    fn bx(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::One(rm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        bx_write_pc(bld, self.read(self.as_reg(rm)?));
        Ok(())
    }

    fn cbz(&self, bld: &mut StmtBuilder, nonzero: bool) -> Result<(), LiftError> {
        if self.ins.mode == OperatingMode::Arm {
            return Err(LiftError::InvalidTargetArchMode(self.ins.opcode));
        }
        let Operands::Two(rn, offset) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let rn = self.read(self.as_reg(rn)?);
        let target = self.branch_target(self.as_imm(offset)?);
        let cond = if nonzero {
            rn.neq(expr::num0(32))
        } else {
            rn.eq(expr::num0(32))
        };
        let taken = bld.new_label("cb_taken");
        let fall = bld.new_label("cb_fall");
        bld.cjmp(cond, taken.clone(), fall.clone());
        bld.lmark(taken);
        branch_write_pc(bld, self.ins, expr::num_u32(target));
        bld.lmark(fall);
        Ok(())
    }

    /// TBB/TBH: load an offset from the table at `rn + rm (<<1)`, double
    /// it and branch forward from PC.
    fn table_branch(&self, bld: &mut StmtBuilder, halfword: bool) -> Result<(), LiftError> {
        if self.ins.mode == OperatingMode::Arm {
            return Err(LiftError::InvalidTargetArchMode(self.ins.opcode));
        }
        let Operands::One(table) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let access = mem_access(self.ins, self.as_mem(table)?)?;
        let width = if halfword { 16 } else { 8 };
        let t = bld.tmp_var(32);
        bld.put(t, expr::zext(32, expr::load_le(width, access.addr)));
        let target = expr::num_u32(pc_value(self.ins))
            .add(expr::var_of(t).mul(expr::num_u32(2)));
        branch_write_pc(bld, self.ins, target);
        Ok(())
    }

    // ---- loads and stores --------------------------------------------

    fn write_back(&self, bld: &mut StmtBuilder, access: &MemAccess) {
        if let Some((base, addr)) = &access.write_back {
            bld.put(self.ctxt.reg_var(*base), addr.clone());
        }
    }

    fn load(&self, bld: &mut StmtBuilder, width: u32, signed: bool) -> Result<(), LiftError> {
        let Operands::Two(rt, mem) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let rt = self.as_reg(rt)?;
        let access = mem_access(self.ins, self.as_mem(mem)?)?;
        let loaded = expr::load_le(width, access.addr.clone());
        let value = if width == 32 {
            loaded
        } else if signed {
            expr::sext(32, loaded)
        } else {
            expr::zext(32, loaded)
        };
        let t = bld.tmp_var(32);
        bld.put(t, value);
        self.write_back(bld, &access);
        if rt == Register::PC {
            load_write_pc(bld, expr::var_of(t));
        } else {
            bld.put(self.ctxt.reg_var(rt), expr::var_of(t));
        }
        Ok(())
    }

    fn load_dual(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Three(rt, rt2, mem) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let rt = self.as_reg(rt)?;
        let rt2 = self.as_reg(rt2)?;
        let access = mem_access(self.ins, self.as_mem(mem)?)?;
        let t1 = bld.tmp_var(32);
        let t2 = bld.tmp_var(32);
        bld.put(t1, expr::load_le(32, access.addr.clone()));
        bld.put(
            t2,
            expr::load_le(32, access.addr.clone().add(expr::num_u32(4))),
        );
        self.write_back(bld, &access);
        bld.put(self.ctxt.reg_var(rt), expr::var_of(t1));
        bld.put(self.ctxt.reg_var(rt2), expr::var_of(t2));
        Ok(())
    }

    fn store(&self, bld: &mut StmtBuilder, width: u32) -> Result<(), LiftError> {
        let Operands::Two(rt, mem) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let rt = self.as_reg(rt)?;
        let access = mem_access(self.ins, self.as_mem(mem)?)?;
        let value = if width == 32 {
            self.read(rt)
        } else {
            expr::extract_low(width, self.read(rt))
        };
        bld.store(access.addr.clone(), value);
        self.write_back(bld, &access);
        Ok(())
    }

    fn store_dual(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Three(rt, rt2, mem) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let rt = self.as_reg(rt)?;
        let rt2 = self.as_reg(rt2)?;
        let access = mem_access(self.ins, self.as_mem(mem)?)?;
        bld.store(access.addr.clone(), self.read(rt));
        bld.store(access.addr.clone().add(expr::num_u32(4)), self.read(rt2));
        self.write_back(bld, &access);
        Ok(())
    }

    // ---- block transfers ---------------------------------------------

    fn block_kind(&self) -> Result<(bool, BlockKind), LiftError> {
        match self.ins.opcode {
            Opcode::Ldm | Opcode::Pop => Ok((true, BlockKind::Ia)),
            Opcode::Ldmib => Ok((true, BlockKind::Ib)),
            Opcode::Ldmda => Ok((true, BlockKind::Da)),
            Opcode::Ldmdb => Ok((true, BlockKind::Db)),
            Opcode::Stm => Ok((false, BlockKind::Ia)),
            Opcode::Stmib => Ok((false, BlockKind::Ib)),
            Opcode::Stmda => Ok((false, BlockKind::Da)),
            Opcode::Stmdb | Opcode::Push => Ok((false, BlockKind::Db)),
            op => Err(LiftError::InvalidOpcode(op)),
        }
    }

    /// LDM/STM and PUSH/POP. The start address depends on the addressing
    /// suffix; registers transfer in ascending number order at stride 4.
    /// A loaded PC routes through the interworking write after the base
    /// write-back; a written-back base that is also in the list becomes
    /// undefined per the manual.
    #[allow(clippy::too_many_lines)]
    fn block_transfer(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let (load, kind) = self.block_kind()?;
        let (base, regs, write_back) = match self.ins.opcode {
            Opcode::Push | Opcode::Pop => {
                let Operands::One(list) = &self.ins.operands else {
                    return Err(self.bad_shape());
                };
                (Register::SP, self.as_list(list)?, true)
            }
            _ => {
                let Operands::Two(rn, list) = &self.ins.operands else {
                    return Err(self.bad_shape());
                };
                (self.as_reg(rn)?, self.as_list(list)?, self.ins.write_back)
            }
        };
        let mask = u32::from(register_mask(regs)?);
        if mask == 0 {
            tracing::warn!(addr = self.ins.address, "block transfer with empty list");
            bld.side_effect(SideEffect::UndefinedInstr);
            return Ok(());
        }
        let count = mask.count_ones();
        let total = expr::num_u32(4 * count);
        let base_expr = self.read(base);
        let start = match kind {
            BlockKind::Ia => base_expr.clone(),
            BlockKind::Ib => base_expr.clone().add(expr::num_u32(4)),
            BlockKind::Da => base_expr
                .clone()
                .sub(expr::num_u32(4 * count))
                .add(expr::num_u32(4)),
            BlockKind::Db => base_expr.clone().sub(expr::num_u32(4 * count)),
        };
        let t_addr = bld.tmp_var(32);
        bld.put(t_addr, start);

        let mut pc_tmp = None;
        let mut slot = 0u32;
        for n in 0..16u32 {
            if mask & (1 << n) == 0 {
                continue;
            }
            let addr = if slot == 0 {
                expr::var_of(t_addr)
            } else {
                expr::var_of(t_addr).add(expr::num_u32(4 * slot))
            };
            let reg = CORE_REGISTERS[n as usize];
            if load {
                if reg == Register::PC {
                    let t = bld.tmp_var(32);
                    bld.put(t, expr::load_le(32, addr));
                    pc_tmp = Some(t);
                } else {
                    bld.put(self.ctxt.reg_var(reg), expr::load_le(32, addr));
                }
            } else {
                bld.store(addr, self.read(reg));
            }
            slot += 1;
        }

        if write_back {
            let base_in_list = base
                .number()
                .is_some_and(|n| mask & (1 << n) != 0);
            if base_in_list {
                tracing::warn!(
                    addr = self.ins.address,
                    base = %base,
                    "write-back base is in the register list"
                );
                bld.put(
                    self.ctxt.reg_var(base),
                    expr::undef(32, "write-back base in register list"),
                );
            } else {
                let new_base = match kind {
                    BlockKind::Ia | BlockKind::Ib => base_expr.add(total),
                    BlockKind::Da | BlockKind::Db => base_expr.sub(total),
                };
                bld.put(self.ctxt.reg_var(base), new_base);
            }
        }
        if let Some(t) = pc_tmp {
            load_write_pc(bld, expr::var_of(t));
        }
        Ok(())
    }

    // ---- bit fields and extensions -----------------------------------

    /// UXTB/SXTH and friends: rotate, take the low byte/halfword, extend;
    /// the accumulate forms add the result to `rn`.
    fn extend(
        &self,
        bld: &mut StmtBuilder,
        width: u32,
        signed: bool,
        accumulate: bool,
    ) -> Result<(), LiftError> {
        let (dst, rn, rm, shift_op) = match (&self.ins.operands, accumulate) {
            (Operands::Two(d, m), false) => (d, None, m, None),
            (Operands::Three(d, m, s @ Operand::Shift { .. }), false) => (d, None, m, Some(s)),
            (Operands::Three(d, n, m), true) => (d, Some(n), m, None),
            (Operands::Four(d, n, m, s), true) => (d, Some(n), m, Some(s)),
            _ => return Err(self.bad_shape()),
        };
        let dst = self.as_reg(dst)?;
        let rotation = match shift_op {
            None => 0,
            Some(Operand::Shift {
                kind: ShiftKind::Ror,
                amount: ShiftAmount::Imm(k),
            }) => *k,
            Some(_) => return Err(self.bad_shape()),
        };
        let rotated = shift(
            self.read(self.as_reg(rm)?),
            32,
            ShiftKind::Ror,
            rotation,
            carry_flag(),
        )?;
        let narrow = expr::extract_low(width, rotated);
        let extended = if signed {
            expr::sext(32, narrow)
        } else {
            expr::zext(32, narrow)
        };
        let value = match rn {
            Some(rn) => self.read(self.as_reg(rn)?).add(extended),
            None => extended,
        };
        self.write_result(bld, dst, value, FlagKind::None)
    }

    fn bitfield_args(&self) -> Result<(Register, Option<Register>, u32, u32), LiftError> {
        let (dst, rn, lsb, width) = match &self.ins.operands {
            Operands::Three(d, lsb, width) => (
                self.as_reg(d)?,
                None,
                self.as_imm(lsb)? as u32,
                self.as_imm(width)? as u32,
            ),
            Operands::Four(d, n, lsb, width) => (
                self.as_reg(d)?,
                Some(self.as_reg(n)?),
                self.as_imm(lsb)? as u32,
                self.as_imm(width)? as u32,
            ),
            _ => return Err(self.bad_shape()),
        };
        if width == 0 || lsb >= 32 || lsb + width > 32 {
            return Err(self.bad_shape());
        }
        Ok((dst, rn, lsb, width))
    }

    const fn field_mask(lsb: u32, width: u32) -> u32 {
        (((1u64 << width) - 1) as u32) << lsb
    }

    fn bfc(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let (dst, _, lsb, width) = self.bitfield_args()?;
        let mask = Self::field_mask(lsb, width);
        let value = self.read(dst).band(expr::num_u32(!mask));
        self.write_result(bld, dst, value, FlagKind::None)
    }

    fn bfi(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let (dst, rn, lsb, width) = self.bitfield_args()?;
        let rn = rn.ok_or_else(|| self.bad_shape())?;
        let mask = Self::field_mask(lsb, width);
        let low_mask = Self::field_mask(0, width);
        let inserted = self
            .read(rn)
            .band(expr::num_u32(low_mask))
            .shl(expr::num_u32(lsb));
        let value = self
            .read(dst)
            .band(expr::num_u32(!mask))
            .bor(inserted);
        self.write_result(bld, dst, value, FlagKind::None)
    }

    fn bfx(&self, bld: &mut StmtBuilder, signed: bool) -> Result<(), LiftError> {
        let (dst, rn, lsb, width) = self.bitfield_args()?;
        let rn = rn.ok_or_else(|| self.bad_shape())?;
        let value = if signed {
            // Shift the field to the top, then arithmetic-shift it down.
            self.read(rn)
                .shl(expr::num_u32(32 - lsb - width))
                .sar(expr::num_u32(32 - width))
        } else {
            self.read(rn)
                .shr(expr::num_u32(lsb))
                .band(expr::num_u32(Self::field_mask(0, width)))
        };
        self.write_result(bld, dst, value, FlagKind::None)
    }

    fn rev(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Two(dst, rm) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let rm = self.read(self.as_reg(rm)?);
        let byte = |i: u32| expr::extract(rm.clone(), 8, 8 * i);
        let value = expr::concat(
            expr::concat(byte(0), byte(1)),
            expr::concat(byte(2), byte(3)),
        );
        self.write_result(bld, dst, value, FlagKind::None)
    }

    // ---- status register ---------------------------------------------

    fn mrs(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Two(dst, psr) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let dst = self.as_reg(dst)?;
        let psr = self.as_reg(psr)?;
        if !psr.is_psr() {
            return Err(LiftError::InvalidRegister(psr));
        }
        bld.put(self.ctxt.reg_var(dst), expr::var(psr));
        Ok(())
    }

    /// MSR, flags-field form: replaces the condition field of the PSR.
    fn msr(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let Operands::Two(psr, src) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let psr = self.as_reg(psr)?;
        if !psr.is_psr() {
            return Err(LiftError::InvalidRegister(psr));
        }
        let value = match src {
            Operand::Reg(rm) => self.read(*rm),
            Operand::Imm(imm) => imm_expr(*imm)?,
            _ => return Err(self.bad_shape()),
        };
        set_psr_field(bld, psr, PsrField::Cond, expr::extract(value, 4, 28));
        Ok(())
    }

    // ---- VFP loads/stores --------------------------------------------

    fn vfp_mem_operands(&self) -> Result<(Register, MemAccess), LiftError> {
        let Operands::Two(fd, mem) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let fd = self.as_reg(fd)?;
        if !fd.is_single_fp() && !fd.is_double_fp() {
            return Err(LiftError::InvalidRegister(fd));
        }
        Ok((fd, mem_access(self.ins, self.as_mem(mem)?)?))
    }

    /// VLDR: 32-bit access for S registers, a pair of 32-bit accesses
    /// composed as `concat(hi, lo)` for D registers.
    fn vldr(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let (fd, access) = self.vfp_mem_operands()?;
        if fd.is_single_fp() {
            bld.put(self.ctxt.reg_var(fd), expr::load_le(32, access.addr.clone()));
        } else {
            let lo = bld.tmp_var(32);
            let hi = bld.tmp_var(32);
            bld.put(lo, expr::load_le(32, access.addr.clone()));
            bld.put(
                hi,
                expr::load_le(32, access.addr.clone().add(expr::num_u32(4))),
            );
            bld.put(
                self.ctxt.reg_var(fd),
                expr::concat(expr::var_of(hi), expr::var_of(lo)),
            );
        }
        self.write_back(bld, &access);
        Ok(())
    }

    fn vstr(&self, bld: &mut StmtBuilder) -> Result<(), LiftError> {
        let (fd, access) = self.vfp_mem_operands()?;
        if fd.is_single_fp() {
            bld.store(access.addr.clone(), expr::var(fd));
        } else {
            bld.store(access.addr.clone(), expr::extract_low(32, expr::var(fd)));
            bld.store(
                access.addr.clone().add(expr::num_u32(4)),
                expr::extract_high(32, expr::var(fd)),
            );
        }
        self.write_back(bld, &access);
        Ok(())
    }

    /// VPUSH/VPOP iterate the floating-point list at stride 4 (S bank) or
    /// 8 (D bank) against SP.
    fn vpush_pop(&self, bld: &mut StmtBuilder, push: bool) -> Result<(), LiftError> {
        let Operands::One(list) = &self.ins.operands else {
            return Err(self.bad_shape());
        };
        let regs = self.as_list(list)?;
        let first = *regs.first().ok_or_else(|| self.bad_shape())?;
        let single = first.is_single_fp();
        if !single && !first.is_double_fp() {
            return Err(LiftError::InvalidRegister(first));
        }
        for &reg in regs {
            let same_bank = if single {
                reg.is_single_fp()
            } else {
                reg.is_double_fp()
            };
            if !same_bank {
                return Err(LiftError::InvalidRegister(reg));
            }
        }
        let stride = if single { 4 } else { 8 };
        let count = u32::try_from(regs.len()).map_err(|_| self.bad_shape())?;
        let total = expr::num_u32(stride * count);

        let t_addr = bld.tmp_var(32);
        let sp = expr::var(Register::SP);
        if push {
            bld.put(t_addr, sp.clone().sub(total.clone()));
        } else {
            bld.put(t_addr, sp.clone());
        }
        for (i, &reg) in regs.iter().enumerate() {
            let offset = stride * u32::try_from(i).map_err(|_| self.bad_shape())?;
            let addr = if offset == 0 {
                expr::var_of(t_addr)
            } else {
                expr::var_of(t_addr).add(expr::num_u32(offset))
            };
            if push {
                if single {
                    bld.store(addr, expr::var(reg));
                } else {
                    bld.store(addr.clone(), expr::extract_low(32, expr::var(reg)));
                    bld.store(
                        addr.add(expr::num_u32(4)),
                        expr::extract_high(32, expr::var(reg)),
                    );
                }
            } else if single {
                bld.put(self.ctxt.reg_var(reg), expr::load_le(32, addr));
            } else {
                let lo = bld.tmp_var(32);
                let hi = bld.tmp_var(32);
                bld.put(lo, expr::load_le(32, addr.clone()));
                bld.put(hi, expr::load_le(32, addr.add(expr::num_u32(4))));
                bld.put(
                    self.ctxt.reg_var(reg),
                    expr::concat(expr::var_of(hi), expr::var_of(lo)),
                );
            }
        }
        let new_sp = if push { sp.sub(total) } else { sp.add(total) };
        bld.put(self.ctxt.reg_var(Register::SP), new_sp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::condition::Condition;
    use crate::arm::instruction::{Offset, Sign};
    use crate::bitvec::BitVector;
    use crate::ir::expr::{
        b0, b1, concat, extract, extract_low, load_le, num, num_u32, var, var_of, zext,
    };
    use crate::ir::{Stmt, UndefKind, Var};
    use pretty_assertions::assert_eq;

    fn ins(opcode: Opcode, operands: Operands) -> InstructionInfo {
        InstructionInfo {
            address: 0x8000,
            num_bytes: 4,
            opcode,
            condition: Some(Condition::AL),
            set_flags: false,
            write_back: false,
            mode: OperatingMode::Arm,
            operands,
        }
    }

    fn ins_s(opcode: Opcode, operands: Operands) -> InstructionInfo {
        InstructionInfo {
            set_flags: true,
            ..ins(opcode, operands)
        }
    }

    fn thumb(mut i: InstructionInfo) -> InstructionInfo {
        i.mode = OperatingMode::Thumb;
        i.condition = None;
        i
    }

    fn lift(i: &InstructionInfo) -> Vec<Stmt> {
        translate(i, &TransContext::new(OperatingMode::Arm)).unwrap()
    }

    fn tmp(id: u32) -> Var {
        Var::Tmp { id, width: 32 }
    }

    fn reg(r: Register) -> Operand {
        Operand::Reg(r)
    }

    fn imm(v: i64) -> Operand {
        Operand::Imm(v)
    }

    fn apsr_put(field: PsrField, value: Expr) -> Stmt {
        Stmt::Put {
            dst: Var::Reg(Register::APSR),
            src: var(Register::APSR)
                .band(num_u32(!field.mask()))
                .bor(zext(32, value).shl(num_u32(field.pos()))),
        }
    }

    #[test]
    fn mov_immediate_is_a_single_put() {
        let stmts = lift(&ins(
            Opcode::Mov,
            Operands::Two(reg(Register::R0), imm(5)),
        ));
        assert_eq!(
            stmts,
            vec![
                Stmt::ISMark {
                    addr: 0x8000,
                    len: 4
                },
                Stmt::Put {
                    dst: Var::Reg(Register::R0),
                    src: num_u32(5)
                },
                Stmt::IEMark { addr: 0x8004 },
            ]
        );
    }

    #[test]
    fn adds_updates_all_four_flags() {
        let stmts = lift(&ins_s(
            Opcode::Add,
            Operands::Three(reg(Register::R0), reg(Register::R1), reg(Register::R2)),
        ));
        // awc temp, destination write, then N/Z/C/V.
        assert_eq!(stmts.len(), 8);
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: tmp(0),
                src: var(Register::R1).add(var(Register::R2)).add(zext(32, b0())),
            }
        );
        assert_eq!(
            stmts[2],
            Stmt::Put {
                dst: Var::Reg(Register::R0),
                src: var_of(tmp(0)),
            }
        );
        let apsr_puts = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::Put { dst: Var::Reg(Register::APSR), .. }))
            .count();
        assert_eq!(apsr_puts, 4);
    }

    #[test]
    fn subs_is_add_with_complement_and_carry_in() {
        let stmts = lift(&ins_s(
            Opcode::Sub,
            Operands::Three(reg(Register::R3), reg(Register::R3), reg(Register::R4)),
        ));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: tmp(0),
                src: var(Register::R3)
                    .add(var(Register::R4).not())
                    .add(zext(32, b1())),
            }
        );
        // The C and V updates come from the add-with-carry expressions.
        let carry = var_of(tmp(0)).ult(var(Register::R3));
        assert!(stmts.contains(&apsr_put(PsrField::C, carry)));
        let sign_a = extract(var(Register::R3), 1, 31);
        let sign_b = extract(var(Register::R4).not(), 1, 31);
        let sign_r = extract(var_of(tmp(0)), 1, 31);
        let overflow = sign_a.clone().eq(sign_b).band(sign_a.neq(sign_r));
        assert!(stmts.contains(&apsr_put(PsrField::V, overflow)));
    }

    #[test]
    fn bx_thumb_path_sets_t_and_clears_bit_zero() {
        let stmts = lift(&ins(Opcode::Bx, Operands::One(reg(Register::R0))));
        // Thumb arm of the interworking machine: J cleared, T set, jump to
        // the target with bit 0 cleared.
        assert!(stmts.contains(&Stmt::Put {
            dst: Var::Reg(Register::APSR),
            src: var(Register::APSR).band(num_u32(!PsrField::J.mask())),
        }));
        assert!(stmts.contains(&Stmt::Put {
            dst: Var::Reg(Register::APSR),
            src: var(Register::APSR).bor(num_u32(PsrField::T.mask())),
        }));
        assert!(stmts.contains(&Stmt::InterJmp {
            pc: Var::Reg(Register::PC),
            target: var_of(tmp(0)).band(num_u32(0xFFFF_FFFE)),
        }));
        assert!(
            stmts
                .iter()
                .any(|s| matches!(s, Stmt::SideEffect(SideEffect::UndefinedInstr)))
        );
    }

    #[test]
    fn ldr_pre_indexed_loads_then_writes_back_then_puts() {
        let stmts = lift(&ins(
            Opcode::Ldr,
            Operands::Two(
                reg(Register::R0),
                Operand::Mem(AddressingMode::PreIndexed(Offset::Imm {
                    base: Register::R1,
                    offset: Some((Sign::Plus, 4)),
                })),
            ),
        ));
        let addr = var(Register::R1).add(num_u32(4));
        assert_eq!(
            stmts,
            vec![
                Stmt::ISMark {
                    addr: 0x8000,
                    len: 4
                },
                Stmt::Put {
                    dst: tmp(0),
                    src: load_le(32, addr.clone()),
                },
                Stmt::Put {
                    dst: Var::Reg(Register::R1),
                    src: addr,
                },
                Stmt::Put {
                    dst: Var::Reg(Register::R0),
                    src: var_of(tmp(0)),
                },
                Stmt::IEMark { addr: 0x8004 },
            ]
        );
    }

    #[test]
    fn push_stores_ascending_from_the_lowered_sp() {
        let stmts = lift(&ins(
            Opcode::Push,
            Operands::One(Operand::RegList(vec![
                Register::R4,
                Register::R5,
                Register::LR,
            ])),
        ));
        let lowered = var(Register::SP).sub(num_u32(12));
        assert_eq!(
            stmts,
            vec![
                Stmt::ISMark {
                    addr: 0x8000,
                    len: 4
                },
                Stmt::Put {
                    dst: tmp(0),
                    src: lowered.clone(),
                },
                Stmt::Store {
                    addr: var_of(tmp(0)),
                    value: var(Register::R4),
                },
                Stmt::Store {
                    addr: var_of(tmp(0)).add(num_u32(4)),
                    value: var(Register::R5),
                },
                Stmt::Store {
                    addr: var_of(tmp(0)).add(num_u32(8)),
                    value: var(Register::LR),
                },
                Stmt::Put {
                    dst: Var::Reg(Register::SP),
                    src: lowered,
                },
                Stmt::IEMark { addr: 0x8004 },
            ]
        );
    }

    #[test]
    fn conditional_instructions_are_gated() {
        let mut conditional = ins(
            Opcode::Add,
            Operands::Three(reg(Register::R0), reg(Register::R1), reg(Register::R2)),
        );
        conditional.condition = Some(Condition::EQ);
        let stmts = lift(&conditional);
        assert!(matches!(stmts[1], Stmt::CJmp { .. }));
        assert!(matches!(stmts[2], Stmt::LMark(_)));
        // The fail label sits right before the IEMark.
        assert!(matches!(stmts[stmts.len() - 2], Stmt::LMark(_)));
    }

    #[test]
    fn always_condition_emits_no_cjmp() {
        for i in [
            ins(Opcode::Mov, Operands::Two(reg(Register::R0), imm(1))),
            ins(
                Opcode::Add,
                Operands::Three(reg(Register::R0), reg(Register::R1), reg(Register::R2)),
            ),
            ins(
                Opcode::Ldr,
                Operands::Two(
                    reg(Register::R0),
                    Operand::Mem(AddressingMode::Offset(Offset::Imm {
                        base: Register::R1,
                        offset: None,
                    })),
                ),
            ),
        ] {
            let stmts = lift(&i);
            assert!(
                !stmts.iter().any(|s| matches!(s, Stmt::CJmp { .. })),
                "unexpected CJmp for {}",
                i.opcode
            );
        }
    }

    #[test]
    fn every_lift_is_bracketed_by_markers() {
        let cases = vec![
            ins(Opcode::Nop, Operands::Zero),
            ins(Opcode::Svc, Operands::One(imm(0))),
            ins(Opcode::Vadd, Operands::Zero),
            ins_s(
                Opcode::Sub,
                Operands::Three(reg(Register::R0), reg(Register::R1), imm(1)),
            ),
            ins(Opcode::Bx, Operands::One(reg(Register::LR))),
        ];
        for i in cases {
            let stmts = lift(&i);
            assert!(matches!(
                stmts.first(),
                Some(Stmt::ISMark {
                    addr: 0x8000,
                    len: 4
                })
            ));
            assert!(matches!(stmts.last(), Some(Stmt::IEMark { addr: 0x8004 })));
        }
    }

    #[test]
    fn ldm_access_count_matches_the_mask_popcount() {
        let stmts = lift(&ins(
            Opcode::Ldm,
            Operands::Two(
                reg(Register::R0),
                Operand::RegList(vec![Register::R1, Register::R2, Register::PC]),
            ),
        ));
        let loads = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::Put { src: Expr::Load { .. }, .. }))
            .count();
        assert_eq!(loads, 3);
        // Bit 15 routes through the interworking PC write.
        assert!(stmts.iter().any(|s| matches!(s, Stmt::InterJmp { .. })));
    }

    #[test]
    fn stm_stores_match_the_mask_popcount() {
        let stmts = lift(&ins(
            Opcode::Stm,
            Operands::Two(
                reg(Register::R3),
                Operand::RegList(vec![Register::R0, Register::R4, Register::SB]),
            ),
        ));
        let stores = stmts
            .iter()
            .filter(|s| matches!(s, Stmt::Store { .. }))
            .count();
        assert_eq!(stores, 3);
    }

    #[test]
    fn write_back_base_in_list_becomes_undefined() {
        let mut i = ins(
            Opcode::Ldm,
            Operands::Two(
                reg(Register::R0),
                Operand::RegList(vec![Register::R0, Register::R1]),
            ),
        );
        i.write_back = true;
        let stmts = lift(&i);
        assert!(stmts.iter().any(|s| matches!(
            s,
            Stmt::Put {
                dst: Var::Reg(Register::R0),
                src: Expr::Undefined {
                    kind: UndefKind::Unpredictable,
                    ..
                },
            }
        )));
    }

    #[test]
    fn pop_delegates_to_ldmia_on_sp() {
        let stmts = lift(&ins(
            Opcode::Pop,
            Operands::One(Operand::RegList(vec![Register::R4, Register::R5])),
        ));
        // Start address is SP itself; SP rises by 8 afterwards.
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: tmp(0),
                src: var(Register::SP),
            }
        );
        assert!(stmts.contains(&Stmt::Put {
            dst: Var::Reg(Register::SP),
            src: var(Register::SP).add(num_u32(8)),
        }));
    }

    #[test]
    fn thumb_only_opcodes_reject_arm_mode() {
        let cbz = ins(
            Opcode::Cbz,
            Operands::Two(reg(Register::R0), imm(8)),
        );
        assert_eq!(
            translate(&cbz, &TransContext::new(OperatingMode::Arm)).unwrap_err(),
            LiftError::InvalidTargetArchMode(Opcode::Cbz)
        );
    }

    #[test]
    fn cbz_branches_on_zero_without_touching_flags() {
        let i = thumb(ins(
            Opcode::Cbz,
            Operands::Two(reg(Register::R3), imm(8)),
        ));
        let stmts = translate(&i, &TransContext::new(OperatingMode::Thumb)).unwrap();
        assert!(stmts.iter().any(|s| matches!(
            s,
            Stmt::CJmp { cond: Expr::RelOp { .. }, .. }
        )));
        // Thumb pipeline PC is addr + 4; target 0x8004 + 8.
        assert!(stmts.contains(&Stmt::InterJmp {
            pc: Var::Reg(Register::PC),
            target: num_u32(0x800C).band(num_u32(0xFFFF_FFFE)),
        }));
    }

    #[test]
    fn table_branch_doubles_the_loaded_offset() {
        let i = thumb(ins(
            Opcode::Tbb,
            Operands::One(Operand::Mem(AddressingMode::Offset(Offset::Reg {
                base: Register::R0,
                sign: Sign::Plus,
                index: Register::R1,
                shift: None,
            }))),
        ));
        let stmts = translate(&i, &TransContext::new(OperatingMode::Thumb)).unwrap();
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: tmp(0),
                src: zext(32, load_le(8, var(Register::R0).add(var(Register::R1)))),
            }
        );
        assert!(stmts.contains(&Stmt::InterJmp {
            pc: Var::Reg(Register::PC),
            target: num_u32(0x8004)
                .add(var_of(tmp(0)).mul(num_u32(2)))
                .band(num_u32(0xFFFF_FFFE)),
        }));
    }

    #[test]
    fn bl_links_the_return_address() {
        let stmts = lift(&ins(Opcode::Bl, Operands::One(imm(-8))));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: Var::Reg(Register::LR),
                src: num_u32(0x8004),
            }
        );
        // Target is pc (0x8008) - 8, word aligned.
        assert_eq!(
            stmts[2],
            Stmt::InterJmp {
                pc: Var::Reg(Register::PC),
                target: num_u32(0x8000).band(num_u32(0xFFFF_FFFC)),
            }
        );

        let i = thumb(ins(Opcode::Bl, Operands::One(imm(-8))));
        let stmts = translate(&i, &TransContext::new(OperatingMode::Thumb)).unwrap();
        // Thumb return addresses carry bit 0.
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: Var::Reg(Register::LR),
                src: num_u32(0x8005),
            }
        );
    }

    #[test]
    fn blx_immediate_swaps_instruction_sets() {
        let stmts = lift(&ins(Opcode::Blx, Operands::One(imm(0x10))));
        // ARM to Thumb: the interworking write sees bit 0 set.
        assert!(stmts.iter().any(|s| matches!(
            s,
            Stmt::Put { src: Expr::Num(n), .. } if *n == BitVector::of_u64(0x8019, 32).unwrap()
        )));
    }

    #[test]
    fn movt_replaces_only_the_high_half() {
        let stmts = lift(&ins(
            Opcode::Movt,
            Operands::Two(reg(Register::R0), imm(0x1234)),
        ));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: Var::Reg(Register::R0),
                src: concat(
                    num(BitVector::of_u64(0x1234, 16).unwrap()),
                    extract_low(16, var(Register::R0)),
                ),
            }
        );
    }

    #[test]
    fn umull_splits_the_product() {
        let stmts = lift(&ins(
            Opcode::Umull,
            Operands::Four(
                reg(Register::R0),
                reg(Register::R1),
                reg(Register::R2),
                reg(Register::R3),
            ),
        ));
        let t64 = Var::Tmp { id: 0, width: 64 };
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: t64,
                src: zext(64, var(Register::R2)).mul(zext(64, var(Register::R3))),
            }
        );
        assert_eq!(
            stmts[2],
            Stmt::Put {
                dst: Var::Reg(Register::R0),
                src: extract_low(32, var_of(t64)),
            }
        );
        assert_eq!(
            stmts[3],
            Stmt::Put {
                dst: Var::Reg(Register::R1),
                src: extract(var_of(t64), 32, 32),
            }
        );
    }

    #[test]
    fn exception_return_copies_spsr_and_guards_the_mode() {
        let stmts = lift(&ins_s(
            Opcode::Sub,
            Operands::Three(reg(Register::PC), reg(Register::LR), imm(4)),
        ));
        assert!(stmts.contains(&Stmt::Put {
            dst: Var::Reg(Register::CPSR),
            src: var(Register::SPSR),
        }));
        assert!(stmts.iter().any(|s| matches!(s, Stmt::CJmp { .. })));
        assert!(
            stmts
                .iter()
                .any(|s| matches!(s, Stmt::SideEffect(SideEffect::UndefinedInstr)))
        );
        assert!(stmts.iter().any(|s| matches!(s, Stmt::InterJmp { .. })));
    }

    #[test]
    fn unsupported_fp_is_a_single_side_effect() {
        for opcode in [
            Opcode::Vadd,
            Opcode::Vsub,
            Opcode::Vmul,
            Opcode::Vdiv,
            Opcode::Vmov,
            Opcode::Vcmp,
            Opcode::Vcvt,
            Opcode::Vmls,
        ] {
            let stmts = lift(&ins(opcode, Operands::Zero));
            assert_eq!(
                stmts,
                vec![
                    Stmt::ISMark {
                        addr: 0x8000,
                        len: 4
                    },
                    Stmt::SideEffect(SideEffect::UnsupportedFp),
                    Stmt::IEMark { addr: 0x8004 },
                ]
            );
        }
    }

    #[test]
    fn vldr_double_composes_the_word_pair() {
        let stmts = lift(&ins(
            Opcode::Vldr,
            Operands::Two(
                reg(Register::D1),
                Operand::Mem(AddressingMode::Offset(Offset::Imm {
                    base: Register::R2,
                    offset: None,
                })),
            ),
        ));
        let (lo, hi) = (tmp(0), tmp(1));
        assert_eq!(
            stmts[3],
            Stmt::Put {
                dst: Var::Reg(Register::D1),
                src: concat(var_of(hi), var_of(lo)),
            }
        );
    }

    #[test]
    fn vpush_uses_the_single_precision_stride() {
        let stmts = lift(&ins(
            Opcode::Vpush,
            Operands::One(Operand::RegList(vec![Register::S0, Register::S1])),
        ));
        let lowered = var(Register::SP).sub(num_u32(8));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: tmp(0),
                src: lowered.clone(),
            }
        );
        assert_eq!(
            stmts[2],
            Stmt::Store {
                addr: var_of(tmp(0)),
                value: var(Register::S0),
            }
        );
        assert!(stmts.contains(&Stmt::Put {
            dst: Var::Reg(Register::SP),
            src: lowered,
        }));
    }

    #[test]
    fn vpush_rejects_mixed_banks() {
        let i = ins(
            Opcode::Vpush,
            Operands::One(Operand::RegList(vec![Register::S0, Register::D1])),
        );
        assert_eq!(
            translate(&i, &TransContext::new(OperatingMode::Arm)).unwrap_err(),
            LiftError::InvalidRegister(Register::D1)
        );
    }

    #[test]
    fn clz_is_not_implemented() {
        let i = ins(
            Opcode::Clz,
            Operands::Two(reg(Register::R0), reg(Register::R1)),
        );
        assert_eq!(
            translate(&i, &TransContext::new(OperatingMode::Arm)).unwrap_err(),
            LiftError::NotImplemented(Opcode::Clz)
        );
    }

    #[test]
    fn operand_shape_mismatch_is_reported() {
        let i = ins(Opcode::Add, Operands::One(reg(Register::R0)));
        assert_eq!(
            translate(&i, &TransContext::new(OperatingMode::Arm)).unwrap_err(),
            LiftError::InvalidOperand(Opcode::Add)
        );
    }

    #[test]
    fn pc_as_operand_reads_the_pipeline_value() {
        let stmts = lift(&ins(
            Opcode::Add,
            Operands::Three(reg(Register::R0), reg(Register::PC), imm(0)),
        ));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: tmp(0),
                src: num_u32(0x8008).add(num_u32(0)).add(zext(32, b0())),
            }
        );
    }

    #[test]
    fn ubfx_and_sbfx_extract_bit_fields() {
        let stmts = lift(&ins(
            Opcode::Ubfx,
            Operands::Four(reg(Register::R0), reg(Register::R1), imm(4), imm(8)),
        ));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: Var::Reg(Register::R0),
                src: var(Register::R1).shr(num_u32(4)).band(num_u32(0xFF)),
            }
        );
        let stmts = lift(&ins(
            Opcode::Sbfx,
            Operands::Four(reg(Register::R0), reg(Register::R1), imm(4), imm(8)),
        ));
        assert_eq!(
            stmts[1],
            Stmt::Put {
                dst: Var::Reg(Register::R0),
                src: var(Register::R1).shl(num_u32(20)).sar(num_u32(24)),
            }
        );
    }

    #[test]
    fn uxtb_rotates_then_extracts() {
        let stmts = lift(&ins(
            Opcode::Uxtb,
            Operands::Three(
                reg(Register::R0),
                reg(Register::R1),
                Operand::Shift {
                    kind: ShiftKind::Ror,
                    amount: ShiftAmount::Imm(8),
                },
            ),
        ));
        match &stmts[1] {
            Stmt::Put { dst, src } => {
                assert_eq!(*dst, Var::Reg(Register::R0));
                assert_eq!(src.width(), 32);
                assert!(matches!(src, Expr::Cast { .. }));
            }
            other => panic!("expected Put, got {other}"),
        }
    }
}
