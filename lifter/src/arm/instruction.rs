//! Decoded-instruction input contract.
//!
//! The decoder hands the lifter one [`InstructionInfo`] per instruction:
//! address, byte length, opcode, operating mode, optional condition and up
//! to four operands. Immediates arrive fully expanded (the 8-bit/rotation
//! encoding is the decoder's business); branch immediates are relative to
//! the pipeline PC value.

use serde::{Deserialize, Serialize};

use crate::arm::condition::Condition;
use crate::arm::register::Register;
use crate::arm::shift::ShiftKind;

/// The instruction-set state the instruction was decoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingMode {
    Arm,
    Thumb,
}

/// Every opcode the lifter knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rustfmt::skip]
pub enum Opcode {
    // Data processing
    Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Movt, Movw, Mvn, Orr,
    Rsb, Rsc, Sbc, Sub, Teq, Tst,
    // Shift instructions
    Asr, Lsl, Lsr, Ror, Rrx,
    // Multiply
    Mla, Mls, Mul, Smlal, Smull, Umlal, Umull,
    // Branch
    B, Bl, Blx, Bx, Cbnz, Cbz, Tbb, Tbh,
    // Load/store
    Ldr, Ldrb, Ldrd, Ldrh, Ldrsb, Ldrsh, Str, Strb, Strd, Strh,
    // Block transfer
    Ldm, Ldmda, Ldmdb, Ldmib, Pop, Push, Stm, Stmda, Stmdb, Stmib,
    // Bit field and extension
    Bfc, Bfi, Rev, Sbfx, Sxtab, Sxtah, Sxtb, Sxth, Ubfx, Uxtab, Uxtah,
    Uxtb, Uxth,
    // Status register
    Mrs, Msr,
    // System and miscellaneous
    Bkpt, Clz, Nop, Svc,
    // VFP loads/stores
    Vldr, Vpop, Vpush, Vstr,
    // Unsupported floating point
    Vadd, Vcmp, Vcvt, Vdiv, Vmls, Vmov, Vmul, Vsub,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{self:?}").to_uppercase())
    }
}

/// Offset direction for memory addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Plus,
    Minus,
}

/// How a shift amount is specified in a shift operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftAmount {
    Imm(u32),
    Reg(Register),
}

/// The offset part of an addressing mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Offset {
    /// `[rn, #±imm]`; `None` when the base register stands alone.
    Imm {
        base: Register,
        offset: Option<(Sign, u32)>,
    },
    /// `[rn, ±rm, shift #k]`.
    Reg {
        base: Register,
        sign: Sign,
        index: Register,
        shift: Option<(ShiftKind, u32)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    /// Plain offset addressing, no base update.
    Offset(Offset),
    /// Pre-indexed: access at base±offset, then write the address back.
    PreIndexed(Offset),
    /// Post-indexed: access at the base, then write base±offset back.
    PostIndexed(Offset),
    /// PC-relative literal: `align(pc, 4) + imm`.
    Literal(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Reg(Register),
    RegList(Vec<Register>),
    Imm(i64),
    Mem(AddressingMode),
    Shift { kind: ShiftKind, amount: ShiftAmount },
}

/// Zero to four operands, as decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operands {
    Zero,
    One(Operand),
    Two(Operand, Operand),
    Three(Operand, Operand, Operand),
    Four(Operand, Operand, Operand, Operand),
}

/// A decoded instruction, borrowed read-only by the lifter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionInfo {
    pub address: u64,
    pub num_bytes: u32,
    pub opcode: Opcode,
    pub condition: Option<Condition>,
    /// The S suffix: update the APSR flags.
    pub set_flags: bool,
    /// Base-register write-back for block transfers.
    pub write_back: bool,
    pub mode: OperatingMode,
    pub operands: Operands,
}

impl InstructionInfo {
    /// The address of the next instruction in sequence.
    #[must_use]
    pub const fn next_address(&self) -> u64 {
        self.address + self.num_bytes as u64
    }
}
